use std::env;

fn main() {
    let version = env::var("FRUIT_QUALITY_VERSION")
        .unwrap_or_else(|_| env::var("CARGO_PKG_VERSION").unwrap());
    println!("cargo:rerun-if-env-changed=FRUIT_QUALITY_VERSION");
    println!("cargo:rustc-env=FRUIT_QUALITY_VERSION={version}");
}
