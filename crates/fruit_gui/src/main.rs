mod app;

use app::UiApp;
use eframe::NativeOptions;

fn main() {
    tracing_subscriber::fmt::init();
    let options = NativeOptions::default();
    if let Err(e) = eframe::run_native(
        "Fruit Quality Detector",
        options,
        Box::new(|_cc| Ok::<_, Box<dyn std::error::Error + Send + Sync>>(Box::new(UiApp::new()))),
    ) {
        eprintln!("Application stopped with error: {e}");
    }
}
