//! Where images come from: local files, a folder scan, a cloud drive, or a
//! camera. The front-end only sees the traits; the concrete pickers here are
//! the ones the desktop app ships with.

use crate::config::DriveConfig;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// Raw image payload ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBytes {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageBytes {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self { name, bytes })
    }

    /// MIME type sniffed from the payload.
    pub fn mime(&self) -> &'static str {
        image::guess_format(&self.bytes)
            .map(|f| f.to_mime_type())
            .unwrap_or("application/octet-stream")
    }
}

/// A file chosen by the user, not yet loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileRef {
    Local(PathBuf),
    Remote { name: String, url: String },
}

impl FileRef {
    pub fn name(&self) -> String {
        match self {
            FileRef::Local(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            FileRef::Remote { name, .. } => name.clone(),
        }
    }
}

pub trait FilePicker {
    fn pick_files(&mut self) -> Result<Vec<FileRef>>;
}

pub trait Camera {
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn capture_frame(&mut self) -> Result<ImageBytes>;
}

/// On/off gate around a camera. At most one acquisition is live at a time.
pub struct CameraToggle {
    camera: Box<dyn Camera + Send>,
    on: bool,
    release_after_capture: bool,
}

impl CameraToggle {
    pub fn new(camera: Box<dyn Camera + Send>) -> Self {
        Self {
            camera,
            on: false,
            release_after_capture: false,
        }
    }

    /// Stop the camera as soon as a frame has been captured.
    pub fn release_after_capture(mut self, release: bool) -> Self {
        self.release_after_capture = release;
        self
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn start(&mut self) -> Result<()> {
        if self.on {
            return Ok(());
        }
        self.camera.start()?;
        self.on = true;
        tracing::info!("camera started");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if !self.on {
            return Ok(());
        }
        self.camera.stop()?;
        self.on = false;
        tracing::info!("camera stopped");
        Ok(())
    }

    pub fn capture(&mut self) -> Result<ImageBytes> {
        if !self.on {
            bail!("camera is not started");
        }
        let frame = self.camera.capture_frame();
        if self.release_after_capture {
            self.stop()?;
        }
        frame
    }
}

impl Drop for CameraToggle {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!("failed to stop camera on drop: {e}");
        }
    }
}

/// Camera backed by an HTTP snapshot URL, the way most IP webcams and phone
/// webcam apps expose a still frame.
pub struct SnapshotCamera {
    url: String,
    client: reqwest::blocking::Client,
    started: bool,
    frames: usize,
}

impl SnapshotCamera {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("cannot build camera HTTP client")?;
        Ok(Self {
            url: url.into(),
            client,
            started: false,
            frames: 0,
        })
    }

    fn grab(&self) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .with_context(|| format!("camera unreachable at {}", self.url))?;
        if !resp.status().is_success() {
            bail!("camera returned {}", resp.status());
        }
        let bytes = resp.bytes().context("camera frame truncated")?;
        if image::guess_format(&bytes).is_err() {
            bail!("camera did not return an image");
        }
        Ok(bytes.to_vec())
    }
}

impl Camera for SnapshotCamera {
    fn start(&mut self) -> Result<()> {
        self.grab()?;
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.started = false;
        Ok(())
    }

    fn capture_frame(&mut self) -> Result<ImageBytes> {
        if !self.started {
            bail!("camera is not started");
        }
        let bytes = self.grab()?;
        self.frames += 1;
        let ext = image::guess_format(&bytes)
            .ok()
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("jpg");
        Ok(ImageBytes::new(format!("capture-{}.{ext}", self.frames), bytes))
    }
}

/// Options controlling how folder scanning behaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// When true, scan subdirectories recursively.
    pub recursive: bool,
}

/// Picks every supported image in a folder.
pub struct FolderPicker {
    root: PathBuf,
    opts: ScanOptions,
}

impl FolderPicker {
    pub fn new(root: impl Into<PathBuf>, opts: ScanOptions) -> Self {
        Self {
            root: root.into(),
            opts,
        }
    }
}

impl FilePicker for FolderPicker {
    fn pick_files(&mut self) -> Result<Vec<FileRef>> {
        let root = self.root.as_path();
        if !root.exists() {
            bail!("Path does not exist: {}", root.display());
        }
        if !root.is_dir() {
            bail!("Path is not a directory: {}", root.display());
        }

        let walker = if self.opts.recursive {
            WalkDir::new(root).sort_by_file_name()
        } else {
            WalkDir::new(root).max_depth(1).sort_by_file_name()
        };

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("walkdir error: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if path.is_file() && is_supported_image(path) {
                files.push(FileRef::Local(path.to_path_buf()));
            }
        }
        Ok(files)
    }
}

fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => {
            let ext = ext.to_ascii_lowercase();
            matches!(ext.as_str(), "jpg" | "jpeg" | "png")
        }
        None => false,
    }
}

const DRIVE_FILES_API: &str = "https://www.googleapis.com/drive/v3/files";

/// Cloud picker over Google Drive share links or bare file ids.
pub struct DrivePicker {
    drive: DriveConfig,
    links: Vec<String>,
}

impl DrivePicker {
    pub fn new(drive: DriveConfig, links: Vec<String>) -> Self {
        Self { drive, links }
    }

    pub fn client_id(&self) -> &str {
        &self.drive.client_id
    }

    fn download_url(&self, id: &str) -> String {
        format!(
            "{DRIVE_FILES_API}/{}?alt=media&key={}",
            urlencoding::encode(id),
            urlencoding::encode(&self.drive.api_key)
        )
    }
}

impl FilePicker for DrivePicker {
    fn pick_files(&mut self) -> Result<Vec<FileRef>> {
        let mut picked = Vec::new();
        for link in self.links.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
            let id = drive_file_id(link)
                .with_context(|| format!("not a Google Drive file link: {link}"))?;
            picked.push(FileRef::Remote {
                name: format!("drive-{id}"),
                url: self.download_url(id),
            });
        }
        tracing::debug!(client_id = %self.client_id(), count = picked.len(), "drive files picked");
        Ok(picked)
    }
}

/// Extract the file id from a Drive link (`/file/d/<id>/...`, `?id=<id>`)
/// or accept a bare id.
fn drive_file_id(link: &str) -> Option<&str> {
    let is_id_char = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    let candidate = if let Some(rest) = link.split("/file/d/").nth(1) {
        rest.split(['/', '?', '#']).next()?
    } else if let Some(query) = link.split_once('?').map(|(_, q)| q) {
        query
            .split('&')
            .find_map(|kv| kv.strip_prefix("id="))?
            .split('#')
            .next()?
    } else if link.contains('/') {
        return None;
    } else {
        link
    };
    (!candidate.is_empty() && candidate.chars().all(is_id_char)).then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs::File;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    #[derive(Default)]
    struct Calls {
        starts: usize,
        stops: usize,
        captures: usize,
    }

    struct FakeCamera {
        calls: Arc<Mutex<Calls>>,
        fail_start: bool,
        fail_stop: bool,
    }

    impl Camera for FakeCamera {
        fn start(&mut self) -> Result<()> {
            if self.fail_start {
                bail!("permission denied");
            }
            self.calls.lock().unwrap().starts += 1;
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            self.calls.lock().unwrap().stops += 1;
            if self.fail_stop {
                bail!("device busy");
            }
            Ok(())
        }

        fn capture_frame(&mut self) -> Result<ImageBytes> {
            self.calls.lock().unwrap().captures += 1;
            Ok(ImageBytes::new("frame.png", vec![1, 2, 3]))
        }
    }

    fn toggle(fail_start: bool) -> (CameraToggle, Arc<Mutex<Calls>>) {
        fake_toggle(fail_start, false)
    }

    fn fake_toggle(fail_start: bool, fail_stop: bool) -> (CameraToggle, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let cam = FakeCamera {
            calls: calls.clone(),
            fail_start,
            fail_stop,
        };
        (CameraToggle::new(Box::new(cam)), calls)
    }

    #[test]
    fn toggle_starts_once_and_stops_on_drop() {
        let (mut cam, calls) = toggle(false);
        cam.start().unwrap();
        cam.start().unwrap();
        assert!(cam.is_on());
        cam.capture().unwrap();
        drop(cam);
        let calls = calls.lock().unwrap();
        assert_eq!(calls.starts, 1);
        assert_eq!(calls.captures, 1);
        assert_eq!(calls.stops, 1);
    }

    #[test]
    fn capture_requires_started_camera() {
        let (mut cam, calls) = toggle(false);
        assert!(cam.capture().is_err());
        assert_eq!(calls.lock().unwrap().captures, 0);
    }

    #[test]
    fn failed_start_leaves_toggle_off() {
        let (mut cam, _calls) = toggle(true);
        assert!(cam.start().is_err());
        assert!(!cam.is_on());
    }

    #[test]
    fn failed_stop_keeps_toggle_on() {
        let (mut cam, calls) = fake_toggle(false, true);
        cam.start().unwrap();
        assert!(cam.stop().is_err());
        assert!(cam.is_on());
        assert!(cam.capture().is_ok());
        assert_eq!(calls.lock().unwrap().captures, 1);
    }

    #[test]
    fn release_after_capture_stops_camera() {
        let (cam, calls) = toggle(false);
        let mut cam = cam.release_after_capture(true);
        cam.start().unwrap();
        let frame = cam.capture().unwrap();
        assert_eq!(frame.name, "frame.png");
        assert!(!cam.is_on());
        assert_eq!(calls.lock().unwrap().stops, 1);
    }

    #[test]
    fn folder_picker_lists_only_images_non_recursive() -> Result<()> {
        let dir = tempdir()?;
        File::create(dir.path().join("a.JPG"))?;
        File::create(dir.path().join("b.jpeg"))?;
        File::create(dir.path().join("c.png"))?;
        File::create(dir.path().join("not-image.txt"))?;
        let nested = dir.path().join("nested");
        fs::create_dir(&nested)?;
        File::create(nested.join("d.jpg"))?;

        let files = FolderPicker::new(dir.path(), ScanOptions { recursive: false }).pick_files()?;
        let names: Vec<String> = files.iter().map(FileRef::name).collect();
        assert_eq!(names, vec!["a.JPG", "b.jpeg", "c.png"]);
        Ok(())
    }

    #[test]
    fn folder_picker_recurses_when_enabled() -> Result<()> {
        let dir = tempdir()?;
        File::create(dir.path().join("a.jpg"))?;
        let nested = dir.path().join("nested");
        fs::create_dir(&nested)?;
        File::create(nested.join("b.PNG"))?;

        let files = FolderPicker::new(dir.path(), ScanOptions { recursive: true }).pick_files()?;
        let mut names: Vec<String> = files.iter().map(FileRef::name).collect();
        names.sort();
        assert_eq!(names, vec!["a.jpg", "b.PNG"]);
        Ok(())
    }

    #[test]
    fn folder_picker_rejects_missing_dir() {
        let mut picker = FolderPicker::new("/definitely/not/here", ScanOptions::default());
        assert!(picker.pick_files().is_err());
    }

    #[test]
    fn image_bytes_sniffs_mime() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("x.png");
        image::RgbImage::new(2, 2).save(&path)?;
        let img = ImageBytes::from_path(&path)?;
        assert_eq!(img.name, "x.png");
        assert_eq!(img.mime(), "image/png");
        assert_eq!(
            ImageBytes::new("junk", vec![0, 1, 2]).mime(),
            "application/octet-stream"
        );
        Ok(())
    }

    #[rstest]
    #[case("https://drive.google.com/file/d/1AbC-d_9/view?usp=sharing", Some("1AbC-d_9"))]
    #[case("https://drive.google.com/open?id=XyZ123", Some("XyZ123"))]
    #[case("https://drive.google.com/uc?export=download&id=XyZ123", Some("XyZ123"))]
    #[case("1AbCdEf", Some("1AbCdEf"))]
    #[case("https://example.com/photo.jpg", None)]
    #[case("not an id", None)]
    fn extracts_drive_ids(#[case] link: &str, #[case] expected: Option<&str>) {
        assert_eq!(drive_file_id(link), expected);
    }

    #[test]
    fn drive_picker_builds_download_urls() -> Result<()> {
        let drive = DriveConfig {
            client_id: "client".into(),
            api_key: "k+y".into(),
        };
        let mut picker = DrivePicker::new(
            drive,
            vec!["https://drive.google.com/file/d/abc/view".into(), "  ".into()],
        );
        let files = picker.pick_files()?;
        assert_eq!(
            files,
            vec![FileRef::Remote {
                name: "drive-abc".into(),
                url: format!("{DRIVE_FILES_API}/abc?alt=media&key=k%2By"),
            }]
        );
        Ok(())
    }

    #[test]
    fn drive_picker_rejects_foreign_links() {
        let drive = DriveConfig {
            client_id: "client".into(),
            api_key: "key".into(),
        };
        let mut picker = DrivePicker::new(drive, vec!["https://example.com/a.jpg".into()]);
        assert!(picker.pick_files().is_err());
    }
}
