mod settings;
mod toasts;

use eframe::{App, Frame, egui};
use fruit_core::config::CONFIG_FILE_NAME;
use fruit_core::{
    CameraToggle, Config, DrivePicker, FileRef, FolderPicker, ScanOptions, Session,
    SnapshotCamera, report,
};
use rfd::FileDialog;
use settings::SettingsForm;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use toasts::{TOAST_TTL, Toasts};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Panel {
    Detect,
    Settings,
}

const PREVIEW_MAX: u32 = 480;

pub struct UiApp {
    panel: Panel,
    config_path: Option<PathBuf>,
    config: Config,
    form: SettingsForm,
    session: Option<Arc<Mutex<Session>>>,
    busy: Arc<AtomicBool>,
    status: String,
    toasts: Toasts,
    drive_links: String,
    recursive: bool,
    has_camera: bool,
    camera_on: bool,
    selected: usize,
    result_lines: Vec<String>,
    preview: Option<(String, egui::TextureHandle)>,
    app_version: &'static str,
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

impl UiApp {
    pub fn new() -> Self {
        let config_path = directories_next::ProjectDirs::from("io", "fruitquality", "FruitQuality")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME));
        let config = Config::resolve(config_path.as_deref()).unwrap_or_else(|e| {
            tracing::warn!("{e}");
            Config::default()
        });
        let mut app = Self {
            panel: Panel::Detect,
            form: SettingsForm::from_config(&config),
            config_path,
            config,
            session: None,
            busy: Arc::new(AtomicBool::new(false)),
            status: String::new(),
            toasts: Toasts::default(),
            drive_links: String::new(),
            recursive: false,
            has_camera: false,
            camera_on: false,
            selected: 0,
            result_lines: Vec::new(),
            preview: None,
            app_version: env!("FRUIT_QUALITY_VERSION"),
        };
        app.rebuild_session();
        app
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Replace the session after the configuration changed. Any running
    /// camera is released with the old session.
    fn rebuild_session(&mut self) {
        self.session = None;
        self.has_camera = false;
        self.camera_on = false;
        self.selected = 0;
        if let Err(e) = self.config.validate() {
            self.status = format!("Configuration incomplete: {e}");
            self.panel = Panel::Settings;
            return;
        }
        let session = match Session::new(self.config.clone()) {
            Ok(s) => s,
            Err(e) => {
                self.status = format!("Cannot start session: {e}");
                return;
            }
        };
        let session = match self.config.camera_url.as_deref().map(SnapshotCamera::new) {
            Some(Ok(camera)) => {
                self.has_camera = true;
                session.with_camera(CameraToggle::new(Box::new(camera)))
            }
            Some(Err(e)) => {
                tracing::warn!("camera disabled: {e}");
                session
            }
            None => session,
        };
        self.session = Some(Arc::new(Mutex::new(session)));
    }

    /// Run a blocking session operation off the UI thread. Only one runs at
    /// a time.
    fn run_in_background<F>(&self, ctx: &egui::Context, op: F)
    where
        F: FnOnce(&mut Session) + Send + 'static,
    {
        let Some(session) = self.session.clone() else {
            return;
        };
        if self.busy.swap(true, Ordering::AcqRel) {
            return;
        }
        let busy = self.busy.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let mut guard = lock(&session);
            op(&mut *guard);
            drop(guard);
            busy.store(false, Ordering::Release);
            ctx.request_repaint();
        });
    }

    /// Pull notifications and results out of the session when it is idle.
    fn sync_from_session(&mut self, ctx: &egui::Context) {
        if self.is_busy() {
            return;
        }
        let Some(session) = self.session.clone() else {
            return;
        };
        let Ok(mut session) = session.try_lock() else {
            return;
        };
        for note in session.drain_notifications() {
            self.toasts.push(note);
        }
        self.camera_on = session.camera_on();
        self.selected = session.selected().len();
        self.result_lines = session.outcome().map(report::render).unwrap_or_default();

        let Some(shown) = session.preview() else {
            self.preview = None;
            return;
        };
        let key = format!("{}:{}", shown.name, shown.bytes.len());
        if self.preview.as_ref().is_some_and(|(k, _)| *k == key) {
            return;
        }
        self.preview = match image::load_from_memory(&shown.bytes) {
            Ok(img) => {
                let thumb = img.thumbnail(PREVIEW_MAX, PREVIEW_MAX).to_rgba8();
                let (w, h) = thumb.dimensions();
                let color = egui::ColorImage::from_rgba_unmultiplied(
                    [w as usize, h as usize],
                    thumb.as_raw(),
                );
                let tex = ctx.load_texture(
                    format!("preview:{key}"),
                    color,
                    egui::TextureOptions::LINEAR,
                );
                Some((key, tex))
            }
            Err(e) => {
                tracing::warn!("Failed to decode preview for {}: {}", shown.name, e);
                None
            }
        };
    }

    fn select_files(&mut self, files: Vec<FileRef>) {
        if let Some(session) = &self.session {
            let mut session = lock(session);
            session.select_files(files);
            self.selected = session.selected().len();
        }
    }

    fn render_detect_panel(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let idle = self.session.is_some() && !self.is_busy();

        ui.heading("Determine whether your fruit is fresh or rotten");
        ui.label("You can choose only Banana, Orange, or Apple for testing.");
        ui.label(
            "Use a camera and show the fruit, upload images from your device, or pick them from Google Drive.",
        );
        ui.add_space(12.0);

        ui.strong("UPLOAD FROM GOOGLE DRIVE:");
        ui.add(
            egui::TextEdit::multiline(&mut self.drive_links)
                .hint_text("One share link or file id per line")
                .desired_rows(2),
        );
        let drive = self.config.drive.clone();
        if ui
            .add_enabled(
                idle && drive.is_some(),
                egui::Button::new("Choose from Google Drive"),
            )
            .clicked()
            && let Some(drive) = drive
        {
            let links = self.drive_links.lines().map(str::to_string).collect();
            let mut picker = DrivePicker::new(drive, links);
            self.run_in_background(ctx, move |s| {
                // failures are reported through the notification queue
                let _ = s.pick_and_submit(&mut picker);
            });
        }

        ui.add_space(12.0);
        ui.strong("UPLOAD IMAGE:");
        ui.horizontal(|ui| {
            if ui
                .add_enabled(idle, egui::Button::new("Choose files..."))
                .clicked()
                && let Some(paths) = FileDialog::new()
                    .add_filter("Images", &["jpg", "jpeg", "png"])
                    .set_directory(".")
                    .pick_files()
            {
                self.select_files(paths.into_iter().map(FileRef::Local).collect());
            }
            if ui.add_enabled(idle, egui::Button::new("Load")).clicked() {
                self.run_in_background(ctx, |s| {
                    let _ = s.submit();
                });
            }
            if self.selected > 0 {
                ui.label(format!("{} selected", self.selected));
            }
        });
        ui.horizontal(|ui| {
            if ui
                .add_enabled(idle, egui::Button::new("Load folder..."))
                .clicked()
                && let Some(dir) = FileDialog::new().set_directory(".").pick_folder()
            {
                let mut picker = FolderPicker::new(
                    dir,
                    ScanOptions {
                        recursive: self.recursive,
                    },
                );
                self.run_in_background(ctx, move |s| {
                    let _ = s.pick_and_submit(&mut picker);
                });
            }
            ui.checkbox(&mut self.recursive, "Include subfolders");
        });

        ui.add_space(12.0);
        ui.strong("USE WEBCAM:");
        if !self.has_camera {
            ui.label("Set a camera snapshot URL in Settings to enable captures.");
        }
        ui.horizontal(|ui| {
            let toggle = if self.camera_on {
                "Close Webcam"
            } else {
                "Start Webcam"
            };
            if ui
                .add_enabled(idle && self.has_camera, egui::Button::new(toggle))
                .clicked()
            {
                if self.camera_on {
                    self.run_in_background(ctx, |s| {
                        let _ = s.stop_camera();
                    });
                } else {
                    self.run_in_background(ctx, |s| {
                        let _ = s.start_camera();
                    });
                }
            }
            if self.camera_on && ui.add_enabled(idle, egui::Button::new("Capture")).clicked() {
                self.run_in_background(ctx, |s| {
                    let _ = s.capture_and_submit();
                });
            }
        });

        if self.is_busy() {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Waiting for prediction...");
            });
        }

        ui.add_space(12.0);
        if let Some((_, tex)) = &self.preview {
            ui.add(egui::Image::new(tex).max_width(ui.available_width().min(PREVIEW_MAX as f32)));
        }
        for line in &self.result_lines {
            ui.label(egui::RichText::new(line).size(16.0));
        }
    }

    fn render_toasts(&mut self, ui: &mut egui::Ui) {
        let now = Instant::now();
        for toast in self.toasts.visible(now) {
            let color = if toast.is_error() {
                egui::Color32::from_rgb(200, 60, 60)
            } else {
                egui::Color32::from_rgb(60, 160, 90)
            };
            ui.horizontal(|ui| {
                ui.label(toast.at.format("%H:%M:%S").to_string());
                ui.colored_label(color, &toast.note.message);
                if let Some(detail) = &toast.note.detail {
                    ui.weak(detail);
                }
            });
        }
    }
}

impl App for UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.sync_from_session(ctx);

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Fruit Quality Detector");
                ui.separator();
                ui.selectable_value(&mut self.panel, Panel::Detect, "Detect");
                ui.selectable_value(&mut self.panel, Panel::Settings, "Settings");
                if !self.status.is_empty() {
                    ui.separator();
                    ui.label(&self.status);
                }
            });
        });

        egui::TopBottomPanel::bottom("toasts").show(ctx, |ui| {
            self.render_toasts(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| match self.panel {
                    Panel::Detect => self.render_detect_panel(ui, ctx),
                    Panel::Settings => self.render_settings_panel(ui),
                });
        });

        if !self.toasts.is_empty() {
            ctx.request_repaint_after(TOAST_TTL / 5);
        }
    }
}
