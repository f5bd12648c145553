//! Settings panel: endpoint, submission contract, camera and cloud picker.

use super::{Panel, UiApp};
use eframe::egui;
use fruit_core::{Config, DriveConfig, SubmitMode};

/// Editable copy of the configuration. Text inputs need owned strings even
/// for optional settings; empty means unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct SettingsForm {
    pub endpoint: String,
    pub field_name: String,
    pub submit_mode: SubmitMode,
    pub timeout_secs: u64,
    pub fill_missing_grade: bool,
    pub camera_url: String,
    pub drive_client_id: String,
    pub drive_api_key: String,
}

impl SettingsForm {
    pub fn from_config(cfg: &Config) -> Self {
        let (drive_client_id, drive_api_key) = cfg
            .drive
            .as_ref()
            .map(|d| (d.client_id.clone(), d.api_key.clone()))
            .unwrap_or_default();
        Self {
            endpoint: cfg.endpoint.clone(),
            field_name: cfg.field_name.clone(),
            submit_mode: cfg.submit_mode,
            timeout_secs: cfg.timeout_secs.unwrap_or(0),
            fill_missing_grade: cfg.fill_missing_grade,
            camera_url: cfg.camera_url.clone().unwrap_or_default(),
            drive_client_id,
            drive_api_key,
        }
    }

    pub fn to_config(&self) -> Config {
        let non_empty = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };
        let drive = match (
            non_empty(&self.drive_client_id),
            non_empty(&self.drive_api_key),
        ) {
            (None, None) => None,
            (id, key) => Some(DriveConfig {
                client_id: id.unwrap_or_default(),
                api_key: key.unwrap_or_default(),
            }),
        };
        Config {
            endpoint: self.endpoint.trim().to_string(),
            field_name: self.field_name.trim().to_string(),
            submit_mode: self.submit_mode,
            timeout_secs: (self.timeout_secs > 0).then_some(self.timeout_secs),
            fill_missing_grade: self.fill_missing_grade,
            camera_url: non_empty(&self.camera_url),
            drive,
        }
    }
}

impl UiApp {
    /// Renders the settings screen and applies changes on save.
    pub(super) fn render_settings_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Settings");
        ui.add_space(8.0);

        egui::Grid::new("settings-grid")
            .num_columns(2)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                ui.label("Prediction endpoint");
                ui.text_edit_singleline(&mut self.form.endpoint);
                ui.end_row();

                ui.label("Upload field name");
                ui.text_edit_singleline(&mut self.form.field_name);
                ui.end_row();

                ui.label("Submission");
                let mode_label = |mode: SubmitMode| match mode {
                    SubmitMode::Batch => "All images in one request",
                    SubmitMode::PerImage => "One request per image",
                };
                egui::ComboBox::from_id_salt("submit-mode")
                    .selected_text(mode_label(self.form.submit_mode))
                    .show_ui(ui, |ui| {
                        for mode in [SubmitMode::Batch, SubmitMode::PerImage] {
                            ui.selectable_value(&mut self.form.submit_mode, mode, mode_label(mode));
                        }
                    });
                ui.end_row();

                ui.label("Timeout (s, 0 = none)");
                ui.add(
                    egui::DragValue::new(&mut self.form.timeout_secs)
                        .range(0..=600)
                        .speed(1),
                );
                ui.end_row();

                ui.label("Grade missing results locally");
                ui.checkbox(&mut self.form.fill_missing_grade, "");
                ui.end_row();

                ui.label("Camera snapshot URL");
                ui.text_edit_singleline(&mut self.form.camera_url);
                ui.end_row();

                ui.label("Google client id");
                ui.text_edit_singleline(&mut self.form.drive_client_id);
                ui.end_row();

                ui.label("Google API key");
                ui.add(egui::TextEdit::singleline(&mut self.form.drive_api_key).password(true));
                ui.end_row();
            });

        ui.add_space(12.0);
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!self.is_busy(), egui::Button::new("Save"))
                .clicked()
            {
                self.apply_settings();
            }
            if ui.button("Reset").clicked() {
                self.form = SettingsForm::from_config(&self.config);
            }
        });

        ui.add_space(16.0);
        ui.separator();
        ui.add_space(6.0);
        ui.heading("Version");
        ui.label(format!("App version: {}", self.app_version));
        if let Some(path) = &self.config_path {
            ui.label(format!("Config file: {}", path.display()));
        }
    }

    fn apply_settings(&mut self) {
        let cfg = self.form.to_config();
        if let Err(e) = cfg.validate() {
            self.status = format!("Settings not saved: {e}");
            return;
        }
        if let Some(path) = &self.config_path
            && let Err(e) = cfg.save(path)
        {
            tracing::warn!("{e}");
            self.status = format!("Settings not saved: {e}");
            return;
        }
        self.config = cfg;
        self.rebuild_session();
        if self.session.is_some() {
            self.status = "Settings saved.".to_string();
            self.panel = Panel::Detect;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_round_trips_config() {
        let cfg = Config {
            endpoint: "http://x/predict".into(),
            timeout_secs: Some(20),
            camera_url: Some("http://cam/shot.jpg".into()),
            drive: Some(DriveConfig {
                client_id: "id".into(),
                api_key: "key".into(),
            }),
            ..Config::default()
        };
        assert_eq!(SettingsForm::from_config(&cfg).to_config(), cfg);
    }

    #[test]
    fn blank_inputs_become_unset() {
        let form = SettingsForm {
            endpoint: " http://x/predict ".into(),
            field_name: "image".into(),
            camera_url: "   ".into(),
            ..SettingsForm::default()
        };
        let cfg = form.to_config();
        assert_eq!(cfg.endpoint, "http://x/predict");
        assert_eq!(cfg.timeout_secs, None);
        assert_eq!(cfg.camera_url, None);
        assert_eq!(cfg.drive, None);
    }

    #[test]
    fn half_filled_drive_fails_validation() {
        let form = SettingsForm {
            endpoint: "http://x/predict".into(),
            field_name: "image".into(),
            drive_client_id: "id".into(),
            ..SettingsForm::default()
        };
        assert!(form.to_config().validate().is_err());
    }
}
