//! Session controller: the state one user works against between launches.
//! Front-ends call into it and render `outcome()` plus the notification
//! queue; every failure ends the current submission and becomes a
//! notification.

use crate::aggregate::{AggregateResult, aggregate_results};
use crate::client::{PredictionClient, SubmitError};
use crate::config::Config;
use crate::grade::Grade;
use crate::source::{CameraToggle, FilePicker, FileRef, ImageBytes};
use crate::wire::PerImageResult;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

/// Transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
    /// Extra diagnostic text, e.g. the body of a failed response.
    pub detail: Option<String>,
}

impl Notification {
    fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
            detail: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
            detail: None,
        }
    }

    fn for_error(err: &SubmitError) -> Self {
        match err {
            SubmitError::DeviceAccess(_) => {
                Self::error("Error accessing webcam. Please try again.")
            }
            SubmitError::MissingInput => Self::error("Please select an image file first."),
            SubmitError::Server {
                status,
                reason,
                body,
            } => Self {
                level: Level::Error,
                message: format!("Failed to load resource. Server error {status}: {reason}"),
                detail: (!body.is_empty()).then(|| body.clone()),
            },
            SubmitError::Transport(_) => Self::error("Failed to send image. Please try again."),
            other => Self::error(other.to_string()),
        }
    }
}

/// Result of the last successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub names: Vec<String>,
    pub results: Vec<PerImageResult>,
    pub overall: AggregateResult<Option<Grade>>,
}

impl Outcome {
    pub fn is_batch(&self) -> bool {
        self.results.len() > 1
    }
}

pub struct Session {
    config: Config,
    client: PredictionClient,
    selected: Vec<FileRef>,
    camera: Option<CameraToggle>,
    outcome: Option<Outcome>,
    preview: Option<ImageBytes>,
    notifications: VecDeque<Notification>,
}

impl Session {
    pub fn new(config: Config) -> Result<Self, SubmitError> {
        let client = PredictionClient::new(&config)?;
        Ok(Self {
            config,
            client,
            selected: Vec::new(),
            camera: None,
            outcome: None,
            preview: None,
            notifications: VecDeque::new(),
        })
    }

    pub fn with_camera(mut self, camera: CameraToggle) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn select_files(&mut self, files: Vec<FileRef>) {
        tracing::info!("{} file(s) selected", files.len());
        self.selected = files;
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn selected(&self) -> &[FileRef] {
        &self.selected
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// First image of the last submission.
    pub fn preview(&self) -> Option<&ImageBytes> {
        self.preview.as_ref()
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    pub fn has_camera(&self) -> bool {
        self.camera.is_some()
    }

    pub fn camera_on(&self) -> bool {
        self.camera.as_ref().is_some_and(CameraToggle::is_on)
    }

    /// Submit the currently selected files.
    pub fn submit(&mut self) -> Result<(), SubmitError> {
        self.discard_outcome();
        let result = self.load_selected().and_then(|images| self.run(images));
        self.record(result)
    }

    pub fn start_camera(&mut self) -> Result<(), SubmitError> {
        let result = match self.camera.as_mut() {
            Some(cam) => cam.start().map_err(SubmitError::DeviceAccess),
            None => Err(SubmitError::DeviceAccess(anyhow::anyhow!(
                "no camera configured"
            ))),
        };
        self.notify_err(result)
    }

    pub fn stop_camera(&mut self) -> Result<(), SubmitError> {
        let result = match self.camera.as_mut() {
            Some(cam) => cam.stop().map_err(SubmitError::DeviceAccess),
            None => Ok(()),
        };
        self.notify_err(result)
    }

    /// Capture one frame from the running camera and submit it.
    pub fn capture_and_submit(&mut self) -> Result<(), SubmitError> {
        self.discard_outcome();
        let frame = match self.camera.as_mut() {
            Some(cam) => cam.capture().map_err(SubmitError::DeviceAccess),
            None => Err(SubmitError::DeviceAccess(anyhow::anyhow!(
                "no camera configured"
            ))),
        };
        let result = frame.and_then(|frame| self.run(vec![frame]));
        self.record(result)
    }

    /// Let `picker` choose the files, then submit them. An empty pick keeps
    /// the current selection.
    pub fn pick_and_submit(&mut self, picker: &mut dyn FilePicker) -> Result<(), SubmitError> {
        self.discard_outcome();
        match picker.pick_files() {
            Ok(files) if files.is_empty() => self.record(Err(SubmitError::MissingInput)),
            Ok(files) => {
                self.select_files(files);
                self.submit()
            }
            Err(source) => self.record(Err(SubmitError::Input {
                name: "picker".to_string(),
                source,
            })),
        }
    }

    fn load_selected(&self) -> Result<Vec<ImageBytes>, SubmitError> {
        if self.selected.is_empty() {
            return Err(SubmitError::MissingInput);
        }
        self.selected.iter().map(|f| self.client.fetch(f)).collect()
    }

    fn discard_outcome(&mut self) {
        self.outcome = None;
        self.preview = None;
    }

    fn run(&mut self, images: Vec<ImageBytes>) -> Result<Outcome, SubmitError> {
        self.preview = images.first().cloned();
        let results = self.client.submit(&images, self.config.submit_mode)?;
        let overall = aggregate_results(&results)?;
        tracing::info!(
            label = %overall.overall_label,
            score = overall.overall_score,
            "prediction received for {} image(s)",
            results.len()
        );
        Ok(Outcome {
            names: images.into_iter().map(|i| i.name).collect(),
            results,
            overall,
        })
    }

    fn record(&mut self, result: Result<Outcome, SubmitError>) -> Result<(), SubmitError> {
        match result {
            Ok(outcome) => {
                self.outcome = Some(outcome);
                self.notifications.push_back(Notification::success(
                    "Image successfully uploaded and prediction received.",
                ));
                Ok(())
            }
            Err(err) => self.notify_err(Err(err)),
        }
    }

    fn notify_err(&mut self, result: Result<(), SubmitError>) -> Result<(), SubmitError> {
        if let Err(err) = &result {
            tracing::warn!("submission failed: {err}");
            self.notifications.push_back(Notification::for_error(err));
        }
        result
    }
}
