//! Core of the fruit quality client: label set, result selection and
//! aggregation, the prediction endpoint client and the session controller
//! the front-end drives.

pub mod aggregate;
pub mod client;
pub mod config;
pub mod grade;
pub mod labels;
pub mod report;
pub mod select;
pub mod session;
pub mod source;
pub mod wire;

pub use aggregate::{AggregateError, AggregateResult, aggregate, aggregate_results};
pub use client::{PredictionClient, SubmitError};
pub use config::{Config, ConfigError, DriveConfig, SubmitMode};
pub use grade::{Grade, grade_for};
pub use labels::FruitClass;
pub use select::{BestClass, SelectError, best_class};
pub use session::{Notification, Outcome, Session};
pub use source::{
    Camera, CameraToggle, DrivePicker, FilePicker, FileRef, FolderPicker, ImageBytes,
    ScanOptions, SnapshotCamera,
};
pub use wire::{PerImageResult, PredictionResponse, WireError};
