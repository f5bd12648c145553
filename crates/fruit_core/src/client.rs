//! Blocking HTTP client for the prediction endpoint.

use crate::aggregate::AggregateError;
use crate::config::{Config, SubmitMode};
use crate::source::{FileRef, ImageBytes};
use crate::wire::{PerImageResult, PredictionResponse, WireError};
use reqwest::blocking::multipart::{Form, Part};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("camera unavailable: {0}")]
    DeviceAccess(#[source] anyhow::Error),

    #[error("no image selected")]
    MissingInput,

    #[error("cannot load {name}: {source}")]
    Input {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server error {status}: {reason}")]
    Server {
        status: u16,
        reason: String,
        body: String,
    },

    #[error(transparent)]
    Decode(#[from] WireError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

pub struct PredictionClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    field_name: String,
    fill_missing_grade: bool,
}

impl PredictionClient {
    pub fn new(cfg: &Config) -> Result<Self, SubmitError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(cfg.timeout())
            .build()?;
        Ok(Self {
            http,
            endpoint: cfg.endpoint.clone(),
            field_name: cfg.field_name.clone(),
            fill_missing_grade: cfg.fill_missing_grade,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send `images` the way `mode` asks for.
    pub fn submit(
        &self,
        images: &[ImageBytes],
        mode: SubmitMode,
    ) -> Result<Vec<PerImageResult>, SubmitError> {
        match mode {
            SubmitMode::Batch => self.predict_batch(images),
            SubmitMode::PerImage => self.predict_each(images),
        }
    }

    pub fn predict(&self, image: &ImageBytes) -> Result<Vec<PerImageResult>, SubmitError> {
        self.predict_batch(std::slice::from_ref(image))
    }

    /// One POST per image, each awaited before the next is sent. The first
    /// failure aborts the rest of the batch.
    pub fn predict_each(&self, images: &[ImageBytes]) -> Result<Vec<PerImageResult>, SubmitError> {
        if images.is_empty() {
            return Err(SubmitError::MissingInput);
        }
        let mut results = Vec::with_capacity(images.len());
        for image in images {
            results.extend(self.predict(image)?);
        }
        Ok(results)
    }

    /// All images in a single multipart POST, each under the configured
    /// field name.
    pub fn predict_batch(&self, images: &[ImageBytes]) -> Result<Vec<PerImageResult>, SubmitError> {
        if images.is_empty() {
            return Err(SubmitError::MissingInput);
        }
        let mut form = Form::new();
        for image in images {
            let part = Part::bytes(image.bytes.clone())
                .file_name(image.name.clone())
                .mime_str(image.mime())?;
            form = form.part(self.field_name.clone(), part);
        }
        tracing::info!(
            images = images.len(),
            bytes = images.iter().map(|i| i.bytes.len()).sum::<usize>(),
            "submitting to {}",
            self.endpoint
        );

        let resp = self.http.post(&self.endpoint).multipart(form).send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_else(|e| {
                tracing::warn!("cannot read error body: {e}");
                String::new()
            });
            tracing::warn!("server error {status}: {body}");
            return Err(SubmitError::Server {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
                body,
            });
        }

        let body = resp.text()?;
        tracing::debug!("prediction response: {body}");
        let response = PredictionResponse::from_json(&body)?;
        if response.rows() != images.len() {
            return Err(WireError::Shape {
                rows: images.len(),
                field: "output",
                len: response.rows(),
            }
            .into());
        }
        let mut results = response.into_results()?;
        if self.fill_missing_grade {
            results.iter_mut().for_each(PerImageResult::fill_grade);
        }
        Ok(results)
    }

    /// Load a picked file into memory, downloading it when remote.
    pub fn fetch(&self, file: &FileRef) -> Result<ImageBytes, SubmitError> {
        match file {
            FileRef::Local(path) => ImageBytes::from_path(path).map_err(|e| SubmitError::Input {
                name: file.name(),
                source: e.into(),
            }),
            FileRef::Remote { name, url } => {
                let resp = self.http.get(url).send()?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(SubmitError::Input {
                        name: name.clone(),
                        source: anyhow::anyhow!("download returned {status}"),
                    });
                }
                Ok(ImageBytes::new(name.clone(), resp.bytes()?.to_vec()))
            }
        }
    }
}
