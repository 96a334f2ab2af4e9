use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;

use crate::detection::domain::detection_result::DetectionResult;
use crate::detection::domain::detection_service::{DetectionError, DetectionService};
use crate::detection::infrastructure::response_parser::parse_response;
use crate::imaging::domain::prepared_payload::{PayloadOrigin, PreparedPayload};

const IMAGE_FIELD: &str = "image";
const IMAGE_DATA_FIELD: &str = "imageData";

/// Submits payloads to the detection endpoint as multipart POSTs.
///
/// Uploads travel as a file part, captures as a data URI text field. Every
/// request is bounded by the configured timeout; expiry surfaces as
/// [`DetectionError::Transport`].
pub struct HttpDetectionClient {
    client: Client,
    endpoint: String,
}

impl HttpDetectionClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, DetectionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DetectionError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl DetectionService for HttpDetectionClient {
    fn detect(&self, payload: &PreparedPayload) -> Result<DetectionResult, DetectionError> {
        let form = build_form(payload)?;
        log::debug!(
            "POST {} ({}x{}, {} bytes, {:?})",
            self.endpoint,
            payload.width,
            payload.height,
            payload.len(),
            payload.origin
        );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(transport_error)?;

        parse_response(status, &body)
    }
}

fn build_form(payload: &PreparedPayload) -> Result<Form, DetectionError> {
    match payload.origin {
        PayloadOrigin::Upload => {
            let part = Part::bytes(payload.bytes.clone())
                .file_name(payload.file_name.clone())
                .mime_str(&payload.mime_type)
                .map_err(|e| {
                    DetectionError::Transport(format!(
                        "invalid payload type {}: {e}",
                        payload.mime_type
                    ))
                })?;
            Ok(Form::new().part(IMAGE_FIELD, part))
        }
        PayloadOrigin::Capture => Ok(Form::new().text(IMAGE_DATA_FIELD, payload.data_uri())),
    }
}

fn transport_error(e: reqwest::Error) -> DetectionError {
    if e.is_timeout() {
        DetectionError::Transport(format!("request timed out: {e}"))
    } else {
        DetectionError::Transport(e.to_string())
    }
}
