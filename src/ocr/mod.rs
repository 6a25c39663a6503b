//! OCR service client
//!
//! Submits bin-label snapshots to a remote text-extraction service using the
//! OCR.space wire format: a multipart form with the API key, a data-URI
//! base64 JPEG, and a language hint. Only the first parsed result is
//! consulted. Nothing here retries; a failed upload is reported and the user
//! repeats the capture.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::multipart::Form;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from a text-extraction request
#[derive(Debug, Error)]
pub enum OcrError {
    /// Transport failure or non-success HTTP status
    #[error("OCR request failed: {0}")]
    Network(String),
    /// The service accepted the request but reported a processing failure
    #[error("OCR service error: {0}")]
    Service(String),
    /// Response body did not match the expected shape
    #[error("unexpected OCR response: {0}")]
    Parse(String),
}

/// Outcome of a successful text-extraction request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Trimmed, lowercased text of the first parsed result
    Text(String),
    /// The service processed the image but found no text
    Empty,
}

#[derive(Debug, Deserialize)]
struct ParsedResult {
    #[serde(rename = "ParsedText", default)]
    parsed_text: String,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(rename = "ParsedResults", default)]
    parsed_results: Vec<ParsedResult>,
    #[serde(rename = "IsErroredOnProcessing", default)]
    is_errored_on_processing: bool,
    // string or array of strings depending on the failure
    #[serde(rename = "ErrorMessage", default)]
    error_message: Option<serde_json::Value>,
}

/// Client for the remote OCR service
pub struct OcrClient {
    endpoint: String,
    api_key: String,
    language: String,
    timeout: Duration,
}

impl OcrClient {
    pub fn new(endpoint: String, api_key: String, language: String) -> Self {
        Self {
            endpoint,
            api_key,
            language,
            timeout: Duration::from_secs(60),
        }
    }

    /// Upload a JPEG snapshot and extract its text
    pub async fn extract_text(&self, jpeg_bytes: &[u8]) -> Result<Extraction, OcrError> {
        let encoded = BASE64.encode(jpeg_bytes);
        let form = Form::new()
            .text("apikey", self.api_key.clone())
            .text("base64Image", format!("data:image/jpeg;base64,{}", encoded))
            .text("language", self.language.clone());

        info!(
            "Uploading {} byte snapshot to {}",
            jpeg_bytes.len(),
            self.endpoint
        );

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| OcrError::Network(e.to_string()))?;

        let response = client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| OcrError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OcrError::Network(format!(
                "service answered {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| OcrError::Network(e.to_string()))?;
        debug!("OCR response body: {}", body);

        parse_response(&body)
    }
}

/// Decode the service response into an extraction outcome
fn parse_response(body: &str) -> Result<Extraction, OcrError> {
    let response: OcrResponse =
        serde_json::from_str(body).map_err(|e| OcrError::Parse(e.to_string()))?;

    if response.is_errored_on_processing {
        let message = response
            .error_message
            .map(|m| m.to_string())
            .unwrap_or_else(|| "no error message".to_string());
        return Err(OcrError::Service(message));
    }

    match response.parsed_results.first() {
        Some(result) => Ok(Extraction::Text(
            result.parsed_text.trim().to_lowercase(),
        )),
        None => Ok(Extraction::Empty),
    }
}
