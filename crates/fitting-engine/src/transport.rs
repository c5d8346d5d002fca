use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde_json::Value;

use crate::config::EditorConfig;
use crate::error::{ConfigError, EditError};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Seam between the editor and the network: posts a `generateContent`
/// payload for a model and hands back the decoded JSON body.
pub trait EditTransport: Send + Sync {
    fn generate_content(&self, model: &str, payload: &Value) -> Result<Value, EditError>;
}

pub struct HttpTransport {
    api_base: String,
    api_key: String,
    http: HttpClient,
}

impl HttpTransport {
    pub fn new(config: &EditorConfig) -> Result<Self, ConfigError> {
        let http = HttpClient::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self {
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            http,
        })
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        endpoint_for_model(&self.api_base, model)
    }
}

impl EditTransport for HttpTransport {
    fn generate_content(&self, model: &str, payload: &Value) -> Result<Value, EditError> {
        let endpoint = self.endpoint_for_model(model);
        tracing::debug!(%endpoint, "posting edit request");
        let response = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(payload)
            .send()
            .map_err(|err| {
                EditError::TransportOrServiceError(format!(
                    "Gemini request failed: {}",
                    error_chain_text(&err.without_url())
                ))
            })?;
        response_json_or_error("Gemini", response)
    }
}

pub(crate) fn endpoint_for_model(api_base: &str, model: &str) -> String {
    let trimmed = model.trim();
    let model_path = if trimmed.starts_with("models/") {
        trimmed.to_string()
    } else {
        format!("models/{trimmed}")
    };
    format!("{api_base}/{model_path}:generateContent")
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value, EditError> {
    let status = response.status();
    let body = response.text().map_err(|err| {
        EditError::TransportOrServiceError(format!(
            "{provider} response body read failed: {}",
            error_chain_text(&err.without_url())
        ))
    })?;
    json_or_error(provider, status.as_u16(), status.is_success(), &body)
}

pub(crate) fn json_or_error(
    provider: &str,
    code: u16,
    success: bool,
    body: &str,
) -> Result<Value, EditError> {
    if !success {
        return Err(EditError::TransportOrServiceError(format!(
            "{provider} request failed ({code}): {}",
            truncate_text(body.trim(), 512)
        )));
    }
    serde_json::from_str(body).map_err(|err| {
        EditError::TransportOrServiceError(format!(
            "{provider} returned invalid JSON payload: {err}"
        ))
    })
}

fn error_chain_text(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut current = Some(err);
    while let Some(cause) = current {
        let text = cause.to_string();
        let trimmed = text.trim();
        if !trimmed.is_empty() && parts.last().map(String::as_str) != Some(trimmed) {
            parts.push(trimmed.to_string());
        }
        current = cause.source();
    }
    parts.join(" | caused by: ")
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
