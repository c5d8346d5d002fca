use fitting_contracts::inputs::{data_uri, EditRequest, GenerationResult};
use serde_json::Value;

use crate::config::EditorConfig;
use crate::editor::ImageEditor;
use crate::error::{ConfigError, EditError};
use crate::prompt::request_payload;
use crate::transport::{EditTransport, HttpTransport};

/// Virtual try-on through Gemini's image editing model.
pub struct GeminiEditor {
    model: String,
    transport: Box<dyn EditTransport>,
}

impl GeminiEditor {
    pub fn new(config: &EditorConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_transport(
            config.model.clone(),
            HttpTransport::new(config)?,
        ))
    }

    pub fn with_transport(model: impl Into<String>, transport: impl EditTransport + 'static) -> Self {
        Self {
            model: model.into(),
            transport: Box::new(transport),
        }
    }
}

impl ImageEditor for GeminiEditor {
    fn name(&self) -> &str {
        "gemini"
    }

    fn edit(&self, request: &EditRequest) -> Result<GenerationResult, EditError> {
        let payload = request_payload(request);
        let response = self.transport.generate_content(&self.model, &payload)?;
        let result = parse_generation_response(&response);
        if let Err(err) = &result {
            tracing::warn!(kind = err.kind(), "edit response rejected: {err}");
        }
        result
    }
}

/// Turns a `generateContent` response into a result.
///
/// Only the first candidate is read. Parts are scanned in order; inline data
/// becomes the image and text becomes the caption, later parts of the same
/// kind replacing earlier ones.
pub fn parse_generation_response(response: &Value) -> Result<GenerationResult, EditError> {
    let first = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .ok_or(EditError::NoCandidates)?;
    let parts = first
        .get("content")
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut image_url: Option<String> = None;
    let mut caption: Option<String> = None;
    for part in parts {
        if let Some(url) = inline_image_url(part) {
            image_url = Some(url);
        } else if let Some(text) = part
            .get("text")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
        {
            caption = Some(text.to_string());
        }
    }

    let image_url = image_url.ok_or(EditError::NoImageInResponse)?;
    Ok(GenerationResult { image_url, caption })
}

fn inline_image_url(part: &Value) -> Option<String> {
    let inline = part
        .get("inlineData")
        .or_else(|| part.get("inline_data"))?;
    let data = inline
        .get("data")
        .and_then(Value::as_str)
        .filter(|data| !data.is_empty())?;
    let mime_type = inline
        .get("mimeType")
        .or_else(|| inline.get("mime_type"))
        .and_then(Value::as_str)
        .unwrap_or("image/png");
    Some(data_uri(mime_type, data))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use fitting_contracts::inputs::{OutfitInput, PhotoInput};
    use serde_json::json;

    use super::*;

    struct CannedTransport {
        response: Result<Value, EditError>,
        seen: Arc<Mutex<Vec<(String, Value)>>>,
    }

    impl EditTransport for CannedTransport {
        fn generate_content(&self, model: &str, payload: &Value) -> Result<Value, EditError> {
            self.seen
                .lock()
                .unwrap()
                .push((model.to_string(), payload.clone()));
            self.response.clone()
        }
    }

    fn editor(response: Result<Value, EditError>) -> (GeminiEditor, Arc<Mutex<Vec<(String, Value)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let transport = CannedTransport {
            response,
            seen: Arc::clone(&seen),
        };
        (GeminiEditor::with_transport("gemini-test", transport), seen)
    }

    fn request() -> EditRequest {
        let subject =
            PhotoInput::from_bytes(b"\x89PNG\r\n\x1a\n".to_vec(), "image/png", "me.png").unwrap();
        EditRequest::new(
            subject,
            OutfitInput::Text("a cozy winter sweater".to_string()),
            "",
        )
    }

    #[test]
    fn zero_candidates_is_no_candidates() {
        assert_eq!(
            parse_generation_response(&json!({ "candidates": [] })),
            Err(EditError::NoCandidates)
        );
        assert_eq!(
            parse_generation_response(&json!({ "promptFeedback": { "blockReason": "SAFETY" } })),
            Err(EditError::NoCandidates)
        );
    }

    #[test]
    fn text_only_candidate_is_no_image() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "I can't help with that." }] } }]
        });
        assert_eq!(
            parse_generation_response(&response),
            Err(EditError::NoImageInResponse)
        );
        assert_eq!(
            parse_generation_response(&json!({ "candidates": [{ "finishReason": "SAFETY" }] })),
            Err(EditError::NoImageInResponse)
        );
    }

    #[test]
    fn image_and_text_parts_build_result() {
        let response = json!({
            "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "image/jpeg", "data": "QUJD" } },
                { "text": "Here is your new look." },
            ] } }]
        });
        let result = parse_generation_response(&response).unwrap();
        assert_eq!(result.image_url, "data:image/jpeg;base64,QUJD");
        assert_eq!(result.caption.as_deref(), Some("Here is your new look."));
    }

    #[test]
    fn last_text_part_wins() {
        let response = json!({
            "candidates": [{ "content": { "parts": [
                { "text": "first" },
                { "inline_data": { "mime_type": "image/png", "data": "QUJD" } },
                { "text": "second" },
            ] } }]
        });
        let result = parse_generation_response(&response).unwrap();
        assert_eq!(result.caption.as_deref(), Some("second"));
        assert_eq!(result.image_url, "data:image/png;base64,QUJD");
    }

    #[test]
    fn only_first_candidate_is_read() {
        let response = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "no image here" }] } },
                { "content": { "parts": [{ "inlineData": { "mimeType": "image/png", "data": "QUJD" } }] } },
            ]
        });
        assert_eq!(
            parse_generation_response(&response),
            Err(EditError::NoImageInResponse)
        );
    }

    #[test]
    fn edit_sends_payload_to_configured_model() {
        let (editor, seen) = editor(Ok(json!({
            "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "image/png", "data": "QUJD" } },
            ] } }]
        })));

        let result = editor.edit(&request()).unwrap();
        assert_eq!(result.caption, None);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "gemini-test");
        assert_eq!(
            seen[0].1["generationConfig"]["responseModalities"],
            json!(["IMAGE", "TEXT"])
        );
    }

    #[test]
    fn transport_errors_pass_through_classified() {
        let (editor, _) = editor(Err(EditError::TransportOrServiceError(
            "Gemini request failed (500): boom".to_string(),
        )));
        let err = editor.edit(&request()).unwrap_err();
        assert_eq!(err.to_string(), "Gemini request failed (500): boom");
    }

    #[test]
    fn missing_credential_prevents_construction() {
        let err = EditorConfig::from_lookup(|_| None)
            .and_then(|config| GeminiEditor::new(&config))
            .err();
        assert!(matches!(err, Some(ConfigError::MissingCredential)));
    }

    #[test]
    fn failed_send_never_echoes_credential() {
        let config = EditorConfig::from_lookup(|name| match name {
            "GEMINI_API_KEY" => Some("SUPER-SECRET-KEY".to_string()),
            "GEMINI_API_BASE" => Some("http://127.0.0.1:1/v1beta".to_string()),
            _ => None,
        })
        .unwrap();
        let editor = GeminiEditor::new(&config).unwrap();

        let err = editor.edit(&request()).unwrap_err();
        assert_eq!(err.kind(), "transport_or_service");
        assert!(!err.to_string().contains("SUPER-SECRET-KEY"), "{err}");
    }
}
