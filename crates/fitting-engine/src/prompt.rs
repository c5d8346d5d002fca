use fitting_contracts::inputs::{EditRequest, OutfitInput, PhotoInput};
use serde_json::{json, Value};

const OUTFIT_IMAGE_INSTRUCTION: &str = "Using the second image as a reference for the outfit, re-render the person in the first image wearing those clothes. Maintain the person's face and body.";

pub fn background_clause(background: Option<&str>, outfit_is_image: bool) -> String {
    match background.map(str::trim).filter(|value| !value.is_empty()) {
        Some(scene) => format!("Place them in the following background: {scene}."),
        None if outfit_is_image => "Maintain the background from the first image.".to_string(),
        None => "Maintain the background. Only change the clothes.".to_string(),
    }
}

pub fn instruction_text(outfit: &OutfitInput, background: Option<&str>) -> String {
    let outfit_clause = match outfit {
        OutfitInput::Image(_) => OUTFIT_IMAGE_INSTRUCTION.to_string(),
        OutfitInput::Text(description) => format!(
            "Re-render this person wearing the following outfit: {description}. Maintain the person's face and body."
        ),
    };
    format!(
        "{outfit_clause} {}",
        background_clause(background, outfit.is_image())
    )
}

fn image_part(photo: &PhotoInput) -> Value {
    json!({
        "inlineData": {
            "mimeType": photo.mime_type(),
            "data": photo.base64(),
        }
    })
}

/// Ordered parts: subject image, outfit image when given, then instructions.
pub(crate) fn message_parts(request: &EditRequest) -> Vec<Value> {
    let mut parts = vec![image_part(&request.subject)];
    if let OutfitInput::Image(outfit) = &request.outfit {
        parts.push(image_part(outfit));
    }
    parts.push(json!({
        "text": instruction_text(&request.outfit, request.background.as_deref()),
    }));
    parts
}

/// Body of a `generateContent` call asking for both image and text back.
pub fn request_payload(request: &EditRequest) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": message_parts(request),
        }],
        "generationConfig": {
            "responseModalities": ["IMAGE", "TEXT"],
        },
    })
}

#[cfg(test)]
mod tests {
    use fitting_contracts::inputs::PhotoInput;

    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";

    fn photo(bytes: &[u8], mime: &str, name: &str) -> PhotoInput {
        PhotoInput::from_bytes(bytes.to_vec(), mime, name).unwrap()
    }

    #[test]
    fn background_clause_uses_supplied_scene() {
        let clause = background_clause(Some("a neon-lit Tokyo night"), true);
        assert_eq!(
            clause,
            "Place them in the following background: a neon-lit Tokyo night."
        );
    }

    #[test]
    fn background_clause_without_scene_depends_on_outfit_kind() {
        assert_eq!(
            background_clause(None, true),
            "Maintain the background from the first image."
        );
        assert_eq!(
            background_clause(Some("  "), false),
            "Maintain the background. Only change the clothes."
        );
    }

    #[test]
    fn text_outfit_instruction_mentions_description() {
        let outfit = OutfitInput::Text("a stylish business suit".to_string());
        let text = instruction_text(&outfit, None);
        assert!(text.starts_with(
            "Re-render this person wearing the following outfit: a stylish business suit."
        ));
        assert!(text.contains("Maintain the person's face and body."));
        assert!(text.ends_with("Only change the clothes."));
    }

    #[test]
    fn image_outfit_payload_orders_parts() {
        let request = EditRequest::new(
            photo(PNG, "image/png", "me.png"),
            OutfitInput::Image(photo(JPEG, "image/jpeg", "jacket.jpg")),
            "",
        );
        let payload = request_payload(&request);
        let parts = payload["contents"][0]["parts"].as_array().unwrap();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], request.subject.base64());
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        let text = parts[2]["text"].as_str().unwrap();
        assert!(text.starts_with("Using the second image as a reference"));
        assert!(text.ends_with("Maintain the background from the first image."));
        assert_eq!(
            payload["generationConfig"]["responseModalities"],
            json!(["IMAGE", "TEXT"])
        );
    }

    #[test]
    fn text_outfit_payload_has_no_second_image() {
        let request = EditRequest::new(
            photo(PNG, "image/png", "me.png"),
            OutfitInput::Text("a summer floral sundress".to_string()),
            "a sunny beach",
        );
        let parts = message_parts(&request);

        assert_eq!(parts.len(), 2);
        assert!(parts[0].get("inlineData").is_some());
        assert!(parts[1]["text"]
            .as_str()
            .unwrap()
            .ends_with("Place them in the following background: a sunny beach."));
    }
}
