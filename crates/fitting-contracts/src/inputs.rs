use std::fmt;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name offered when the generated image is saved.
pub const DOWNLOAD_FILE_NAME: &str = "virtual-try-on.png";

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Please select an image file ({0} is not an image).")]
    NotAnImage(String),
    #[error("{0} does not contain a recognizable image")]
    Unrecognized(String),
    #[error("failed reading {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed data URI: {0}")]
    MalformedDataUri(String),
}

/// An uploaded image, kept both as raw bytes and in the base64 form the
/// editing service expects. Replaced wholesale, never edited.
#[derive(Clone, PartialEq, Eq)]
pub struct PhotoInput {
    bytes: Vec<u8>,
    base64: String,
    mime_type: String,
    preview: String,
}

impl PhotoInput {
    pub fn from_path(path: &Path) -> Result<Self, InputError> {
        let label = path.display().to_string();
        let Some(mime_type) = mime_for_path(path) else {
            return Err(InputError::NotAnImage(label));
        };
        let bytes = std::fs::read(path).map_err(|source| InputError::Io {
            path: label.clone(),
            source,
        })?;
        Self::from_bytes(bytes, mime_type, label)
    }

    pub fn from_bytes(
        bytes: Vec<u8>,
        mime_type: impl Into<String>,
        preview: impl Into<String>,
    ) -> Result<Self, InputError> {
        let mime_type = mime_type.into().trim().to_ascii_lowercase();
        let preview = preview.into();
        if !mime_type.starts_with("image/") {
            return Err(InputError::NotAnImage(preview));
        }
        if image::guess_format(&bytes).is_err() {
            return Err(InputError::Unrecognized(preview));
        }
        let base64 = BASE64.encode(&bytes);
        Ok(Self {
            bytes,
            base64,
            mime_type,
            preview,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn base64(&self) -> &str {
        &self.base64
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Where the photo came from, shown back to the user.
    pub fn preview(&self) -> &str {
        &self.preview
    }

    pub fn data_uri(&self) -> String {
        data_uri(&self.mime_type, &self.base64)
    }
}

impl fmt::Debug for PhotoInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhotoInput")
            .field("mime_type", &self.mime_type)
            .field("preview", &self.preview)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutfitInput {
    Text(String),
    Image(PhotoInput),
}

impl OutfitInput {
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image(_))
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            Self::Image(_) => None,
        }
    }

    pub fn image(&self) -> Option<&PhotoInput> {
        match self {
            Self::Text(_) => None,
            Self::Image(photo) => Some(photo),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutfitMode {
    #[default]
    Text,
    Image,
}

impl OutfitMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" | "describe" => Some(Self::Text),
            "image" | "upload" => Some(Self::Image),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

/// Everything one call to the editing service needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    pub subject: PhotoInput,
    pub outfit: OutfitInput,
    /// `None` when the user left the scene blank.
    pub background: Option<String>,
}

impl EditRequest {
    pub fn new(subject: PhotoInput, outfit: OutfitInput, background: &str) -> Self {
        let background = Some(background.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Self {
            subject,
            outfit,
            background,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub image_url: String,
    pub caption: Option<String>,
}

impl GenerationResult {
    pub fn decode_image(&self) -> Result<DecodedImage, InputError> {
        decode_data_uri(&self.image_url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

pub fn data_uri(mime_type: &str, base64: &str) -> String {
    format!("data:{mime_type};base64,{base64}")
}

pub fn decode_data_uri(uri: &str) -> Result<DecodedImage, InputError> {
    let malformed = || InputError::MalformedDataUri(truncate_for_error(uri));
    let rest = uri.strip_prefix("data:").ok_or_else(malformed)?;
    let (header, payload) = rest.split_once(',').ok_or_else(malformed)?;
    let mime_type = header.strip_suffix(";base64").ok_or_else(malformed)?;
    let bytes = BASE64
        .decode(payload.trim().as_bytes())
        .map_err(|_| malformed())?;
    Ok(DecodedImage {
        mime_type: mime_type.to_string(),
        bytes,
    })
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

fn truncate_for_error(value: &str) -> String {
    const MAX: usize = 48;
    if value.chars().count() <= MAX {
        return value.to_string();
    }
    value.chars().take(MAX).collect::<String>() + "…"
}
