use std::fmt;

use thiserror::Error;

use crate::inputs::{EditRequest, GenerationResult, OutfitInput, OutfitMode, PhotoInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please upload an image of yourself.")]
    MissingSubject,
    #[error("Please describe an outfit or upload an image of one.")]
    MissingOutfit,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    InFlight {
        submission: u64,
    },
    Succeeded(GenerationResult),
    Failed(String),
}

impl RequestState {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::InFlight { .. })
    }

    pub fn result(&self) -> Option<&GenerationResult> {
        match self {
            Self::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::InFlight { .. } => "in-flight",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: u64,
    pub request: EditRequest,
}

/// The outfit mode is tracked apart from the outfit: switching to image mode
/// keeps typed text until an image is actually chosen.
#[derive(Debug, Clone, Default)]
pub struct Session {
    subject: Option<PhotoInput>,
    outfit_mode: OutfitMode,
    outfit: Option<OutfitInput>,
    background: String,
    state: RequestState,
    submissions: u64,
    last_completed: Option<u64>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(&self) -> Option<&PhotoInput> {
        self.subject.as_ref()
    }

    pub fn outfit_mode(&self) -> OutfitMode {
        self.outfit_mode
    }

    pub fn outfit_text(&self) -> &str {
        self.outfit
            .as_ref()
            .and_then(OutfitInput::description)
            .unwrap_or_default()
    }

    pub fn outfit_image(&self) -> Option<&PhotoInput> {
        self.outfit.as_ref().and_then(OutfitInput::image)
    }

    pub fn background(&self) -> &str {
        &self.background
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn submissions(&self) -> u64 {
        self.submissions
    }

    pub fn last_completed(&self) -> Option<u64> {
        self.last_completed
    }

    pub fn upload_subject(&mut self, photo: PhotoInput) {
        self.subject = Some(photo);
        if matches!(
            self.state,
            RequestState::Succeeded(_) | RequestState::Failed(_)
        ) {
            self.state = RequestState::Idle;
        }
    }

    pub fn set_outfit_mode(&mut self, mode: OutfitMode) {
        self.outfit_mode = mode;
    }

    pub fn set_outfit_text(&mut self, text: impl Into<String>) {
        self.outfit = Some(OutfitInput::Text(text.into()));
    }

    pub fn set_outfit_image(&mut self, photo: PhotoInput) {
        self.outfit = Some(OutfitInput::Image(photo));
    }

    pub fn set_background(&mut self, text: impl Into<String>) {
        self.background = text.into();
    }

    pub fn clear_background(&mut self) {
        self.background.clear();
    }

    pub fn can_submit(&self) -> bool {
        self.validate().is_ok()
    }

    fn validate(&self) -> Result<(&PhotoInput, OutfitInput), ValidationError> {
        let subject = self
            .subject
            .as_ref()
            .ok_or(ValidationError::MissingSubject)?;
        let outfit = match (self.outfit_mode, self.outfit.as_ref()) {
            (OutfitMode::Text, Some(OutfitInput::Text(text))) if !text.trim().is_empty() => {
                OutfitInput::Text(text.clone())
            }
            (OutfitMode::Image, Some(OutfitInput::Image(photo))) => {
                OutfitInput::Image(photo.clone())
            }
            _ => return Err(ValidationError::MissingOutfit),
        };
        Ok((subject, outfit))
    }

    // A rejected submission leaves the state untouched.
    pub fn begin_submission(&mut self) -> Result<Submission, ValidationError> {
        let (subject, outfit) = self.validate()?;
        let request = EditRequest::new(subject.clone(), outfit, &self.background);
        self.submissions += 1;
        let id = self.submissions;
        self.state = RequestState::InFlight { submission: id };
        Ok(Submission { id, request })
    }

    /// Completions apply in arrival order regardless of submission id, so the
    /// last one to finish is what gets shown.
    pub fn complete<E: fmt::Display>(
        &mut self,
        submission: u64,
        outcome: Result<GenerationResult, E>,
    ) -> &RequestState {
        self.last_completed = Some(submission);
        self.state = match outcome {
            Ok(result) => RequestState::Succeeded(result),
            Err(err) => RequestState::Failed(format!("Failed to generate image: {err}")),
        };
        &self.state
    }
}
