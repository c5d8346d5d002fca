use fitting_contracts::inputs::{EditRequest, GenerationResult};

use crate::error::EditError;
use crate::prompt::instruction_text;

pub trait ImageEditor: Send + Sync {
    fn name(&self) -> &str;
    fn edit(&self, request: &EditRequest) -> Result<GenerationResult, EditError>;
}

/// Offline stand-in that hands the subject photo back unchanged, captioned
/// with the instruction that would have been sent.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryrunEditor;

impl ImageEditor for DryrunEditor {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn edit(&self, request: &EditRequest) -> Result<GenerationResult, EditError> {
        Ok(GenerationResult {
            image_url: request.subject.data_uri(),
            caption: Some(format!(
                "dryrun: {}",
                instruction_text(&request.outfit, request.background.as_deref())
            )),
        })
    }
}
