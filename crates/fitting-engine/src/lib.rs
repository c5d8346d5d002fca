mod config;
mod editor;
mod engine;
mod error;
mod gemini;
mod prompt;
mod transport;

pub use config::{EditorConfig, DEFAULT_API_BASE, DEFAULT_MODEL};
pub use editor::{DryrunEditor, ImageEditor};
pub use engine::{Completion, FittingEngine};
pub use error::{ConfigError, EditError};
pub use gemini::{parse_generation_response, GeminiEditor};
pub use prompt::{background_clause, instruction_text, request_payload};
pub use transport::{EditTransport, HttpTransport};
