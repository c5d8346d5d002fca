mod command_registry;
mod intent_parser;
mod suggestions;

pub use command_registry::CHAT_HELP_COMMANDS;
pub use intent_parser::{parse_intent, Intent};
pub use suggestions::{suggestion, SuggestionKind, BACKGROUND_SUGGESTIONS, OUTFIT_SUGGESTIONS};
