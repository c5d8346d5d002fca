use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, NO_ARG_COMMANDS, PICK_COMMAND, RAW_TEXT_COMMANDS, SINGLE_PATH_COMMANDS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            command_args: BTreeMap::new(),
        }
    }

    fn with_arg(mut self, key: &str, value: Value) -> Self {
        self.command_args.insert(key.to_string(), value);
        self
    }

    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.command_args.get(key).and_then(Value::as_str)
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_path_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn parse_single_path_arg(arg: &str) -> String {
    parse_path_args(arg).join(" ")
}

fn parse_pick_args(arg: &str) -> (String, Value) {
    let mut parts = arg.split_whitespace();
    let kind = parts.next().unwrap_or_default().to_ascii_lowercase();
    let position = parts
        .next()
        .and_then(|raw| raw.trim_start_matches('#').parse::<u64>().ok())
        .map(|value| Value::Number(value.into()))
        .unwrap_or(Value::Null);
    (kind, position)
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if let Some(action) = find_action(&command, RAW_TEXT_COMMANDS) {
                let key = if action == "set_outfit_mode" {
                    "mode"
                } else {
                    "text"
                };
                return Intent::new(action, text).with_arg(key, Value::String(arg.to_string()));
            }

            if let Some(action) = find_action(&command, SINGLE_PATH_COMMANDS) {
                return Intent::new(action, text)
                    .with_arg("path", Value::String(parse_single_path_arg(arg)));
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return Intent::new(action, text);
            }

            if command == PICK_COMMAND.command {
                let (kind, position) = parse_pick_args(arg);
                return Intent::new(PICK_COMMAND.action, text)
                    .with_arg("kind", Value::String(kind))
                    .with_arg("position", position);
            }

            return Intent::new("unknown", text)
                .with_arg("command", Value::String(command))
                .with_arg("arg", Value::String(arg.to_string()));
        }
    }

    Intent::new("describe_outfit", text).with_arg("text", Value::String(raw_trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse_intent;

    #[test]
    fn blank_input_is_noop() {
        assert_eq!(parse_intent("").action, "noop");
        assert_eq!(parse_intent("   \t").action, "noop");
    }

    #[test]
    fn plain_text_describes_outfit() {
        let intent = parse_intent("  a black leather jacket and jeans ");
        assert_eq!(intent.action, "describe_outfit");
        assert_eq!(
            intent.command_args["text"],
            json!("a black leather jacket and jeans")
        );
    }

    #[test]
    fn raw_text_commands_keep_remainder_verbatim() {
        let outfit = parse_intent("/outfit a \"quoted\" red dress");
        assert_eq!(outfit.action, "describe_outfit");
        assert_eq!(outfit.command_args["text"], json!("a \"quoted\" red dress"));

        let background = parse_intent("/background standing on a beach at sunset");
        assert_eq!(background.action, "set_background");
        assert_eq!(
            background.arg_str("text"),
            Some("standing on a beach at sunset")
        );

        let cleared = parse_intent("/background");
        assert_eq!(cleared.action, "set_background");
        assert_eq!(cleared.arg_str("text"), Some(""));

        let mode = parse_intent("/MODE image");
        assert_eq!(mode.action, "set_outfit_mode");
        assert_eq!(mode.command_args["mode"], json!("image"));
    }

    #[test]
    fn path_commands_accept_quoted_paths() {
        let photo = parse_intent("/photo \"/tmp/my photo.jpg\"");
        assert_eq!(photo.action, "upload_subject");
        assert_eq!(photo.command_args["path"], json!("/tmp/my photo.jpg"));

        let outfit = parse_intent("/outfit_image jacket.png");
        assert_eq!(outfit.action, "upload_outfit_image");
        assert_eq!(outfit.command_args["path"], json!("jacket.png"));

        let download = parse_intent("/download");
        assert_eq!(download.action, "download");
        assert_eq!(download.command_args["path"], json!(""));
    }

    #[test]
    fn no_arg_commands() {
        assert_eq!(parse_intent("/generate").action, "generate");
        assert_eq!(parse_intent("/wait").action, "wait");
        assert_eq!(parse_intent("/status").action, "status");
        assert_eq!(parse_intent("/ideas").action, "ideas");
        assert_eq!(parse_intent("/exit").action, "quit");
    }

    #[test]
    fn pick_parses_kind_and_position() {
        let pick = parse_intent("/pick Background #3");
        assert_eq!(pick.action, "pick");
        assert_eq!(pick.command_args["kind"], json!("background"));
        assert_eq!(pick.command_args["position"], json!(3));

        let missing = parse_intent("/pick outfit");
        assert_eq!(missing.command_args["position"], json!(null));
    }

    #[test]
    fn parse_unknown_command() {
        let intent = parse_intent("/magic foo bar");
        assert_eq!(intent.action, "unknown");
        assert_eq!(intent.command_args["command"], json!("magic"));
        assert_eq!(intent.command_args["arg"], json!("foo bar"));
    }
}
