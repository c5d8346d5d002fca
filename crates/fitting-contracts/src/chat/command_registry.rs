#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

/// Commands whose whole remainder is kept verbatim as free text.
pub(crate) const RAW_TEXT_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "outfit",
        action: "describe_outfit",
    },
    CommandSpec {
        command: "background",
        action: "set_background",
    },
    CommandSpec {
        command: "mode",
        action: "set_outfit_mode",
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "photo",
        action: "upload_subject",
    },
    CommandSpec {
        command: "outfit_image",
        action: "upload_outfit_image",
    },
    CommandSpec {
        command: "download",
        action: "download",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "generate",
        action: "generate",
    },
    CommandSpec {
        command: "wait",
        action: "wait",
    },
    CommandSpec {
        command: "status",
        action: "status",
    },
    CommandSpec {
        command: "ideas",
        action: "ideas",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub(crate) const PICK_COMMAND: CommandSpec = CommandSpec {
    command: "pick",
    action: "pick",
};

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/photo",
    "/outfit",
    "/outfit_image",
    "/mode",
    "/background",
    "/ideas",
    "/pick",
    "/generate",
    "/wait",
    "/download",
    "/status",
    "/help",
    "/quit",
];
