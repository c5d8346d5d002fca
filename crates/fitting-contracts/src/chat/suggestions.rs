pub const OUTFIT_SUGGESTIONS: &[&str] = &[
    "a red formal dress",
    "a stylish business suit",
    "a vintage denim jacket",
    "a cozy winter sweater",
    "a summer floral sundress",
    "a futuristic cyberpunk outfit",
];

pub const BACKGROUND_SUGGESTIONS: &[&str] = &[
    "a sunny beach",
    "a bustling city street",
    "a minimalist studio",
    "a magical forest",
    "a neon-lit Tokyo night",
    "a cozy Parisian cafe",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    Outfit,
    Background,
}

impl SuggestionKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "outfit" | "o" => Some(Self::Outfit),
            "background" | "bg" | "b" => Some(Self::Background),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Outfit => "outfit",
            Self::Background => "background",
        }
    }

    pub fn all(self) -> &'static [&'static str] {
        match self {
            Self::Outfit => OUTFIT_SUGGESTIONS,
            Self::Background => BACKGROUND_SUGGESTIONS,
        }
    }
}

/// Looks up a suggestion by its 1-based position in the printed list.
pub fn suggestion(kind: SuggestionKind, position: usize) -> Option<&'static str> {
    position
        .checked_sub(1)
        .and_then(|index| kind.all().get(index))
        .copied()
}
