use thiserror::Error;

/// Failures of a single edit call. Every outcome of the service that is not a
/// usable image lands in one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("No response candidates found from the API. The request may have been blocked.")]
    NoCandidates,
    #[error("API response did not contain an image. It might have been blocked due to safety policies.")]
    NoImageInResponse,
    #[error("{0}")]
    TransportOrServiceError(String),
}

impl EditError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoCandidates => "no_candidates",
            Self::NoImageInResponse => "no_image_in_response",
            Self::TransportOrServiceError(_) => "transport_or_service",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY (or API_KEY / GOOGLE_API_KEY) environment variable is not set")]
    MissingCredential,
    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}
