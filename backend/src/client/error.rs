use crate::services::image::ImageError;
use crate::validation::ValidationReport;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid input: {0}")]
    Validation(ValidationReport),

    #[error("Not signed in or the session has expired")]
    Unauthorized,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Image could not be decoded: {0}")]
    ImageDecode(String),

    #[error("Image could not be re-encoded: {0}")]
    ImageEncode(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Another submission or upload is still in progress")]
    Busy,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// The per-field report when the failure was a validation one.
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            ClientError::Validation(report) => Some(report),
            _ => None,
        }
    }
}

impl From<ValidationReport> for ClientError {
    fn from(report: ValidationReport) -> Self {
        ClientError::Validation(report)
    }
}

impl From<ImageError> for ClientError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::TooLarge { .. } | ImageError::UnsupportedFormat => ClientError::Validation(
                ValidationReport::single("file", "file", err.to_string()),
            ),
            ImageError::Decode(e) => ClientError::ImageDecode(e.to_string()),
            ImageError::Encode(e) => ClientError::ImageEncode(e.to_string()),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
