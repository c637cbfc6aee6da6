use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuillError {
    /// The request carried nothing to send to the model
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The remote model call failed (network, auth, quota, malformed envelope)
    #[error("AI service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Prompt template error: {0}")]
    Template(String),
}

pub type QuillResult<T> = Result<T, QuillError>;

impl From<tera::Error> for QuillError {
    fn from(err: tera::Error) -> Self {
        // tera keeps the useful part of the message in the source chain
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(inner) = source {
            message = format!("{}: {}", message, inner);
            source = inner.source();
        }
        QuillError::Template(message)
    }
}
