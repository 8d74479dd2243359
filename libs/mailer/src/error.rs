use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Template error: {0}")]
    Template(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type MailerResult<T> = Result<T, MailerError>;
