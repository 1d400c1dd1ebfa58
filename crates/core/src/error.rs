use thiserror::Error;

/// Errors raised while parsing or converting core domain values.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
