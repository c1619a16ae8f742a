use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("Invalid page strictness '{0}' (expected strict, lax, fix or off)")]
    InvalidStrictness(String),

    #[error("Unknown check '{0}'")]
    UnknownCheck(String),
}
