use thiserror::Error;

/// Errors produced by profile store operations.
///
/// The first three variants are caller mistakes and map to 4xx at the HTTP
/// boundary. `Backend` and `Codec` are infrastructure failures; callers log
/// them and answer 5xx.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A required field is missing or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A profile with this email already exists.
    #[error("a profile for `{0}` already exists")]
    AlreadyExists(String),

    /// No profile stored under this email.
    #[error("no profile for `{0}`")]
    NotFound(String),

    #[error("database error: {0}")]
    Backend(#[from] sled::Error),

    #[error("corrupt profile record: {0}")]
    Codec(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
