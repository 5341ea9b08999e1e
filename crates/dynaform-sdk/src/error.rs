use dynaform_ops::ProgramError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("configuration parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Program(#[from] ProgramError),
}

pub type SdkResult<T> = Result<T, SdkError>;
