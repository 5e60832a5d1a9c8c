use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SimError {
    /// Short error code string reported to operators alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            SimError::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<figment::Error> for SimError {
    fn from(e: figment::Error) -> Self {
        SimError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
