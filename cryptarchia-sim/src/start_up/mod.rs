use crate::settings::{self, logging};
use cryptarchia_consensus::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to initialize the logger")]
    LoggingInitializationError(#[from] logging::Error),
    #[error("Error in the overall configuration of the simulation")]
    ConfigurationError(#[from] settings::Error),
    #[error("Unable to start the stake holders")]
    Genesis(#[from] ConfigError),
}

impl Error {
    #[inline]
    pub fn code(&self) -> i32 {
        match self {
            Error::LoggingInitializationError { .. } => 1,
            Error::ConfigurationError { .. } => 2,
            Error::Genesis { .. } => 3,
        }
    }
}
