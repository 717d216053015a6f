//! Domain error types

use thiserror::Error;

use super::LinkMode;

/// Why a channel value could not be read.
///
/// `NotReady` is transient (no decoder running yet, or reinitialising).
/// `Unavailable` means the channel does not exist in the current signal.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    #[error("PPM input not ready")]
    NotReady,

    #[error("Channel {index} unavailable")]
    Unavailable { index: usize },
}

/// Errors that can occur outside interrupt context
#[derive(Error, Debug)]
pub enum PpmError {
    #[error("PPM link not ready")]
    NotReady,

    #[error("Operation needs {expected} mode, link is in {actual} mode")]
    ModeUnavailable { expected: LinkMode, actual: LinkMode },

    #[error("{given} channels given, at most {max} supported")]
    TooManyChannels { given: usize, max: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Link error: {0}")]
    Link(String),

    #[error("Timer error: {0}")]
    Timer(String),

    #[error("Profile error: {0}")]
    Profile(String),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Result type alias for PPM link operations
pub type PpmResult<T> = Result<T, PpmError>;
