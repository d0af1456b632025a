//! Error types for lrumap

use std::fmt;
use std::io;

/// Result type alias for lrumap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Usage errors reported synchronously to the caller
#[derive(Debug)]
pub enum Error {
    /// Capacity must hold at least one entry
    InvalidCapacity(usize),

    /// Mutation queue must buffer at least one request
    InvalidQueueDepth(usize),

    /// Mutation queue is saturated (only from `try_set`)
    QueueFull,

    /// Cache has been closed
    Closed,

    /// Blocking call made from inside an async runtime
    InsideRuntime,

    /// Writer could not be started, or a dump sink failed
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidCapacity(n) => write!(f, "Invalid capacity: {} (must be > 0)", n),
            Error::InvalidQueueDepth(n) => write!(f, "Invalid queue depth: {} (must be > 0)", n),
            Error::QueueFull => write!(f, "Mutation queue is full"),
            Error::Closed => write!(f, "Cache is closed"),
            Error::InsideRuntime => write!(
                f,
                "Blocking call inside an async runtime (use the *_async form)"
            ),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
