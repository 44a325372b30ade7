//! Error handling module for the slabkit workspace

use core::fmt;

/// Common error type used throughout the slabkit workspace.
///
/// Messages are `&'static str` so the type stays usable without `alloc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Invalid argument
    InvalidArgument(&'static str),
    /// Configuration error
    ConfigError(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

/// Result type for operations that can fail
pub type Result<T> = core::result::Result<T, Error>;

/// Creates a new invalid argument error
pub fn invalid_argument(msg: &'static str) -> Error {
    Error::InvalidArgument(msg)
}

/// Creates a new config error
pub fn config_error(msg: &'static str) -> Error {
    Error::ConfigError(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        extern crate std;
        use std::string::ToString;

        let err = config_error("slab size must be a power of two");
        assert_eq!(
            err.to_string(),
            "Configuration error: slab size must be a power of two"
        );
        assert_eq!(
            invalid_argument("bad handle").to_string(),
            "Invalid argument: bad handle"
        );
    }
}
