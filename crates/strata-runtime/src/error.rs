//! Error types for strata-runtime.

use thiserror::Error;

/// Result type for runtime operations that report failures to Rust callers.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Failures raised by container, string and memory operations.
///
/// Generated code never sees these directly: the raising entry points
/// (`set_length`, indexing, `str_to_int`, ...) convert them into software
/// exceptions through [`crate::raise_error`]. The `try_*`/`get` variants
/// return them so Rust callers can stay on the `Result` path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A negative size or count was passed to a container operation.
    #[error("{0}")]
    InvalidArgument(String),

    /// Indexed access outside the valid range of a container.
    #[error("{container} index out of range")]
    IndexOutOfRange {
        /// Name used in the message ("DynArray", "String").
        container: &'static str,
        /// Offending index, as passed by the caller.
        index: i32,
        /// Length at the time of the access.
        length: i32,
    },

    /// The C allocator returned null.
    #[error("Out of memory")]
    OutOfMemory {
        /// Requested size in bytes.
        size: usize,
    },

    /// A string could not be converted to a number.
    #[error("{0}")]
    Convert(String),
}

/// Errors that can occur while loading the runtime configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration validation error.
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_message_names_container() {
        let err = RuntimeError::IndexOutOfRange {
            container: "DynArray",
            index: 3,
            length: 3,
        };
        assert_eq!(err.to_string(), "DynArray index out of range");
    }

    #[test]
    fn test_invalid_argument_message_is_verbatim() {
        let err = RuntimeError::InvalidArgument("SetLength: negative length".into());
        assert_eq!(err.to_string(), "SetLength: negative length");
    }
}
