//! Relay error types.

/// Errors that can occur while running the relay server.
#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    /// Failed to bind to address.
    #[error("Failed to bind to {address}: {source}")]
    BindError {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Server error.
    #[error("Server error: {0}")]
    ServerError(String),
}
