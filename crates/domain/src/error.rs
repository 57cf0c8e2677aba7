/// Shared error type used across all aqmap crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    /// A completion call was rejected for rate limiting. The retry layer
    /// treats this as recoverable; everything else fails the call.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Transport or parse failure from the feature service.
    #[error("upstream {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
