use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("auth error: {0}")]
    Auth(#[from] cloud_clients::AuthError),

    #[error("model returned no usable content")]
    EmptyResponse,

    #[error("failed generation on max retries")]
    MaxRetries(#[source] Box<GenAiError>),

    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}
