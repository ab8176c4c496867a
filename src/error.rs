use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{source_name}: request failed: {message}")]
    Transport {
        source_name: &'static str,
        message: String,
    },
    #[error("{source_name}: upstream answered {status}: {body}")]
    Status {
        source_name: &'static str,
        status: u16,
        body: String,
    },
    #[error("gmail: {0}")]
    Gmail(String),
    #[error("TLS setup failed: {0}")]
    Tls(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store query failed: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("store encode failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("refresh aborted: {0}")]
    Upstream(#[from] UpstreamError),
}
