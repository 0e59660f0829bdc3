#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{operation} failed: provider returned HTTP {status}: {detail}")]
    Provider {
        operation: &'static str,
        status: u16,
        detail: String,
    },
}
