use thiserror::Error;

/// Error classes shared by the alert pipeline, ingestion and reporting.
///
/// `Config` is fatal and raised before any work starts. `Database`,
/// `Transport` and `MarketData` are infrastructure failures that callers
/// isolate per item where a batch is involved. `InvalidPayload` marks a caller
/// that sent malformed input, which must not look like an empty result.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("mail transport error: {0}")]
    Transport(String),

    #[error("market data error: {0}")]
    MarketData(String),

    #[error("invalid event payload: {0}")]
    InvalidPayload(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: &'static str, seconds: u64 },
}

impl From<handlebars::RenderError> for AppError {
    fn from(e: handlebars::RenderError) -> Self {
        AppError::Template(e.to_string())
    }
}

impl From<handlebars::TemplateError> for AppError {
    fn from(e: handlebars::TemplateError) -> Self {
        AppError::Template(e.to_string())
    }
}

impl From<reqwest_middleware::Error> for AppError {
    fn from(e: reqwest_middleware::Error) -> Self {
        AppError::MarketData(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::MarketData(e.to_string())
    }
}
