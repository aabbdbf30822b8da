/// Errors from decoding feed payloads and validating domain values.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}
