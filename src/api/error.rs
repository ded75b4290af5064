use thiserror::Error;

/// Domain error taxonomy for cart operations.
///
/// The gateway normalizes every transport and server failure into one of
/// these; the store catches them at the command boundary and never leaves
/// a partial write behind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CartError {
    /// Bad input caught before dispatch where possible.
    #[error("{0}")]
    Validation(String),
    /// The product requires a variant and none was selected.
    #[error("Please select a product variant")]
    NeedsVariant,
    #[error("Product is out of stock")]
    OutOfStock,
    /// Malformed call, e.g. a missing cart-item id. Rejected locally,
    /// no request is issued.
    #[error("{0}")]
    InvalidArgument(&'static str),
    /// Target line or cart vanished; treated as stale state.
    #[error("{0}")]
    NotFound(String),
    /// Business-rule rejection of a discount code.
    #[error("{0}")]
    InvalidDiscount(String),
    #[error("Authentication required")]
    Unauthorized,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },
    /// The store was reset while this command was in flight; its result
    /// was discarded instead of being written into retired state.
    #[error("Superseded by a newer cart state")]
    Superseded,
    #[error("Failed to decode server response: {0}")]
    Serde(String),
}

impl From<reqwest::Error> for CartError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CartError::Timeout
        } else {
            CartError::Network(e.to_string())
        }
    }
}
