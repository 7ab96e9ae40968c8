// ============================================================================
// Order Validation Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("Order ID cannot be empty")]
    MissingOrderId,

    #[error("Product name cannot be empty")]
    MissingProduct,

    #[error("Price must be greater than zero, got {0}")]
    InvalidPrice(f64),
}
