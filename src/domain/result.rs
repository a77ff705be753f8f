//! Result type alias for RDMP
//!
//! Every fallible operation in the crate returns [`Result`], which fixes the error type to
//! [`RdmpError`].

use super::errors::RdmpError;

/// Result type alias for RDMP operations
///
/// # Examples
///
/// ```
/// use rdmp::domain::result::Result;
/// use rdmp::domain::errors::RdmpError;
///
/// fn failing_function() -> Result<()> {
///     Err(RdmpError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, RdmpError>;
