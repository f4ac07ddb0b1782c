//! Error types for member resolution and proxy construction

use thiserror::Error;

/// Result type for object-model operations
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Errors raised by the object model and the proxy entry points.
///
/// Every variant is propagated to the immediate caller; nothing is
/// retried or recovered internally.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProxyError {
    /// Neither the class members, the instance storage nor the delegate
    /// could answer a lookup
    #[error("'{type_name}' object has no member '{member}'")]
    MemberNotFound {
        /// Name of the type the lookup was made against
        type_name: String,
        /// Requested member name
        member: String,
    },

    /// Arguments do not satisfy a constructor signature
    #[error("{type_name}() {reason}")]
    ConstructorArgumentMismatch {
        /// Type being constructed
        type_name: String,
        /// What did not match
        reason: String,
    },

    /// Retrieval, rebinding or delegation on an object without a bound slot
    #[error("Invalid binding state for '{type_name}': {reason}")]
    InvalidBindingState {
        /// Type of the offending object
        type_name: String,
        /// What was missing
        reason: String,
    },

    /// A proxy entry point was given a class the factory did not produce
    #[error("'{type_name}' is not a proxy type")]
    NotAProxyType {
        /// Offending class name
        type_name: String,
    },

    /// Attempted to call a value that is not a method
    #[error("'{member}' is not callable (found {kind})")]
    NotCallable {
        /// Member name (or a description of the value)
        member: String,
        /// Kind of value found instead
        kind: &'static str,
    },

    /// Native method called with the wrong number of arguments
    #[error("{method}() takes {expected} arguments but {got} were given")]
    MethodArgumentMismatch {
        /// Method name
        method: String,
        /// Expected argument count
        expected: usize,
        /// Actual argument count
        got: usize,
    },

    /// Value conversion failed
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: &'static str,
        /// Actual type name
        got: &'static str,
    },
}

impl ProxyError {
    pub(crate) fn member_not_found(type_name: &str, member: &str) -> Self {
        ProxyError::MemberNotFound {
            type_name: type_name.to_string(),
            member: member.to_string(),
        }
    }

    pub(crate) fn unbound(type_name: &str, reason: impl Into<String>) -> Self {
        ProxyError::InvalidBindingState {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }

    /// True for [`ProxyError::MemberNotFound`]
    pub fn is_member_not_found(&self) -> bool {
        matches!(self, ProxyError::MemberNotFound { .. })
    }
}
