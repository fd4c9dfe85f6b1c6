use thiserror::Error;

/// Raised when a relationship mapping cannot be constructed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Mapping field `{field}` must not be empty")]
    EmptyField { field: &'static str },

    #[error("Mapping field `{field}` is not a usable identifier: {value:?}")]
    InvalidIdentifier { field: &'static str, value: String },

    #[error("Mapping field `{field}` has both a column and a field name")]
    AmbiguousSelector { field: &'static str },

    #[error("Invalid endpoint notation {0:?}: expected Label:KeyProperty:selector")]
    InvalidEndpoint(String),
}
