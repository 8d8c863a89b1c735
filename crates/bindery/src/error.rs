//! Error types for the object model and the export factory

use crate::value::Value;

/// Result type used throughout bindery
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the object model, discovery configuration and export factory
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The value handed to the export factory is not a class
    #[error("Not a class: {found}")]
    NotAClass {
        /// Description of the rejected value
        found: String,
    },

    /// A value raised by a constructor or method body
    #[error("Uncaught {0}")]
    Thrown(Value),

    /// Member lookup failed on an instance or export map
    #[error("Member not found: {owner}.{name}")]
    MemberNotFound {
        /// Class (or export map) the lookup ran against
        owner: String,
        /// Requested member name
        name: String,
    },

    /// Member exists but cannot be invoked
    #[error("{owner}.{name} is not a function")]
    NotCallable {
        /// Class the member was resolved on
        owner: String,
        /// Member name
        name: String,
    },

    /// Assignment to a property that only has a getter
    #[error("Cannot set property {name} of {owner} which has only a getter")]
    ReadOnlyProperty {
        /// Class declaring the getter
        owner: String,
        /// Property name
        name: String,
    },

    /// A function taken from an instance was called after the instance was dropped
    #[error("{name} was called after its instance was dropped")]
    InstanceDropped {
        /// Member name the function was bound from
        name: String,
    },

    /// Missing or malformed call argument
    #[error("Argument error: {0}")]
    ArgumentError(String),

    /// Type mismatch during conversion
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        got: String,
    },

    /// Registry lookup by name failed
    #[error("Unknown class: {0}")]
    UnknownClass(String),

    /// Failed to read a configuration file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration parsed but is not usable
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Raise an arbitrary value, the way a method body throws
    pub fn thrown(value: impl Into<Value>) -> Self {
        Error::Thrown(value.into())
    }

    /// The raised value, if this error came from user code
    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            Error::Thrown(value) => Some(value),
            _ => None,
        }
    }
}
