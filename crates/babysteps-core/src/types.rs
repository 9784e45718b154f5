//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A string did not match any known value for an enumerated field.
    #[error("invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Creates a fresh random (UUID v4) ID.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated care event identifier.
    ///
    /// Event IDs must be non-empty strings. Uniqueness is enforced by the
    /// primary key of the events table.
    EventId, "event ID"
);

define_string_id!(
    /// Identifies the baby that owns an event or timer.
    BabyId, "baby ID"
);

/// Id of the baby used when no profile has been saved yet.
pub const DEFAULT_BABY_ID: &str = "default-baby";

impl Default for BabyId {
    fn default() -> Self {
        Self(DEFAULT_BABY_ID.to_string())
    }
}

define_string_id!(
    /// Identifies the caregiver who created a record.
    CaregiverId, "caregiver ID"
);

define_string_id!(
    /// A validated active timer identifier.
    TimerId, "timer ID"
);

define_string_id!(
    /// A validated outbox item identifier.
    OutboxId, "outbox ID"
);

define_string_id!(
    /// A validated invite identifier.
    InviteId, "invite ID"
);

/// Generates a fieldless enum stored as a lowercase string.
///
/// The generated type gets `as_str`, `Display`, `FromStr` (erroring with
/// [`ValidationError::InvalidValue`]) and serde support using the same strings.
macro_rules! define_str_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// String representation for storage and display.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::types::ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err($crate::types::ValidationError::InvalidValue {
                        field: $field_name,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use define_str_enum;

define_str_enum!(
    /// Where an event record came from.
    EventSource, "event source" {
        /// Created on this device.
        Local => "local",
        /// Received from a remote authority.
        Synced => "synced",
    }
);
