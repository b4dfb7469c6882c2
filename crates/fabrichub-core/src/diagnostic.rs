//! Non-fatal findings reported alongside a decoded value.

use serde::Serialize;
use std::fmt;

/// A warning raised during decoding that did not prevent a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The policy uses a type that is recognised on the wire but not decoded.
    UnsupportedPolicyType { name: String, policy_type: i32 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedPolicyType { name, policy_type } => write!(
                f,
                "policy '{name}' has unsupported type {policy_type}; value left undecoded"
            ),
        }
    }
}

/// A decoded value together with the diagnostics collected while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Decoded<T> {
    /// Drop the diagnostics and keep the value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Returns `true` if any diagnostics were collected.
    pub fn has_warnings(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}
