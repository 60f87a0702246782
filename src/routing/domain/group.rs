//! Routing group record.

use super::{GroupId, ParseDomainValueError};
use serde::{Deserialize, Serialize};

/// How new conversations reach agents in a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMode {
    /// Conversations are routed to the first available agent.
    Auto,
    /// Agents pick conversations from the queue themselves.
    Manual,
}

impl AssignmentMode {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

impl TryFrom<&str> for AssignmentMode {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            _ => Err(ParseDomainValueError::new("assignment_mode", value)),
        }
    }
}

/// A routing bucket of agents.
///
/// Exactly one group should carry the `is_default` flag; conversations
/// without a group fall back to it when routed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group identifier.
    pub id: GroupId,
    /// Display name.
    pub name: String,
    /// Auto or manual assignment.
    pub assignment_mode: AssignmentMode,
    /// Whether this is the system default group.
    pub is_default: bool,
}

impl Group {
    /// Creates a non-default group with auto assignment.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: GroupId::new(),
            name: name.into(),
            assignment_mode: AssignmentMode::Auto,
            is_default: false,
        }
    }

    /// Sets the assignment mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: AssignmentMode) -> Self {
        self.assignment_mode = mode;
        self
    }

    /// Marks the group as the system default.
    #[must_use]
    pub const fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}
