//! Incident triage workflow.
//!
//! Reports move through a fixed linear progression:
//!
//! ```text
//! Pending -> Verified -> Assigned -> Resolved
//! ```
//!
//! There are no branches and no way back. Each state offers exactly one
//! forward action (none once resolved).

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Triage status of an incident report.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum IncidentStatus {
    /// Submitted, not yet reviewed.
    #[default]
    Pending,
    /// Confirmed genuine by an authority.
    Verified,
    /// A team has been assigned.
    Assigned,
    /// Closed.
    Resolved,
}

impl IncidentStatus {
    /// The single state this one may advance to, or `None` when terminal.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Verified),
            Self::Verified => Some(Self::Assigned),
            Self::Assigned => Some(Self::Resolved),
            Self::Resolved => None,
        }
    }

    /// Label of the one action button offered in this state.
    #[must_use]
    pub const fn action_label(self) -> Option<&'static str> {
        match self {
            Self::Pending => Some("Verify"),
            Self::Verified => Some("Assign"),
            Self::Assigned => Some("Resolve"),
            Self::Resolved => None,
        }
    }

    /// Whether no further transition exists.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    /// Whether moving from `self` to `to` is the single permitted step.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        self.next() == Some(to)
    }

    /// Returns all variants in workflow order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Pending, Self::Verified, Self::Assigned, Self::Resolved]
    }
}
