use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of one cache generation.
///
/// ```text
/// Registered -> Installing -> Installed -> Activating -> Active -> Superseded -> Deleted
///                   |  ^                                  |
///                   v  |                                  +-> Activating (re-run)
///                  Failed
/// ```
///
/// Transitions are driven only by host lifecycle signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GenerationState {
    #[default]
    Registered,
    Installing,
    Installed,
    /// Population failed; the host may retry the install.
    Failed,
    Activating,
    Active,
    /// A newer generation has taken over.
    Superseded,
    /// The generation's entries are gone from the store.
    Deleted,
}

impl GenerationState {
    pub fn can_transition_to(self, next: GenerationState) -> bool {
        use GenerationState::*;
        matches!(
            (self, next),
            (Registered, Installing)
                | (Failed, Installing)
                | (Installing, Installed)
                | (Installing, Failed)
                | (Installed, Activating)
                | (Activating, Active)
                | (Active, Activating)
                | (Installed, Superseded)
                | (Active, Superseded)
                | (Superseded, Deleted)
        )
    }

    pub fn is_active(self) -> bool {
        self == GenerationState::Active
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GenerationState::Registered => "registered",
            GenerationState::Installing => "installing",
            GenerationState::Installed => "installed",
            GenerationState::Failed => "failed",
            GenerationState::Activating => "activating",
            GenerationState::Active => "active",
            GenerationState::Superseded => "superseded",
            GenerationState::Deleted => "deleted",
        }
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
