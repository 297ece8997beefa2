//! Engine readiness state
//!
//! Readiness only moves forward: `NotReady -> Loading -> Ready`, with
//! `Failed` reachable from `Loading`. `Ready` and `Failed` are terminal for
//! an engine instance.

use serde::Serialize;
use std::fmt;

/// Readiness of a search engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// Initialization has not been requested yet
    #[default]
    NotReady,
    /// Assets are being fetched and the module instantiated
    Loading,
    /// Index loaded, queries allowed
    Ready,
    /// Initialization failed; the instance stays failed
    Failed,
}

impl Readiness {
    /// Whether `self -> next` is a legal transition.
    pub fn can_advance_to(self, next: Readiness) -> bool {
        matches!(
            (self, next),
            (Readiness::NotReady, Readiness::Loading)
                | (Readiness::Loading, Readiness::Ready)
                | (Readiness::Loading, Readiness::Failed)
        )
    }

    /// Queries may reach the module only in this state.
    pub fn is_ready(self) -> bool {
        self == Readiness::Ready
    }

    /// `Ready` or `Failed`: initialization has finished one way or the other.
    pub fn is_settled(self) -> bool {
        matches!(self, Readiness::Ready | Readiness::Failed)
    }

    /// Stable lowercase name, used in logs and JSON output.
    pub fn as_str(self) -> &'static str {
        match self {
            Readiness::NotReady => "not_ready",
            Readiness::Loading => "loading",
            Readiness::Ready => "ready",
            Readiness::Failed => "failed",
        }
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Readiness; 4] = [
        Readiness::NotReady,
        Readiness::Loading,
        Readiness::Ready,
        Readiness::Failed,
    ];

    #[test]
    fn forward_transitions_allowed() {
        assert!(Readiness::NotReady.can_advance_to(Readiness::Loading));
        assert!(Readiness::Loading.can_advance_to(Readiness::Ready));
        assert!(Readiness::Loading.can_advance_to(Readiness::Failed));
    }

    #[test]
    fn terminal_states_never_move() {
        for next in ALL {
            assert!(!Readiness::Ready.can_advance_to(next));
            assert!(!Readiness::Failed.can_advance_to(next));
        }
    }

    #[test]
    fn no_skipping_loading() {
        assert!(!Readiness::NotReady.can_advance_to(Readiness::Ready));
        assert!(!Readiness::NotReady.can_advance_to(Readiness::Failed));
    }

    #[test]
    fn no_reverting() {
        assert!(!Readiness::Loading.can_advance_to(Readiness::NotReady));
        assert!(!Readiness::Loading.can_advance_to(Readiness::Loading));
    }

    #[test]
    fn settled_and_ready() {
        assert!(Readiness::Ready.is_ready());
        assert!(Readiness::Ready.is_settled());
        assert!(Readiness::Failed.is_settled());
        assert!(!Readiness::Failed.is_ready());
        assert!(!Readiness::Loading.is_settled());
        assert_eq!(Readiness::default(), Readiness::NotReady);
    }

    #[test]
    fn display_matches_as_str() {
        for r in ALL {
            assert_eq!(r.to_string(), r.as_str());
        }
    }
}
