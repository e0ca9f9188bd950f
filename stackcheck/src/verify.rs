//! Ordering-invariant verification over settled snapshots.
//!
//! The verifier walks a snapshot once to build a first-seen position index
//! per handle, then evaluates every pairwise constraint against the
//! indices, short-circuiting on the first broken one. Evaluation order is
//! fixed (constraints in derivation order, then the desktop sentinel, then
//! bare presence), so the outcome is deterministic for a given snapshot
//! and check set.
//!
//! Only settled snapshots reach this module. Transient states mid-rewrite,
//! including momentary transiency cycles, are the orchestrator's concern:
//! it settles before every check.

use serde::Serialize;
use thiserror::Error;

use crate::registry::{WindowHandle, WindowRegistry};
use crate::snapshot::StackSnapshot;

/// Pairwise assertion that `above` must appear before `below` in a settled
/// top-to-bottom snapshot, provided both windows are expected visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderingConstraint {
    /// The window expected nearer the top.
    pub above: WindowHandle,
    /// The window expected below it.
    pub below: WindowHandle,
}

/// A broken stacking invariant, reported with enough context for triage.
///
/// Violations are recorded per check; they never abort the run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum Violation {
    /// `below` was stacked above `above`, against a transiency constraint.
    #[error("{below} is stacked above {above}, violating transiency order")]
    OrderViolation {
        /// The window that should have been on top.
        above: WindowHandle,
        /// The window that should have been underneath.
        below: WindowHandle,
        /// The offending snapshot.
        snapshot: StackSnapshot,
    },

    /// The desktop sentinel outranked a visible application.
    #[error("home window {home} is stacked above application {app}")]
    HomeBeforeApp {
        /// The desktop/home sentinel.
        home: WindowHandle,
        /// The application it outranked.
        app: WindowHandle,
        /// The offending snapshot.
        snapshot: StackSnapshot,
    },

    /// A window expected visible never appeared in the snapshot.
    #[error("expected window {handle} is missing from the stack")]
    MissingWindow {
        /// The absent handle.
        handle: WindowHandle,
    },
}

/// Everything one check needs: constraints plus visibility expectations.
///
/// Built from the registry at check time so it reflects the current
/// transiency edges, never a stale set.
#[derive(Debug, Clone)]
pub struct CheckSet {
    /// Pairwise ordering constraints, in derivation order.
    pub constraints: Vec<OrderingConstraint>,
    /// Handles the scenario currently expects on screen.
    pub expected_visible: Vec<WindowHandle>,
    /// The desktop sentinel, when discovered.
    pub home: Option<WindowHandle>,
    /// Applications currently expected visible.
    pub visible_apps: Vec<WindowHandle>,
}

impl CheckSet {
    /// Derive the check set from the registry's current state.
    pub fn from_registry(registry: &WindowRegistry) -> Self {
        Self {
            constraints: registry.ordering_constraints(),
            expected_visible: registry.expected_visible(),
            home: registry.desktop().cloned(),
            visible_apps: registry.visible_applications(),
        }
    }

    fn expects_visible(&self, handle: &WindowHandle) -> bool {
        self.expected_visible.contains(handle)
    }
}

/// Check a settled snapshot against the constraint set.
///
/// Returns the first violation encountered, or `Ok(())` when the snapshot
/// is consistent. Constraints whose endpoints are not both expected
/// visible are skipped: a window may legitimately leave the stack while
/// iconified.
pub fn verify(snapshot: &StackSnapshot, checks: &CheckSet) -> Result<(), Violation> {
    let index = snapshot.position_index();

    for constraint in &checks.constraints {
        if !checks.expects_visible(&constraint.above) || !checks.expects_visible(&constraint.below)
        {
            continue;
        }
        let Some(above_pos) = index.get(&constraint.above) else {
            return Err(Violation::MissingWindow {
                handle: constraint.above.clone(),
            });
        };
        let Some(below_pos) = index.get(&constraint.below) else {
            return Err(Violation::MissingWindow {
                handle: constraint.below.clone(),
            });
        };
        if below_pos < above_pos {
            return Err(Violation::OrderViolation {
                above: constraint.above.clone(),
                below: constraint.below.clone(),
                snapshot: snapshot.clone(),
            });
        }
    }

    if let Some(home) = &checks.home {
        if let Some(home_pos) = index.get(home) {
            for app in &checks.visible_apps {
                match index.get(app) {
                    Some(app_pos) if home_pos < app_pos => {
                        return Err(Violation::HomeBeforeApp {
                            home: home.clone(),
                            app: app.clone(),
                            snapshot: snapshot.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        return Err(Violation::MissingWindow {
                            handle: app.clone(),
                        });
                    }
                }
            }
        }
    }

    for handle in &checks.expected_visible {
        if !index.contains_key(handle) {
            return Err(Violation::MissingWindow {
                handle: handle.clone(),
            });
        }
    }

    Ok(())
}
