//! Typed stacking-order snapshots and the boundary parser.
//!
//! A [`StackSnapshot`] is an ordered, TOP-TO-BOTTOM view of the window
//! manager's client stacking at one instant: the entry at index 0 is the
//! topmost window. Snapshots are produced fresh on every query and never
//! cached across steps.
//!
//! [`parse_stack_dump`] is the only place that understands the textual
//! `windowstack`-style dump format; everything past this boundary works on
//! typed records.

use std::collections::HashMap;

use serde::Serialize;

use crate::registry::{WindowHandle, WindowRole};

/// Which monitors a snapshot query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotScope {
    /// Clients on every monitor.
    AllMonitors,
    /// Clients on the current monitor only (`windowstack m`).
    CurrentMonitor,
}

/// Map-state of a window as reported by the dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Visibility {
    /// Mapped and viewable.
    Viewable,
    /// Iconified.
    Iconic,
    /// Unmapped or state not reported.
    Unmapped,
}

/// One window in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackEntry {
    /// The window's handle token. Windows unknown to the registry pass
    /// through; their positions still count for relative-order checks.
    pub handle: WindowHandle,
    /// Map-state reported alongside the handle.
    pub visibility: Visibility,
    /// Role word from the dump, when one was recognized.
    pub role_hint: Option<WindowRole>,
}

/// An ordered top-to-bottom stacking snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StackSnapshot {
    entries: Vec<StackEntry>,
}

impl StackSnapshot {
    /// Build a snapshot from already-typed entries, topmost first.
    pub fn from_entries(entries: Vec<StackEntry>) -> Self {
        Self { entries }
    }

    /// The entries, topmost first.
    pub fn entries(&self) -> &[StackEntry] {
        &self.entries
    }

    /// Whether the snapshot contains no windows.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First-seen position per handle, topmost first.
    ///
    /// Duplicate handles keep their first (highest) position.
    pub fn position_index(&self) -> HashMap<WindowHandle, usize> {
        let mut index = HashMap::new();
        for (pos, entry) in self.entries.iter().enumerate() {
            index.entry(entry.handle.clone()).or_insert(pos);
        }
        index
    }

    /// Find the topmost viewable entry with the given role hint.
    pub fn find_viewable(&self, role: WindowRole) -> Option<&StackEntry> {
        self.entries
            .iter()
            .find(|e| e.role_hint == Some(role) && e.visibility == Visibility::Viewable)
    }
}

/// Opaque token mirroring the window manager's ordered-client-list root
/// property (`_NET_CLIENT_LIST_STACKING`).
///
/// Compared only for equality; a change means the manager restacked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackingSignal(String);

impl StackingSignal {
    /// Wrap a raw property value.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

/// Parse a raw `windowstack`-style dump into a snapshot.
///
/// Expected line shape: `0x<hex-id> [name] <ROLE> <state> ...`, topmost
/// window first. Tolerates and skips header lines, malformed lines, and
/// anything without a leading hex window id; empty input yields an empty
/// snapshot, not an error.
pub fn parse_stack_dump(raw: &str) -> StackSnapshot {
    let mut entries = Vec::new();
    for line in raw.lines() {
        let line = line.trim();
        let mut tokens = line.split_whitespace();
        let Some(id) = tokens.next() else { continue };
        if !is_window_id(id) {
            continue;
        }
        let mut visibility = Visibility::Unmapped;
        let mut role_hint = None;
        for token in tokens {
            match token {
                "viewable" => visibility = Visibility::Viewable,
                "iconic" => visibility = Visibility::Iconic,
                "unmapped" => visibility = Visibility::Unmapped,
                "DESKTOP" => role_hint = Some(WindowRole::Desktop),
                "APPLICATION" | "NORMAL" => role_hint = Some(WindowRole::Application),
                "DIALOG" => role_hint = Some(WindowRole::Dialog),
                _ => {}
            }
        }
        entries.push(StackEntry {
            handle: WindowHandle::new(id),
            visibility,
            role_hint,
        });
    }
    StackSnapshot::from_entries(entries)
}

fn is_window_id(token: &str) -> bool {
    token
        .strip_prefix("0x")
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_hexdigit()))
}
