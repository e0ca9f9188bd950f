//! In-memory bookkeeping of windows and transiency edges.
//!
//! The registry never talks to the window manager. It records the handles
//! the scenario created, their roles, the current transiency edges, and
//! which windows the scenario currently expects to be visible. The verifier
//! reads all of its ordering constraints from here.
//!
//! Transiency edges are replaced, never accumulated: rewiring a window
//! drops its previous edge. A rewrite sequence is allowed to pass through a
//! momentary cycle (A transient-for B, B transient-for A); the window
//! manager under test tolerates that state and so does the registry. All
//! walks over parent links carry a visited set so a cycle can never loop
//! them.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::verify::OrderingConstraint;

/// Opaque identifier naming a window instance.
///
/// Handles are the tokens the command channel returns at creation time
/// (e.g. `0x1a00007` for an X client). They carry no structure beyond
/// equality and stay valid for comparison even after the window leaves the
/// visible stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WindowHandle(String);

impl WindowHandle {
    /// Wrap a raw handle token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, as the external tools print it.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role tag for a registered window.
///
/// Informational except for `Desktop`, which marks the sentinel that must
/// never outrank a visible application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WindowRole {
    /// The home/desktop window, the stacking baseline.
    Desktop,
    /// A regular application window.
    Application,
    /// A transient (dialog) window.
    Dialog,
}

#[derive(Debug, Clone)]
struct WindowEntry {
    handle: WindowHandle,
    role: WindowRole,
    parent: Option<WindowHandle>,
    expect_visible: bool,
}

/// Registry of created windows, their roles, and transiency edges.
///
/// Entries keep insertion order so constraint derivation is deterministic.
#[derive(Debug, Default)]
pub struct WindowRegistry {
    windows: Vec<WindowEntry>,
}

impl WindowRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly created window.
    ///
    /// `parent` is the transiency parent for dialog windows. Windows start
    /// out expected-visible (the window manager maps new windows on top).
    pub fn register(
        &mut self,
        handle: WindowHandle,
        role: WindowRole,
        parent: Option<&WindowHandle>,
    ) {
        self.windows.push(WindowEntry {
            handle,
            role,
            parent: parent.cloned(),
            expect_visible: true,
        });
    }

    /// Replace a window's transiency edge with a new parent.
    ///
    /// No acyclicity validation: a rewrite sequence may transiently create
    /// a cycle before the final state is in place.
    pub fn rewire_transiency(&mut self, handle: &WindowHandle, new_parent: &WindowHandle) {
        if let Some(entry) = self.windows.iter_mut().find(|w| &w.handle == handle) {
            entry.parent = Some(new_parent.clone());
        }
    }

    /// The role a handle was registered with.
    pub fn lookup_role(&self, handle: &WindowHandle) -> Option<WindowRole> {
        self.entry(handle).map(|e| e.role)
    }

    /// Mark whether the scenario currently expects this window on screen.
    pub fn set_expected_visible(&mut self, handle: &WindowHandle, visible: bool) {
        if let Some(entry) = self.windows.iter_mut().find(|w| &w.handle == handle) {
            entry.expect_visible = visible;
        }
    }

    /// Whether the scenario currently expects this window on screen.
    pub fn expects_visible(&self, handle: &WindowHandle) -> bool {
        self.entry(handle).is_some_and(|e| e.expect_visible)
    }

    /// The desktop sentinel, if one was discovered.
    pub fn desktop(&self) -> Option<&WindowHandle> {
        self.windows
            .iter()
            .find(|w| w.role == WindowRole::Desktop)
            .map(|w| &w.handle)
    }

    /// All windows in the transiency chain touched by `handle`: its chain
    /// root plus every transient hanging off that root.
    ///
    /// Iconifying or activating any member affects the whole chain, so the
    /// orchestrator flips visibility expectations for all of them at once.
    pub fn chain_members(&self, handle: &WindowHandle) -> Vec<WindowHandle> {
        let root = self.chain_root(handle);
        let mut members = Vec::new();
        let mut visited = HashSet::new();
        self.collect_chain(&root, &mut visited, &mut members);
        members
    }

    /// Follow parent links up to the chain root.
    ///
    /// Stops at a window with no (or unknown) parent, or on revisiting a
    /// window when the edges currently form a cycle.
    pub fn chain_root(&self, handle: &WindowHandle) -> WindowHandle {
        let mut visited = HashSet::new();
        let mut current = handle.clone();
        while visited.insert(current.clone()) {
            match self.entry(&current).and_then(|e| e.parent.clone()) {
                Some(parent) if self.entry(&parent).is_some() => current = parent,
                _ => break,
            }
        }
        current
    }

    /// Derive the pairwise ordering constraints implied by the current
    /// transiency edges: every window must stack above each of its
    /// ancestors.
    ///
    /// Ancestor walks are cycle-guarded; constraints come out in
    /// registration order, ancestors nearest-first.
    pub fn ordering_constraints(&self) -> Vec<OrderingConstraint> {
        let mut constraints = Vec::new();
        for window in &self.windows {
            let mut visited = HashSet::new();
            visited.insert(window.handle.clone());
            let mut current = window.parent.clone();
            while let Some(ancestor) = current {
                if self.entry(&ancestor).is_none() || !visited.insert(ancestor.clone()) {
                    break;
                }
                constraints.push(OrderingConstraint {
                    above: window.handle.clone(),
                    below: ancestor.clone(),
                });
                current = self.entry(&ancestor).and_then(|e| e.parent.clone());
            }
        }
        constraints
    }

    /// Handles currently expected visible, in registration order.
    pub fn expected_visible(&self) -> Vec<WindowHandle> {
        self.windows
            .iter()
            .filter(|w| w.expect_visible)
            .map(|w| w.handle.clone())
            .collect()
    }

    /// Application windows currently expected visible, in registration
    /// order. Used for the desktop sentinel check.
    pub fn visible_applications(&self) -> Vec<WindowHandle> {
        self.windows
            .iter()
            .filter(|w| w.role == WindowRole::Application && w.expect_visible)
            .map(|w| w.handle.clone())
            .collect()
    }

    fn entry(&self, handle: &WindowHandle) -> Option<&WindowEntry> {
        self.windows.iter().find(|w| &w.handle == handle)
    }

    fn collect_chain(
        &self,
        handle: &WindowHandle,
        visited: &mut HashSet<WindowHandle>,
        out: &mut Vec<WindowHandle>,
    ) {
        if !visited.insert(handle.clone()) {
            return;
        }
        out.push(handle.clone());
        // Children in registration order keeps traversal deterministic.
        let children: Vec<WindowHandle> = self
            .windows
            .iter()
            .filter(|w| w.parent.as_ref() == Some(handle))
            .map(|w| w.handle.clone())
            .collect();
        for child in children {
            self.collect_chain(&child, visited, out);
        }
    }
}
