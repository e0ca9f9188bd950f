//! Command and query channel seams to the window manager under test.
//!
//! The engine never issues window operations or reads window state
//! directly; it goes through these traits. Two implementations exist:
//! [`crate::sim::SimWindowManager`] (in-memory, deterministic per seed) and
//! [`crate::tool::ToolWindowManager`] (drives a real manager through its
//! control tools).

use async_trait::async_trait;

use crate::error::HarnessResult;
use crate::registry::WindowHandle;
use crate::snapshot::{SnapshotScope, StackSnapshot, StackingSignal};

/// Kind of window to create.
///
/// Narrower than [`crate::registry::WindowRole`]: the harness never creates
/// a desktop window, it discovers the one the environment provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    /// Regular application window.
    Application,
    /// Transient dialog window.
    Dialog,
}

/// Sends window operations to the manager under test.
///
/// Commands return once the manager has accepted them; any restacking they
/// trigger happens asynchronously on the manager's own schedule. Callers
/// must settle (see [`crate::convergence`]) before reading state.
#[async_trait(?Send)]
pub trait CommandChannel {
    /// Create and show a window, returning its handle.
    ///
    /// `transient_to` sets the initial transiency parent for dialogs.
    async fn create_window(
        &mut self,
        kind: WindowKind,
        transient_to: Option<&WindowHandle>,
    ) -> HarnessResult<WindowHandle>;

    /// Iconify a window.
    async fn iconify(&mut self, window: &WindowHandle) -> HarnessResult<()>;

    /// Activate (raise and focus) a window.
    async fn activate(&mut self, window: &WindowHandle) -> HarnessResult<()>;

    /// Replace a window's transiency parent.
    async fn set_transient_for(
        &mut self,
        window: &WindowHandle,
        new_parent: &WindowHandle,
    ) -> HarnessResult<()>;

    /// Destroy every window this channel spawned. Called at cleanup on
    /// every exit path.
    async fn destroy_all(&mut self) -> HarnessResult<()>;
}

/// Reads live stacking state from the manager under test.
#[async_trait(?Send)]
pub trait QueryChannel {
    /// Read a fresh, ordered stacking snapshot.
    async fn stack_snapshot(&mut self, scope: SnapshotScope) -> HarnessResult<StackSnapshot>;

    /// Read the cheap stacking-change token from the root window.
    async fn stacking_signal(&mut self) -> HarnessResult<StackingSignal>;
}
