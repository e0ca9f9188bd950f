//! # stackcheck
//!
//! Stacking-invariant verification harness for window managers.
//!
//! The harness drives a window manager under test through a scripted
//! sequence of window operations, waits for its asynchronous restacking to
//! converge, captures the resulting stack order, and checks it against the
//! partial order implied by the transiency edges: every dialog above its
//! owner, chains in ancestor order, the desktop sentinel below every
//! visible application.
//!
//! ## Pipeline
//!
//! ```text
//! ScenarioRunner ──mutate──▶ CommandChannel ──▶ window manager
//!       │                                           │ (restacks
//!       ├──settle──▶ wait_for_restack ◀──signal─────┤  asynchronously)
//!       ├──observe─▶ QueryChannel ◀────snapshot─────┘
//!       └──check───▶ verify ──▶ ScenarioReport
//! ```
//!
//! The window manager itself is an external collaborator behind the
//! [`channel`] seams. [`sim::SimWindowManager`] is the deterministic
//! in-memory stand-in used by the harness's own tests;
//! [`tool::ToolWindowManager`] binds the seams to a real manager's control
//! tools.

#![deny(missing_docs)]

pub mod channel;
pub mod convergence;
pub mod error;
pub mod registry;
pub mod scenario;
pub mod sim;
pub mod snapshot;
pub mod tool;
pub mod verify;

pub use channel::{CommandChannel, QueryChannel, WindowKind};
pub use convergence::{Settle, SettleConfig, wait_for_restack};
pub use error::{HarnessError, HarnessResult};
pub use registry::{WindowHandle, WindowRegistry, WindowRole};
pub use scenario::{CheckOutcome, CheckRecord, ScenarioReport, ScenarioRunner};
pub use sim::{RaisePolicy, SimWindowManager};
pub use snapshot::{
    SnapshotScope, StackEntry, StackSnapshot, StackingSignal, Visibility, parse_stack_dump,
};
pub use tool::{ToolConfig, ToolWindowManager};
pub use verify::{CheckSet, OrderingConstraint, Violation};
