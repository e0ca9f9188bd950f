//! Scenario orchestration: drive the manager, settle, verify, record.
//!
//! The runner executes steps strictly sequentially. Every mutating step
//! captures the stacking signal before issuing its command, so the next
//! [`ScenarioRunner::settle`] can wait for the manager's asynchronous
//! restack against the right baseline. Checks only ever see settled
//! snapshots.
//!
//! Failure policy, explicit and consistent: each check stops at its first
//! violation, the scenario then continues to the next step. Only an
//! unrecoverable channel or setup failure aborts the run. Cleanup runs on
//! every exit path and can only ever log a warning, never change the
//! verdict.

use std::fmt;

use serde::Serialize;

use crate::channel::{CommandChannel, QueryChannel, WindowKind};
use crate::convergence::{self, SettleConfig};
use crate::error::{HarnessError, HarnessResult};
use crate::registry::{WindowHandle, WindowRegistry, WindowRole};
use crate::snapshot::{SnapshotScope, StackingSignal};
use crate::verify::{self, CheckSet, Violation};

/// Result of one named check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CheckOutcome {
    /// The settled snapshot satisfied every constraint.
    Passed,
    /// A constraint was broken; the offending snapshot travels with it.
    Violated(Violation),
    /// The settle wait before this point exhausted its bound; the snapshot
    /// could not be trusted, so the check counts as failed.
    ConvergenceTimeout,
}

/// One recorded check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckRecord {
    /// Human-readable label naming what the check covered.
    pub label: String,
    /// What happened.
    pub outcome: CheckOutcome,
}

/// Accumulated pass/fail results for a scenario run.
///
/// Threaded through the runner and returned at the end; never global
/// state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioReport {
    /// All recorded checks, in execution order.
    pub checks: Vec<CheckRecord>,
}

impl ScenarioReport {
    /// True when every recorded check passed.
    pub fn passed(&self) -> bool {
        self.checks
            .iter()
            .all(|c| c.outcome == CheckOutcome::Passed)
    }

    /// Number of passed checks.
    pub fn passed_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.outcome == CheckOutcome::Passed)
            .count()
    }

    /// Number of failed checks.
    pub fn failed_count(&self) -> usize {
        self.checks.len() - self.passed_count()
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Stacking Scenario Report ===")?;
        writeln!(f, "Checks: {}", self.checks.len())?;
        writeln!(f, "Passed: {}", self.passed_count())?;
        writeln!(f, "Failed: {}", self.failed_count())?;
        for check in &self.checks {
            match &check.outcome {
                CheckOutcome::Passed => writeln!(f, "  PASS {}", check.label)?,
                CheckOutcome::ConvergenceTimeout => {
                    writeln!(f, "  FAIL {} (stacking never settled)", check.label)?
                }
                CheckOutcome::Violated(violation) => {
                    writeln!(f, "  FAIL {}: {}", check.label, violation)?;
                    if let Violation::OrderViolation { snapshot, .. }
                    | Violation::HomeBeforeApp { snapshot, .. } = violation
                    {
                        writeln!(f, "  Failed stack (topmost first):")?;
                        for entry in snapshot.entries() {
                            writeln!(
                                f,
                                "    {} {:?} {:?}",
                                entry.handle, entry.role_hint, entry.visibility
                            )?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Drives a scripted scenario against one window manager channel.
///
/// `C` is a single object serving both channel seams; the runner is the
/// sole owner, so no shared mutable state crosses the boundary.
pub struct ScenarioRunner<C> {
    channel: C,
    registry: WindowRegistry,
    settle_config: SettleConfig,
    scope: SnapshotScope,
    report: ScenarioReport,
    /// Signal captured before the first mutation of the current batch.
    baseline: Option<StackingSignal>,
    /// Set when the last settle timed out; consumed by the next check.
    settle_timed_out: bool,
}

impl<C> ScenarioRunner<C>
where
    C: CommandChannel + QueryChannel,
{
    /// Create a runner over a channel with the given settle parameters.
    pub fn new(channel: C, settle_config: SettleConfig) -> Self {
        Self {
            channel,
            registry: WindowRegistry::new(),
            settle_config,
            scope: SnapshotScope::CurrentMonitor,
            report: ScenarioReport::default(),
            baseline: None,
            settle_timed_out: false,
        }
    }

    /// Locate and register the desktop sentinel from an initial snapshot.
    ///
    /// Its absence means the environment is not ready: a setup failure,
    /// fatal before any checks run.
    pub async fn discover_desktop(&mut self) -> HarnessResult<WindowHandle> {
        let snapshot = self.channel.stack_snapshot(self.scope).await?;
        let desktop = snapshot
            .find_viewable(WindowRole::Desktop)
            .map(|e| e.handle.clone())
            .ok_or_else(|| HarnessError::Setup("desktop window not found".into()))?;
        tracing::info!(%desktop, "desktop sentinel discovered");
        self.registry
            .register(desktop.clone(), WindowRole::Desktop, None);
        Ok(desktop)
    }

    /// Create and show a window, registering it with the given transiency
    /// parent.
    pub async fn create(
        &mut self,
        kind: WindowKind,
        transient_to: Option<&WindowHandle>,
    ) -> HarnessResult<WindowHandle> {
        self.capture_baseline().await?;
        let handle = self.channel.create_window(kind, transient_to).await?;
        let role = match kind {
            WindowKind::Application => WindowRole::Application,
            WindowKind::Dialog => WindowRole::Dialog,
        };
        tracing::info!(%handle, ?role, "window created");
        self.registry.register(handle.clone(), role, transient_to);
        Ok(handle)
    }

    /// Iconify a window. The whole transiency chain follows it off screen.
    pub async fn iconify(&mut self, window: &WindowHandle) -> HarnessResult<()> {
        self.capture_baseline().await?;
        self.channel.iconify(window).await?;
        tracing::debug!(%window, "iconified");
        for member in self.registry.chain_members(window) {
            self.registry.set_expected_visible(&member, false);
        }
        Ok(())
    }

    /// Activate a window. The whole transiency chain is expected back on
    /// screen, stacked above its root.
    pub async fn activate(&mut self, window: &WindowHandle) -> HarnessResult<()> {
        self.capture_baseline().await?;
        self.channel.activate(window).await?;
        tracing::debug!(%window, "activated");
        for member in self.registry.chain_members(window) {
            self.registry.set_expected_visible(&member, true);
        }
        Ok(())
    }

    /// Replace a window's transiency parent, in the manager and in the
    /// registry.
    pub async fn rewire(
        &mut self,
        window: &WindowHandle,
        new_parent: &WindowHandle,
    ) -> HarnessResult<()> {
        self.capture_baseline().await?;
        self.channel.set_transient_for(window, new_parent).await?;
        tracing::debug!(%window, %new_parent, "transiency rewired");
        self.registry.rewire_transiency(window, new_parent);
        Ok(())
    }

    /// Wait for the manager's restack to settle after the current batch of
    /// mutations.
    ///
    /// A timeout is not a crash: it is remembered and fails the next
    /// check, since that check cannot trust its snapshot. A timeout with
    /// no check after it is folded into the report at [`Self::finish`].
    pub async fn settle(&mut self) -> HarnessResult<()> {
        let baseline = match self.baseline.take() {
            Some(signal) => signal,
            // Nothing mutated since the last settle; nothing to wait for.
            None => return Ok(()),
        };
        let settle =
            convergence::wait_for_restack(&mut self.channel, &baseline, &self.settle_config)
                .await?;
        if settle.timed_out {
            self.settle_timed_out = true;
        }
        Ok(())
    }

    /// Read a fresh snapshot, verify it against the registry's current
    /// constraints, and record the outcome under `label`.
    pub async fn check(&mut self, label: &str) -> HarnessResult<()> {
        if std::mem::take(&mut self.settle_timed_out) {
            tracing::error!(label, "check failed: stacking never settled");
            self.record(label, CheckOutcome::ConvergenceTimeout);
            return Ok(());
        }
        let checks = CheckSet::from_registry(&self.registry);
        let snapshot = self.channel.stack_snapshot(self.scope).await?;
        match verify::verify(&snapshot, &checks) {
            Ok(()) => {
                tracing::info!(label, "check passed");
                self.record(label, CheckOutcome::Passed);
            }
            Err(violation) => {
                tracing::error!(label, %violation, "check failed");
                self.record(label, CheckOutcome::Violated(violation));
            }
        }
        Ok(())
    }

    /// Destroy spawned windows and hand back the report.
    ///
    /// Scenario drivers call this on every exit path, error or not, so
    /// cleanup cannot be skipped. Cleanup failure is logged and swallowed:
    /// it never upgrades the run status. A settle timeout no check
    /// consumed is recorded here so it cannot vanish from the report.
    pub async fn finish(mut self) -> ScenarioReport {
        if std::mem::take(&mut self.settle_timed_out) {
            tracing::warn!("run ended with an unconsumed settle timeout");
            self.record(
                "stacking settled before cleanup",
                CheckOutcome::ConvergenceTimeout,
            );
        }
        if let Err(err) = self.channel.destroy_all().await {
            tracing::warn!(%err, "cleanup failed");
        }
        self.report
    }

    /// The registry, for scenario-side assertions.
    pub fn registry(&self) -> &WindowRegistry {
        &self.registry
    }

    async fn capture_baseline(&mut self) -> HarnessResult<()> {
        if self.baseline.is_none() {
            self.baseline = Some(self.channel.stacking_signal().await?);
        }
        Ok(())
    }

    fn record(&mut self, label: &str, outcome: CheckOutcome) {
        self.report.checks.push(CheckRecord {
            label: label.to_string(),
            outcome,
        });
    }
}
