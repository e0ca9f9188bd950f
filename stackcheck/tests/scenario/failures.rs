//! Failure paths: broken managers, stuck restacks, missing windows, and
//! environments without a desktop.

use std::cell::Cell;
use std::rc::Rc;

use async_trait::async_trait;

use stackcheck::{
    CheckOutcome, CommandChannel, HarnessError, HarnessResult, QueryChannel, RaisePolicy,
    ScenarioRunner, SimWindowManager, SnapshotScope, StackSnapshot, StackingSignal, Violation,
    WindowHandle, WindowKind, parse_stack_dump,
};

use super::util;

/// Channel stub returning a fixed snapshot; the signal only moves when
/// `bump_on_command` is set.
struct ScriptedManager {
    snapshot: StackSnapshot,
    version: u64,
    bump_on_command: bool,
    next_id: u32,
    fail_activate: bool,
    destroyed: Rc<Cell<bool>>,
}

impl ScriptedManager {
    fn new(raw_stack: &str, bump_on_command: bool) -> Self {
        Self {
            snapshot: parse_stack_dump(raw_stack),
            version: 0,
            bump_on_command,
            next_id: 2,
            fail_activate: false,
            destroyed: Rc::new(Cell::new(false)),
        }
    }

    fn bump(&mut self) {
        if self.bump_on_command {
            self.version += 1;
        }
    }
}

#[async_trait(?Send)]
impl CommandChannel for ScriptedManager {
    async fn create_window(
        &mut self,
        _kind: WindowKind,
        _transient_to: Option<&WindowHandle>,
    ) -> HarnessResult<WindowHandle> {
        let handle = WindowHandle::new(format!("0x{:x}", self.next_id));
        self.next_id += 1;
        self.bump();
        Ok(handle)
    }

    async fn iconify(&mut self, _window: &WindowHandle) -> HarnessResult<()> {
        self.bump();
        Ok(())
    }

    async fn activate(&mut self, _window: &WindowHandle) -> HarnessResult<()> {
        if self.fail_activate {
            return Err(HarnessError::Channel("activation refused".into()));
        }
        self.bump();
        Ok(())
    }

    async fn set_transient_for(
        &mut self,
        _window: &WindowHandle,
        _new_parent: &WindowHandle,
    ) -> HarnessResult<()> {
        self.bump();
        Ok(())
    }

    async fn destroy_all(&mut self) -> HarnessResult<()> {
        self.destroyed.set(true);
        Ok(())
    }
}

#[async_trait(?Send)]
impl QueryChannel for ScriptedManager {
    async fn stack_snapshot(&mut self, _scope: SnapshotScope) -> HarnessResult<StackSnapshot> {
        Ok(self.snapshot.clone())
    }

    async fn stacking_signal(&mut self) -> HarnessResult<StackingSignal> {
        Ok(StackingSignal::new(format!("v{}", self.version)))
    }
}

#[tokio::test]
async fn broken_raise_policy_is_reported_as_order_violation() {
    let wm = SimWindowManager::with_policy(2, RaisePolicy::OwnersAboveTransients);
    let report = util::run_transient_dialog_scenario(wm)
        .await
        .expect("scenario runs to completion");
    assert!(!report.passed());
    let first_failure = report
        .checks
        .iter()
        .find(|c| c.outcome != CheckOutcome::Passed)
        .expect("a failed check");
    assert!(matches!(
        first_failure.outcome,
        CheckOutcome::Violated(Violation::OrderViolation { .. })
    ));
}

#[tokio::test]
async fn stuck_restack_records_convergence_timeout_and_continues() {
    let stub = ScriptedManager::new("0x1 desk DESKTOP viewable\n", false);
    let mut run = ScenarioRunner::new(stub, util::fast_settle());
    run.discover_desktop().await.expect("desktop");
    run.create(WindowKind::Application, None).await.expect("app");
    run.settle().await.expect("settle returns despite timeout");
    run.check("stack after stuck restack").await.expect("check");
    let report = run.finish().await;
    assert_eq!(report.checks.len(), 1);
    assert_eq!(report.checks[0].outcome, CheckOutcome::ConvergenceTimeout);
    assert!(!report.passed());
}

#[tokio::test]
async fn absent_created_window_is_a_missing_window_failure() {
    // The stub's stack never gains the created windows: 0x2 (app) shows
    // up, 0x3 (dialog) does not.
    let stub = ScriptedManager::new(
        "0x2 app APPLICATION viewable\n0x1 desk DESKTOP viewable\n",
        true,
    );
    let mut run = ScenarioRunner::new(stub, util::fast_settle());
    run.discover_desktop().await.expect("desktop");
    let app = run.create(WindowKind::Application, None).await.expect("app");
    let _dialog = run.create(WindowKind::Dialog, Some(&app)).await.expect("dialog");
    run.settle().await.expect("settle");
    run.check("created dialog must be in the stack").await.expect("check");
    let report = run.finish().await;
    assert_eq!(
        report.checks[0].outcome,
        CheckOutcome::Violated(Violation::MissingWindow {
            handle: WindowHandle::new("0x3"),
        })
    );
}

#[tokio::test]
async fn cleanup_runs_when_a_channel_error_aborts_the_run() {
    let mut stub = ScriptedManager::new(
        "0x2 app APPLICATION viewable\n0x1 desk DESKTOP viewable\n",
        true,
    );
    stub.fail_activate = true;
    let destroyed = stub.destroyed.clone();
    let result = util::run_transient_dialog_scenario(stub).await;
    assert!(matches!(result, Err(HarnessError::Channel(_))));
    assert!(destroyed.get(), "destroy_all must run on the error exit path");
}

#[tokio::test]
async fn trailing_settle_timeout_still_fails_the_report() {
    // A settle that times out with no check after it must not vanish.
    let stub = ScriptedManager::new("0x1 desk DESKTOP viewable\n", false);
    let mut run = ScenarioRunner::new(stub, util::fast_settle());
    run.discover_desktop().await.expect("desktop");
    run.create(WindowKind::Application, None).await.expect("app");
    run.settle().await.expect("settle returns despite timeout");
    let report = run.finish().await;
    assert_eq!(report.checks.len(), 1);
    assert_eq!(report.checks[0].outcome, CheckOutcome::ConvergenceTimeout);
    assert!(!report.passed());
}

#[tokio::test]
async fn missing_desktop_is_a_fatal_setup_failure() {
    let stub = ScriptedManager::new("", true);
    let mut run = ScenarioRunner::new(stub, util::fast_settle());
    match run.discover_desktop().await {
        Err(HarnessError::Setup(reason)) => assert!(reason.contains("desktop")),
        other => panic!("expected setup failure, got {other:?}"),
    }
}
