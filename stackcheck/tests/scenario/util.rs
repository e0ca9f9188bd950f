//! Shared helpers for scenario tests.

use std::time::Duration;

use stackcheck::{
    CommandChannel, HarnessResult, QueryChannel, ScenarioReport, ScenarioRunner, SettleConfig,
    WindowKind,
};

/// Settle parameters tight enough for tests.
pub fn fast_settle() -> SettleConfig {
    SettleConfig {
        poll_interval: Duration::from_millis(1),
        max_polls: 10,
    }
}

/// The full transient-dialog scenario: chain raises across
/// iconify/activate cycles, then a transiency swap through a momentary
/// loop. Mirrors the `transient-dialogs` binary.
pub async fn run_transient_dialog_scenario<C>(channel: C) -> HarnessResult<ScenarioReport>
where
    C: CommandChannel + QueryChannel,
{
    let mut run = ScenarioRunner::new(channel, fast_settle());
    // Cleanup is unconditional, even when a step errors out.
    let result = drive(&mut run).await;
    let report = run.finish().await;
    result.map(|()| report)
}

async fn drive<C>(run: &mut ScenarioRunner<C>) -> HarnessResult<()>
where
    C: CommandChannel + QueryChannel,
{
    run.discover_desktop().await?;

    let app = run.create(WindowKind::Application, None).await?;
    run.settle().await?;
    let dialog = run.create(WindowKind::Dialog, Some(&app)).await?;
    run.settle().await?;

    run.iconify(&app).await?;
    run.settle().await?;
    run.activate(&app).await?;
    run.settle().await?;
    run.check("dialog raised with its application").await?;

    run.iconify(&app).await?;
    run.settle().await?;
    run.activate(&dialog).await?;
    run.settle().await?;
    run.check("activating the transient raises the chain").await?;

    let dialog2 = run.create(WindowKind::Dialog, Some(&dialog)).await?;
    run.settle().await?;
    run.iconify(&app).await?;
    run.settle().await?;
    run.activate(&app).await?;
    run.settle().await?;
    run.check("both transients above the application, in chain order")
        .await?;

    run.rewire(&dialog, &dialog2).await?;
    run.rewire(&dialog2, &app).await?;
    run.settle().await?;
    run.check("swapped transiencies settle to the new chain").await?;

    Ok(())
}
