//! Transient-dialog stacking scenario.
//!
//! Checks that a window manager raises transient dialogs with the windows
//! they are transient for: an application and its dialog chain survive
//! iconify/activate cycles in order, and rewiring the transiencies of two
//! dialogs (through a momentary transiency loop) settles to the new chain.
//!
//! Runs against the in-memory simulated manager by default. Set
//! `STACKCHECK_WINDOWCTL` and `STACKCHECK_WINDOWSTACK` to drive a real
//! manager through its control tools; `STACKCHECK_INIT` and
//! `STACKCHECK_RESTORE` hook environment setup and cleanup.
//!
//! Exit status: 0 when every check passes, 1 on any recorded violation,
//! 2 on a setup or channel failure.

use std::env;
use std::process;

use stackcheck::{
    CommandChannel, HarnessError, HarnessResult, QueryChannel, ScenarioReport, ScenarioRunner,
    SettleConfig, SimWindowManager, ToolConfig, ToolWindowManager, WindowKind,
};

async fn run_scenario<C>(channel: C) -> HarnessResult<ScenarioReport>
where
    C: CommandChannel + QueryChannel,
{
    let mut run = ScenarioRunner::new(channel, SettleConfig::default());
    // Cleanup is unconditional: finish() runs whether the steps succeeded
    // or bailed out with an error.
    let result = drive(&mut run).await;
    let report = run.finish().await;
    result.map(|()| report)
}

async fn drive<C>(run: &mut ScenarioRunner<C>) -> HarnessResult<()>
where
    C: CommandChannel + QueryChannel,
{
    run.discover_desktop().await?;

    // Application with one transient dialog.
    let app = run.create(WindowKind::Application, None).await?;
    run.settle().await?;
    let dialog = run.create(WindowKind::Dialog, Some(&app)).await?;
    run.settle().await?;

    // Iconify the application, then activate it: the dialog must come
    // back up with it.
    run.iconify(&app).await?;
    run.settle().await?;
    run.activate(&app).await?;
    run.settle().await?;
    run.check("dialog raised with its application").await?;

    // Same cycle, but activate the transient instead.
    run.iconify(&app).await?;
    run.settle().await?;
    run.activate(&dialog).await?;
    run.settle().await?;
    run.check("activating the transient raises the chain").await?;

    // Second dialog, transient for the first.
    let dialog2 = run.create(WindowKind::Dialog, Some(&dialog)).await?;
    run.settle().await?;
    run.iconify(&app).await?;
    run.settle().await?;
    run.activate(&app).await?;
    run.settle().await?;
    run.check("both transients above the application, in chain order")
        .await?;

    // Swap the transiencies of the dialogs. The first rewrite creates a
    // momentary transiency loop; only the settled result is judged.
    run.rewire(&dialog, &dialog2).await?;
    run.rewire(&dialog2, &app).await?;
    run.settle().await?;
    run.check("swapped transiencies settle to the new chain").await?;

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt::init();

    let result = match (
        env::var_os("STACKCHECK_WINDOWCTL"),
        env::var_os("STACKCHECK_WINDOWSTACK"),
    ) {
        (Some(ctl), Some(stack)) => {
            let mut config = ToolConfig::new(ctl, stack);
            config.init_cmd = env::var("STACKCHECK_INIT")
                .ok()
                .map(|cmd| cmd.split_whitespace().map(str::to_string).collect());
            config.restore_cmd = env::var("STACKCHECK_RESTORE")
                .ok()
                .map(|cmd| cmd.split_whitespace().map(str::to_string).collect());
            match ToolWindowManager::initialize(config).await {
                Ok(wm) => run_scenario(wm).await,
                Err(err) => Err(err),
            }
        }
        _ => {
            let seed = env::var("STACKCHECK_SEED")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            run_scenario(SimWindowManager::new(seed)).await
        }
    };

    match result {
        Ok(report) => {
            eprintln!("{report}");
            if !report.passed() {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{json}"),
                    Err(err) => eprintln!("could not serialize report: {err}"),
                }
                process::exit(1);
            }
        }
        Err(err @ HarnessError::Setup(_)) => {
            eprintln!("setup failed: {err}");
            process::exit(2);
        }
        Err(err) => {
            eprintln!("unrecoverable failure: {err}");
            process::exit(2);
        }
    }
}
