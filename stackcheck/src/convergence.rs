//! Bounded wait for the window manager's restack to settle.
//!
//! After a mutating command the manager restacks on its own schedule. The
//! waiter re-polls the cheap stacking signal at a fixed interval until it
//! differs from the pre-mutation value. The wait is always bounded: on
//! timeout it hands back the last-observed signal flagged `timed_out`
//! instead of blocking the run forever.

use std::time::Duration;

use crate::channel::QueryChannel;
use crate::error::HarnessResult;
use crate::snapshot::StackingSignal;

/// Polling parameters for the settle wait.
#[derive(Debug, Clone)]
pub struct SettleConfig {
    /// Fixed delay between signal polls.
    pub poll_interval: Duration,
    /// Maximum number of polls before giving up.
    pub max_polls: u32,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_polls: 20,
        }
    }
}

/// Outcome of a settle wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settle {
    /// The last signal observed.
    pub signal: StackingSignal,
    /// True when the bound elapsed without the signal changing.
    pub timed_out: bool,
}

/// Block until the stacking signal differs from `previous` or the bound
/// elapses.
///
/// Sleeps one interval before each poll, matching the cadence the manager
/// needs to pick up the pending work.
pub async fn wait_for_restack<Q>(
    query: &mut Q,
    previous: &StackingSignal,
    config: &SettleConfig,
) -> HarnessResult<Settle>
where
    Q: QueryChannel + ?Sized,
{
    for poll in 0..config.max_polls {
        tokio::time::sleep(config.poll_interval).await;
        let signal = query.stacking_signal().await?;
        if signal != *previous {
            tracing::debug!(polls = poll + 1, "stacking settled");
            return Ok(Settle {
                signal,
                timed_out: false,
            });
        }
    }
    tracing::warn!(max_polls = config.max_polls, "stacking signal never changed");
    Ok(Settle {
        signal: previous.clone(),
        timed_out: true,
    })
}
