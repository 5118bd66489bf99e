use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

/// Runs `task` every `period` until `shutdown` flips to true (or its sender
/// is dropped).
///
/// The first tick fires immediately. Each run is awaited before the next
/// tick is considered and ticks missed meanwhile are skipped, so runs of one
/// loop never overlap. A run still pending at shutdown is dropped.
pub async fn run_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut task: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    info!("Starting {} loop with period={:?}", name, period);

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    'ticks: loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }

            _ = ticker.tick() => {
                let run = task();
                tokio::pin!(run);

                loop {
                    tokio::select! {
                        _ = &mut run => break,
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                info!("{} loop abandoning run in flight", name);
                                break 'ticks;
                            }
                        }
                    }
                }
            }
        }
    }

    info!("{} loop stopped", name);
}
