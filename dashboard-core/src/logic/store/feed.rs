//! Per-feed polling task

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};

use super::{FeedKind, StoreInner};
use crate::error::FetchError;
use crate::logic::scheduler::{PollPhase, PollScheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FeedCommand {
    /// Poll now, clearing backoff and pause
    Retry,
    /// Poll now without the incremental cursor
    Refresh,
}

/// Drive one feed until shutdown.
///
/// Polls run one at a time on this task, so two reconciliations of the
/// same feed can never overlap. Commands that arrive while a poll is in
/// flight are coalesced and handled once it finishes.
pub(crate) async fn run_feed(
    inner: Arc<StoreInner>,
    feed: FeedKind,
    mut scheduler: PollScheduler,
    mut commands: mpsc::UnboundedReceiver<FeedCommand>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::debug!(feed = feed.name(), "feed task started");
    scheduler.start();
    inner.record_schedule(feed, &scheduler);
    let mut full_reload = false;

    loop {
        if *shutdown.borrow() || inner.is_closed() {
            break;
        }

        if scheduler.phase() == PollPhase::Polling {
            let (seq, result) = tokio::select! {
                outcome = inner.poll(feed, full_reload) => outcome,
                _ = shutdown.changed() => break,
            };
            full_reload = false;
            if matches!(result, Err(FetchError::Closed)) {
                break;
            }

            let now = Instant::now();
            match &result {
                Ok(_) => {
                    scheduler.on_success(now);
                }
                Err(_) => {
                    scheduler.on_failure(now);
                }
            }
            inner.complete(feed, seq, &result, Some(&scheduler));
            continue;
        }

        let wake = scheduler.next_wake();
        tokio::select! {
            _ = shutdown.changed() => break,
            command = commands.recv() => {
                let Some(mut command) = command else { break };
                // Several clicks while busy collapse into one poll
                while let Ok(next) = commands.try_recv() {
                    if next == FeedCommand::Refresh {
                        command = next;
                    }
                }
                if command == FeedCommand::Refresh {
                    full_reload = true;
                }
                tracing::debug!(feed = feed.name(), ?command, "manual poll");
                scheduler.manual_retry();
                inner.clear_error(feed);
                inner.record_schedule(feed, &scheduler);
            }
            _ = async {
                match wake {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            } => {
                if scheduler.on_timer(Instant::now()) {
                    inner.record_schedule(feed, &scheduler);
                }
            }
        }
    }

    scheduler.stop();
    tracing::debug!(feed = feed.name(), "feed task stopped");
}
