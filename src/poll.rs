//! Fixed-interval polling of remote jobs.
//!
//! Both the transcription result and the lip-sync render are asynchronous on
//! the remote side. Each poll step reports one of three outcomes and the loop
//! below decides whether to sleep, stop, or fail.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{DubError, Result};

/// Outcome of a single poll.
#[derive(Debug)]
pub enum PollStatus<T> {
    /// Terminal success
    Done(T),
    /// Still running; carries the remote status for logging
    Pending(String),
    /// Terminal failure
    Failed(DubError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls until the remote side reaches a terminal state
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: Option<u32>) -> Self {
        Self { interval, max_attempts }
    }
}

/// Call `step` until it returns `Done` or `Failed`, sleeping `policy.interval`
/// between pending results. No backoff.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    policy: PollPolicy,
    cancel: &CancellationToken,
    mut step: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollStatus<T>>>,
{
    let mut attempts: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(DubError::Cancelled);
        }

        attempts += 1;
        debug!("Polling {} (attempt {})", what, attempts);

        match step().await? {
            PollStatus::Done(value) => {
                debug!("{} finished after {} polls", what, attempts);
                return Ok(value);
            }
            PollStatus::Failed(error) => return Err(error),
            PollStatus::Pending(status) => {
                info!("{} status: {}", what, status);
            }
        }

        if let Some(max) = policy.max_attempts {
            if attempts >= max {
                return Err(DubError::PollExhausted {
                    what: what.to_string(),
                    attempts,
                });
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(DubError::Cancelled),
            _ = tokio::time::sleep(policy.interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn fast(max_attempts: Option<u32>) -> PollPolicy {
        PollPolicy::new(Duration::from_millis(1), max_attempts)
    }

    #[tokio::test]
    async fn test_poll_returns_value_after_pending() {
        let mut script: VecDeque<PollStatus<&str>> = VecDeque::from([
            PollStatus::Pending("queued".to_string()),
            PollStatus::Pending("processing".to_string()),
            PollStatus::Done("finished"),
        ]);
        let mut calls = 0;

        let value = poll_until("job", fast(None), &CancellationToken::new(), || {
            calls += 1;
            let next = script.pop_front().expect("script exhausted");
            async move { Ok(next) }
        })
        .await
        .unwrap();

        assert_eq!(value, "finished");
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_poll_stops_on_failure() {
        let result: Result<()> = poll_until("job", fast(None), &CancellationToken::new(), || async {
            Ok(PollStatus::Failed(DubError::LipSync("render failed".to_string())))
        })
        .await;

        assert!(matches!(result, Err(DubError::LipSync(_))));
    }

    #[tokio::test]
    async fn test_poll_gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: Result<()> = poll_until("job", fast(Some(3)), &CancellationToken::new(), || {
            calls += 1;
            async { Ok(PollStatus::Pending("processing".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(DubError::PollExhausted { attempts: 3, .. })));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_poll_propagates_step_errors() {
        let result: Result<()> = poll_until("job", fast(None), &CancellationToken::new(), || async {
            Err(DubError::Transcription("malformed".to_string()))
        })
        .await;

        assert!(matches!(result, Err(DubError::Transcription(_))));
    }

    #[tokio::test]
    async fn test_poll_honours_cancellation() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let policy = PollPolicy::new(Duration::from_secs(3600), None);

        let handle = tokio::spawn(async move {
            poll_until::<(), _, _>("job", policy, &cancel, || async {
                Ok(PollStatus::Pending("processing".to_string()))
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(DubError::Cancelled)));
    }
}
