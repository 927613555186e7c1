//! # Eventual-Consistency Polling
//!
//! The ingest service provisions upload areas and accessions files
//! asynchronously and never pushes a notification, so the client polls with a
//! fixed delay until the awaited field shows up.
//!
//! [`poll_until`] only retries *absence*. A probe that fails (transport error,
//! non-2xx status) propagates immediately; nothing wraps the whole request in a
//! retry.

use crate::framework::FrameworkError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// How often to re-check, and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` keeps polling until the field appears or the actor is stopped.
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    /// File accessioning: 0.5 s between attempts.
    pub const ACCESSIONING: PollPolicy = PollPolicy::unbounded(Duration::from_millis(500));

    /// Upload-area provisioning: 3 s between attempts.
    pub const UPLOAD_AREA: PollPolicy = PollPolicy::unbounded(Duration::from_secs(3));

    pub const fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    pub const fn bounded(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: Some(max_attempts),
        }
    }

    pub fn with_max_attempts(self, max_attempts: Option<u32>) -> Self {
        Self {
            max_attempts,
            ..self
        }
    }
}

/// Calls `probe` until it yields a value, sleeping `policy.interval` after every
/// absent result.
///
/// `what` names the awaited field in logs and in [`FrameworkError::PollExhausted`].
pub async fn poll_until<T, E, F, Fut>(
    policy: PollPolicy,
    what: &'static str,
    mut probe: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
    E: From<FrameworkError>,
{
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        if let Some(value) = probe().await? {
            debug!(what, attempts, "Ready");
            return Ok(value);
        }

        if policy.max_attempts.is_some_and(|max| attempts >= max) {
            warn!(what, attempts, "Giving up");
            return Err(FrameworkError::PollExhausted { what, attempts }.into());
        }

        debug!(what, attempts, delay_ms = policy.interval.as_millis() as u64, "Not ready");
        tokio::time::sleep(policy.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[derive(Debug, PartialEq)]
    enum ProbeError {
        Framework(FrameworkError),
        Boom,
    }

    impl From<FrameworkError> for ProbeError {
        fn from(e: FrameworkError) -> Self {
            ProbeError::Framework(e)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_after_k_absent_results_with_fixed_delay() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let value: Result<&str, ProbeError> = poll_until(PollPolicy::UPLOAD_AREA, "upload area", || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(if call == 3 { Some("ready") } else { None }) }
        })
        .await;

        assert_eq!(value, Ok("ready"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_policy_gives_up() {
        let calls = AtomicU32::new(0);
        let policy = PollPolicy::bounded(Duration::from_millis(500), 3);

        let value: Result<(), ProbeError> = poll_until(policy, "uuid", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(None) }
        })
        .await;

        assert_eq!(
            value,
            Err(ProbeError::Framework(FrameworkError::PollExhausted {
                what: "uuid",
                attempts: 3
            }))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_error_is_not_retried() {
        let calls = AtomicU32::new(0);

        let value: Result<(), ProbeError> = poll_until(PollPolicy::ACCESSIONING, "uuid", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ProbeError::Boom) }
        })
        .await;

        assert_eq!(value, Err(ProbeError::Boom));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_with_max_attempts_keeps_interval() {
        let policy = PollPolicy::ACCESSIONING.with_max_attempts(Some(10));
        assert_eq!(policy, PollPolicy::bounded(Duration::from_millis(500), 10));
        assert_eq!(PollPolicy::UPLOAD_AREA.max_attempts, None);
    }
}
