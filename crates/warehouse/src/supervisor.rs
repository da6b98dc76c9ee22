//! Startup connection supervision.
//!
//! The primary target is tried exactly once as a fast-path probe. After that
//! the fallback target is retried with exponential backoff until it connects,
//! a non-transient error occurs, or the elapsed budget runs out.

use crate::WarehouseError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Backoff parameters for the fallback retry loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    /// Total time budget measured from the first fallback attempt.
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(60),
            max_elapsed: Duration::from_secs(30 * 60),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero based), capped at `max_interval`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.initial_interval
            .saturating_mul(factor)
            .min(self.max_interval)
    }
}

pub struct ConnectionSupervisor {
    policy: RetryPolicy,
}

impl ConnectionSupervisor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Connect through `connector`, first to `primary` then to `fallback`.
    ///
    /// When no fallback is given the primary target is reused for the retry
    /// loop. Fails with [`WarehouseError::Exhausted`] once the elapsed budget
    /// is spent, or with the original error when it is not transient.
    pub async fn connect<T, F, Fut>(
        &self,
        primary: &str,
        fallback: Option<&str>,
        mut connector: F,
    ) -> Result<T, WarehouseError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, WarehouseError>>,
    {
        match connector(primary.to_string()).await {
            Ok(handle) => {
                info!(target = %redact(primary), "Connected to primary store");
                return Ok(handle);
            }
            Err(e) => {
                warn!(target = %redact(primary), error = %e, "Primary store unavailable, switching to fallback");
            }
        }

        let target = fallback.unwrap_or(primary);
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match connector(target.to_string()).await {
                Ok(handle) => {
                    info!(target = %redact(target), attempts, "Connected to fallback store");
                    return Ok(handle);
                }
                Err(e) if !e.is_transient() => {
                    error!(target = %redact(target), error = %e, "Non-transient store error, giving up");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.policy.delay_for(attempts - 1);
                    if started.elapsed() + delay > self.policy.max_elapsed {
                        error!(attempts, error = %e, "Store connection retries exhausted");
                        return Err(WarehouseError::Exhausted {
                            attempts,
                            last: Box::new(e),
                        });
                    }
                    warn!(
                        target = %redact(target),
                        error = %e,
                        attempts,
                        "Store connection failed, retrying in {:.1}s",
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Strip credentials from a connection URL before logging it.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            format!("{}://***{}", &url[..scheme], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    fn transient() -> WarehouseError {
        WarehouseError::Sqlx(sqlx::Error::Io(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "refused",
        )))
    }

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(4),
            max_elapsed: Duration::from_millis(200),
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(1),
            max_elapsed: Duration::from_secs(60),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for(4), Duration::from_secs(1));
        assert_eq!(policy.delay_for(40), Duration::from_secs(1));
    }

    #[test]
    fn test_redact_hides_credentials() {
        assert_eq!(redact("postgres://user:pw@db:5432/x"), "postgres://***@db:5432/x");
        assert_eq!(redact("sqlite://spread.db"), "sqlite://spread.db");
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = calls.clone();
        let supervisor = ConnectionSupervisor::new(quick_policy());

        let handle = supervisor
            .connect("primary", Some("fallback"), |target| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(target.clone());
                    Ok::<_, WarehouseError>(target)
                }
            })
            .await
            .unwrap();

        assert_eq!(handle, "primary");
        assert_eq!(*calls.lock().unwrap(), vec!["primary".to_string()]);
    }

    #[tokio::test]
    async fn test_fallback_retried_until_success() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = calls.clone();
        let supervisor = ConnectionSupervisor::new(quick_policy());

        let handle = supervisor
            .connect("primary", Some("fallback"), |target| {
                let seen = seen.clone();
                async move {
                    let n = {
                        let mut guard = seen.lock().unwrap();
                        guard.push(target.clone());
                        guard.len()
                    };
                    if n < 4 {
                        Err(transient())
                    } else {
                        Ok(target)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(handle, "fallback");
        let calls = calls.lock().unwrap();
        assert_eq!(calls[0], "primary");
        assert!(calls[1..].iter().all(|t| t == "fallback"));
        assert_eq!(calls.len(), 4);
    }

    #[tokio::test]
    async fn test_non_transient_error_is_fatal_immediately() {
        let calls = Arc::new(Mutex::new(0u32));
        let seen = calls.clone();
        let supervisor = ConnectionSupervisor::new(quick_policy());

        let result: Result<(), _> = supervisor
            .connect("primary", Some("fallback"), |_| {
                let seen = seen.clone();
                async move {
                    *seen.lock().unwrap() += 1;
                    Err(WarehouseError::Sqlx(sqlx::Error::Configuration("bad url".into())))
                }
            })
            .await;

        assert!(matches!(result, Err(WarehouseError::Sqlx(sqlx::Error::Configuration(_)))));
        // Primary probe plus a single fallback attempt.
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_attempts() {
        let supervisor = ConnectionSupervisor::new(RetryPolicy {
            initial_interval: Duration::from_millis(5),
            max_interval: Duration::from_millis(5),
            max_elapsed: Duration::from_millis(30),
        });

        let result: Result<(), _> = supervisor
            .connect("primary", None, |_| async { Err(transient()) })
            .await;

        match result {
            Err(WarehouseError::Exhausted { attempts, last }) => {
                assert!(attempts >= 2);
                assert!(last.is_transient());
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }
}
