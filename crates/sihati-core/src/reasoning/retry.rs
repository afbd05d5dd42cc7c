use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use super::{
    ExtractionRequest, OverlapRequest, RawResponse, ReasoningService, ServiceError, ServiceResult,
};

/// Bounded exponential backoff for transient reasoning-service failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    /// Upper bound of the random delay added to every backoff
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 750,
            max_delay_ms: 5000,
            multiplier: 1.75,
            jitter_ms: 250,
        }
    }
}

impl RetryPolicy {
    /// Policy that gives up after the first failure.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff before retry number `attempt` (1-based), without jitter.
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let millis = (self.initial_delay_ms as f64) * self.multiplier.max(1.0).powi(exponent);
        let capped = millis.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    fn delay(&self, attempt: u32) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=self.jitter_ms)
        };
        self.base_delay(attempt) + Duration::from_millis(jitter)
    }
}

/// Wraps a [`ReasoningService`] with a per-attempt deadline and retries of
/// transient failures.
pub struct GuardedService<S> {
    inner: S,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl<S: ReasoningService> GuardedService<S> {
    #[must_use]
    pub fn new(inner: S, policy: RetryPolicy, attempt_timeout: Duration) -> Self {
        Self {
            inner,
            policy,
            attempt_timeout,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn call<F, Fut>(&self, operation: &'static str, mut request: F) -> ServiceResult<RawResponse>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = ServiceResult<RawResponse>> + Send,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let outcome = match tokio::time::timeout(self.attempt_timeout, request()).await {
                Ok(result) => result,
                Err(_) => Err(ServiceError::Timeout(self.attempt_timeout)),
            };

            match outcome {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.policy.delay(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Reasoning request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::warn!(operation, attempt, error = %err, "Reasoning request failed");
                    return Err(err);
                }
            }
        }
    }
}

#[async_trait]
impl<S: ReasoningService> ReasoningService for GuardedService<S> {
    fn model(&self) -> Option<&str> {
        self.inner.model()
    }

    async fn extract(&self, request: &ExtractionRequest<'_>) -> ServiceResult<RawResponse> {
        let inner = &self.inner;
        self.call("extract", move || inner.extract(request)).await
    }

    async fn analyze_overlap(&self, request: &OverlapRequest<'_>) -> ServiceResult<RawResponse> {
        let inner = &self.inner;
        self.call("analyze_overlap", move || inner.analyze_overlap(request))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        error: fn() -> ServiceError,
    }

    impl Flaky {
        fn new(failures: u32, error: fn() -> ServiceError) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                error,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        fn respond(&self) -> ServiceResult<RawResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err((self.error)())
            } else {
                Ok(RawResponse::new("{}"))
            }
        }
    }

    #[async_trait]
    impl ReasoningService for Flaky {
        async fn extract(&self, _request: &ExtractionRequest<'_>) -> ServiceResult<RawResponse> {
            self.respond()
        }

        async fn analyze_overlap(&self, _request: &OverlapRequest<'_>) -> ServiceResult<RawResponse> {
            self.respond()
        }
    }

    struct Hanging;

    #[async_trait]
    impl ReasoningService for Hanging {
        async fn extract(&self, _request: &ExtractionRequest<'_>) -> ServiceResult<RawResponse> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(RawResponse::new("{}"))
        }

        async fn analyze_overlap(&self, _request: &OverlapRequest<'_>) -> ServiceResult<RawResponse> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(RawResponse::new("{}"))
        }
    }

    fn unavailable() -> ServiceError {
        ServiceError::Status {
            status: 503,
            body: "overloaded".into(),
        }
    }

    fn bad_request() -> ServiceError {
        ServiceError::Status {
            status: 400,
            body: "bad".into(),
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.base_delay(1), Duration::from_millis(750));
        assert_eq!(policy.base_delay(2), Duration::from_millis(1312));
        assert_eq!(policy.base_delay(3), Duration::from_millis(2296));
        assert_eq!(policy.base_delay(10), Duration::from_millis(5000));
    }

    #[test]
    fn test_jitter_is_bounded() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let delay = policy.delay(1);
            assert!(delay >= Duration::from_millis(750));
            assert!(delay <= Duration::from_millis(1000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried() {
        let service = GuardedService::new(
            Flaky::new(2, unavailable),
            RetryPolicy::default(),
            Duration::from_secs(30),
        );

        let result = service.analyze_overlap(&OverlapRequest { records: &[] }).await;

        assert!(result.is_ok());
        assert_eq!(service.inner().calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let service = GuardedService::new(
            Flaky::new(10, unavailable),
            RetryPolicy::default(),
            Duration::from_secs(30),
        );

        let result = service.analyze_overlap(&OverlapRequest { records: &[] }).await;

        assert!(matches!(result, Err(ServiceError::Status { status: 503, .. })));
        assert_eq!(service.inner().calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failures_are_not_retried() {
        let service = GuardedService::new(
            Flaky::new(1, bad_request),
            RetryPolicy::default(),
            Duration::from_secs(30),
        );

        let result = service.analyze_overlap(&OverlapRequest { records: &[] }).await;

        assert!(result.is_err());
        assert_eq!(service.inner().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout() {
        let service = GuardedService::new(Hanging, RetryPolicy::none(), Duration::from_secs(5));
        let sources = Vec::new();
        let request = ExtractionRequest {
            entity_name: "BPS",
            source_documents: &sources,
            excerpt: "",
        };

        let result = service.extract(&request).await;

        assert!(matches!(result, Err(ServiceError::Timeout(d)) if d == Duration::from_secs(5)));
    }
}
