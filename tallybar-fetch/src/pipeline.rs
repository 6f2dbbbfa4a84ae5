//! Fetch pipeline for executing a strategy chain.
//!
//! The pipeline runs strategies strictly in the order it was given. The
//! first success wins. Unavailable strategies are skipped, and a failing
//! strategy decides through `should_fallback` whether the chain goes on.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tallybar_core::{ProviderKind, UsageSnapshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::context::{FetchSettings, ProviderFetchContext};
use crate::error::PipelineError;
use crate::strategy::{FetchKind, FetchStrategy, StrategyInfo};

// ============================================================================
// Fetch Attempt
// ============================================================================

/// What happened to one strategy during a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// `is_available` returned false.
    Skipped {
        /// Why the strategy was skipped.
        reason: String,
    },
    /// `fetch` returned an error.
    Failed {
        /// The error message.
        error: String,
    },
    /// The attempt ran out of time.
    TimedOut,
    /// `fetch` returned a snapshot.
    Succeeded,
}

/// Record of a single fetch attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchAttempt {
    /// The strategy ID that was attempted.
    pub strategy_id: String,
    /// The kind of fetch used.
    pub kind: FetchKind,
    /// What happened.
    pub outcome: AttemptOutcome,
    /// How long the attempt took.
    pub duration: Duration,
}

impl FetchAttempt {
    fn new(
        strategy_id: impl Into<String>,
        kind: FetchKind,
        outcome: AttemptOutcome,
        duration: Duration,
    ) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            kind,
            outcome,
            duration,
        }
    }

    /// Returns true if the attempt produced the result.
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Succeeded)
    }

    /// Returns true if the strategy was skipped.
    pub fn skipped(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Skipped { .. })
    }

    /// Returns the error message for failed attempts.
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            AttemptOutcome::Failed { error } => Some(error),
            _ => None,
        }
    }
}

// ============================================================================
// Fetch Options
// ============================================================================

/// Per-call execution limits.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Budget for the whole call.
    pub deadline: Option<Duration>,
    /// Budget for a single strategy.
    pub attempt_timeout: Option<Duration>,
    /// Cooperative cancellation.
    pub cancel: Option<CancellationToken>,
    /// Continue with the next strategy when an attempt times out.
    pub fallback_on_timeout: bool,
}

impl FetchOptions {
    /// Creates options with no limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options from fetch settings.
    pub fn from_settings(settings: &FetchSettings) -> Self {
        Self {
            deadline: settings.default_deadline,
            ..Self::default()
        }
    }

    /// Sets the overall deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the per-attempt timeout.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = Some(timeout);
        self
    }

    /// Sets the cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Allows falling back after a timed-out attempt.
    pub fn with_fallback_on_timeout(mut self, enabled: bool) -> Self {
        self.fallback_on_timeout = enabled;
        self
    }
}

// ============================================================================
// Provider Fetch Result
// ============================================================================

/// A successful pipeline run.
#[derive(Debug, Clone)]
pub struct ProviderFetchResult {
    /// Provider that was fetched.
    pub provider: ProviderKind,
    /// The normalized snapshot, with `source` stamped.
    pub snapshot: UsageSnapshot,
    /// The strategy that produced it.
    pub strategy_id: String,
    /// That strategy's kind.
    pub kind: FetchKind,
    /// That strategy's source label.
    pub source_label: String,
    /// Every attempt in chain order, ending with the success.
    pub attempts: Vec<FetchAttempt>,
    /// Total time spent.
    pub duration: Duration,
}

impl ProviderFetchResult {
    /// Attempts that did not produce the result.
    pub fn prior_attempts(&self) -> &[FetchAttempt] {
        let end = self.attempts.len().saturating_sub(1);
        &self.attempts[..end]
    }
}

// ============================================================================
// Bounded Execution
// ============================================================================

enum Bounded<T> {
    Done(T),
    Expired,
    Cancelled,
}

/// Runs a future until it finishes, the deadline passes or the token fires.
async fn bounded<F: Future>(
    fut: F,
    deadline: Option<Instant>,
    cancel: Option<&CancellationToken>,
) -> Bounded<F::Output> {
    let cancelled = async {
        match cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    };
    let expired = async {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        () = cancelled => Bounded::Cancelled,
        () = expired => Bounded::Expired,
        out = fut => Bounded::Done(out),
    }
}

fn attempt_deadline(
    overall: Option<Instant>,
    attempt_timeout: Option<Duration>,
    attempt_start: Instant,
) -> Option<Instant> {
    let per_attempt = attempt_timeout.map(|t| attempt_start + t);
    match (overall, per_attempt) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

// ============================================================================
// Fetch Pipeline
// ============================================================================

/// A chain of fetch strategies tried in order.
pub struct FetchPipeline {
    provider: ProviderKind,
    strategies: Vec<Arc<dyn FetchStrategy>>,
}

impl FetchPipeline {
    /// Creates a pipeline. The order of `strategies` is the fallback chain.
    pub fn new(provider: ProviderKind, strategies: Vec<Arc<dyn FetchStrategy>>) -> Self {
        Self {
            provider,
            strategies,
        }
    }

    /// Returns the number of strategies in the pipeline.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Returns true if the pipeline is empty.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Strategy IDs in chain order.
    pub fn strategy_ids(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    /// Returns information about all strategies.
    pub async fn strategy_info(&self, ctx: &ProviderFetchContext) -> Vec<StrategyInfo> {
        let mut info = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            info.push(StrategyInfo::from_strategy(strategy.as_ref(), ctx).await);
        }
        info
    }

    /// Runs the chain until a strategy succeeds.
    #[instrument(
        skip(self, ctx, options),
        fields(provider = %self.provider, mode = %ctx.source_mode, strategies = self.strategies.len())
    )]
    pub async fn run(
        &self,
        ctx: &ProviderFetchContext,
        options: &FetchOptions,
    ) -> Result<ProviderFetchResult, PipelineError> {
        let start = Instant::now();
        let deadline = options.deadline.map(|d| start + d);
        let cancel = options.cancel.as_ref();
        let mut attempts = Vec::with_capacity(self.strategies.len());

        if self.strategies.is_empty() {
            return Err(PipelineError::NoStrategiesResolved {
                provider: self.provider,
                mode: ctx.source_mode,
            });
        }

        info!("Executing fetch pipeline");

        for strategy in &self.strategies {
            let strategy_id = strategy.id();
            let kind = strategy.kind();
            let attempt_start = Instant::now();
            let limit = attempt_deadline(deadline, options.attempt_timeout, attempt_start);

            debug!(strategy = %strategy_id, kind = %kind, "Checking strategy availability");

            let available = match bounded(strategy.is_available(ctx), limit, cancel).await {
                Bounded::Done(available) => available,
                Bounded::Cancelled => return Err(self.cancelled(attempts)),
                Bounded::Expired => {
                    attempts.push(FetchAttempt::new(
                        strategy_id,
                        kind,
                        AttemptOutcome::TimedOut,
                        attempt_start.elapsed(),
                    ));
                    if self.continue_after_timeout(deadline, options) {
                        continue;
                    }
                    return Err(self.timed_out(strategy_id, start, attempts));
                }
            };

            if !available {
                debug!(strategy = %strategy_id, "Strategy not available, skipping");
                attempts.push(FetchAttempt::new(
                    strategy_id,
                    kind,
                    AttemptOutcome::Skipped {
                        reason: "not available".to_string(),
                    },
                    attempt_start.elapsed(),
                ));
                continue;
            }

            debug!(strategy = %strategy_id, "Executing strategy");

            let outcome = match bounded(strategy.fetch(ctx), limit, cancel).await {
                Bounded::Done(outcome) => outcome,
                Bounded::Cancelled => return Err(self.cancelled(attempts)),
                Bounded::Expired => {
                    warn!(strategy = %strategy_id, elapsed = ?attempt_start.elapsed(), "Strategy timed out");
                    attempts.push(FetchAttempt::new(
                        strategy_id,
                        kind,
                        AttemptOutcome::TimedOut,
                        attempt_start.elapsed(),
                    ));
                    if self.continue_after_timeout(deadline, options) {
                        continue;
                    }
                    return Err(self.timed_out(strategy_id, start, attempts));
                }
            };

            let duration = attempt_start.elapsed();
            match outcome {
                Ok(mut snapshot) => {
                    if let Err(e) = snapshot.validate() {
                        warn!(strategy = %strategy_id, error = %e, "Clamping invalid snapshot values");
                        snapshot.sanitize();
                    }
                    let source_label = strategy.source_label();
                    snapshot.source = source_label.to_string();

                    info!(strategy = %strategy_id, duration = ?duration, "Strategy succeeded");
                    attempts.push(FetchAttempt::new(
                        strategy_id,
                        kind,
                        AttemptOutcome::Succeeded,
                        duration,
                    ));

                    return Ok(ProviderFetchResult {
                        provider: self.provider,
                        snapshot,
                        strategy_id: strategy_id.to_string(),
                        kind,
                        source_label: source_label.to_string(),
                        attempts,
                        duration: start.elapsed(),
                    });
                }
                Err(error) => {
                    warn!(
                        strategy = %strategy_id,
                        error = %error,
                        duration = ?duration,
                        "Strategy failed"
                    );
                    attempts.push(FetchAttempt::new(
                        strategy_id,
                        kind,
                        AttemptOutcome::Failed {
                            error: error.to_string(),
                        },
                        duration,
                    ));

                    if !strategy.should_fallback(&error, ctx) {
                        debug!(strategy = %strategy_id, "Strategy indicates no fallback");
                        return Err(PipelineError::Strategy {
                            strategy_id: strategy_id.to_string(),
                            error,
                            attempts,
                        });
                    }
                }
            }
        }

        warn!(attempts = attempts.len(), "All strategies exhausted");
        Err(PipelineError::AllStrategiesExhausted {
            provider: self.provider,
            attempts,
        })
    }

    fn continue_after_timeout(&self, deadline: Option<Instant>, options: &FetchOptions) -> bool {
        options.fallback_on_timeout && deadline.is_none_or(|at| Instant::now() < at)
    }

    fn timed_out(
        &self,
        strategy_id: &str,
        start: Instant,
        attempts: Vec<FetchAttempt>,
    ) -> PipelineError {
        PipelineError::Timeout {
            provider: self.provider,
            strategy_id: Some(strategy_id.to_string()),
            elapsed: start.elapsed(),
            attempts,
        }
    }

    fn cancelled(&self, attempts: Vec<FetchAttempt>) -> PipelineError {
        info!(provider = %self.provider, "Fetch cancelled");
        PipelineError::Cancelled {
            provider: self.provider,
            attempts,
        }
    }
}

impl std::fmt::Debug for FetchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchPipeline")
            .field("provider", &self.provider)
            .field("strategies", &self.strategy_ids())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Environment;
    use crate::error::FetchError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tallybar_core::UsageWindow;

    enum Behavior {
        Succeed(f64),
        Fail { fallback: bool },
        Hang,
    }

    struct StubStrategy {
        id: &'static str,
        kind: FetchKind,
        available: bool,
        behavior: Behavior,
        fetch_calls: AtomicUsize,
        fallback_calls: AtomicUsize,
    }

    impl StubStrategy {
        fn new(id: &'static str, behavior: Behavior) -> Arc<Self> {
            Self::with(id, FetchKind::ApiToken, true, behavior)
        }

        fn with(id: &'static str, kind: FetchKind, available: bool, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                id,
                kind,
                available,
                behavior,
                fetch_calls: AtomicUsize::new(0),
                fallback_calls: AtomicUsize::new(0),
            })
        }

        fn fetches(&self) -> usize {
            self.fetch_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FetchStrategy for StubStrategy {
        fn id(&self) -> &str {
            self.id
        }

        fn kind(&self) -> FetchKind {
            self.kind
        }

        async fn is_available(&self, _ctx: &ProviderFetchContext) -> bool {
            self.available
        }

        async fn fetch(&self, _ctx: &ProviderFetchContext) -> Result<UsageSnapshot, FetchError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed(weekly) => {
                    let mut snapshot = UsageSnapshot::new();
                    snapshot.weekly = Some(UsageWindow::new(weekly));
                    Ok(snapshot)
                }
                Behavior::Fail { .. } => Err(FetchError::InvalidResponse("stub".to_string())),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(FetchError::InvalidResponse("unreachable".to_string()))
                }
            }
        }

        fn should_fallback(&self, _error: &FetchError, _ctx: &ProviderFetchContext) -> bool {
            self.fallback_calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Fail { fallback } => fallback,
                _ => true,
            }
        }
    }

    fn ctx() -> ProviderFetchContext {
        ProviderFetchContext::builder(ProviderKind::Warp)
            .env(Environment::new())
            .build()
    }

    fn pipeline(strategies: Vec<Arc<StubStrategy>>) -> FetchPipeline {
        FetchPipeline::new(
            ProviderKind::Warp,
            strategies
                .into_iter()
                .map(|s| s as Arc<dyn FetchStrategy>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_empty_pipeline() {
        let result = pipeline(vec![]).run(&ctx(), &FetchOptions::new()).await;
        assert!(matches!(
            result,
            Err(PipelineError::NoStrategiesResolved { .. })
        ));
    }

    #[tokio::test]
    async fn test_single_success_stamps_source() {
        let s1 = StubStrategy::new("test.api", Behavior::Succeed(7.0));
        let result = pipeline(vec![s1.clone()])
            .run(&ctx(), &FetchOptions::new())
            .await
            .unwrap();

        assert_eq!(result.strategy_id, "test.api");
        assert_eq!(result.snapshot.source, "api");
        assert_eq!(result.source_label, "api");
        assert_eq!(result.attempts.len(), 1);
        assert!(result.attempts[0].succeeded());
        assert!(result.prior_attempts().is_empty());
    }

    #[tokio::test]
    async fn test_first_success_after_recorded_failure() {
        let s1 = StubStrategy::new("test.first", Behavior::Fail { fallback: true });
        let s2 = StubStrategy::new("test.second", Behavior::Succeed(5.0));
        let s3 = StubStrategy::new("test.third", Behavior::Succeed(9.0));

        let result = pipeline(vec![s1.clone(), s2.clone(), s3.clone()])
            .run(&ctx(), &FetchOptions::new())
            .await
            .unwrap();

        assert_eq!(result.strategy_id, "test.second");
        assert_eq!(result.snapshot.weekly.as_ref().unwrap().used, 5.0);
        assert_eq!(result.prior_attempts().len(), 1);
        assert_eq!(result.attempts[0].error(), Some("Invalid response: stub"));
        assert_eq!(s3.fetches(), 0);
    }

    #[tokio::test]
    async fn test_fail_fast_keeps_strategy_error() {
        let s1 = StubStrategy::new("test.first", Behavior::Fail { fallback: false });
        let s2 = StubStrategy::new("test.second", Behavior::Succeed(5.0));

        let err = pipeline(vec![s1.clone(), s2.clone()])
            .run(&ctx(), &FetchOptions::new())
            .await
            .unwrap_err();

        match err {
            PipelineError::Strategy {
                strategy_id,
                error,
                attempts,
            } => {
                assert_eq!(strategy_id, "test.first");
                assert!(matches!(error, FetchError::InvalidResponse(_)));
                assert_eq!(attempts.len(), 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(s2.fetches(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_strategy_is_never_fetched() {
        let s1 = StubStrategy::with("test.local", FetchKind::LocalProbe, false, Behavior::Fail {
            fallback: false,
        });
        let s2 = StubStrategy::new("test.api", Behavior::Succeed(1.0));

        let result = pipeline(vec![s1.clone(), s2])
            .run(&ctx(), &FetchOptions::new())
            .await
            .unwrap();

        assert_eq!(result.strategy_id, "test.api");
        assert!(result.attempts[0].skipped());
        assert_eq!(s1.fetches(), 0);
        assert_eq!(s1.fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exhaustion_has_one_entry_per_strategy() {
        let s1 = StubStrategy::with("test.local", FetchKind::LocalProbe, false, Behavior::Succeed(1.0));
        let s2 = StubStrategy::new("test.api", Behavior::Fail { fallback: true });

        let err = pipeline(vec![s1, s2])
            .run(&ctx(), &FetchOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::AllStrategiesExhausted { .. }));
        let attempts = err.attempts();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].strategy_id, "test.local");
        assert!(attempts[0].skipped());
        assert_eq!(attempts[1].strategy_id, "test.api");
        assert!(attempts[1].error().is_some());
    }

    #[tokio::test]
    async fn test_deadline_reports_in_flight_strategy() {
        let s1 = StubStrategy::new("test.slow", Behavior::Hang);
        let s2 = StubStrategy::new("test.fast", Behavior::Succeed(1.0));

        let options = FetchOptions::new().with_deadline(Duration::from_millis(50));
        let err = pipeline(vec![s1, s2.clone()])
            .run(&ctx(), &options)
            .await
            .unwrap_err();

        match err {
            PipelineError::Timeout {
                strategy_id,
                attempts,
                ..
            } => {
                assert_eq!(strategy_id.as_deref(), Some("test.slow"));
                assert_eq!(attempts.len(), 1);
                assert_eq!(attempts[0].outcome, AttemptOutcome::TimedOut);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(s2.fetches(), 0);
    }

    #[tokio::test]
    async fn test_attempt_timeout_falls_back_when_enabled() {
        let s1 = StubStrategy::new("test.slow", Behavior::Hang);
        let s2 = StubStrategy::new("test.fast", Behavior::Succeed(2.0));

        let options = FetchOptions::new()
            .with_deadline(Duration::from_secs(10))
            .with_attempt_timeout(Duration::from_millis(50))
            .with_fallback_on_timeout(true);
        let result = pipeline(vec![s1, s2]).run(&ctx(), &options).await.unwrap();

        assert_eq!(result.strategy_id, "test.fast");
        assert_eq!(result.attempts[0].outcome, AttemptOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_attempt_timeout_without_fallback_is_terminal() {
        let s1 = StubStrategy::new("test.slow", Behavior::Hang);
        let s2 = StubStrategy::new("test.fast", Behavior::Succeed(2.0));

        let options = FetchOptions::new().with_attempt_timeout(Duration::from_millis(50));
        let err = pipeline(vec![s1, s2.clone()])
            .run(&ctx(), &options)
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(s2.fetches(), 0);
    }

    #[tokio::test]
    async fn test_cancellation() {
        let s1 = StubStrategy::new("test.slow", Behavior::Hang);
        let token = CancellationToken::new();
        let options = FetchOptions::new().with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = pipeline(vec![s1]).run(&ctx(), &options).await.unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(err, PipelineError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_already_cancelled_touches_nothing() {
        let s1 = StubStrategy::new("test.api", Behavior::Succeed(1.0));
        let token = CancellationToken::new();
        token.cancel();

        let err = pipeline(vec![s1.clone()])
            .run(&ctx(), &FetchOptions::new().with_cancellation(token))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Cancelled { .. }));
        assert_eq!(s1.fetches(), 0);
    }

    #[tokio::test]
    async fn test_invalid_values_are_clamped() {
        let s1 = StubStrategy::new("test.api", Behavior::Succeed(-4.0));
        let result = pipeline(vec![s1])
            .run(&ctx(), &FetchOptions::new())
            .await
            .unwrap();

        assert_eq!(result.snapshot.weekly.unwrap().used, 0.0);
    }

    #[test]
    fn test_attempt_outcome_serde() {
        let attempt = FetchAttempt::new(
            "warp.api",
            FetchKind::ApiToken,
            AttemptOutcome::Skipped {
                reason: "not available".to_string(),
            },
            Duration::ZERO,
        );
        let value = serde_json::to_value(&attempt).unwrap();
        assert_eq!(value["outcome"]["status"], "skipped");
        assert_eq!(value["outcome"]["reason"], "not available");
        assert_eq!(value["kind"], "api_token");
    }
}
