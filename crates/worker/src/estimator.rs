//! Failure-risk estimation with a bounded evaluation budget.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lathe_core::process::Reading;
use lathe_core::scoring::{FallbackScorer, Scorer};

/// Default evaluation budget for a trained scorer.
pub const DEFAULT_SCORER_TIMEOUT: Duration = Duration::from_millis(250);

/// Consecutive timeouts after which the trained scorer is no longer called.
pub const MAX_CONSECUTIVE_TIMEOUTS: u32 = 3;

/// Wraps the process-wide [`Scorer`].
///
/// A trained scorer runs on the blocking pool under a timeout. Errors,
/// panics, timeouts and probabilities outside `[0, 1]` all degrade to a
/// fallback draw in `[0, 0.3]`, so [`estimate`](Self::estimate) always
/// returns promptly with a valid probability.
///
/// A timed-out evaluation cannot be cancelled and keeps its blocking
/// thread until the scorer returns. After [`MAX_CONSECUTIVE_TIMEOUTS`] in a
/// row the trained scorer is disabled for the life of the process, so a
/// hung model holds at most that many threads.
pub struct RiskEstimator {
    scorer: Arc<dyn Scorer>,
    timeout: Duration,
    consecutive_timeouts: AtomicU32,
}

impl RiskEstimator {
    pub fn new(scorer: Arc<dyn Scorer>, timeout: Duration) -> Self {
        Self {
            scorer,
            timeout,
            consecutive_timeouts: AtomicU32::new(0),
        }
    }

    /// Estimator that always uses the uniform-random fallback.
    pub fn fallback() -> Self {
        Self::new(Arc::new(FallbackScorer), DEFAULT_SCORER_TIMEOUT)
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    /// Whether the trained scorer was disabled after repeated timeouts.
    pub fn scorer_disabled(&self) -> bool {
        self.consecutive_timeouts.load(Ordering::Relaxed) >= MAX_CONSECUTIVE_TIMEOUTS
    }

    /// Failure probability for one reading.
    pub async fn estimate(&self, reading: &Reading) -> f64 {
        if self.scorer.is_fallback() || self.scorer_disabled() {
            return FallbackScorer::draw();
        }

        let scorer = Arc::clone(&self.scorer);
        let features = reading.features();
        let evaluation = tokio::task::spawn_blocking(move || scorer.predict(&features));

        let outcome = tokio::time::timeout(self.timeout, evaluation).await;
        if outcome.is_ok() {
            self.consecutive_timeouts.store(0, Ordering::Relaxed);
        }

        match outcome {
            Ok(Ok(Ok(p))) if p.is_finite() && (0.0..=1.0).contains(&p) => p,
            Ok(Ok(Ok(p))) => {
                tracing::warn!(probability = p, "Scorer returned an out-of-range value, using fallback");
                FallbackScorer::draw()
            }
            Ok(Ok(Err(e))) => {
                tracing::warn!(error = %e, scorer = self.scorer.name(), "Scorer failed, using fallback");
                FallbackScorer::draw()
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Scorer task panicked, using fallback");
                FallbackScorer::draw()
            }
            Err(_) => {
                let timeouts = self.consecutive_timeouts.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    consecutive_timeouts = timeouts,
                    "Scorer exceeded its evaluation budget, using fallback"
                );
                if timeouts == MAX_CONSECUTIVE_TIMEOUTS {
                    tracing::error!(
                        scorer = self.scorer.name(),
                        "Scorer keeps timing out, disabling it in favour of the fallback"
                    );
                }
                FallbackScorer::draw()
            }
        }
    }
}
