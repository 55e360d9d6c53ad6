/// Prometheus metrics for suggestion generation
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter_vec, Histogram, IntCounterVec,
};

static SUGGESTION_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "suggestion_requests_total",
        "Total number of people-you-may-know requests by outcome",
        &["outcome"]
    )
    .expect("Failed to register suggestion requests metric")
});

static SIGNAL_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "suggestion_signal_failures_total",
        "Signal collectors that failed or timed out, by signal",
        &["signal"]
    )
    .expect("Failed to register signal failures metric")
});

static REQUEST_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "suggestion_request_duration_seconds",
        "End-to-end latency of a suggestion request",
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register suggestion duration metric")
});

static CANDIDATES_RETURNED: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "suggestion_candidates_returned",
        "Number of suggestions returned per request",
        vec![0.0, 1.0, 5.0, 10.0, 20.0, 50.0, 100.0]
    )
    .expect("Failed to register candidates returned metric")
});

/// Request outcome label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Empty,
    Error,
    CacheHit,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Empty => "empty",
            Outcome::Error => "error",
            Outcome::CacheHit => "cache_hit",
        }
    }
}

/// Metrics collector for the suggestion engine
pub struct SuggestionMetrics;

impl SuggestionMetrics {
    pub fn record_request(outcome: Outcome, duration_secs: f64, returned: usize) {
        SUGGESTION_REQUESTS
            .with_label_values(&[outcome.as_str()])
            .inc();
        REQUEST_DURATION.observe(duration_secs);
        if outcome != Outcome::Error {
            CANDIDATES_RETURNED.observe(returned as f64);
        }
    }

    pub fn record_signal_failure(signal: &str) {
        SIGNAL_FAILURES.with_label_values(&[signal]).inc();
    }

    #[cfg(test)]
    pub fn requests(outcome: Outcome) -> u64 {
        SUGGESTION_REQUESTS
            .with_label_values(&[outcome.as_str()])
            .get()
    }

    #[cfg(test)]
    pub fn signal_failures(signal: &str) -> u64 {
        SIGNAL_FAILURES.with_label_values(&[signal]).get()
    }
}
