use crate::error::{ServiceError, ServiceResult};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};

lazy_static! {
    /// Social mutations by action (post, like, unlike, comment, delete_comment, upload)
    /// and outcome (ok, rejected, error).
    pub static ref SOCIAL_ACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "social_actions_total",
        "Social mutations segmented by action and outcome",
        &["action", "outcome"]
    )
    .expect("failed to register social_actions_total");

    /// Feed reads served from degraded data (placeholder, bare).
    pub static ref FEED_FALLBACK_TOTAL: IntCounterVec = register_int_counter_vec!(
        "feed_fallback_total",
        "Feed reads answered with fallback content segmented by reason",
        &["reason"]
    )
    .expect("failed to register feed_fallback_total");

    /// Like inserts that lost a race to a concurrent identical insert.
    pub static ref LIKE_TOGGLE_RACES_TOTAL: IntCounter = register_int_counter!(
        "like_toggle_races_total",
        "Like toggles resolved through a unique-constraint conflict"
    )
    .expect("failed to register like_toggle_races_total");

    /// Time spent composing a feed page.
    pub static ref FEED_COMPOSE_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "feed_compose_duration_seconds",
        "Feed composition duration segmented by view",
        &["view"]
    )
    .expect("failed to register feed_compose_duration_seconds");
}

pub fn record_action(action: &str, outcome: &str) {
    SOCIAL_ACTIONS_TOTAL
        .with_label_values(&[action, outcome])
        .inc();
}

pub fn record_fallback(reason: &str) {
    FEED_FALLBACK_TOTAL.with_label_values(&[reason]).inc();
}

/// Outcome label for a finished mutation: caller mistakes are "rejected",
/// backend failures are "error".
pub fn outcome<T>(result: &ServiceResult<T>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(ServiceError::Store(_)) | Err(ServiceError::Storage(_)) => "error",
        Err(_) => "rejected",
    }
}
