//! # Challenge Metrics
//!
//! Prometheus counters for the challenge lifecycle.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! storage-challenge = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `challenge_opened_total` - Challenges opened, by origin (random, submitted, heartbeat)
//! - `challenge_attested_total` - Attestations committed, by result
//! - `challenge_expired_total` - Challenges dropped at expiry
//! - `challenge_heartbeat_total` - Heartbeats attested
//! - `challenge_slash_amount_total` - Sum of slash amounts handed to the registry

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    pub static ref CHALLENGES_OPENED: IntCounterVec = register_int_counter_vec!(
        "challenge_opened_total",
        "Total number of challenges opened",
        &["origin"]
    )
    .expect("Failed to create CHALLENGES_OPENED metric");

    pub static ref CHALLENGES_ATTESTED: IntCounterVec = register_int_counter_vec!(
        "challenge_attested_total",
        "Total number of challenge attestations committed",
        &["result"]
    )
    .expect("Failed to create CHALLENGES_ATTESTED metric");

    pub static ref CHALLENGES_EXPIRED: IntCounter = register_int_counter!(
        "challenge_expired_total",
        "Total number of challenges that expired unattested"
    )
    .expect("Failed to create CHALLENGES_EXPIRED metric");

    pub static ref HEARTBEATS_ATTESTED: IntCounter = register_int_counter!(
        "challenge_heartbeat_total",
        "Total number of heartbeat challenges attested"
    )
    .expect("Failed to create HEARTBEATS_ATTESTED metric");

    /// Saturates at u64::MAX
    pub static ref SLASH_AMOUNT: IntCounter = register_int_counter!(
        "challenge_slash_amount_total",
        "Sum of slash amounts applied to storage operators"
    )
    .expect("Failed to create SLASH_AMOUNT metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

#[cfg(feature = "metrics")]
pub fn record_challenge_opened(origin: &str) {
    CHALLENGES_OPENED.with_label_values(&[origin]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_challenge_attested(result: &str) {
    CHALLENGES_ATTESTED.with_label_values(&[result]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_challenges_expired(count: u64) {
    CHALLENGES_EXPIRED.inc_by(count);
}

#[cfg(feature = "metrics")]
pub fn record_heartbeat_attested() {
    HEARTBEATS_ATTESTED.inc();
}

#[cfg(feature = "metrics")]
pub fn record_slash_amount(amount: u128) {
    SLASH_AMOUNT.inc_by(u64::try_from(amount).unwrap_or(u64::MAX));
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_challenge_opened(_origin: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_challenge_attested(_result: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_challenges_expired(_count: u64) {}

#[cfg(not(feature = "metrics"))]
pub fn record_heartbeat_attested() {}

#[cfg(not(feature = "metrics"))]
pub fn record_slash_amount(_amount: u128) {}
