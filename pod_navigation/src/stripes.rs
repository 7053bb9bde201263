//! Stripe counter fusion.
//!
//! The track carries optical stripes at a fixed spacing; every detection is
//! an absolute position measurement. On each new stripe the IMU-integrated
//! displacement is compared against the stripe-implied position, a single
//! missed stripe is forgiven when the evidence supports it, large
//! disagreements are counted, and displacement/velocity are snapped back
//! onto the stripe grid.

use tracing::{debug, error};

use pod_common::consts::NUM_STRIPE_COUNTERS;
use pod_common::data::{DataPoint, StripeCounterReading};

/// Minimum gap between two accepted stripe detections [µs].
const DEBOUNCE_US: u64 = 100_000;

/// Maximum stripe disagreement events before navigation must fail.
const MAX_DISAGREEMENTS: u32 = 1;

/// Whole stripes of IMU drift ahead of the counters before navigation
/// must fail.
const MAX_DRIFT_STRIPES: f64 = 4.0;

/// Debounced stripe counting with IMU cross-checking.
#[derive(Debug, Clone)]
pub struct StripeHandler {
    stripe_distance_m: f64,
    /// Accepted stripe count and the timestamp of the last acceptance.
    count: DataPoint<u32>,
    prev_readings: [StripeCounterReading; NUM_STRIPE_COUNTERS],
    disagreements: u32,
    init_time_us: u64,
}

impl StripeHandler {
    /// Create a handler for the given stripe spacing.
    pub fn new(stripe_distance_m: f64) -> Self {
        Self {
            stripe_distance_m,
            count: DataPoint::new(0, 0),
            prev_readings: Default::default(),
            disagreements: 0,
            init_time_us: 0,
        }
    }

    /// Anchor the handler at launch: the run clock starts at `init_time_us`
    /// and the current counter values become the baseline.
    pub fn set_init(&mut self, init_time_us: u64, readings: [StripeCounterReading; NUM_STRIPE_COUNTERS]) {
        self.init_time_us = init_time_us;
        self.count.timestamp_us = init_time_us;
        self.prev_readings = readings;
    }

    /// Stripes accepted so far.
    pub fn stripe_count(&self) -> u32 {
        self.count.value
    }

    /// Disagreement events recorded so far.
    pub fn failure_count(&self) -> u32 {
        self.disagreements
    }

    /// True when the stripe evidence says navigation can no longer be
    /// trusted.
    pub fn check_failure(&self, displacement_m: f64) -> bool {
        if self.disagreements > MAX_DISAGREEMENTS {
            error!(
                target: "nav",
                disagreements = self.disagreements,
                "more than one large stripe/IMU disagreement"
            );
            return true;
        }
        let implied = f64::from(self.count.value) * self.stripe_distance_m;
        if displacement_m - implied > MAX_DRIFT_STRIPES * self.stripe_distance_m {
            error!(
                target: "nav",
                displacement_m,
                implied,
                "IMU displacement several stripes ahead of the counters"
            );
            return true;
        }
        false
    }

    /// Process one pair of counter readings.
    ///
    /// On a genuine new stripe, corrects `displacement` and `velocity` in
    /// place and shrinks `velocity_uncertainty` by the correction rate.
    /// `displacement_uncertainty` caps how much disagreement is tolerated.
    pub fn on_new_readings(
        &mut self,
        readings: [StripeCounterReading; NUM_STRIPE_COUNTERS],
        displacement: &mut f64,
        velocity: &mut f64,
        displacement_uncertainty: f64,
        velocity_uncertainty: &mut f64,
    ) {
        for i in 0..NUM_STRIPE_COUNTERS {
            // A stripe needs a changed count and a plausible gap since the
            // last acceptance.
            if self.prev_readings[i].count == readings[i].count
                || readings[i].timestamp_us.saturating_sub(self.count.timestamp_us) < DEBOUNCE_US
            {
                continue;
            }
            self.count.value += 1;
            self.count.timestamp_us = readings[i].timestamp_us;

            let minimum_uncertainty = self.stripe_distance_m / 5.0;
            let allowed_uncertainty = displacement_uncertainty.max(minimum_uncertainty);
            let mut offset = *displacement - f64::from(self.count.value) * self.stripe_distance_m;

            // Allow up to one missed stripe.
            if offset > self.stripe_distance_m - allowed_uncertainty
                && offset < self.stripe_distance_m + allowed_uncertainty
                && *displacement
                    > f64::from(self.count.value) * self.stripe_distance_m
                        + 0.5 * self.stripe_distance_m
            {
                self.count.value += 1;
                offset -= self.stripe_distance_m;
            }

            // Too large a disagreement: count it, plus one per whole stripe
            // of overshoot.
            if offset.abs() > 2.0 * allowed_uncertainty {
                debug!(
                    target: "nav",
                    offset, allowed_uncertainty, "stripe disagreement"
                );
                self.disagreements += 1 + (offset.abs() / self.stripe_distance_m) as u32;
            }

            let elapsed_us = self.count.timestamp_us.saturating_sub(self.init_time_us);
            if elapsed_us > 0 {
                let correction_rate = offset * 1e6 / elapsed_us as f64;
                *velocity_uncertainty -= correction_rate.abs();
                *velocity_uncertainty = velocity_uncertainty.abs();
                *velocity -= correction_rate;
            }
            *displacement -= offset;

            debug!(target: "nav", count = self.count.value, "stripe detected");
            break;
        }
        self.prev_readings = readings;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
