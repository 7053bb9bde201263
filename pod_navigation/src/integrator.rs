//! Trapezoidal integration over timestamped samples.

use pod_common::data::DataPoint;

/// Trapezoidal integrator.
//
// The accumulator is owned by the caller and passed in per update, so the
// same cell can double as a field of the published kinematic record and be
// corrected in place by the stripe handler between updates.
#[derive(Debug, Clone, Default)]
pub struct Integrator {
    previous: DataPoint<f64>,
    initialised: bool,
}

impl Integrator {
    /// Create an integrator with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Integrate up to `point`, accumulating the trapezoid area into
    /// `output`. The first sample only seeds the history; the output is
    /// unchanged until a second sample arrives.
    pub fn update(&mut self, point: DataPoint<f64>, output: &mut DataPoint<f64>) {
        if !self.initialised {
            self.previous = point;
            self.initialised = true;
        }
        // Timestamps are microseconds; integrate in seconds.
        let dt = (point.timestamp_us.saturating_sub(self.previous.timestamp_us)) as f64 / 1e6;
        output.value += (point.value + self.previous.value) / 2.0 * dt;
        output.timestamp_us = point.timestamp_us;
        self.previous = point;
    }

    /// Drop the history so the next sample seeds a fresh interval.
    pub fn reset(&mut self) {
        self.initialised = false;
        self.previous = DataPoint::default();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_does_not_move_the_output() {
        let mut integrator = Integrator::new();
        let mut output = DataPoint::new(0, 0.0);
        integrator.update(DataPoint::new(1_000_000, 5.0), &mut output);
        assert_eq!(output.value, 0.0);
        assert_eq!(output.timestamp_us, 1_000_000);
    }

    #[test]
    fn constant_input_integrates_linearly() {
        // For constant input a over [t0, t1] the gain is a * (t1 - t0).
        let mut integrator = Integrator::new();
        let mut output = DataPoint::new(0, 0.0);
        let a = 3.0;
        integrator.update(DataPoint::new(0, a), &mut output);
        integrator.update(DataPoint::new(2_000_000, a), &mut output);
        assert!((output.value - a * 2.0).abs() < 1e-12);

        integrator.update(DataPoint::new(3_500_000, a), &mut output);
        assert!((output.value - a * 3.5).abs() < 1e-12);
    }

    #[test]
    fn zero_input_leaves_state_unchanged() {
        let mut integrator = Integrator::new();
        let mut output = DataPoint::new(0, 7.0);
        integrator.update(DataPoint::new(0, 0.0), &mut output);
        for t in 1..10u64 {
            integrator.update(DataPoint::new(t * 100_000, 0.0), &mut output);
            assert_eq!(output.value, 7.0);
        }
    }

    #[test]
    fn ramp_input_integrates_to_trapezoid_area() {
        let mut integrator = Integrator::new();
        let mut output = DataPoint::new(0, 0.0);
        integrator.update(DataPoint::new(0, 0.0), &mut output);
        integrator.update(DataPoint::new(1_000_000, 10.0), &mut output);
        // Area of a triangle: (0 + 10) / 2 * 1 s.
        assert!((output.value - 5.0).abs() < 1e-12);
    }

    #[test]
    fn external_corrections_are_preserved() {
        let mut integrator = Integrator::new();
        let mut output = DataPoint::new(0, 0.0);
        integrator.update(DataPoint::new(0, 1.0), &mut output);
        integrator.update(DataPoint::new(1_000_000, 1.0), &mut output);
        // A stripe correction rewrites the accumulator between updates.
        output.value = 30.48;
        integrator.update(DataPoint::new(2_000_000, 1.0), &mut output);
        assert!((output.value - 31.48).abs() < 1e-12);
    }
}
