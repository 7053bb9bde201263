//! Scalar per-IMU filter.
//!
//! A 1-state/1-measurement instance of the multivariate engine tracking the
//! motion-axis acceleration of one IMU. The measurement noise preset is
//! picked by the run kind; after gravity calibration the measurement
//! covariance is replaced by the observed calibration variance.

use nalgebra::{DMatrix, DVector};

use pod_common::config::RunKind;

use crate::kalman::{KalmanError, KalmanMultivariate};

/// Initial estimate error variance.
const INITIAL_ERROR_VAR: f64 = 0.5;
/// Process noise variance.
const PROCESS_NOISE_VAR: f64 = 0.02;
/// Measurement noise inside the tube (and on open-air track).
const TRACK_MEASUREMENT_VAR: f64 = 0.001;
/// Measurement noise on the elevator rig.
const ELEVATOR_MEASUREMENT_VAR: f64 = 0.12;
/// Measurement noise with the pod on jacks.
const STATIONARY_MEASUREMENT_VAR: f64 = 0.04;

/// Measurement noise preset for a run kind.
pub fn measurement_variance(kind: RunKind) -> f64 {
    match kind {
        RunKind::Tube | RunKind::Outside => TRACK_MEASUREMENT_VAR,
        RunKind::Elevator => ELEVATOR_MEASUREMENT_VAR,
        RunKind::Stationary => STATIONARY_MEASUREMENT_VAR,
    }
}

/// One IMU's acceleration filter.
#[derive(Debug, Clone)]
pub struct ImuFilter {
    engine: KalmanMultivariate,
}

impl ImuFilter {
    /// Create a filter with the noise preset for `kind`.
    pub fn new(kind: RunKind) -> Self {
        let mut engine = KalmanMultivariate::new(1, 1);
        // Static setup with fixed dimensions; the shapes are correct by
        // construction.
        engine
            .set_models(
                DMatrix::identity(1, 1),
                DMatrix::from_element(1, 1, PROCESS_NOISE_VAR),
                DMatrix::identity(1, 1),
                DMatrix::from_element(1, 1, measurement_variance(kind)),
            )
            .expect("1x1 model shapes are fixed");
        engine
            .set_initial(
                DVector::zeros(1),
                DMatrix::from_element(1, 1, INITIAL_ERROR_VAR),
            )
            .expect("1x1 initial shapes are fixed");
        Self { engine }
    }

    /// Replace the measurement noise variance, e.g. with the variance
    /// observed during gravity calibration.
    pub fn update_measurement_variance(&mut self, var: f64) -> Result<(), KalmanError> {
        self.engine.update_r(DMatrix::from_element(1, 1, var))
    }

    /// Filter one motion-axis acceleration sample and return the estimate.
    pub fn filter(&mut self, z: f64) -> Result<f64, KalmanError> {
        self.engine.filter(&DVector::from_element(1, z))?;
        Ok(self.estimate())
    }

    /// Current acceleration estimate.
    pub fn estimate(&self) -> f64 {
        self.engine.state()[0]
    }

    /// Current estimate variance.
    pub fn estimate_variance(&self) -> f64 {
        self.engine.covariance()[(0, 0)]
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
