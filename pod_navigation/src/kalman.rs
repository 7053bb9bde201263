//! Multivariate Kalman filter on dense matrices.
//!
//! State dimension `n`, measurement dimension `m`, optional control
//! dimension `k`. All model setters validate matrix shapes against the
//! filter dimensions; the correction step fails if the innovation
//! covariance `H P Hᵀ + R` is singular.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Errors from filter setup or the correction step.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KalmanError {
    /// A supplied matrix or vector does not match the filter dimensions.
    #[error("matrix dimensions do not match filter (n={n}, m={m}, k={k})")]
    BadDimensions {
        /// State dimension.
        n: usize,
        /// Measurement dimension.
        m: usize,
        /// Control dimension.
        k: usize,
    },

    /// The innovation covariance has zero determinant.
    #[error("innovation covariance is singular")]
    Singular,
}

/// General multivariate Kalman filter.
///
/// Construct with [`KalmanMultivariate::new`], install the models with the
/// `set_*` methods, seed the state with [`set_initial`](Self::set_initial),
/// then call [`filter`](Self::filter) per measurement.
#[derive(Debug, Clone)]
pub struct KalmanMultivariate {
    n: usize,
    m: usize,
    k: usize,
    /// State transition model A (n×n).
    a: DMatrix<f64>,
    /// Control model B (n×k), present only with a control dimension.
    b: Option<DMatrix<f64>>,
    /// Process noise covariance Q (n×n).
    q: DMatrix<f64>,
    /// Measurement model H (m×n).
    h: DMatrix<f64>,
    /// Measurement noise covariance R (m×m).
    r: DMatrix<f64>,
    /// State estimate x (n).
    x: DVector<f64>,
    /// Estimate covariance P (n×n).
    p: DMatrix<f64>,
    /// Identity (n×n), kept around for the correction step.
    identity: DMatrix<f64>,
}

impl KalmanMultivariate {
    /// Create a filter without a control input.
    pub fn new(n: usize, m: usize) -> Self {
        Self::with_control(n, m, 0)
    }

    /// Create a filter with a control dimension.
    pub fn with_control(n: usize, m: usize, k: usize) -> Self {
        Self {
            n,
            m,
            k,
            a: DMatrix::zeros(n, n),
            b: None,
            q: DMatrix::zeros(n, n),
            h: DMatrix::zeros(m, n),
            r: DMatrix::zeros(m, m),
            x: DVector::zeros(n),
            p: DMatrix::zeros(n, n),
            identity: DMatrix::identity(n, n),
        }
    }

    fn bad_dimensions(&self) -> KalmanError {
        KalmanError::BadDimensions {
            n: self.n,
            m: self.m,
            k: self.k,
        }
    }

    /// Install the state transition and process noise models.
    pub fn set_dynamics_model(
        &mut self,
        a: DMatrix<f64>,
        q: DMatrix<f64>,
    ) -> Result<(), KalmanError> {
        if a.nrows() != self.n || a.ncols() != self.n || q.nrows() != self.n || q.ncols() != self.n
        {
            return Err(self.bad_dimensions());
        }
        self.a = a;
        self.q = q;
        Ok(())
    }

    /// Install the state transition, control and process noise models.
    pub fn set_dynamics_model_with_control(
        &mut self,
        a: DMatrix<f64>,
        b: DMatrix<f64>,
        q: DMatrix<f64>,
    ) -> Result<(), KalmanError> {
        if b.nrows() != self.n || b.ncols() != self.k {
            return Err(self.bad_dimensions());
        }
        self.set_dynamics_model(a, q)?;
        self.b = Some(b);
        Ok(())
    }

    /// Install the measurement model and noise covariance.
    pub fn set_measurement_model(
        &mut self,
        h: DMatrix<f64>,
        r: DMatrix<f64>,
    ) -> Result<(), KalmanError> {
        if h.nrows() != self.m || h.ncols() != self.n || r.nrows() != self.m || r.ncols() != self.m
        {
            return Err(self.bad_dimensions());
        }
        self.h = h;
        self.r = r;
        Ok(())
    }

    /// Install all models at once.
    pub fn set_models(
        &mut self,
        a: DMatrix<f64>,
        q: DMatrix<f64>,
        h: DMatrix<f64>,
        r: DMatrix<f64>,
    ) -> Result<(), KalmanError> {
        self.set_dynamics_model(a, q)?;
        self.set_measurement_model(h, r)
    }

    /// Replace the state transition matrix, e.g. for a new time delta.
    pub fn update_a(&mut self, a: DMatrix<f64>) -> Result<(), KalmanError> {
        if a.nrows() != self.n || a.ncols() != self.n {
            return Err(self.bad_dimensions());
        }
        self.a = a;
        Ok(())
    }

    /// Replace the measurement noise covariance.
    pub fn update_r(&mut self, r: DMatrix<f64>) -> Result<(), KalmanError> {
        if r.nrows() != self.m || r.ncols() != self.m {
            return Err(self.bad_dimensions());
        }
        self.r = r;
        Ok(())
    }

    /// Seed the state estimate and its covariance.
    pub fn set_initial(&mut self, x0: DVector<f64>, p0: DMatrix<f64>) -> Result<(), KalmanError> {
        if x0.nrows() != self.n || p0.nrows() != self.n || p0.ncols() != self.n {
            return Err(self.bad_dimensions());
        }
        self.x = x0;
        self.p = p0;
        Ok(())
    }

    /// Prediction step without control: `x ← A x`, `P ← A P Aᵀ + Q`.
    pub fn predict(&mut self) {
        self.x = &self.a * &self.x;
        self.p = &self.a * &self.p * self.a.transpose() + &self.q;
    }

    /// Prediction step with control input: `x ← A x + B u`.
    pub fn predict_with_control(&mut self, u: &DVector<f64>) -> Result<(), KalmanError> {
        let Some(b) = &self.b else {
            return Err(self.bad_dimensions());
        };
        if u.nrows() != self.k {
            return Err(self.bad_dimensions());
        }
        self.x = &self.a * &self.x + b * u;
        self.p = &self.a * &self.p * self.a.transpose() + &self.q;
        Ok(())
    }

    /// Correction step for a measurement `z`.
    pub fn correct(&mut self, z: &DVector<f64>) -> Result<(), KalmanError> {
        if z.nrows() != self.m {
            return Err(self.bad_dimensions());
        }
        let innovation_cov = &self.h * &self.p * self.h.transpose() + &self.r;
        if innovation_cov.determinant() == 0.0 {
            return Err(KalmanError::Singular);
        }
        let inverse = innovation_cov
            .try_inverse()
            .ok_or(KalmanError::Singular)?;
        let gain = &self.p * self.h.transpose() * inverse;
        self.x = &self.x + &gain * (z - &self.h * &self.x);
        self.p = (&self.identity - &gain * &self.h) * &self.p;
        Ok(())
    }

    /// One predict + correct cycle.
    pub fn filter(&mut self, z: &DVector<f64>) -> Result<(), KalmanError> {
        self.predict();
        self.correct(z)
    }

    /// One predict + correct cycle with a control input.
    pub fn filter_with_control(
        &mut self,
        u: &DVector<f64>,
        z: &DVector<f64>,
    ) -> Result<(), KalmanError> {
        self.predict_with_control(u)?;
        self.correct(z)
    }

    /// Current state estimate.
    pub fn state(&self) -> &DVector<f64> {
        &self.x
    }

    /// Current estimate covariance.
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.p
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn dimension_mismatch_in_dynamics_model() {
        let mut filter = KalmanMultivariate::new(3, 1);
        let a = DMatrix::identity(2, 2);
        let q = DMatrix::zeros(3, 3);
        assert_eq!(
            filter.set_dynamics_model(a, q),
            Err(KalmanError::BadDimensions { n: 3, m: 1, k: 0 })
        );
    }

    #[test]
    fn dimension_mismatch_in_measurement_model() {
        let mut filter = KalmanMultivariate::new(3, 1);
        let h = DMatrix::zeros(2, 3);
        let r = DMatrix::identity(1, 1);
        assert!(filter.set_measurement_model(h, r).is_err());

        let h = DMatrix::zeros(1, 3);
        let r = DMatrix::identity(2, 2);
        assert!(filter.set_measurement_model(h, r).is_err());
    }

    #[test]
    fn dimension_mismatch_in_initial_state() {
        let mut filter = KalmanMultivariate::new(3, 1);
        assert!(
            filter
                .set_initial(DVector::zeros(2), DMatrix::zeros(3, 3))
                .is_err()
        );
        assert!(
            filter
                .set_initial(DVector::zeros(3), DMatrix::zeros(2, 3))
                .is_err()
        );
    }

    #[test]
    fn dimension_mismatch_in_control() {
        let mut filter = KalmanMultivariate::with_control(2, 1, 1);
        filter
            .set_dynamics_model_with_control(
                DMatrix::identity(2, 2),
                DMatrix::zeros(2, 1),
                DMatrix::zeros(2, 2),
            )
            .unwrap();
        let u_wrong = DVector::zeros(2);
        assert!(filter.predict_with_control(&u_wrong).is_err());

        // B with wrong shape.
        let mut filter = KalmanMultivariate::with_control(2, 1, 1);
        assert!(
            filter
                .set_dynamics_model_with_control(
                    DMatrix::identity(2, 2),
                    DMatrix::zeros(1, 1),
                    DMatrix::zeros(2, 2),
                )
                .is_err()
        );
    }

    #[test]
    fn predict_without_control_model_fails() {
        let mut filter = KalmanMultivariate::new(2, 1);
        filter
            .set_models(
                DMatrix::identity(2, 2),
                DMatrix::zeros(2, 2),
                DMatrix::zeros(1, 2),
                DMatrix::identity(1, 1),
            )
            .unwrap();
        assert!(filter.predict_with_control(&DVector::zeros(0)).is_err());
    }

    #[test]
    fn singular_innovation_covariance_is_rejected() {
        let mut filter = KalmanMultivariate::new(1, 1);
        // H = 0 and R = 0 make the innovation covariance zero.
        filter
            .set_models(
                DMatrix::identity(1, 1),
                DMatrix::zeros(1, 1),
                DMatrix::zeros(1, 1),
                DMatrix::zeros(1, 1),
            )
            .unwrap();
        filter
            .set_initial(DVector::zeros(1), DMatrix::identity(1, 1))
            .unwrap();
        let z = DVector::from_element(1, 1.0);
        assert_eq!(filter.filter(&z), Err(KalmanError::Singular));
    }

    #[test]
    fn identity_models_leave_state_untouched() {
        // A = I, Q = 0, H = 0, R = I: the gain is zero, so repeated
        // filtering must not move x or P.
        let n = 3;
        let mut filter = KalmanMultivariate::new(n, 1);
        filter
            .set_models(
                DMatrix::identity(n, n),
                DMatrix::zeros(n, n),
                DMatrix::zeros(1, n),
                DMatrix::identity(1, 1),
            )
            .unwrap();
        let x0 = DVector::from_vec(vec![1.0, -2.0, 3.0]);
        let p0 = DMatrix::identity(n, n) * 0.5;
        filter.set_initial(x0.clone(), p0.clone()).unwrap();

        let z = DVector::from_element(1, 123.0);
        for _ in 0..25 {
            filter.filter(&z).unwrap();
        }
        for i in 0..n {
            assert_close(filter.state()[i], x0[i]);
            for j in 0..n {
                assert_close(filter.covariance()[(i, j)], p0[(i, j)]);
            }
        }
    }

    #[test]
    fn scalar_filter_converges_to_constant_measurement() {
        let mut filter = KalmanMultivariate::new(1, 1);
        filter
            .set_models(
                DMatrix::identity(1, 1),
                DMatrix::from_element(1, 1, 0.02),
                DMatrix::identity(1, 1),
                DMatrix::from_element(1, 1, 0.001),
            )
            .unwrap();
        filter
            .set_initial(DVector::zeros(1), DMatrix::from_element(1, 1, 0.5))
            .unwrap();

        let z = DVector::from_element(1, 9.81);
        for _ in 0..100 {
            filter.filter(&z).unwrap();
        }
        assert!((filter.state()[0] - 9.81).abs() < 1e-3);
        // Covariance settles to a small positive steady state.
        assert!(filter.covariance()[(0, 0)] > 0.0);
        assert!(filter.covariance()[(0, 0)] < 0.01);
    }

    /// Reference implementation on plain arrays, used to cross-check the
    /// engine over a 3-state constant-velocity model.
    mod reference {
        pub fn mat_mul(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
            let mut out = [[0.0; 3]; 3];
            for i in 0..3 {
                for j in 0..3 {
                    for (k, row) in b.iter().enumerate() {
                        out[i][j] += a[i][k] * row[j];
                    }
                }
            }
            out
        }

        pub fn mat_vec(a: &[[f64; 3]; 3], v: &[f64; 3]) -> [f64; 3] {
            let mut out = [0.0; 3];
            for i in 0..3 {
                for k in 0..3 {
                    out[i] += a[i][k] * v[k];
                }
            }
            out
        }

        pub fn transpose(a: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
            let mut out = [[0.0; 3]; 3];
            for (i, row) in a.iter().enumerate() {
                for j in 0..3 {
                    out[j][i] = row[j];
                }
            }
            out
        }
    }

    #[test]
    fn three_state_filter_matches_reference_after_50_steps() {
        let dt = 0.01;
        // Constant-acceleration kinematics: state (acc, vel, pos),
        // measuring acceleration only.
        let a_model = [
            [1.0, 0.0, 0.0],
            [dt, 1.0, 0.0],
            [0.5 * dt * dt, dt, 1.0],
        ];
        let q_scalar = 0.02;
        let r_scalar = 0.001;

        let mut engine = KalmanMultivariate::new(3, 1);
        engine
            .set_models(
                DMatrix::from_fn(3, 3, |i, j| a_model[i][j]),
                DMatrix::from_element(3, 3, q_scalar),
                DMatrix::from_fn(1, 3, |_, j| if j == 0 { 1.0 } else { 0.0 }),
                DMatrix::from_element(1, 1, r_scalar),
            )
            .unwrap();
        engine
            .set_initial(DVector::zeros(3), DMatrix::from_element(3, 3, 0.5))
            .unwrap();

        // Reference runs the same recursion with scalar innovation algebra
        // (m = 1, so the inverse is a plain division).
        let mut x = [0.0f64; 3];
        let mut p = [[0.5f64; 3]; 3];
        let h = [1.0, 0.0, 0.0];

        let measurement = 9.81;
        let z = DVector::from_element(1, measurement);
        for _ in 0..50 {
            engine.filter(&z).unwrap();

            // Predict.
            x = reference::mat_vec(&a_model, &x);
            let ap = reference::mat_mul(&a_model, &p);
            let mut apat = reference::mat_mul(&ap, &reference::transpose(&a_model));
            for row in apat.iter_mut() {
                for value in row.iter_mut() {
                    *value += q_scalar;
                }
            }
            p = apat;

            // Correct: S = H P Hᵀ + R is scalar because m = 1.
            let s = p[0][0] + r_scalar;
            let gain = [p[0][0] / s, p[1][0] / s, p[2][0] / s];
            let innovation = measurement - (h[0] * x[0] + h[1] * x[1] + h[2] * x[2]);
            for i in 0..3 {
                x[i] += gain[i] * innovation;
            }
            // P ← (I - K H) P; K H only has a nonzero first column, so
            // row i of the product is row i of P minus gain[i] times row 0.
            let mut next_p = [[0.0f64; 3]; 3];
            for i in 0..3 {
                for j in 0..3 {
                    next_p[i][j] = p[i][j] - gain[i] * p[0][j];
                }
            }
            p = next_p;
        }

        for i in 0..3 {
            assert!(
                (engine.state()[i] - x[i]).abs() < 1e-9,
                "state[{i}]: engine {} vs reference {}",
                engine.state()[i],
                x[i]
            );
            for j in 0..3 {
                assert!(
                    (engine.covariance()[(i, j)] - p[i][j]).abs() < 1e-9,
                    "cov[{i}][{j}] mismatch"
                );
            }
        }
        // The acceleration component tracks the constant measurement.
        assert!((engine.state()[0] - measurement).abs() < 0.1);
    }
}
