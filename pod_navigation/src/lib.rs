//! Pod Navigation
//!
//! Fuses four redundant IMUs and two optical stripe counters into a
//! displacement/velocity/acceleration estimate with uncertainty tracking,
//! and publishes the kinematic record the state machine and the actuators
//! consume.
//!
//! # Module Structure
//!
//! - [`kalman`] - Multivariate Kalman engine on dense matrices
//! - [`filter`] - Scalar per-IMU filter with run-kind noise presets
//! - [`integrator`] - Trapezoidal integration over timestamped samples
//! - [`stats`] - Online mean/variance accumulators
//! - [`stripes`] - Stripe counter fusion and disagreement tracking
//! - [`estimator`] - The estimator itself: calibration, outlier rejection,
//!   fusion, uncertainty
//! - [`run`] - The navigation task loop

pub mod estimator;
pub mod filter;
pub mod integrator;
pub mod kalman;
pub mod run;
pub mod stats;
pub mod stripes;

pub use estimator::Navigation;
pub use kalman::{KalmanError, KalmanMultivariate};
