//! The navigation estimator.
//!
//! Per tick: subtract the calibrated gravity vector from each reliable IMU,
//! reject outliers on the motion axis with Tukey's fences, filter each
//! surviving reading through its own Kalman filter, average the estimates,
//! and integrate twice. Stripe counter detections snap the integrated
//! displacement back onto the track grid. Uncertainty grows with every
//! tick and shrinks on every stripe.

use std::sync::Arc;

use heapless::HistoryBuffer;
use tracing::{debug, error, info, warn};

use pod_common::config::{NavigationConfig, RunKind};
use pod_common::consts::{
    BRAKE_PAD_ANGLE_RAD, BRAKING_DISTANCE_FACTOR, EMERGENCY_DECELERATION, FRICTION_COEFFICIENT,
    NUM_BRAKES, NUM_IMUS, NUM_MOTORS, POD_MASS_KG, SPRING_COEFFICIENT, SPRING_COMPRESSION,
    WHEEL_MOMENT_OF_INERTIA,
};
use pod_common::data::store::DataStore;
use pod_common::data::{DataPoint, MotorsRecord, NavigationRecord, SensorsRecord};
use pod_common::flags::RunFlag;
use pod_common::state::ModuleStatus;

use crate::filter::ImuFilter;
use crate::integrator::Integrator;
use crate::stats::{OnlineStatistics, VectorStatistics};
use crate::stripes::StripeHandler;

/// Tukey fence multiplier on the interquartile range.
const TUKEY_THRESHOLD: f64 = 1.0;
/// Upper clamp on the interquartile range, against extreme outliers.
const TUKEY_IQR_BOUND: f64 = 3.0;
/// Consecutive outlier ticks before an IMU is written off.
const OUTLIER_COUNTER_LIMIT: u32 = 1000;
/// Raw samples kept for the vibration check.
const HISTORY_LEN: usize = 1000;
/// Ticks before uncertainty tracking starts.
const UNCERTAINTY_WARMUP_TICKS: u64 = 1000;

/// Raw per-axis samples of one tick: `[axis][imu]`.
type AxisSamples = [[f64; NUM_IMUS]; 3];

/// The navigation estimator. Owns the kinematic record.
pub struct Navigation {
    store: Arc<DataStore>,
    cfg: NavigationConfig,
    status: ModuleStatus,
    counter: u64,
    axis: usize,

    // Calibration results.
    gravity_calibration: [[f64; 3]; NUM_IMUS],
    calibration_variance: [f64; 3],

    // Per-IMU filtering and health.
    filters: [ImuFilter; NUM_IMUS],
    outlier_counters: [u32; NUM_IMUS],
    imu_reliable: [bool; NUM_IMUS],
    unreliable_imus: u32,

    // Rolling raw history for the vibration check.
    history: HistoryBuffer<AxisSamples, HISTORY_LEN>,

    // Stripe fusion.
    stripes: StripeHandler,
    stripes_enabled: bool,

    // Kinematic state.
    acceleration: DataPoint<f64>,
    velocity: DataPoint<f64>,
    displacement: DataPoint<f64>,
    acceleration_integrator: Integrator,
    velocity_integrator: Integrator,

    // Uncertainty tracking.
    displacement_uncertainty: f64,
    velocity_uncertainty: f64,
    prev_timestamp_us: u64,
    prev_acceleration: f64,
    prev_velocity: f64,
    timestamps_initialised: bool,
}

impl Navigation {
    /// Construct the estimator and publish the `Init` status.
    pub fn new(store: Arc<DataStore>, cfg: NavigationConfig, run_kind: RunKind) -> Self {
        let axis = cfg.axis;
        let stripe_distance = cfg.stripe_distance_m;
        let mut nav = Self {
            store,
            cfg,
            status: ModuleStatus::Init,
            counter: 0,
            axis,
            gravity_calibration: [[0.0; 3]; NUM_IMUS],
            calibration_variance: [0.0; 3],
            filters: std::array::from_fn(|_| ImuFilter::new(run_kind)),
            outlier_counters: [0; NUM_IMUS],
            imu_reliable: [true; NUM_IMUS],
            unreliable_imus: 0,
            history: HistoryBuffer::new(),
            stripes: StripeHandler::new(stripe_distance),
            stripes_enabled: true,
            acceleration: DataPoint::default(),
            velocity: DataPoint::default(),
            displacement: DataPoint::default(),
            acceleration_integrator: Integrator::new(),
            velocity_integrator: Integrator::new(),
            displacement_uncertainty: 0.0,
            velocity_uncertainty: 0.0,
            prev_timestamp_us: 0,
            prev_acceleration: 0.0,
            prev_velocity: 0.0,
            timestamps_initialised: false,
        };
        info!(target: "nav", "navigation module initialised");
        nav.publish();
        nav
    }

    /// Current module status.
    pub fn module_status(&self) -> ModuleStatus {
        self.status
    }

    /// Ignore the stripe counters (bench rigs without a striped track).
    pub fn set_stripes_enabled(&mut self, enabled: bool) {
        self.stripes_enabled = enabled;
    }

    /// Whether launch timestamps have been set.
    pub fn has_init(&self) -> bool {
        self.timestamps_initialised
    }

    /// Current displacement estimate [m].
    pub fn displacement(&self) -> f64 {
        self.displacement.value
    }

    /// Current velocity estimate [m/s].
    pub fn velocity(&self) -> f64 {
        self.velocity.value
    }

    /// Current acceleration estimate [m/s²].
    pub fn acceleration(&self) -> f64 {
        self.acceleration.value
    }

    /// Stripes accepted so far.
    pub fn stripe_count(&self) -> u32 {
        self.stripes.stripe_count()
    }

    // ─── Calibration ────────────────────────────────────────────────

    /// Determine the gravity vector seen by each IMU at rest.
    ///
    /// Collects `calibration_queries` readings per attempt and accepts when
    /// every axis variance of every IMU is under its limit. On success the
    /// per-IMU measurement covariances are replaced by the observed
    /// variances and the module goes `Ready`; after the configured attempts
    /// it goes `CriticalFailure`.
    pub fn calibrate_gravity(&mut self, running: &RunFlag) {
        info!(target: "nav", "calibrating gravity");
        let mut calibrated: Option<[VectorStatistics; NUM_IMUS]> = None;
        let mut attempt = 0;

        while calibrated.is_none() && attempt < self.cfg.calibration_attempts {
            attempt += 1;
            info!(target: "nav", attempt, "calibration attempt");
            let mut stats = [VectorStatistics::new(); NUM_IMUS];
            for _ in 0..self.cfg.calibration_queries {
                if !running.is_running() {
                    return;
                }
                let sensors = self.store.sensors();
                for (accumulator, imu) in stats.iter_mut().zip(&sensors.imus.value) {
                    accumulator.update(&imu.acc);
                }
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
            let within_limits = stats.iter().all(|accumulator| {
                accumulator
                    .variance()
                    .iter()
                    .zip(&self.cfg.calibration_variance_limits)
                    .all(|(variance, limit)| variance < limit)
            });
            if within_limits {
                calibrated = Some(stats);
            }
        }

        let Some(stats) = calibrated else {
            self.status = ModuleStatus::CriticalFailure;
            self.publish();
            error!(target: "nav", attempts = attempt, "gravity calibration failed");
            return;
        };

        for (i, accumulator) in stats.iter().enumerate() {
            self.gravity_calibration[i] = accumulator.mean();
            let variance_sum: f64 = accumulator.variance().iter().sum();
            if let Err(e) = self.filters[i].update_measurement_variance(variance_sum) {
                error!(target: "nav", imu = i, error = %e, "filter covariance update rejected");
            }
            info!(
                target: "nav",
                imu = i,
                gravity = ?self.gravity_calibration[i],
                variance = variance_sum,
                "gravity calibrated"
            );
        }
        // Combine the per-IMU variances of each axis into one figure for
        // the vibration check.
        for axis in 0..3 {
            let sum_of_squares: f64 = stats
                .iter()
                .map(|accumulator| {
                    let variance = accumulator.variance()[axis];
                    variance * variance
                })
                .sum();
            self.calibration_variance[axis] = sum_of_squares.sqrt();
        }

        self.status = ModuleStatus::Ready;
        self.publish();
        info!(target: "nav", "navigation module ready");
    }

    // ─── Launch ─────────────────────────────────────────────────────

    /// Anchor all integration timestamps at launch.
    pub fn init_timestamps(&mut self, now_us: u64) {
        self.acceleration.timestamp_us = now_us;
        self.velocity.timestamp_us = now_us;
        self.displacement.timestamp_us = now_us;
        self.prev_timestamp_us = now_us;
        self.prev_acceleration = self.acceleration.value;
        self.prev_velocity = self.velocity.value;
        self.acceleration_integrator.reset();
        self.velocity_integrator.reset();
        self.stripes
            .set_init(now_us, self.store.sensors().stripe_counters);
        self.timestamps_initialised = true;
        debug!(target: "nav", now_us, "navigation timestamps initialised");
    }

    // ─── Outlier Rejection ──────────────────────────────────────────

    /// Tukey's fences over the motion-axis samples, in place.
    ///
    /// Outliers are replaced with the median and counted per IMU; an IMU
    /// whose counter passes the limit is written off for the rest of the
    /// run. With two or more IMUs written off no fence can be trusted, so
    /// every slot gets the mean of the survivors instead.
    pub fn tukey_fences(&mut self, samples: &mut [f64; NUM_IMUS]) {
        let (q1, q2, q3) = match self.unreliable_imus {
            0 => {
                let mut sorted = *samples;
                sorted.sort_by(f64::total_cmp);
                (
                    (sorted[0] + sorted[1]) / 2.0,
                    (sorted[1] + sorted[2]) / 2.0,
                    (sorted[2] + sorted[3]) / 2.0,
                )
            }
            1 => {
                let mut sorted: heapless::Vec<f64, NUM_IMUS> = heapless::Vec::new();
                for (value, reliable) in samples.iter().zip(&self.imu_reliable) {
                    if *reliable {
                        // Capacity is NUM_IMUS and at most 3 values arrive.
                        let _ = sorted.push(*value);
                    }
                }
                sorted.sort_by(f64::total_cmp);
                (
                    (sorted[0] + sorted[1]) / 2.0,
                    sorted[1],
                    (sorted[1] + sorted[2]) / 2.0,
                )
            }
            _ => {
                // Too few IMUs for outlier support: average the survivors.
                let mut sum = 0.0;
                let mut survivors = 0u32;
                for (value, reliable) in samples.iter().zip(&self.imu_reliable) {
                    if *reliable {
                        sum += *value;
                        survivors += 1;
                    }
                }
                if survivors > 0 {
                    let mean = sum / f64::from(survivors);
                    samples.fill(mean);
                }
                return;
            }
        };

        let iqr = (q3 - q1).min(TUKEY_IQR_BOUND);
        let lower = q1 - TUKEY_THRESHOLD * iqr;
        let upper = q3 + TUKEY_THRESHOLD * iqr;

        for i in 0..NUM_IMUS {
            if !self.imu_reliable[i] {
                continue;
            }
            if samples[i] < lower || samples[i] > upper {
                debug!(
                    target: "nav",
                    imu = i,
                    reading = samples[i],
                    lower,
                    upper,
                    median = q2,
                    "outlier replaced with median"
                );
                samples[i] = q2;
                self.outlier_counters[i] += 1;
                if self.outlier_counters[i] > OUTLIER_COUNTER_LIMIT {
                    self.imu_reliable[i] = false;
                    self.unreliable_imus += 1;
                    warn!(target: "nav", imu = i, "IMU written off as unreliable");
                    if self.unreliable_imus > 1 {
                        self.status = ModuleStatus::CriticalFailure;
                        error!(target: "nav", "more than one IMU unreliable");
                    }
                }
            } else {
                self.outlier_counters[i] = 0;
            }
        }
    }

    // ─── Per-Tick Fusion ────────────────────────────────────────────

    fn query_imus(&mut self, sensors: &SensorsRecord) {
        let timestamp_us = sensors.imus.timestamp_us;
        let mut axis_samples: AxisSamples = [[0.0; NUM_IMUS]; 3];
        let mut moving_axis = [0.0; NUM_IMUS];

        for i in 0..NUM_IMUS {
            for axis in 0..3 {
                let corrected = sensors.imus.value[i].acc[axis] - self.gravity_calibration[i][axis];
                axis_samples[axis][i] = corrected;
                if axis == self.axis && self.imu_reliable[i] {
                    moving_axis[i] = corrected;
                }
            }
        }

        self.tukey_fences(&mut moving_axis);

        let mut filtered = OnlineStatistics::new();
        for i in 0..NUM_IMUS {
            if !self.imu_reliable[i] {
                continue;
            }
            match self.filters[i].filter(moving_axis[i]) {
                Ok(estimate) => filtered.update(estimate),
                Err(e) => error!(target: "nav", imu = i, error = %e, "filter step failed"),
            }
        }

        self.history.write(axis_samples);
        if self.history.len() == HISTORY_LEN {
            self.check_vibration();
        }

        self.acceleration = DataPoint::new(timestamp_us, filtered.mean());
        self.acceleration_integrator
            .update(self.acceleration, &mut self.velocity);
        self.velocity_integrator
            .update(self.velocity, &mut self.displacement);
    }

    /// Compare the variance on the non-motion axes of the rolling history
    /// against the calibration variance. High ratios mean the pod is
    /// shaking; a warning, not a failure.
    fn check_vibration(&self) {
        let ratio_limit = self.cfg.calibration_queries as f64 / HISTORY_LEN as f64;
        for axis in 0..3 {
            if axis == self.axis || self.calibration_variance[axis] <= 0.0 {
                continue;
            }
            let mut stats = OnlineStatistics::new();
            for samples in self.history.oldest_ordered() {
                for value in &samples[axis] {
                    stats.update(*value);
                }
            }
            let ratio = stats.variance() / self.calibration_variance[axis];
            if ratio > ratio_limit {
                warn!(
                    target: "nav",
                    axis,
                    ratio,
                    "axis variance far above calibration variance"
                );
            }
        }
    }

    // ─── Uncertainty ────────────────────────────────────────────────

    fn update_uncertainty(&mut self) {
        let dt = self
            .displacement
            .timestamp_us
            .saturating_sub(self.prev_timestamp_us) as f64
            / 1e6;
        // Random-walk term.
        let delta_acceleration = (self.acceleration.value - self.prev_acceleration).abs();
        self.velocity_uncertainty += delta_acceleration * dt / 2.0;
        // Processing term from the averaged filter variance.
        let acceleration_variance: f64 = self
            .filters
            .iter()
            .map(ImuFilter::estimate_variance)
            .sum::<f64>()
            / NUM_IMUS as f64;
        self.velocity_uncertainty += acceleration_variance.sqrt() * dt;

        self.displacement_uncertainty += self.velocity_uncertainty * dt;
        self.displacement_uncertainty +=
            (self.velocity.value - self.prev_velocity).abs() * dt / 2.0;
    }

    // ─── Derived Outputs ────────────────────────────────────────────

    /// Stopping distance from the current velocity under worst-case
    /// deceleration [m].
    pub fn emergency_braking_distance(&self) -> f64 {
        let v = self.velocity.value;
        v * v / (2.0 * EMERGENCY_DECELERATION)
    }

    /// Stopping distance published to the state machine [m]. A fixed safety
    /// factor over the emergency figure.
    pub fn braking_distance(&self) -> f64 {
        BRAKING_DISTANCE_FACTOR * self.emergency_braking_distance()
    }

    /// Stopping distance from the full brake/spring/friction model [m].
    ///
    /// Accounts for the rotational energy of the drive wheels at the
    /// current motor speed. The published record uses the factor form; this
    /// figure is logged for comparison.
    pub fn physical_braking_distance(&self, motors: &MotorsRecord) -> f64 {
        let rpm_sum: u32 = motors.rpms.iter().sum();
        let avg_rpm = f64::from(rpm_sum) / NUM_MOTORS as f64;
        let rotational_velocity = (avg_rpm / 60.0) * 2.0 * std::f64::consts::PI;

        let actuation_force = SPRING_COMPRESSION * SPRING_COEFFICIENT;
        let braking_force = (actuation_force * FRICTION_COEFFICIENT)
            / (BRAKE_PAD_ANGLE_RAD.tan() - FRICTION_COEFFICIENT);
        let deceleration = NUM_BRAKES as f64 * braking_force / POD_MASS_KG;

        let v = self.velocity.value;
        let pod_kinetic_energy = 0.5 * POD_MASS_KG * v * v;
        let rotational_kinetic_energy = NUM_MOTORS as f64
            * 0.5
            * WHEEL_MOMENT_OF_INERTIA
            * rotational_velocity
            * rotational_velocity;
        let total_kinetic_energy = pod_kinetic_energy + rotational_kinetic_energy;

        (total_kinetic_energy / POD_MASS_KG) / deceleration
    }

    // ─── Publication ────────────────────────────────────────────────

    /// Publish the kinematic record and roll the previous-tick state.
    fn publish(&mut self) {
        let record = NavigationRecord {
            module_status: self.status,
            displacement_m: self.displacement.value,
            velocity_mps: self.velocity.value,
            acceleration_mps2: self.acceleration.value,
            emergency_braking_distance_m: self.emergency_braking_distance(),
            braking_distance_m: self.braking_distance(),
        };
        self.store.set_navigation(record);

        if self.counter % 100 == 0 {
            let motors = self.store.motors();
            debug!(
                target: "nav",
                tick = self.counter,
                acceleration = self.acceleration.value,
                velocity = self.velocity.value,
                displacement = self.displacement.value,
                stripe_displacement =
                    f64::from(self.stripes.stripe_count()) * self.cfg.stripe_distance_m,
                velocity_uncertainty = self.velocity_uncertainty,
                displacement_uncertainty = self.displacement_uncertainty,
                physical_braking_distance = self.physical_braking_distance(&motors),
                stripe_failures = self.stripes.failure_count(),
                "kinematic update"
            );
        }
        self.counter += 1;
        self.prev_timestamp_us = self.displacement.timestamp_us;
        self.prev_acceleration = self.acceleration.value;
        self.prev_velocity = self.velocity.value;
    }

    /// One navigation tick: fuse IMUs, fold in stripes, track uncertainty,
    /// publish.
    pub fn navigate(&mut self) {
        let sensors = self.store.sensors();
        self.query_imus(&sensors);

        if self.stripes_enabled {
            self.stripes.on_new_readings(
                sensors.stripe_counters,
                &mut self.displacement.value,
                &mut self.velocity.value,
                self.displacement_uncertainty,
                &mut self.velocity_uncertainty,
            );
            if self.stripes.check_failure(self.displacement.value) {
                self.status = ModuleStatus::CriticalFailure;
            }
        }

        if self.counter > UNCERTAINTY_WARMUP_TICKS {
            self.update_uncertainty();
        }
        self.publish();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
