//! Track geometry, physics constants and fleet sizes shared across the
//! pod subsystems.
//!
//! All distances are in metres, velocities in m/s, accelerations in m/s²
//! and timestamps in microseconds unless a suffix says otherwise.

// ─── Track & Run Geometry ───────────────────────────────────────────

/// Length of the competition run [m].
pub const RUN_LENGTH_M: f64 = 1250.0;

/// Spacing between two optical track stripes [m].
pub const STRIPE_DISTANCE_M: f64 = 30.48;

/// Safety margin added to the braking distance when deciding whether the
/// pod has entered the braking zone [m].
pub const BRAKING_BUFFER_M: f64 = 20.0;

// ─── Braking Physics ────────────────────────────────────────────────

/// Worst-case deceleration assumed for the emergency braking distance [m/s²].
pub const EMERGENCY_DECELERATION: f64 = 24.0;

/// Safety factor applied to the emergency braking distance to obtain the
/// nominal braking distance published to the state machine.
pub const BRAKING_DISTANCE_FACTOR: f64 = 1.2;

/// Pod mass [kg].
pub const POD_MASS_KG: f64 = 250.0;

/// Moment of inertia of one drive wheel [kg·m²].
pub const WHEEL_MOMENT_OF_INERTIA: f64 = 0.04;

/// Friction coefficient of the brake pads against the rail.
pub const FRICTION_COEFFICIENT: f64 = 0.38;

/// Brake spring compression [mm].
pub const SPRING_COMPRESSION: f64 = 40.0;

/// Brake spring coefficient [N/mm].
pub const SPRING_COEFFICIENT: f64 = 18.0;

/// Brake pad wedge angle [rad].
pub const BRAKE_PAD_ANGLE_RAD: f64 = 0.52;

// ─── Fleet Sizes ────────────────────────────────────────────────────

/// Number of redundant IMUs.
pub const NUM_IMUS: usize = 4;

/// Number of optical stripe counters.
pub const NUM_STRIPE_COUNTERS: usize = 2;

/// Number of friction brakes.
pub const NUM_BRAKES: usize = 4;

/// Number of propulsion motors.
pub const NUM_MOTORS: usize = 4;

/// Number of low-power batteries.
pub const NUM_LP_BATTERIES: usize = 3;

/// Number of high-power batteries.
pub const NUM_HP_BATTERIES: usize = 2;

/// Cells per battery pack.
pub const NUM_BATTERY_CELLS: usize = 36;

/// Number of high-power solid-state relays.
pub const NUM_HP_RELAYS: usize = 4;

// ─── State Machine Thresholds ───────────────────────────────────────

/// |velocity| below which the pod counts as stopped [m/s].
pub const STOPPED_VELOCITY_EPSILON: f64 = 0.01;

/// Fixed early-cruising trigger used by bench/demo run kinds [µs].
pub const DEMO_ACCELERATION_TIMEOUT_US: u64 = 120_000;

// ─── Battery Operating Ranges (optional guard) ──────────────────────
//
// Enforced only when `enforce_battery_limits` is enabled in the
// state-machine configuration.

/// Low-power battery voltage range [dV] (17.5 V to 29.4 V).
pub const LP_VOLTAGE_RANGE_DV: (u16, u16) = (175, 294);

/// Low-power battery current range [dA] (0 A to 50 A).
pub const LP_CURRENT_RANGE_DA: (i16, i16) = (0, 500);

/// High-power battery voltage range [dV] (100 V to 129.6 V).
pub const HP_VOLTAGE_RANGE_DV: (u16, u16) = (1000, 1296);

/// High-power battery current range [dA] (0 A to 350 A).
pub const HP_CURRENT_RANGE_DA: (i16, i16) = (0, 3500);

/// Battery charge range [%].
pub const CHARGE_RANGE_PCT: (u8, u8) = (20, 100);
