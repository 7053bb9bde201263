//! Command-line interface.
//!
//! All flags are optional. Fake-hardware toggles stand in for subsystems
//! that are absent on the bench; the `_fail` variants additionally inject a
//! failure mid-run. Run-type selectors pick the navigation noise presets.

use std::path::PathBuf;

use clap::Parser;

use pod_common::config::RunKind;

/// Hyperloop pod control core.
#[derive(Debug, Parser)]
#[command(name = "pod", version, about, rename_all = "snake_case")]
pub struct Cli {
    /// Path to the pod configuration file.
    #[arg(long, default_value = "config.toml")]
    pub config: PathBuf,

    /// System-wide verbosity: prints all info messages.
    #[arg(short, long)]
    pub verbose: bool,

    /// System-wide debug level (1 = debug, 2 = trace).
    #[arg(short, long, value_name = "LEVEL")]
    pub debug: Option<u8>,

    /// Navigation debug level.
    #[arg(long, value_name = "LEVEL")]
    pub debug_nav: Option<u8>,

    /// State machine debug level.
    #[arg(long, value_name = "LEVEL")]
    pub debug_state: Option<u8>,

    /// Telemetry debug level.
    #[arg(long, value_name = "LEVEL")]
    pub debug_tlm: Option<u8>,

    // ── Fake hardware toggles ──
    /// Run without real IMUs.
    #[arg(long)]
    pub fake_imu: bool,

    /// Run without real IMUs and inject an IMU failure mid-run.
    #[arg(long)]
    pub fake_imu_fail: bool,

    /// Run without real battery management.
    #[arg(long)]
    pub fake_batteries: bool,

    /// Run without real battery management and inject a failure mid-run.
    #[arg(long)]
    pub fake_batteries_fail: bool,

    /// Run without real stripe counters.
    #[arg(long)]
    pub fake_keyence: bool,

    /// Run without real stripe counters and inject a failure mid-run.
    #[arg(long)]
    pub fake_keyence_fail: bool,

    /// Run without a real thermistor.
    #[arg(long)]
    pub fake_temperature: bool,

    /// Run without a real thermistor and inject a failure mid-run.
    #[arg(long)]
    pub fake_temperature_fail: bool,

    /// Run without real brake hardware.
    #[arg(long)]
    pub fake_brakes: bool,

    /// Run without real motor controllers.
    #[arg(long)]
    pub fake_motors: bool,

    /// Report the high-power rail as energised.
    #[arg(long)]
    pub fake_highpower: bool,

    /// Battery bench test mode.
    #[arg(long)]
    pub battery_test: bool,

    // ── Run-type selectors ──
    /// Official tube run (default).
    #[arg(long)]
    pub tube_run: bool,

    /// Elevator rig run.
    #[arg(long)]
    pub elevator_run: bool,

    /// Stationary run, pod on jacks.
    #[arg(long)]
    pub stationary_run: bool,

    /// Open-air track run.
    #[arg(long)]
    pub outside_run: bool,

    /// IMU axis used as the motion axis (overrides the config).
    #[arg(long, value_name = "AXIS")]
    pub axis: Option<usize>,
}

impl Cli {
    /// The selected run kind; tube is the default.
    pub fn run_kind(&self) -> RunKind {
        if self.elevator_run {
            RunKind::Elevator
        } else if self.stationary_run {
            RunKind::Stationary
        } else if self.outside_run {
            RunKind::Outside
        } else {
            RunKind::Tube
        }
    }

    /// Env-filter directives for the tracing subscriber.
    ///
    /// The global level comes from `--verbose`/`--debug`; per-module levels
    /// override it for their target.
    pub fn log_directives(&self) -> String {
        let base = match (self.debug, self.verbose) {
            (Some(level), _) => debug_level_name(level),
            (None, true) => "info",
            (None, false) => "warn",
        };
        let mut directives = vec![base.to_string()];
        for (target, level) in [
            ("nav", self.debug_nav),
            ("state", self.debug_state),
            ("telemetry", self.debug_tlm),
        ] {
            if let Some(level) = level {
                directives.push(format!("{target}={}", debug_level_name(level)));
            }
        }
        directives.join(",")
    }
}

fn debug_level_name(level: u8) -> &'static str {
    if level == 0 { "debug" } else { "trace" }
}

// ─── Tests ──────────────────────────────────────────────────────────
