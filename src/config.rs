//! # Commander configuration
//!
//! The tunables bound how aggressively the Crazyflie responds to the sticks. They are plain data so that they can
//! be loaded from a configuration file by the host application:
//! ```
//! # use crazyflie_ble::config::{CommanderConfig, PacketFormat};
//! let config: CommanderConfig = serde_json::from_str(r#"{
//!     "format": "rpyt",
//!     "tuning": { "max_thrust_percent": 0.5 }
//! }"#).unwrap();
//!
//! assert_eq!(config.format, PacketFormat::Rpyt);
//! assert_eq!(config.tuning.max_yaw_rate, 200.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default maximum roll/pitch angle in degrees
pub const DEFAULT_MAX_PITCH_ROLL_RATE: f64 = 30.0;
/// Default maximum yaw rate in degrees per second
pub const DEFAULT_MAX_YAW_RATE: f64 = 200.0;
/// Default maximum thrust, as a fraction of full thrust
pub const DEFAULT_MAX_THRUST_PERCENT: f64 = 0.8;

/// Commander packet format sent by the link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PacketFormat {
    /// Legacy roll/pitch/yaw/thrust setpoint on the commander port
    Rpyt,
    /// CPPM emulation setpoint on the generic commander port, carries an arm channel
    #[default]
    Cppm,
}

/// Runtime adjustable scaling applied to the axes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Roll and pitch angle at full stick deflection (degrees)
    pub max_pitch_roll_rate: f64,
    /// Yaw rate at full stick deflection (degrees/second)
    pub max_yaw_rate: f64,
    /// Fraction of full thrust reached at full throttle (0 to 1)
    pub max_thrust_percent: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            max_pitch_roll_rate: DEFAULT_MAX_PITCH_ROLL_RATE,
            max_yaw_rate: DEFAULT_MAX_YAW_RATE,
            max_thrust_percent: DEFAULT_MAX_THRUST_PERCENT,
        }
    }
}

impl Tuning {
    /// Check that every tunable is within its documented domain
    pub fn validate(&self) -> Result<()> {
        if !self.max_pitch_roll_rate.is_finite() || self.max_pitch_roll_rate < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "max_pitch_roll_rate must be a positive angle, got {}",
                self.max_pitch_roll_rate
            )));
        }
        if !self.max_yaw_rate.is_finite() || self.max_yaw_rate < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "max_yaw_rate must be a positive rate, got {}",
                self.max_yaw_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.max_thrust_percent) {
            return Err(Error::InvalidConfig(format!(
                "max_thrust_percent must be between 0 and 1, got {}",
                self.max_thrust_percent
            )));
        }
        Ok(())
    }
}

/// Configuration of a [Crazyflie](crate::Crazyflie) commander link
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CommanderConfig {
    /// Packet format used for every run of the link
    pub format: PacketFormat,
    /// Initial scaling, can be changed while running with [Crazyflie::set_tuning()](crate::Crazyflie::set_tuning)
    pub tuning: Tuning,
    /// Send one de-energized packet after the loop observes a stop request
    pub disarm_on_stop: bool,
}
