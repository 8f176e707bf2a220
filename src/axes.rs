//! # Control axes
//!
//! The commander loop does not know where the stick positions come from. Anything able to produce a
//! [FlightControlAxes] snapshot implements [AxisSource], see the [sources](crate::sources) module for the
//! implementations shipped with the lib.

use async_trait::async_trait;

/// Snapshot of the flight control axes
///
/// Each value is a fraction of how far the axis is deflected. All the fields of one snapshot are sampled at the
/// same instant.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlightControlAxes {
    /// -1 is full left, 1 is full right
    pub roll: f64,
    /// -1 is full backward, 1 is full forward
    pub pitch: f64,
    /// -1 is full counter-clockwise, 1 is full clockwise
    pub yaw: f64,
    /// 0 is no thrust, 1 is full thrust
    pub thrust: f64,
    /// Operator kill/enable switch
    pub is_armed: bool,
    /// Firmware-side self-leveling (angle) mode
    ///
    /// Not transmitted: the legacy setpoint has no mode field and the CPPM setpoint carries a single aux channel,
    /// used by the arm switch. The firmware keeps its configured mode.
    pub is_self_level_enabled: bool,
}

impl FlightControlAxes {
    /// Returns a copy with every axis bounded to its domain
    ///
    /// NaN axes are treated as centered.
    pub fn clamped(&self) -> Self {
        Self {
            roll: bipolar(self.roll),
            pitch: bipolar(self.pitch),
            yaw: bipolar(self.yaw),
            thrust: if self.thrust.is_nan() {
                0.0
            } else {
                self.thrust.clamp(0.0, 1.0)
            },
            ..*self
        }
    }

    /// True if none of the four axes is deflected
    pub fn is_zero(&self) -> bool {
        self.roll == 0.0 && self.pitch == 0.0 && self.yaw == 0.0 && self.thrust == 0.0
    }
}

fn bipolar(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

/// Source of flight control axes
///
/// Implementations are selected by the caller when the [Crazyflie](crate::Crazyflie) is created and are only
/// ever sampled from the commander loop task.
#[async_trait]
pub trait AxisSource: Send + Sync {
    /// Sample all axes as one consistent snapshot
    ///
    /// This may suspend, for example while waiting for the UI to report the stick positions.
    async fn sample(&self) -> FlightControlAxes;
}
