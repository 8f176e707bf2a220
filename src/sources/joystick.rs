use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::axes::{AxisSource, FlightControlAxes};

/// Position of a joystick as a fraction of its range of motion
///
/// X goes from -1 (left) to 1 (right). Y goes from -1 (bottom) to 1 (top), or from 0 (bottom) to 1 (top) for a
/// full range Y stick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StickPoint {
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
}

/// Something that knows where a joystick is
#[async_trait]
pub trait StickPosition: Send + Sync {
    /// Current position of the stick
    async fn position(&self) -> StickPoint;
}

#[async_trait]
impl<T: StickPosition + ?Sized> StickPosition for Arc<T> {
    async fn position(&self) -> StickPoint {
        (**self).position().await
    }
}

/// Stick position updated by the UI
#[derive(Debug, Default)]
pub struct SharedStick {
    point: Mutex<StickPoint>,
}

impl SharedStick {
    /// Create a stick at `point`
    pub fn new(point: StickPoint) -> Self {
        Self {
            point: Mutex::new(point),
        }
    }

    /// Move the stick
    pub fn set(&self, point: StickPoint) {
        *self.point.lock().unwrap_or_else(PoisonError::into_inner) = point;
    }
}

#[async_trait]
impl StickPosition for SharedStick {
    async fn position(&self) -> StickPoint {
        *self.point.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Geometry of an on-screen joystick
///
/// Converts the stick offset inside its box, as reported by the UI, into a [StickPoint].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StickFrame {
    /// Width of the box the stick moves in
    pub box_width: f64,
    /// Height of the box the stick moves in
    pub box_height: f64,
    /// Width of the stick knob
    pub stick_width: f64,
    /// Height of the stick knob
    pub stick_height: f64,
    /// Y is 0 at the bottom of the box instead of its center
    pub full_range_y: bool,
}

impl StickFrame {
    /// Position of a stick whose top-left corner is at (`left`, `top`) relative to the box
    ///
    /// UI coordinates grow downward, the Y axis is inverted so that up is positive.
    pub fn position(&self, left: f64, top: f64) -> StickPoint {
        let center_x = left + self.stick_width / 2.0;
        let center_y = top + self.stick_height / 2.0;

        let half_width = self.box_width / 2.0;
        let x = ((center_x - half_width) / half_width).clamp(-1.0, 1.0);

        let y = if self.full_range_y {
            (-(center_y - self.box_height) / self.box_height).clamp(0.0, 1.0)
        } else {
            let half_height = self.box_height / 2.0;
            (-(center_y - half_height) / half_height).clamp(-1.0, 1.0)
        };

        StickPoint { x, y }
    }
}

/// Arm and self-level switches shown next to the sticks
#[derive(Debug)]
pub struct Switches {
    armed: AtomicBool,
    self_level: AtomicBool,
}

impl Default for Switches {
    fn default() -> Self {
        Self {
            armed: AtomicBool::new(false),
            self_level: AtomicBool::new(true),
        }
    }
}

impl Switches {
    /// Set the arm switch
    pub fn set_armed(&self, armed: bool) {
        self.armed.store(armed, Relaxed);
    }

    /// Set the self-level switch
    ///
    /// Only reported in [FlightControlAxes::is_self_level_enabled], it does not reach the Crazyflie.
    pub fn set_self_level(&self, enabled: bool) {
        self.self_level.store(enabled, Relaxed);
    }

    /// State of the arm switch
    pub fn is_armed(&self) -> bool {
        self.armed.load(Relaxed)
    }

    /// State of the self-level switch
    pub fn is_self_level_enabled(&self) -> bool {
        self.self_level.load(Relaxed)
    }
}

/// Axis source made of two joysticks
///
/// Mode 2 layout: the left stick X is yaw and its Y (full range) is thrust, the right stick X is roll and its Y
/// is pitch.
pub struct DualStickSource<L, R> {
    left: L,
    right: R,
    switches: Arc<Switches>,
}

impl<L: StickPosition, R: StickPosition> DualStickSource<L, R> {
    /// Create a source from the left and right sticks, disarmed
    pub fn new(left: L, right: R) -> Self {
        Self {
            left,
            right,
            switches: Default::default(),
        }
    }

    /// Switches handle for the UI
    pub fn switches(&self) -> Arc<Switches> {
        self.switches.clone()
    }
}

#[async_trait]
impl<L: StickPosition, R: StickPosition> AxisSource for DualStickSource<L, R> {
    async fn sample(&self) -> FlightControlAxes {
        let (left, right) = futures::join!(self.left.position(), self.right.position());

        FlightControlAxes {
            roll: right.x,
            pitch: right.y,
            yaw: left.x,
            thrust: left.y,
            is_armed: self.switches.is_armed(),
            is_self_level_enabled: self.switches.is_self_level_enabled(),
        }
        .clamped()
    }
}
