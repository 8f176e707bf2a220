use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use log::debug;

use crate::axes::{AxisSource, FlightControlAxes};

#[derive(Debug, Default, Clone, Copy)]
struct GestureState {
    offset: [f64; 3],
    armed: bool,
}

/// Axis source driven by spatial navigation gestures
///
/// The gesture recognizer reports a normalized hand offset while a navigation gesture is held:
///  - X (right) is roll
///  - Y (up) is thrust, moving the hand down gives no thrust
///  - Z (toward the user) is inverted pitch
///
/// There is no yaw. A tap toggles the arm switch and ending or canceling the navigation disarms and re-centers.
///
/// The recognizer callbacks and the commander loop can run on different threads, the state is only ever read and
/// written as a whole.
#[derive(Debug, Default)]
pub struct GestureSource {
    state: Mutex<GestureState>,
}

impl GestureSource {
    /// Create a centered, disarmed source
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&self, f: impl FnOnce(&mut GestureState)) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state);
    }

    fn snapshot(&self) -> GestureState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// New normalized offset of the navigation gesture
    pub fn navigation_updated(&self, x: f64, y: f64, z: f64) {
        self.update(|state| state.offset = [x, y, z]);
    }

    /// The navigation gesture ended
    pub fn navigation_completed(&self) {
        debug!("Navigation completed");
        self.update(|state| *state = GestureState::default());
    }

    /// The navigation gesture was canceled
    pub fn navigation_canceled(&self) {
        debug!("Navigation canceled");
        self.update(|state| *state = GestureState::default());
    }

    /// Tap gesture, toggles the arm switch
    pub fn tapped(&self) {
        self.update(|state| state.armed = !state.armed);
    }

    /// Current state of the arm switch
    pub fn is_armed(&self) -> bool {
        self.snapshot().armed
    }
}

#[async_trait]
impl AxisSource for GestureSource {
    async fn sample(&self) -> FlightControlAxes {
        let state = self.snapshot();
        let [x, y, z] = state.offset;

        FlightControlAxes {
            roll: x,
            pitch: -z,
            yaw: 0.0,
            thrust: y.max(0.0),
            is_armed: state.armed,
            is_self_level_enabled: true,
        }
        .clamped()
    }
}
