//! # Axis sources
//!
//! Implementations of [AxisSource](crate::axes::AxisSource) that turn operator input into
//! [FlightControlAxes](crate::axes::FlightControlAxes) snapshots:
//!  - [DualStickSource]: two on-screen joysticks, left one for yaw and thrust, right one for roll and pitch.
//!  - [GestureSource]: spatial hand navigation gestures, tap toggles the arm switch.
//!  - [ChannelSource]: snapshots pushed by any producer through a watch channel.
//!
//! The source is picked when creating the [Crazyflie](crate::Crazyflie) and used as a trait object.

mod channel;
mod gesture;
mod joystick;

pub use channel::ChannelSource;
pub use gesture::GestureSource;
pub use joystick::{DualStickSource, SharedStick, StickFrame, StickPoint, StickPosition, Switches};
