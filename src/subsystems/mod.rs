//! # Crazyflie subsystems
//!
//! The Crazyflie firmware, as well as the CRTP protocol used to communicate with it, is organized in logical
//! subsystems. Only the commander side is needed to fly over BLE: building setpoints from the sticks and making sure
//! the first of them cannot spin the motors up.

pub mod commander;
pub mod interlock;
