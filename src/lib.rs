//! # Crazyflie BLE commander
//!
//! This crate flies a Crazyflie over Bluetooth Low Energy: it samples operator input, turns it into commander
//! setpoints and writes them continuously on the Crazyflie CRTP GATT service.
//!
//! ## Status
//!
//! Only the commander side of the protocol is implemented:
//!
//! | Setpoint | Port | Support |
//! |-----------|------|---------|
//! | Legacy RPYT | Commander (3) | Full |
//! | CPPM emulation | Generic commander (7) | Full, one aux channel (arm) |
//!
//! Packets are limited to the 20 bytes of the basic CRTP characteristic. The up/down characteristics used for
//! fragmented packets are resolved but not used, there is no downlink (log, param, console) support.
//!
//! ## Usage
//!
//! The basic procedure to use the lib is:
//!  - Pick a Bluetooth host, `link::native::NativeHost` with the `native` feature or your own
//!    [GattHost](link::GattHost) implementation
//!  - Pick an [AxisSource](axes::AxisSource), for example one of the [sources]
//!  - Create a [Crazyflie] with a [CommanderConfig](config::CommanderConfig)
//!  - Call [Crazyflie::start()] to send setpoints and [Crazyflie::stop()] to end
//!
//! All functions only take an un-mutable reference to self (`&self`), the intention is for the [Crazyflie] object
//! to be shared between tasks using `Arc<>`.
//!
//! For example:
//! ``` no_run
//! # use std::sync::Arc;
//! # use crazyflie_ble::{link::GattHost, sources::GestureSource, Crazyflie};
//! # async fn fly(host: impl GattHost) -> Result<(), Box<dyn std::error::Error>> {
//! let gestures = Arc::new(GestureSource::new());
//! let cf = Crazyflie::new(host, gestures.clone(), Default::default())?;
//!
//! if !cf.is_paired().await {
//!     println!("Pair the Crazyflie first!");
//!     return Ok(());
//! }
//!
//! cf.start().await?;
//!
//! // Feed the gesture recognizer events to `gestures` ...
//!
//! cf.stop().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod crazyflie;
mod error;

pub mod axes;
pub mod config;
pub mod link;
pub mod sources;
pub mod subsystems;

pub use crate::axes::{AxisSource, FlightControlAxes};
pub use crate::config::{CommanderConfig, PacketFormat, Tuning};
pub use crate::crazyflie::{Crazyflie, LinkState, LinkStatistics};
pub use crate::error::{Error, Result};
