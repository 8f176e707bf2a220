//! # Low level setpoints
//!
//! The commander setpoints are described as low-level in the sense that they are setting the instant target state.
//! As such they need to be sent continuously for the Crazyflie to follow the sticks, this is what the commander loop
//! of [Crazyflie](crate::Crazyflie) does.
//!
//! Two packet formats are supported:
//!  - [RpytSetpoint]: the legacy roll/pitch/yawrate/thrust setpoint on the commander port. Roll and pitch are angles
//!    in degrees, yaw is a rate in degrees per second and thrust is a 16 bit value (0 = 0%, 65535 = 100%).
//!  - [CppmSetpoint]: the CPPM emulation setpoint on the generic commander port. Every axis is an RC style pulse
//!    width between 1000 and 2000 and one auxiliary channel carries the arm switch.
//!
//! The packets are parsed positionally by the firmware: there is no length or type tag beside the CRTP header, so
//! the field order and byte order below are part of the protocol.
//!
//! ```
//! # use crazyflie_ble::subsystems::commander::{RpytSetpoint, COMMANDER_HEADER};
//! let setpoint = RpytSetpoint { roll: 0.0, pitch: 0.0, yaw: 0.0, thrust: 10_000 };
//! let packet = setpoint.encode();
//!
//! assert_eq!(packet[0], COMMANDER_HEADER);
//! assert_eq!(&packet[13..15], &10_000u16.to_le_bytes());
//! ```

use crate::axes::FlightControlAxes;
use crate::config::{PacketFormat, Tuning};

/// CRTP header of the commander port (port 3, link 0, channel 0)
pub const COMMANDER_HEADER: u8 = 0x30;
/// CRTP header of the generic commander port (port 7, link 0, channel 0)
pub const GENERIC_COMMANDER_HEADER: u8 = 0x70;

// Generic setpoint type identifiers
const TYPE_CPPM_EMU: u8 = 3;

const CPPM_AUX_CHANNELS: u8 = 1;

/// Size in bytes of an encoded [RpytSetpoint]
pub const RPYT_PACKET_SIZE: usize = 15;
/// Size in bytes of an encoded [CppmSetpoint]
pub const CPPM_PACKET_SIZE: usize = 3 + 2 * (4 + CPPM_AUX_CHANNELS as usize);

/// Lowest CPPM pulse width
pub const CPPM_MIN: u16 = 1000;
/// Centered CPPM pulse width
pub const CPPM_CENTER: u16 = 1500;
/// Highest CPPM pulse width
pub const CPPM_MAX: u16 = 2000;

const CPPM_HALF_RANGE: f64 = 500.0;
const CPPM_RANGE: f64 = 1000.0;

const RPYT_THRUST_SCALE: f64 = 65536.0;

/// # Legacy RPYT setpoint
///
/// This setpoint was originally the only one present in the Crazyflie. The thrust is locked by the firmware
/// until a setpoint with `thrust = 0` has been received.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RpytSetpoint {
    /// Desired roll angle (degrees)
    pub roll: f32,
    /// Desired pitch angle (degrees)
    pub pitch: f32,
    /// Desired yaw rate (degrees/second)
    pub yaw: f32,
    /// Thrust as a 16-bit value
    pub thrust: u16,
}

impl RpytSetpoint {
    /// Scale the axes to a setpoint
    ///
    /// Roll and pitch reach `max_pitch_roll_rate` at full deflection, yaw reaches `max_yaw_rate` and thrust reaches
    /// `max_thrust_percent` of the full 16 bit range.
    pub fn from_axes(axes: &FlightControlAxes, tuning: &Tuning) -> Self {
        let axes = axes.clamped();

        Self {
            roll: (axes.roll * tuning.max_pitch_roll_rate) as f32,
            pitch: (axes.pitch * tuning.max_pitch_roll_rate) as f32,
            yaw: (axes.yaw * tuning.max_yaw_rate) as f32,
            // Float to integer casts saturate, 100% of 65536 lands on 65535
            thrust: (axes.thrust * tuning.max_thrust_percent * RPYT_THRUST_SCALE) as u16,
        }
    }

    /// Serialize the setpoint as a commander CRTP packet
    pub fn encode(&self) -> [u8; RPYT_PACKET_SIZE] {
        let mut packet = [0u8; RPYT_PACKET_SIZE];
        packet[0] = COMMANDER_HEADER;
        packet[1..5].copy_from_slice(&self.roll.to_le_bytes());
        packet[5..9].copy_from_slice(&self.pitch.to_le_bytes());
        packet[9..13].copy_from_slice(&self.yaw.to_le_bytes());
        packet[13..15].copy_from_slice(&self.thrust.to_le_bytes());
        packet
    }
}

/// # CPPM emulation setpoint
///
/// Generic commander setpoint emulating an RC receiver: each channel is a pulse width in microseconds between
/// [CPPM_MIN] and [CPPM_MAX]. The arm switch is sent on the only auxiliary channel, a disarmed Crazyflie keeps its
/// motors stopped whatever the other channels say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CppmSetpoint {
    /// Roll channel
    pub roll: u16,
    /// Pitch channel
    pub pitch: u16,
    /// Yaw channel
    pub yaw: u16,
    /// Thrust channel
    pub thrust: u16,
    /// Arm switch channel
    pub armed: u16,
}

/// Centered sticks, no thrust, disarmed
impl Default for CppmSetpoint {
    fn default() -> Self {
        Self {
            roll: CPPM_CENTER,
            pitch: CPPM_CENTER,
            yaw: CPPM_CENTER,
            thrust: CPPM_MIN,
            armed: CPPM_MIN,
        }
    }
}

impl CppmSetpoint {
    /// Map the axes to CPPM channels
    ///
    /// `max_pitch_roll_rate` and `max_yaw_rate` do not apply here, the firmware holds the rate limits for this
    /// setpoint.
    pub fn from_axes(axes: &FlightControlAxes, tuning: &Tuning) -> Self {
        let axes = axes.clamped();

        Self {
            roll: bipolar_channel(axes.roll),
            pitch: bipolar_channel(axes.pitch),
            yaw: bipolar_channel(axes.yaw),
            thrust: thrust_channel(axes.thrust, tuning.max_thrust_percent),
            armed: switch_channel(axes.is_armed),
        }
    }

    /// True if the arm channel is high
    pub fn is_armed(&self) -> bool {
        self.armed >= CPPM_MAX
    }

    /// Same setpoint with the arm channel low
    pub fn disarmed(self) -> Self {
        Self {
            armed: CPPM_MIN,
            ..self
        }
    }

    /// Serialize the setpoint as a generic commander CRTP packet
    pub fn encode(&self) -> [u8; CPPM_PACKET_SIZE] {
        let mut packet = [0u8; CPPM_PACKET_SIZE];
        packet[0] = GENERIC_COMMANDER_HEADER;
        packet[1] = TYPE_CPPM_EMU;
        packet[2] = CPPM_AUX_CHANNELS;

        let channels = [self.roll, self.pitch, self.yaw, self.thrust, self.armed];
        for (i, channel) in channels.iter().enumerate() {
            let offset = 3 + 2 * i;
            packet[offset..offset + 2].copy_from_slice(&channel.to_le_bytes());
        }

        packet
    }
}

/// Map a bipolar axis in [-1, 1] to a [1000, 2000] pulse width, 0 and NaN map to the center
pub fn bipolar_channel(value: f64) -> u16 {
    let value = if value.is_nan() { 0.0 } else { value.clamp(-1.0, 1.0) };
    ((value * CPPM_HALF_RANGE).round() + CPPM_CENTER as f64) as u16
}

/// Map a thrust in [0, 1] to a pulse width, full throttle maps to `1000 + 1000 * max_thrust_percent`
///
/// NaN is no thrust.
pub fn thrust_channel(thrust: f64, max_thrust_percent: f64) -> u16 {
    let thrust = if thrust.is_nan() { 0.0 } else { thrust.clamp(0.0, 1.0) };
    ((thrust * CPPM_RANGE * max_thrust_percent).round() + CPPM_MIN as f64) as u16
}

/// Map a switch to a pulse width
pub fn switch_channel(on: bool) -> u16 {
    if on {
        CPPM_MAX
    } else {
        CPPM_MIN
    }
}

/// Commander setpoint in one of the supported [PacketFormat]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setpoint {
    /// Legacy commander setpoint
    Rpyt(RpytSetpoint),
    /// Generic commander CPPM emulation setpoint
    Cppm(CppmSetpoint),
}

impl Setpoint {
    /// Scale an axes snapshot into a setpoint of the requested format
    pub fn from_axes(axes: &FlightControlAxes, format: PacketFormat, tuning: &Tuning) -> Self {
        match format {
            PacketFormat::Rpyt => Setpoint::Rpyt(RpytSetpoint::from_axes(axes, tuning)),
            PacketFormat::Cppm => Setpoint::Cppm(CppmSetpoint::from_axes(axes, tuning)),
        }
    }

    /// Fully de-energized and disarmed setpoint
    pub fn de_energized(format: PacketFormat) -> Self {
        match format {
            PacketFormat::Rpyt => Setpoint::Rpyt(RpytSetpoint::default()),
            PacketFormat::Cppm => Setpoint::Cppm(CppmSetpoint::default()),
        }
    }

    /// Format of this setpoint
    pub fn format(&self) -> PacketFormat {
        match self {
            Setpoint::Rpyt(_) => PacketFormat::Rpyt,
            Setpoint::Cppm(_) => PacketFormat::Cppm,
        }
    }

    /// Serialize the setpoint to the bytes written on the link
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Setpoint::Rpyt(setpoint) => setpoint.encode().to_vec(),
            Setpoint::Cppm(setpoint) => setpoint.encode().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axes(roll: f64, pitch: f64, yaw: f64, thrust: f64) -> FlightControlAxes {
        FlightControlAxes {
            roll,
            pitch,
            yaw,
            thrust,
            ..Default::default()
        }
    }

    #[test]
    fn rpyt_packet_layout() {
        let setpoint = RpytSetpoint {
            roll: 12.5,
            pitch: -7.25,
            yaw: 100.0,
            thrust: 0xBEEF,
        };
        let packet = setpoint.encode();

        assert_eq!(packet.len(), 15);
        assert_eq!(packet[0], 0x30);
        assert_eq!(&packet[1..5], &12.5f32.to_le_bytes());
        assert_eq!(&packet[5..9], &(-7.25f32).to_le_bytes());
        assert_eq!(&packet[9..13], &100.0f32.to_le_bytes());
        assert_eq!(&packet[13..15], &[0xEF, 0xBE]);
    }

    #[test]
    fn rpyt_scaling_uses_tuning() {
        let tuning = Tuning::default();
        let setpoint = RpytSetpoint::from_axes(&axes(1.0, -0.5, 0.25, 0.5), &tuning);

        assert_eq!(setpoint.roll, 30.0);
        assert_eq!(setpoint.pitch, -15.0);
        assert_eq!(setpoint.yaw, 50.0);
        assert_eq!(setpoint.thrust, (0.5 * 0.8 * 65536.0) as u16);
    }

    #[test]
    fn rpyt_full_thrust_saturates() {
        let tuning = Tuning {
            max_thrust_percent: 1.0,
            ..Default::default()
        };
        let setpoint = RpytSetpoint::from_axes(&axes(0.0, 0.0, 0.0, 1.0), &tuning);
        assert_eq!(setpoint.thrust, u16::MAX);
    }

    #[test]
    fn cppm_packet_layout() {
        let setpoint = CppmSetpoint {
            roll: 2000,
            pitch: 1000,
            yaw: 1750,
            thrust: 1800,
            armed: 1000,
        };
        let packet = setpoint.encode();

        assert_eq!(packet.len(), CPPM_PACKET_SIZE);
        assert_eq!(&packet[0..3], &[0x70, 0x03, 0x01]);
        assert_eq!(&packet[3..5], &2000u16.to_le_bytes());
        assert_eq!(&packet[5..7], &1000u16.to_le_bytes());
        assert_eq!(&packet[7..9], &1750u16.to_le_bytes());
        assert_eq!(&packet[9..11], &1800u16.to_le_bytes());
        assert_eq!(&packet[11..13], &1000u16.to_le_bytes());
    }

    #[test]
    fn cppm_bipolar_endpoints() {
        assert_eq!(bipolar_channel(-1.0), 1000);
        assert_eq!(bipolar_channel(0.0), 1500);
        assert_eq!(bipolar_channel(1.0), 2000);

        for i in -100..=100 {
            let channel = bipolar_channel(i as f64 / 100.0);
            assert!((CPPM_MIN..=CPPM_MAX).contains(&channel));
        }
    }

    #[test]
    fn self_level_is_not_on_the_wire() {
        let tuning = Tuning::default();
        let leveled = FlightControlAxes {
            is_self_level_enabled: true,
            ..axes(0.2, -0.4, 0.1, 0.6)
        };
        let acro = FlightControlAxes {
            is_self_level_enabled: false,
            ..leveled
        };

        for format in [PacketFormat::Rpyt, PacketFormat::Cppm] {
            assert_eq!(
                Setpoint::from_axes(&leveled, format, &tuning).encode(),
                Setpoint::from_axes(&acro, format, &tuning).encode()
            );
        }
    }

    #[test]
    fn cppm_nan_stays_in_range() {
        assert_eq!(bipolar_channel(f64::NAN), CPPM_CENTER);
        assert_eq!(thrust_channel(f64::NAN, 0.8), CPPM_MIN);
        assert_eq!(thrust_channel(f64::INFINITY, 0.8), 1800);
    }

    #[test]
    fn cppm_thrust_is_bounded_by_max_thrust() {
        for i in 0..=100 {
            let channel = thrust_channel(i as f64 / 100.0, 0.8);
            assert!((1000..=1800).contains(&channel));
        }
        assert_eq!(thrust_channel(0.0, 0.8), 1000);
        assert_eq!(thrust_channel(1.0, 0.8), 1800);
    }

    #[test]
    fn cppm_scenario() {
        let mut snapshot = axes(1.0, -1.0, 0.5, 1.0);
        snapshot.is_armed = true;
        let setpoint = CppmSetpoint::from_axes(&snapshot, &Tuning::default());

        assert_eq!(
            setpoint,
            CppmSetpoint {
                roll: 2000,
                pitch: 1000,
                yaw: 1750,
                thrust: 1800,
                armed: 2000,
            }
        );
        assert!(setpoint.is_armed());
        assert!(!setpoint.disarmed().is_armed());
    }

    #[test]
    fn de_energized_setpoints() {
        assert_eq!(
            Setpoint::de_energized(PacketFormat::Rpyt).encode(),
            [&[0x30u8][..], &[0u8; 14][..]].concat()
        );

        let cppm = Setpoint::de_energized(PacketFormat::Cppm);
        assert_eq!(cppm.format(), PacketFormat::Cppm);
        assert_eq!(
            cppm,
            Setpoint::Cppm(CppmSetpoint {
                roll: 1500,
                pitch: 1500,
                yaw: 1500,
                thrust: 1000,
                armed: 1000,
            })
        );
    }
}
