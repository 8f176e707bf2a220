//! # Thrust lock
//!
//! Guards the first packets sent after the link is resolved so that a stale or garbage stick position cannot spin
//! the motors up as soon as the Crazyflie is connected.
//!
//! The policy depends on the packet format:
//!  - [RpytSetpoint](super::commander::RpytSetpoint) has no arm channel. The first packet is replaced by an all-zero
//!    setpoint, which is also what unlocks the firmware thrust lock. The lock clears once that first write has been
//!    attempted, delivered or not.
//!  - [CppmSetpoint](super::commander::CppmSetpoint) carries an arm channel, which is the authoritative disarm signal.
//!    The first packet is always disarmed and the arm channel stays low until the operator has been seen with the
//!    arm switch off. Arming therefore needs an explicit off-to-on transition after connecting.

use log::{debug, info};

use super::commander::Setpoint;
use crate::axes::FlightControlAxes;
use crate::config::PacketFormat;

/// Release policy of a [ThrustLock]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPolicy {
    /// Replace exactly one packet by a de-energized setpoint
    OneShot,
    /// Keep the arm channel low until a disarmed snapshot is observed
    ArmEdge,
}

impl From<PacketFormat> for LockPolicy {
    fn from(format: PacketFormat) -> Self {
        match format {
            PacketFormat::Rpyt => LockPolicy::OneShot,
            PacketFormat::Cppm => LockPolicy::ArmEdge,
        }
    }
}

/// Safety interlock applied by the commander loop, one per run
#[derive(Debug)]
pub struct ThrustLock {
    policy: LockPolicy,
    first_written: bool,
    disarm_seen: bool,
}

impl ThrustLock {
    /// Create an engaged lock
    pub fn new(policy: LockPolicy) -> Self {
        Self {
            policy,
            first_written: false,
            disarm_seen: false,
        }
    }

    /// Policy of this lock
    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    /// True while the lock still alters outgoing setpoints
    pub fn is_engaged(&self) -> bool {
        match self.policy {
            LockPolicy::OneShot => !self.first_written,
            LockPolicy::ArmEdge => !self.first_written || !self.disarm_seen,
        }
    }

    /// Gate the setpoint computed from `axes`
    pub fn gate(&mut self, axes: &FlightControlAxes, setpoint: Setpoint) -> Setpoint {
        if !axes.is_armed && !self.disarm_seen {
            debug!("Disarmed snapshot observed");
            self.disarm_seen = true;
        }

        if !self.is_engaged() {
            return setpoint;
        }

        match (self.policy, setpoint) {
            (LockPolicy::OneShot, setpoint) => Setpoint::de_energized(setpoint.format()),
            (LockPolicy::ArmEdge, Setpoint::Cppm(cppm)) => Setpoint::Cppm(cppm.disarmed()),
            // No arm channel to hold low
            (LockPolicy::ArmEdge, setpoint) => Setpoint::de_energized(setpoint.format()),
        }
    }

    /// Record that a gated packet was handed to the link, whatever the delivery outcome
    pub fn written(&mut self) {
        let was_engaged = self.is_engaged();
        self.first_written = true;
        if was_engaged && !self.is_engaged() {
            info!("Thrust lock released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tuning;
    use crate::subsystems::commander::{CppmSetpoint, RpytSetpoint};

    fn full_stick(is_armed: bool) -> FlightControlAxes {
        FlightControlAxes {
            roll: 1.0,
            pitch: 1.0,
            yaw: -1.0,
            thrust: 1.0,
            is_armed,
            is_self_level_enabled: true,
        }
    }

    #[test]
    fn one_shot_zeroes_only_the_first_packet() {
        let axes = full_stick(true);
        let tuning = Tuning::default();
        let mut lock = ThrustLock::new(LockPolicy::OneShot);

        let first = lock.gate(&axes, Setpoint::from_axes(&axes, PacketFormat::Rpyt, &tuning));
        assert_eq!(first, Setpoint::Rpyt(RpytSetpoint::default()));
        lock.written();
        assert!(!lock.is_engaged());

        let live = Setpoint::from_axes(&axes, PacketFormat::Rpyt, &tuning);
        assert_eq!(lock.gate(&axes, live), live);
    }

    #[test]
    fn arm_edge_keeps_stale_arm_low() {
        let tuning = Tuning::default();
        let mut lock = ThrustLock::new(LockPolicy::ArmEdge);

        // Stale "armed" reading at connect
        for _ in 0..5 {
            let axes = full_stick(true);
            let gated = lock.gate(&axes, Setpoint::from_axes(&axes, PacketFormat::Cppm, &tuning));
            match gated {
                Setpoint::Cppm(cppm) => {
                    assert!(!cppm.is_armed());
                    assert_eq!(cppm.roll, 2000);
                }
                _ => panic!("format changed"),
            }
            lock.written();
        }
        assert!(lock.is_engaged());

        // Operator switches off then on again
        let off = full_stick(false);
        lock.gate(&off, Setpoint::from_axes(&off, PacketFormat::Cppm, &tuning));
        lock.written();
        assert!(!lock.is_engaged());

        let on = full_stick(true);
        let live = Setpoint::from_axes(&on, PacketFormat::Cppm, &tuning);
        assert_eq!(lock.gate(&on, live), live);
    }

    #[test]
    fn arm_edge_first_packet_is_disarmed() {
        let tuning = Tuning::default();
        let mut lock = ThrustLock::new(PacketFormat::Cppm.into());
        let axes = full_stick(false);

        let first = lock.gate(&axes, Setpoint::from_axes(&axes, PacketFormat::Cppm, &tuning));
        assert_eq!(
            first,
            Setpoint::Cppm(CppmSetpoint::from_axes(&axes, &tuning).disarmed())
        );
        assert!(lock.is_engaged());
        lock.written();
        assert!(!lock.is_engaged());
    }
}
