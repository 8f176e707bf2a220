use async_trait::async_trait;
use tokio::sync::watch;

use crate::axes::{AxisSource, FlightControlAxes};

/// Axis source fed through a [watch] channel
///
/// The producer publishes whole snapshots with [watch::Sender::send()], the commander loop always samples the
/// latest one. Once the sender is dropped the last published snapshot keeps being sampled.
///
/// ```
/// # use crazyflie_ble::{axes::{AxisSource, FlightControlAxes}, sources::ChannelSource};
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (source, sticks) = ChannelSource::new();
/// sticks.send_replace(FlightControlAxes { thrust: 0.5, ..Default::default() });
///
/// assert_eq!(source.sample().await.thrust, 0.5);
/// # }
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: watch::Receiver<FlightControlAxes>,
}

impl ChannelSource {
    /// Create a source starting with centered sticks, disarmed
    pub fn new() -> (Self, watch::Sender<FlightControlAxes>) {
        let (sender, receiver) = watch::channel(FlightControlAxes::default());
        (Self { receiver }, sender)
    }

    /// Create a source from an existing receiver
    pub fn from_receiver(receiver: watch::Receiver<FlightControlAxes>) -> Self {
        Self { receiver }
    }
}

#[async_trait]
impl AxisSource for ChannelSource {
    async fn sample(&self) -> FlightControlAxes {
        self.receiver.borrow().clamped()
    }
}
