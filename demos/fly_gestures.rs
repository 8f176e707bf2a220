use std::sync::Arc;

use crazyflie_ble::link::native::NativeHost;
use crazyflie_ble::sources::GestureSource;
use crazyflie_ble::{CommanderConfig, Crazyflie, PacketFormat};
use tokio::time::{sleep, Duration};

/// Fly a short scripted gesture sequence over BLE

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let host = NativeHost::new().await?;
    let gestures = Arc::new(GestureSource::new());
    let crazyflie = Crazyflie::new(
        host,
        gestures.clone(),
        CommanderConfig {
            format: PacketFormat::Cppm,
            disarm_on_stop: true,
            ..Default::default()
        },
    )?;

    if !crazyflie.is_paired().await {
        println!("No Crazyflie found, pair it first");
        return Ok(());
    }

    crazyflie.start().await?;
    println!("Commander link running");

    // Settle disarmed so that the thrust lock is released
    sleep(Duration::from_millis(500)).await;

    // Tap to arm
    gestures.tapped();
    println!("Armed: {}", gestures.is_armed());

    // Raise the hand slowly, then come back down
    for y in (0..=10).chain((0..10).rev()) {
        gestures.navigation_updated(0.0, y as f64 / 25.0, 0.0);
        sleep(Duration::from_millis(100)).await;
    }

    // Releasing the gesture disarms and re-centers
    gestures.navigation_completed();
    sleep(Duration::from_millis(200)).await;

    crazyflie.stop().await;
    println!("{:?}", crazyflie.statistics().await);

    Ok(())
}
