// Test that the Crazyflie object can be sent between threads and shared between tasks

mod common;

use std::sync::Arc;
use std::thread::spawn;

use common::MockHost;
use crazyflie_ble::sources::{DualStickSource, SharedStick};
use crazyflie_ble::{Crazyflie, LinkState};

fn assert_send_sync<T: Send + Sync + 'static>() {}

#[test]
fn crazyflie_is_send_and_sync() {
    assert_send_sync::<Crazyflie<MockHost>>();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn crazyflie_can_be_sent_to_thread() -> Result<(), Box<dyn std::error::Error>> {
    let host = MockHost::with_devices(1);
    let sticks = DualStickSource::new(Arc::new(SharedStick::default()), Arc::new(SharedStick::default()));
    let cf = Crazyflie::new(host.clone(), Arc::new(sticks), Default::default())?;

    let cf = spawn(move || cf).join().unwrap();

    let cf = Arc::new(cf);
    let task_cf = cf.clone();
    tokio::spawn(async move { task_cf.start().await }).await??;
    assert_eq!(cf.state(), LinkState::Running);

    host.wait_writes(3).await;
    cf.stop().await;
    assert_eq!(cf.state(), LinkState::Stopped);

    Ok(())
}
