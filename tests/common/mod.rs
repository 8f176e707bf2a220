// In-memory GATT host recording every packet written on the basic characteristic

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use crazyflie_ble::link::{
    CharacteristicRole, Delivery, GattCharacteristic, GattHost, GattService, CRTP_CHARACTERISTIC_UUID,
};
use crazyflie_ble::{Error, Result};
use uuid::Uuid;

#[derive(Default)]
struct MockState {
    devices: AtomicUsize,
    discovery_fails: AtomicBool,
    open_fails: AtomicBool,
    service_missing: AtomicBool,
    missing: Mutex<HashSet<Uuid>>,
    unreachable: AtomicBool,
    writes: Mutex<Vec<Vec<u8>>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    released: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MockHost {
    state: Arc<MockState>,
}

impl MockHost {
    pub fn with_devices(devices: usize) -> Self {
        let host = Self::default();
        host.state.devices.store(devices, Relaxed);
        host
    }

    pub fn remove_characteristic(&self, role: CharacteristicRole) {
        self.state.missing.lock().unwrap().insert(role.uuid());
    }

    pub fn set_discovery_fails(&self, fails: bool) {
        self.state.discovery_fails.store(fails, Relaxed);
    }

    pub fn set_open_fails(&self, fails: bool) {
        self.state.open_fails.store(fails, Relaxed);
    }

    pub fn set_service_missing(&self, missing: bool) {
        self.state.service_missing.store(missing, Relaxed);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.unreachable.store(unreachable, Relaxed);
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.writes.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.state.writes.lock().unwrap().len()
    }

    pub fn opened(&self) -> usize {
        self.state.opened.load(Relaxed)
    }

    pub fn closed(&self) -> usize {
        self.state.closed.load(Relaxed)
    }

    pub fn released(&self) -> usize {
        self.state.released.load(Relaxed)
    }

    /// Wait until at least `count` packets have been written
    pub async fn wait_writes(&self, count: usize) -> Vec<Vec<u8>> {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.write_count() < count {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("timed out waiting for commander packets");

        self.writes()
    }
}

#[async_trait]
impl GattHost for MockHost {
    type Device = usize;
    type Service = MockService;

    async fn find_devices(&self, _service: Uuid) -> Result<Vec<usize>> {
        if self.state.discovery_fails.load(Relaxed) {
            return Err(Error::BackendError("adapter powered off".to_owned()));
        }
        Ok((0..self.state.devices.load(Relaxed)).collect())
    }

    async fn open_service(&self, _device: &usize, _service: Uuid) -> Result<Option<MockService>> {
        if self.state.open_fails.load(Relaxed) {
            return Err(Error::BackendError("connection refused".to_owned()));
        }
        if self.state.service_missing.load(Relaxed) {
            return Ok(None);
        }
        self.state.opened.fetch_add(1, Relaxed);
        Ok(Some(MockService {
            state: self.state.clone(),
        }))
    }

    async fn release_device(&self, _device: &usize) {
        self.state.released.fetch_add(1, Relaxed);
    }
}

pub struct MockService {
    state: Arc<MockState>,
}

#[async_trait]
impl GattService for MockService {
    type Characteristic = MockCharacteristic;

    async fn characteristic(&self, uuid: Uuid) -> Result<Option<MockCharacteristic>> {
        if self.state.missing.lock().unwrap().contains(&uuid) {
            return Ok(None);
        }
        Ok(Some(MockCharacteristic {
            uuid,
            state: self.state.clone(),
        }))
    }

    async fn close(&self) {
        self.state.closed.fetch_add(1, Relaxed);
    }
}

pub struct MockCharacteristic {
    uuid: Uuid,
    state: Arc<MockState>,
}

#[async_trait]
impl GattCharacteristic for MockCharacteristic {
    async fn write_with_response(&self, data: &[u8]) -> Result<Delivery> {
        assert_eq!(self.uuid, CRTP_CHARACTERISTIC_UUID, "commander wrote on a fragment characteristic");

        // Link layer round trip
        tokio::time::sleep(Duration::from_millis(1)).await;

        self.state.writes.lock().unwrap().push(data.to_vec());
        if self.state.unreachable.load(Relaxed) {
            Ok(Delivery::Unreachable)
        } else {
            Ok(Delivery::Delivered)
        }
    }
}

/// Decoded CPPM packet channels: roll, pitch, yaw, thrust, armed
pub fn cppm_channels(packet: &[u8]) -> [u16; 5] {
    assert_eq!(&packet[0..3], &[0x70, 0x03, 0x01]);
    let mut channels = [0u16; 5];
    for (i, channel) in channels.iter_mut().enumerate() {
        *channel = u16::from_le_bytes([packet[3 + 2 * i], packet[4 + 2 * i]]);
    }
    channels
}

/// Decoded RPYT packet: roll, pitch, yaw, thrust
pub fn rpyt_fields(packet: &[u8]) -> (f32, f32, f32, u16) {
    assert_eq!(packet.len(), 15);
    assert_eq!(packet[0], 0x30);
    let f = |i: usize| f32::from_le_bytes([packet[i], packet[i + 1], packet[i + 2], packet[i + 3]]);
    (f(1), f(5), f(9), u16::from_le_bytes([packet[13], packet[14]]))
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
