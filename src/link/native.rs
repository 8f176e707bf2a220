//! # Native Bluetooth host
//!
//! [GattHost] implementation on top of the btleplug crate, available with the `native` feature.
//!
//! ``` no_run
//! # async fn fly() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use crazyflie_ble::{link::native::NativeHost, sources::ChannelSource, Crazyflie};
//!
//! let host = NativeHost::new().await?;
//! let (source, _sticks) = ChannelSource::new();
//! let cf = Crazyflie::new(host, Arc::new(source), Default::default())?;
//!
//! if cf.is_paired().await {
//!     cf.start().await?;
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, Service, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use log::{debug, warn};
use uuid::Uuid;

use super::{Delivery, GattCharacteristic, GattHost, GattService};
use crate::{Error, Result};

/// Default time spent scanning for advertisements when looking for devices
pub const DEFAULT_SCAN_WINDOW: Duration = Duration::from_secs(2);

/// Bluetooth host backed by the first adapter of the system
pub struct NativeHost {
    adapter: Adapter,
    scan_window: Duration,
    // Peripherals connected by a pending open_service()
    connecting: Mutex<HashSet<PeripheralId>>,
}

impl NativeHost {
    /// Open the first Bluetooth adapter of the system
    pub async fn new() -> Result<Self> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::BackendError("No Bluetooth adapter found".to_owned()))?;

        Ok(Self::from_adapter(adapter))
    }

    /// Use an already opened adapter
    pub fn from_adapter(adapter: Adapter) -> Self {
        Self {
            adapter,
            scan_window: DEFAULT_SCAN_WINDOW,
            connecting: Mutex::new(HashSet::new()),
        }
    }

    /// Change how long discovery listens for advertisements
    pub fn with_scan_window(mut self, scan_window: Duration) -> Self {
        self.scan_window = scan_window;
        self
    }

    fn connecting(&self) -> MutexGuard<'_, HashSet<PeripheralId>> {
        self.connecting.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl GattHost for NativeHost {
    type Device = Peripheral;
    type Service = NativeService;

    async fn find_devices(&self, service: Uuid) -> Result<Vec<Peripheral>> {
        let mut filter = ScanFilter::default();
        filter.services = vec![service];
        self.adapter.start_scan(filter).await?;
        tokio::time::sleep(self.scan_window).await;
        if let Err(e) = self.adapter.stop_scan().await {
            warn!("Failed to stop scanning: {}", e);
        }

        let mut devices = Vec::new();
        for peripheral in self.adapter.peripherals().await? {
            let properties = peripheral.properties().await?;
            if let Some(properties) = properties {
                if properties.services.contains(&service) {
                    debug!("Found {:?} ({:?})", properties.local_name, peripheral.id());
                    devices.push(peripheral);
                }
            }
        }

        Ok(devices)
    }

    async fn open_service(&self, device: &Peripheral, service: Uuid) -> Result<Option<NativeService>> {
        if !device.is_connected().await? {
            device.connect().await?;
            self.connecting().insert(device.id());
        }
        device.discover_services().await?;

        let service = device
            .services()
            .into_iter()
            .find(|s| s.uuid == service)
            .map(|service| NativeService {
                peripheral: device.clone(),
                service,
            });

        // The service now owns the connection
        if service.is_some() {
            self.connecting().remove(&device.id());
        }

        Ok(service)
    }

    async fn release_device(&self, device: &Peripheral) {
        if !self.connecting().remove(&device.id()) {
            return;
        }

        debug!("Disconnecting {:?}, no usable CRTP service", device.id());
        if let Err(e) = device.disconnect().await {
            warn!("Failed to disconnect: {}", e);
        }
    }
}

/// GATT service of a connected peripheral
pub struct NativeService {
    peripheral: Peripheral,
    service: Service,
}

#[async_trait]
impl GattService for NativeService {
    type Characteristic = NativeCharacteristic;

    async fn characteristic(&self, uuid: Uuid) -> Result<Option<NativeCharacteristic>> {
        Ok(self
            .service
            .characteristics
            .iter()
            .find(|c| c.uuid == uuid)
            .map(|characteristic| NativeCharacteristic {
                peripheral: self.peripheral.clone(),
                characteristic: characteristic.clone(),
            }))
    }

    async fn close(&self) {
        if let Err(e) = self.peripheral.disconnect().await {
            warn!("Failed to disconnect: {}", e);
        }
    }
}

/// Characteristic of a connected peripheral
pub struct NativeCharacteristic {
    peripheral: Peripheral,
    characteristic: Characteristic,
}

#[async_trait]
impl GattCharacteristic for NativeCharacteristic {
    async fn write_with_response(&self, data: &[u8]) -> Result<Delivery> {
        match self
            .peripheral
            .write(&self.characteristic, data, WriteType::WithResponse)
            .await
        {
            Ok(()) => Ok(Delivery::Delivered),
            Err(btleplug::Error::NotConnected) | Err(btleplug::Error::TimedOut(_)) => {
                Ok(Delivery::Unreachable)
            }
            Err(e) => Err(e.into()),
        }
    }
}
