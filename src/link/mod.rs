//! # BLE link
//!
//! The Crazyflie exposes CRTP over Bluetooth Low Energy as one GATT service with three characteristics:
//!  - **basic**: carries one whole CRTP packet per write, up to [BASIC_MTU] bytes. This is the only one used by the
//!    commander.
//!  - **up** and **down**: reserved for packets larger than the basic MTU. They are resolved with the service so that
//!    the link is ready for a fragmenting encoder, no such encoder exists yet.
//!
//! The Bluetooth stack itself is abstracted by the [GattHost], [GattService] and [GattCharacteristic] traits. With
//! the `native` feature, `native::NativeHost` implements them on top of btleplug.

use std::fmt;

use async_trait::async_trait;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::{Error, Result};

#[cfg(feature = "native")]
pub mod native;

/// Crazyflie CRTP GATT service
pub const CRTP_SERVICE_UUID: Uuid = Uuid::from_u128(0x00000201_1c7f_4f9e_947b_43b7c00a9a08);
/// Characteristic carrying whole CRTP packets
pub const CRTP_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x00000202_1c7f_4f9e_947b_43b7c00a9a08);
/// Characteristic for fragmented uplink packets
pub const CRTP_UP_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x00000203_1c7f_4f9e_947b_43b7c00a9a08);
/// Characteristic for fragmented downlink packets
pub const CRTP_DOWN_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x00000204_1c7f_4f9e_947b_43b7c00a9a08);

/// Largest packet accepted by the basic characteristic
pub const BASIC_MTU: usize = 20;

/// Outcome of an acknowledged write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The peripheral link layer acknowledged the write
    Delivered,
    /// The peripheral could not be reached
    Unreachable,
}

/// Role of a characteristic in the CRTP service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacteristicRole {
    /// Whole packets up to [BASIC_MTU]
    Basic,
    /// Fragmented uplink
    Up,
    /// Fragmented downlink
    Down,
}

impl CharacteristicRole {
    /// Well-known identifier of the characteristic
    pub fn uuid(&self) -> Uuid {
        match self {
            CharacteristicRole::Basic => CRTP_CHARACTERISTIC_UUID,
            CharacteristicRole::Up => CRTP_UP_CHARACTERISTIC_UUID,
            CharacteristicRole::Down => CRTP_DOWN_CHARACTERISTIC_UUID,
        }
    }
}

impl fmt::Display for CharacteristicRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharacteristicRole::Basic => write!(f, "basic"),
            CharacteristicRole::Up => write!(f, "up"),
            CharacteristicRole::Down => write!(f, "down"),
        }
    }
}

/// Bluetooth host able to find and open GATT services
#[async_trait]
pub trait GattHost: Send + Sync + 'static {
    /// Handle of a device known to the host
    type Device: fmt::Debug + Send + Sync;
    /// Opened service
    type Service: GattService;

    /// List the paired or visible devices exposing `service`
    ///
    /// This does not connect to anything.
    async fn find_devices(&self, service: Uuid) -> Result<Vec<Self::Device>>;

    /// Open `service` on `device`, returns `None` if the device does not expose it
    async fn open_service(&self, device: &Self::Device, service: Uuid) -> Result<Option<Self::Service>>;

    /// Release whatever a failed [GattHost::open_service()] acquired on `device`
    ///
    /// Called when opening fails or finds no service. Once a service is opened it is released with
    /// [GattService::close()] instead.
    async fn release_device(&self, _device: &Self::Device) {}
}

/// Opened GATT service
#[async_trait]
pub trait GattService: Send + Sync + 'static {
    /// Characteristic of the service
    type Characteristic: GattCharacteristic;

    /// Look up a characteristic of the service by identifier
    async fn characteristic(&self, uuid: Uuid) -> Result<Option<Self::Characteristic>>;

    /// Release the service
    async fn close(&self) {}
}

/// GATT characteristic that can be written
#[async_trait]
pub trait GattCharacteristic: Send + Sync + 'static {
    /// Write `data` and wait for the peripheral to acknowledge it
    async fn write_with_response(&self, data: &[u8]) -> Result<Delivery>;
}

/// Transport to the Crazyflie CRTP service
///
/// The link holds no connection by itself, every call to [BleLink::resolve()] creates a new [LinkEndpoint].
pub struct BleLink<H: GattHost> {
    host: H,
}

impl<H: GattHost> BleLink<H> {
    /// Create a link on top of a Bluetooth host
    pub fn new(host: H) -> Self {
        Self { host }
    }

    /// Access the Bluetooth host
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Returns true if at least one device exposing the CRTP service is known to the host
    ///
    /// A paired Crazyflie is not necessarily connected or even connectable. Discovery errors are logged and reported
    /// as not paired.
    pub async fn is_paired(&self) -> bool {
        match self.host.find_devices(CRTP_SERVICE_UUID).await {
            Ok(devices) => {
                debug!("Found {} device(s) with the CRTP service", devices.len());
                !devices.is_empty()
            }
            Err(e) => {
                warn!("CRTP service discovery failed: {}", e);
                false
            }
        }
    }

    /// Open the CRTP service of the first discovered device and look up its characteristics
    ///
    /// Succeeds only if the service and all three characteristics are found.
    pub async fn resolve(&self) -> Result<LinkEndpoint<H::Service>> {
        let devices = self.host.find_devices(CRTP_SERVICE_UUID).await?;
        let device = devices.first().ok_or(Error::NotPaired)?;

        debug!("Opening CRTP service on {:?}", device);
        let service = match self.host.open_service(device, CRTP_SERVICE_UUID).await {
            Ok(Some(service)) => service,
            Ok(None) => {
                self.host.release_device(device).await;
                return Err(Error::ServiceUnavailable);
            }
            Err(e) => {
                self.host.release_device(device).await;
                return Err(e);
            }
        };

        let basic = find_characteristic(&service, CharacteristicRole::Basic).await;
        let up = find_characteristic(&service, CharacteristicRole::Up).await;
        let down = find_characteristic(&service, CharacteristicRole::Down).await;

        match (basic, up, down) {
            (Ok(basic), Ok(up), Ok(down)) => {
                info!("CRTP link resolved on {:?}", device);
                Ok(LinkEndpoint {
                    service,
                    basic,
                    up,
                    down,
                })
            }
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
                service.close().await;
                Err(e)
            }
        }
    }
}

async fn find_characteristic<S: GattService>(
    service: &S,
    role: CharacteristicRole,
) -> Result<S::Characteristic> {
    service
        .characteristic(role.uuid())
        .await?
        .ok_or(Error::CharacteristicNotFound(role))
}

/// Resolved CRTP service and its characteristics
///
/// Only exists once resolution fully succeeded. It is owned by whoever writes on it and torn down with
/// [LinkEndpoint::close()].
pub struct LinkEndpoint<S: GattService> {
    service: S,
    basic: S::Characteristic,
    up: S::Characteristic,
    down: S::Characteristic,
}

impl<S: GattService> LinkEndpoint<S> {
    /// Send one encoded packet on the basic characteristic and wait for the acknowledgment
    ///
    /// Nothing is retried. Backend errors are reported as [Delivery::Unreachable], the only error returned is
    /// [Error::PacketTooLarge] for packets that do not fit the basic characteristic.
    pub async fn write(&self, packet: &[u8]) -> Result<Delivery> {
        if packet.len() > BASIC_MTU {
            return Err(Error::PacketTooLarge(packet.len()));
        }

        match self.basic.write_with_response(packet).await {
            Ok(delivery) => Ok(delivery),
            Err(e) => {
                debug!("Write on basic characteristic failed: {}", e);
                Ok(Delivery::Unreachable)
            }
        }
    }

    /// The owning service
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Characteristic reserved for fragmented uplink packets
    pub fn up(&self) -> &S::Characteristic {
        &self.up
    }

    /// Characteristic reserved for fragmented downlink packets
    pub fn down(&self) -> &S::Characteristic {
        &self.down
    }

    /// Tear the endpoint down
    pub async fn close(self) {
        self.service.close().await;
    }
}
