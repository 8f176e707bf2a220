use crate::link::CharacteristicRole;

/// [Result] alias for return types of the crate API
pub type Result<T> = std::result::Result<T, Error>;

/// Error enum type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No device exposing the Crazyflie CRTP service is known to the host.
    NotPaired,
    /// The CRTP service was discovered but could not be opened.
    ServiceUnavailable,
    /// The CRTP service is missing one of the required characteristics.
    CharacteristicNotFound(CharacteristicRole),
    /// The commander link is already linking or running.
    AlreadyRunning,
    /// Packets written to the basic characteristic should be no larger than
    /// [BASIC_MTU](crate::link::BASIC_MTU). Contains the rejected length.
    PacketTooLarge(usize),
    /// Configuration value out of its domain. The String contains the reason.
    InvalidConfig(String),
    /// Error reported by the Bluetooth backend. The String contains the reason.
    BackendError(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NotPaired => write!(f, "no paired Crazyflie exposes the CRTP service"),
            Error::ServiceUnavailable => write!(f, "the CRTP service could not be opened"),
            Error::CharacteristicNotFound(role) => {
                write!(f, "CRTP {} characteristic not found", role)
            }
            Error::AlreadyRunning => write!(f, "commander link already started"),
            Error::PacketTooLarge(len) => write!(
                f,
                "packet of {} bytes exceeds the {} bytes basic characteristic MTU",
                len,
                crate::link::BASIC_MTU
            ),
            Error::InvalidConfig(reason) => write!(f, "invalid configuration: {}", reason),
            Error::BackendError(reason) => write!(f, "bluetooth backend error: {}", reason),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(feature = "native")]
impl From<btleplug::Error> for Error {
    fn from(error: btleplug::Error) -> Self {
        Self::BackendError(format!("{}", error))
    }
}
