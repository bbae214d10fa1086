//! Router accessory record and its characteristic handlers

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::models::DeviceInfo;

/// Capabilities an accessory can expose to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Characteristic {
    Manufacturer,
    Model,
    SerialNumber,
    FirmwareRevision,
    ManagedNetworkEnable,
    RouterStatus,
}

impl Characteristic {
    pub const ALL: [Characteristic; 6] = [
        Self::Manufacturer,
        Self::Model,
        Self::SerialNumber,
        Self::FirmwareRevision,
        Self::ManagedNetworkEnable,
        Self::RouterStatus,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Manufacturer => "Manufacturer",
            Self::Model => "Model",
            Self::SerialNumber => "SerialNumber",
            Self::FirmwareRevision => "FirmwareRevision",
            Self::ManagedNetworkEnable => "ManagedNetworkEnable",
            Self::RouterStatus => "RouterStatus",
        }
    }
}

impl FromStr for Characteristic {
    type Err = CharacteristicError;

    /// Case-insensitive match on [`Characteristic::name`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CharacteristicError::Unknown(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharacteristicValue {
    Text(String),
    UInt(u8),
}

impl fmt::Display for CharacteristicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::UInt(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for CharacteristicValue {
    type Err = Infallible;

    /// Small integers become `UInt`, anything else is `Text`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse()
            .map(Self::UInt)
            .unwrap_or_else(|_| Self::Text(s.to_string())))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CharacteristicError {
    #[error("unknown characteristic `{0}`")]
    Unknown(String),

    #[error("characteristic {} is not supported", .0.name())]
    Unsupported(Characteristic),

    #[error("characteristic {} is read-only", .0.name())]
    ReadOnly(Characteristic),
}

type Getter = Box<dyn Fn() -> CharacteristicValue + Send + Sync>;
type Setter = Box<dyn Fn(CharacteristicValue) -> Result<(), CharacteristicError> + Send + Sync>;

struct Handlers {
    get: Getter,
    set: Option<Setter>,
}

/// `ManagedNetworkEnable`: the router always reports managed networking on
const MANAGED_NETWORK_ENABLED: u8 = 1;
/// `RouterStatus`: 0 means ready
const ROUTER_STATUS_READY: u8 = 0;

/// An accessory representing one router, as handed to the host
pub struct RouterAccessory {
    uuid: Uuid,
    display_name: String,
    handlers: BTreeMap<Characteristic, Handlers>,
}

impl RouterAccessory {
    pub fn new(uuid: Uuid, display_name: impl Into<String>) -> Self {
        Self {
            uuid,
            display_name: display_name.into(),
            handlers: BTreeMap::new(),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Register a read handler, replacing any previous one
    pub fn on_get<F>(&mut self, characteristic: Characteristic, get: F)
    where
        F: Fn() -> CharacteristicValue + Send + Sync + 'static,
    {
        self.handlers.insert(
            characteristic,
            Handlers {
                get: Box::new(get),
                set: None,
            },
        );
    }

    /// Register a write handler for a characteristic that already has a reader
    #[cfg(test)]
    pub fn on_set<F>(&mut self, characteristic: Characteristic, set: F) -> Result<(), CharacteristicError>
    where
        F: Fn(CharacteristicValue) -> Result<(), CharacteristicError> + Send + Sync + 'static,
    {
        let handlers = self
            .handlers
            .get_mut(&characteristic)
            .ok_or(CharacteristicError::Unsupported(characteristic))?;
        handlers.set = Some(Box::new(set));
        Ok(())
    }

    /// Populate the accessory-information characteristics
    pub fn set_identity(&mut self, info: &DeviceInfo) {
        let fields = [
            (Characteristic::Manufacturer, &info.manufacturer),
            (Characteristic::Model, &info.model_number),
            (Characteristic::SerialNumber, &info.serial_number),
            (Characteristic::FirmwareRevision, &info.firmware_version),
        ];
        for (characteristic, value) in fields {
            let value = value.clone();
            self.on_get(characteristic, move || CharacteristicValue::Text(value.clone()));
        }
    }

    /// Attach the WiFi router service
    pub fn add_router_service(&mut self) {
        self.on_get(Characteristic::ManagedNetworkEnable, || {
            CharacteristicValue::UInt(MANAGED_NETWORK_ENABLED)
        });
        self.on_get(Characteristic::RouterStatus, || {
            CharacteristicValue::UInt(ROUTER_STATUS_READY)
        });
    }

    pub fn get(&self, characteristic: Characteristic) -> Result<CharacteristicValue, CharacteristicError> {
        self.handlers
            .get(&characteristic)
            .map(|h| (h.get)())
            .ok_or(CharacteristicError::Unsupported(characteristic))
    }

    pub fn set(
        &self,
        characteristic: Characteristic,
        value: CharacteristicValue,
    ) -> Result<(), CharacteristicError> {
        let handlers = self
            .handlers
            .get(&characteristic)
            .ok_or(CharacteristicError::Unsupported(characteristic))?;
        match &handlers.set {
            Some(set) => set(value),
            None => Err(CharacteristicError::ReadOnly(characteristic)),
        }
    }

    /// Current value of every supported characteristic
    pub fn read_all(&self) -> Vec<(Characteristic, CharacteristicValue)> {
        self.handlers
            .iter()
            .map(|(characteristic, h)| (*characteristic, (h.get)()))
            .collect()
    }

    pub fn identify(&self) {
        tracing::info!("{} identified!", self.display_name);
    }
}

impl fmt::Debug for RouterAccessory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterAccessory")
            .field("uuid", &self.uuid)
            .field("display_name", &self.display_name)
            .field("characteristics", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
