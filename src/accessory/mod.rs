//! Accessory registration interface
//!
//! The home-automation host owns the list of configured accessories. The
//! session only needs to ask whether an identifier is known and to register a
//! new one, so that is all the `AccessoryHost` trait exposes. The
//! `AccessoryRegistry` is the in-process host used by the binary.

pub mod router;

pub use router::{Characteristic, CharacteristicValue, RouterAccessory};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::DeviceInfo;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("accessory {0} is already registered")]
    Duplicate(Uuid),
}

/// Interface the device session uses to hand results to the host
#[async_trait]
pub trait AccessoryHost: Send + Sync {
    /// Whether an accessory with this identifier is already configured
    async fn find_existing_accessory(&self, identifier: Uuid) -> bool;

    /// Create and register a new accessory
    async fn register_accessory(
        &mut self,
        identifier: Uuid,
        display_name: &str,
        identity: &DeviceInfo,
    ) -> Result<(), RegistrationError>;
}

/// In-memory accessory cache
pub struct AccessoryRegistry {
    accessories: Vec<RouterAccessory>,
}

impl AccessoryRegistry {
    pub fn new() -> Self {
        Self {
            accessories: Vec::new(),
        }
    }

    /// Attach the router service and take ownership of an accessory
    ///
    /// Used both for freshly registered accessories and for ones restored
    /// from a host cache.
    pub fn configure(&mut self, mut accessory: RouterAccessory) {
        tracing::info!("Configuring accessory {}", accessory.display_name());
        accessory.add_router_service();
        self.accessories.push(accessory);
    }

    pub fn get(&self, identifier: Uuid) -> Option<&RouterAccessory> {
        self.accessories.iter().find(|a| a.uuid() == identifier)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.accessories.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.accessories.is_empty()
    }
}

impl Default for AccessoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccessoryHost for AccessoryRegistry {
    async fn find_existing_accessory(&self, identifier: Uuid) -> bool {
        self.get(identifier).is_some()
    }

    async fn register_accessory(
        &mut self,
        identifier: Uuid,
        display_name: &str,
        identity: &DeviceInfo,
    ) -> Result<(), RegistrationError> {
        if self.get(identifier).is_some() {
            return Err(RegistrationError::Duplicate(identifier));
        }

        let mut accessory = RouterAccessory::new(identifier, display_name);
        accessory.set_identity(identity);
        self.configure(accessory);

        tracing::info!("Registered accessory {} ({})", display_name, identifier);
        Ok(())
    }
}
