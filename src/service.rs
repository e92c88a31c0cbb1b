//! Chat service
//!
//! Entry points used by connection handlers: join a room, create and
//! close rooms on behalf of an authorized user, list rooms.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::auth::{authenticate, UserChecker};
use crate::config::ChatConfig;
use crate::error::{AppError, RegistryError};
use crate::member::Identity;
use crate::registry::RoomRegistry;
use crate::room::RoomHandle;
use crate::types::RoomName;

/// Registry plus authorization, shared by all connections
pub struct ChatService {
    registry: RoomRegistry,
    checker: Arc<dyn UserChecker>,
    mailbox_capacity: usize,
    handshake_timeout: Duration,
}

impl ChatService {
    /// Create the service and seed the default room
    pub fn new(config: &ChatConfig, checker: Arc<dyn UserChecker>) -> Result<Self, AppError> {
        if config.mailbox_capacity == 0 {
            return Err(AppError::InvalidConfig(
                "mailbox capacity must be at least 1".to_string(),
            ));
        }

        let registry = RoomRegistry::new(config.room_limit);
        registry.create(RoomName::parse(config.default_room.as_str())?, None)?;

        Ok(Self {
            registry,
            checker,
            mailbox_capacity: config.mailbox_capacity,
            handshake_timeout: config.handshake_timeout,
        })
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn mailbox_capacity(&self) -> usize {
        self.mailbox_capacity
    }

    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    /// Resolve the room a new connection wants to join
    pub fn join(&self, name: &str) -> Result<RoomHandle, AppError> {
        let name = RoomName::parse(name)?;
        self.registry
            .get(&name)
            .filter(|room| !room.is_closed())
            .ok_or_else(|| RegistryError::NotFound(name).into())
    }

    /// Turn a session token into an identity
    pub async fn authenticate(&self, token: &str) -> Result<Identity, AppError> {
        Ok(authenticate(self.checker.as_ref(), token).await?)
    }

    /// Create a room owned by the token's user
    pub async fn create_room(&self, token: &str, name: &str) -> Result<RoomHandle, AppError> {
        let name = RoomName::parse(name)?;
        let user = self.checker.authorize(token).await?;

        let handle = self.registry.create(name, Some(user))?;
        info!("User {} created room {}", user, handle.name());
        Ok(handle)
    }

    /// Close a room; only its owner may do so
    pub async fn close_room(&self, token: &str, name: &str) -> Result<(), AppError> {
        let name = RoomName::parse(name)?;
        let user = self.checker.authorize(token).await?;

        self.registry.close_owned(&name, user)?;
        Ok(())
    }

    /// Names of open rooms
    pub fn list_rooms(&self) -> Vec<String> {
        self.registry.list()
    }
}
