//! Room registry
//!
//! Maps room names to running rooms. Every operation takes the same short
//! lock; none of them waits on a room's event loop.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::error::RegistryError;
use crate::room::{Room, RoomHandle};
use crate::types::{RoomName, UserId};

/// Default maximum number of live rooms
pub const DEFAULT_ROOM_LIMIT: usize = 100;

/// Name → room directory with a fixed capacity
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomName, RoomHandle>>,
    capacity: usize,
}

impl RoomRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Create a room and start its event loop
    ///
    /// The existence check, the capacity check and the insert happen under
    /// one lock, so concurrent creates of the same name have one winner.
    pub fn create(
        &self,
        name: RoomName,
        owner: Option<UserId>,
    ) -> Result<RoomHandle, RegistryError> {
        let mut rooms = self.lock();

        if rooms.contains_key(&name) {
            return Err(RegistryError::AlreadyExists(name));
        }
        if rooms.len() >= self.capacity {
            return Err(RegistryError::CapacityExceeded(self.capacity));
        }

        let handle = Room::spawn(name.clone(), owner);
        rooms.insert(name.clone(), handle.clone());

        info!("Room {} created ({}/{})", name, rooms.len(), self.capacity);
        Ok(handle)
    }

    /// Look up a room by name
    pub fn get(&self, name: &RoomName) -> Option<RoomHandle> {
        self.lock().get(name).cloned()
    }

    /// Remove a room and signal it to close
    pub fn close(&self, name: &RoomName) -> Result<(), RegistryError> {
        let handle = self
            .lock()
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.clone()))?;

        handle.close();
        info!("Room {} closed", name);
        Ok(())
    }

    /// Close a room on behalf of `user`, who must own it
    ///
    /// The owner check and the removal share one critical section so a
    /// room re-created under the same name cannot be closed by mistake.
    pub fn close_owned(&self, name: &RoomName, user: UserId) -> Result<(), RegistryError> {
        let handle = {
            let mut rooms = self.lock();
            let handle = rooms
                .get(name)
                .ok_or_else(|| RegistryError::NotFound(name.clone()))?;

            if !handle.is_owned_by(user) {
                debug!("User {} tried to close room {} it does not own", user, name);
                return Err(RegistryError::NotOwner(name.clone()));
            }
            rooms.remove(name)
        };

        if let Some(handle) = handle {
            handle.close();
        }
        info!("Room {} closed by owner {}", name, user);
        Ok(())
    }

    /// Snapshot of open room names, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().map(|n| n.to_string()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave the map half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<RoomName, RoomHandle>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_ROOM_LIMIT)
    }
}
