//! Error types for the chat server
//!
//! Defines application-level errors plus the narrower errors of the
//! registry, the authorization collaborator and mailbox delivery.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::types::RoomName;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// business errors (reported back to an administrative caller).
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Room lifecycle error
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Authorization collaborator rejected or failed
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Room name failed validation
    #[error("Invalid room name: '{0}'")]
    InvalidRoomName(String),

    /// Connection closed before credentials were received
    #[error("Connection closed before handshake")]
    HandshakeAborted,

    /// No credentials received within the handshake timeout
    #[error("Handshake timed out")]
    HandshakeTimeout,

    /// Settings that cannot be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Room registry errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No live room with this name
    #[error("Room not found: {0}")]
    NotFound(RoomName),

    /// Name already maps to a live room
    #[error("Room name is already taken: {0}")]
    AlreadyExists(RoomName),

    /// Registry holds its maximum number of rooms
    #[error("Room limit reached ({0})")]
    CapacityExceeded(usize),

    /// Caller does not own the room
    #[error("Not the owner of room {0}")]
    NotOwner(RoomName),
}

/// Authorization collaborator errors
///
/// Both variants are fatal to the session that triggered them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Credential rejected
    #[error("Unauthorized")]
    Unauthorized,

    /// Collaborator unreachable or answered garbage
    #[error("Authorization service unavailable: {0}")]
    Unavailable(String),
}

/// Mailbox delivery errors
///
/// `Lagging` only drops the envelope; the other variants mean the session
/// is treated as dead by its room.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// Mailbox is momentarily at capacity; the envelope was dropped
    #[error("Mailbox lagging")]
    Lagging,

    /// Mailbox has stayed at capacity past the grace period
    #[error("Mailbox full")]
    Full,

    /// The receiving end of the mailbox has been dropped
    #[error("Mailbox closed")]
    Closed,
}

impl DeliveryError {
    /// Whether the session should be removed from its room
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DeliveryError::Lagging)
    }
}
