//! Room member definition
//!
//! A member is a room's view of one session: who it is and the sending
//! half of its outbound mailbox.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;

use crate::error::DeliveryError;
use crate::message::Envelope;
use crate::types::{SessionId, UserId};

/// Default mailbox capacity per session
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;

/// How long a mailbox may stay full before its session counts as dead
pub const STALL_GRACE: Duration = Duration::from_secs(5);

/// Outbound queue from a room to one session
pub type Mailbox = mpsc::Receiver<Arc<Envelope>>;

/// Authenticated user behind a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    pub display_name: String,
    pub connected_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            connected_at: Utc::now(),
        }
    }
}

/// Room membership entry
///
/// Holds the only sender of the session's mailbox. Dropping the member
/// closes the mailbox, which is how a session learns it was removed.
#[derive(Debug)]
pub struct Member {
    pub id: SessionId,
    pub identity: Identity,
    mailbox: mpsc::Sender<Arc<Envelope>>,
    /// Set on the first failed delivery to a full mailbox, cleared on success
    full_since: Option<Instant>,
}

impl Member {
    /// Create a member with a fresh session ID and bounded mailbox
    ///
    /// Returns the receiving half for the session's outbound loop.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero, like `mpsc::channel`.
    pub fn new(identity: Identity, capacity: usize) -> (Self, Mailbox) {
        let (tx, rx) = mpsc::channel(capacity);
        let member = Self {
            id: SessionId::new(),
            identity,
            mailbox: tx,
            full_since: None,
        };
        (member, rx)
    }

    pub fn display_name(&self) -> &str {
        &self.identity.display_name
    }

    /// Enqueue an envelope without waiting
    ///
    /// A full mailbox drops the envelope with `Lagging` until it has been
    /// full for [`STALL_GRACE`]; after that every attempt fails with `Full`.
    pub fn deliver(&mut self, envelope: Arc<Envelope>) -> Result<(), DeliveryError> {
        match self.mailbox.try_send(envelope) {
            Ok(()) => {
                self.full_since = None;
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(DeliveryError::Closed),
            Err(TrySendError::Full(_)) => {
                let since = *self.full_since.get_or_insert_with(Instant::now);
                if since.elapsed() >= STALL_GRACE {
                    Err(DeliveryError::Full)
                } else {
                    Err(DeliveryError::Lagging)
                }
            }
        }
    }
}
