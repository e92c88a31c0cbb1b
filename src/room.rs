//! Room actor implementation
//!
//! Each room is an actor: a private membership map owned by one task that
//! consumes a single ordered event queue. Nothing outside the task touches
//! the map; callers talk to it through a cloneable [`RoomHandle`].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::{AppError, DeliveryError, RegistryError};
use crate::member::Member;
use crate::message::{Action, Envelope, KICK_NOTICE};
use crate::types::{RoomName, SessionId, UserId};

/// Who submitted a dispatched envelope
///
/// Passed explicitly with every dispatch so the room can route replies
/// and check privileges without looking anything up elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub session: SessionId,
    pub user: UserId,
}

/// Events consumed by the room task, in arrival order
#[derive(Debug)]
pub enum RoomEvent {
    /// Add a member
    Register(Member),
    /// Remove a member and close its mailbox
    Unregister(SessionId),
    /// Route an envelope according to its action
    Dispatch { origin: Origin, envelope: Envelope },
    /// Reply with the current display names
    Members(oneshot::Sender<Vec<String>>),
    /// Close every mailbox and stop
    Close,
}

/// Room lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Running,
    Closed,
}

/// Cloneable handle to a running room
#[derive(Debug, Clone)]
pub struct RoomHandle {
    name: RoomName,
    owner: Option<UserId>,
    events: mpsc::UnboundedSender<RoomEvent>,
}

impl RoomHandle {
    pub fn name(&self) -> &RoomName {
        &self.name
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    /// Check whether `user` owns this room
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner == Some(user)
    }

    /// Hand a member to the room
    ///
    /// Fails if the room has already closed; the member is dropped and its
    /// mailbox closed in that case.
    pub fn register(&self, member: Member) -> Result<(), AppError> {
        self.events
            .send(RoomEvent::Register(member))
            .map_err(|_| RegistryError::NotFound(self.name.clone()).into())
    }

    /// Ask the room to drop a session. No-op if it is not a member.
    pub fn unregister(&self, session: SessionId) {
        let _ = self.events.send(RoomEvent::Unregister(session));
    }

    /// Submit an envelope on behalf of `origin`
    pub fn dispatch(&self, origin: Origin, envelope: Envelope) {
        if self
            .events
            .send(RoomEvent::Dispatch { origin, envelope })
            .is_err()
        {
            debug!("Room {} closed, dropping envelope from {}", self.name, origin.session);
        }
    }

    /// Display names of current members, queried through the room task
    ///
    /// Returns `None` once the room has closed.
    pub async fn members(&self) -> Option<Vec<String>> {
        let (tx, rx) = oneshot::channel();
        self.events.send(RoomEvent::Members(tx)).ok()?;
        rx.await.ok()
    }

    /// Signal the room to close. Only the registry calls this.
    pub(crate) fn close(&self) {
        let _ = self.events.send(RoomEvent::Close);
    }

    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }
}

/// Room actor state
pub struct Room {
    name: RoomName,
    owner: Option<UserId>,
    members: HashMap<SessionId, Member>,
    receiver: mpsc::UnboundedReceiver<RoomEvent>,
    state: RoomState,
}

impl Room {
    /// Create a room and its handle without starting it
    pub fn new(name: RoomName, owner: Option<UserId>) -> (Self, RoomHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = RoomHandle {
            name: name.clone(),
            owner,
            events: tx,
        };
        let room = Self {
            name,
            owner,
            members: HashMap::new(),
            receiver: rx,
            state: RoomState::Running,
        };
        (room, handle)
    }

    /// Create a room and spawn its event loop on the current runtime
    pub fn spawn(name: RoomName, owner: Option<UserId>) -> RoomHandle {
        let (room, handle) = Self::new(name, owner);
        tokio::spawn(room.run());
        handle
    }

    /// Run the room event loop
    ///
    /// Processes events one at a time until a `Close` arrives or every
    /// handle has been dropped. Events still queued after `Close` are
    /// discarded with the receiver.
    pub async fn run(mut self) {
        info!("Room {} started (owner: {:?})", self.name, self.owner);

        while let Some(event) = self.receiver.recv().await {
            self.handle_event(event);
            if self.state == RoomState::Closed {
                break;
            }
        }

        // Covers the all-handles-dropped exit as well
        self.close();
        info!("Room {} stopped", self.name);
    }

    /// Process a single event
    fn handle_event(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::Register(member) => self.handle_register(member),
            RoomEvent::Unregister(session) => self.handle_unregister(session),
            RoomEvent::Dispatch { origin, envelope } => self.handle_dispatch(origin, envelope),
            RoomEvent::Members(reply) => {
                let _ = reply.send(self.display_names());
            }
            RoomEvent::Close => self.close(),
        }
    }

    fn handle_register(&mut self, member: Member) {
        info!(
            "{} ({}) joined room {}",
            member.display_name(),
            member.id,
            self.name
        );
        self.members.insert(member.id, member);
        debug!("Room {} members: {}", self.name, self.members.len());
    }

    fn handle_unregister(&mut self, session: SessionId) {
        // Dropping the member closes its mailbox
        if let Some(member) = self.members.remove(&session) {
            info!(
                "{} ({}) left room {}",
                member.display_name(),
                session,
                self.name
            );
        }
    }

    fn handle_dispatch(&mut self, origin: Origin, envelope: Envelope) {
        match envelope.action {
            Action::Broadcast => self.broadcast(envelope),
            Action::ListUsers => self.list_users(origin, envelope),
            Action::Kick => self.kick(origin, envelope),
            Action::Unknown => {
                debug!("Ignoring envelope with unknown action from {}", origin.session);
            }
        }
    }

    /// Fan an envelope out to every member, sender included
    fn broadcast(&mut self, envelope: Envelope) {
        let envelope = Arc::new(envelope);
        let name = &self.name;
        let dead: Vec<SessionId> = self
            .members
            .values_mut()
            .filter_map(|member| match member.deliver(envelope.clone()) {
                Ok(()) => None,
                Err(e) => is_dead(name, member, &e).then_some(member.id),
            })
            .collect();

        for session in dead {
            self.handle_unregister(session);
        }
    }

    /// Reply to the requester only, with member names in `payload`
    fn list_users(&mut self, origin: Origin, mut envelope: Envelope) {
        envelope.text.clear();
        envelope.payload = serde_json::Value::from(self.display_names());

        let Some(member) = self.members.get_mut(&origin.session) else {
            return;
        };

        if let Err(e) = member.deliver(Arc::new(envelope)) {
            if is_dead(&self.name, member, &e) {
                self.handle_unregister(origin.session);
            }
        }
    }

    /// Remove the member named in `text`, if the origin owns the room
    ///
    /// Non-owners are ignored silently.
    fn kick(&mut self, origin: Origin, envelope: Envelope) {
        if self.owner != Some(origin.user) {
            debug!("User {} is not allowed to kick in room {}", origin.user, self.name);
            return;
        }

        let Some(target) = self
            .members
            .values_mut()
            .find(|m| m.display_name() == envelope.text)
        else {
            return;
        };

        let notice = Envelope {
            text: KICK_NOTICE.to_string(),
            ..envelope
        };
        // Best effort: the member goes either way
        let _ = target.deliver(Arc::new(notice));

        let session = target.id;
        info!("User {} kicked {} from room {}", origin.user, session, self.name);
        self.handle_unregister(session);
    }

    /// Close all mailboxes and stop accepting events
    fn close(&mut self) {
        if self.state == RoomState::Running {
            info!("Closing room {} ({} members)", self.name, self.members.len());
        }
        self.members.clear();
        self.receiver.close();
        self.state = RoomState::Closed;
    }

    fn display_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .members
            .values()
            .map(|m| m.display_name().to_string())
            .collect();
        names.sort();
        names
    }
}

/// Log a failed delivery and tell whether the member has to go
fn is_dead(room: &RoomName, member: &Member, err: &DeliveryError) -> bool {
    if err.is_fatal() {
        warn!("Dropping {} from room {}: {}", member.display_name(), room, err);
        true
    } else {
        debug!("{} lagging in room {}, envelope dropped", member.display_name(), room);
        false
    }
}
