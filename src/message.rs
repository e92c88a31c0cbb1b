//! Message protocol definitions
//!
//! Two JSON protocols share this module:
//! - the room protocol: a credential frame followed by [`Envelope`]s
//! - the admin protocol: tagged [`AdminRequest`] / [`AdminResponse`] enums

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AuthError, RegistryError};

/// Text sent to a member right before it is kicked
pub const KICK_NOTICE: &str = "You have been kicked out of the room!";

/// Room action carried by an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Fan out to every member
    #[serde(rename = "message")]
    Broadcast,
    /// Ask for the member list
    #[serde(rename = "users")]
    ListUsers,
    /// Owner-only removal of a member by display name
    Kick,
    /// Anything else; ignored by rooms
    #[default]
    #[serde(other)]
    Unknown,
}

/// Chat message exchanged between clients through a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sender display name; always overwritten by the server
    #[serde(rename = "nickname", default)]
    pub sender_name: String,
    #[serde(default)]
    pub action: Action,
    #[serde(default)]
    pub text: String,
    #[serde(default = "Utc::now")]
    pub time: DateTime<Utc>,
    /// Opaque payload; the member list for `users` replies
    #[serde(rename = "data", default)]
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Build an envelope stamped with the current time
    pub fn new(action: Action, text: impl Into<String>) -> Self {
        Self {
            sender_name: String::new(),
            action,
            text: text.into(),
            time: Utc::now(),
            payload: serde_json::Value::Null,
        }
    }

    /// Replace client-supplied sender and time with server-side values
    pub fn stamped(mut self, sender_name: &str) -> Self {
        self.sender_name = sender_name.to_string();
        self.time = Utc::now();
        self
    }
}

/// First frame of a room session
///
/// Extra fields sent by older clients (such as `nickname`) are ignored.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub token: String,
}

/// Admin client → server request
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdminRequest {
    /// Create a room owned by the token's user
    CreateRoom { name: String, token: String },
    /// Close a room owned by the token's user
    CloseRoom { name: String, token: String },
    /// List open rooms
    ListRooms,
}

/// Server → admin client response
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdminResponse {
    RoomCreated { name: String },
    RoomClosed { name: String },
    Rooms { names: Vec<String> },
    Error { code: ErrorCode, message: String },
}

/// Error codes for AdminResponse::Error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    RoomNotFound,
    RoomNameTaken,
    RoomLimitReached,
    InvalidRoomName,
    /// Bad credential or not the room owner
    Unauthorized,
    Unavailable,
    InvalidMessage,
}

/// Convert AppError to AdminResponse for client notification
impl From<AppError> for AdminResponse {
    fn from(err: AppError) -> Self {
        let code = match &err {
            AppError::Registry(RegistryError::NotFound(_)) => ErrorCode::RoomNotFound,
            AppError::Registry(RegistryError::AlreadyExists(_)) => ErrorCode::RoomNameTaken,
            AppError::Registry(RegistryError::CapacityExceeded(_)) => ErrorCode::RoomLimitReached,
            AppError::Registry(RegistryError::NotOwner(_)) => ErrorCode::Unauthorized,
            AppError::Auth(AuthError::Unauthorized) => ErrorCode::Unauthorized,
            AppError::Auth(AuthError::Unavailable(_)) => ErrorCode::Unavailable,
            AppError::InvalidRoomName(_) => ErrorCode::InvalidRoomName,
            _ => ErrorCode::InvalidMessage,
        };
        AdminResponse::Error {
            code,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RoomName;

    #[test]
    fn test_envelope_deserialize_wire_names() {
        let json = r#"{"nickname": "mallory", "action": "message", "text": "hi", "data": {"k": 1}}"#;
        let env: Envelope = serde_json::from_str(json).unwrap();

        assert_eq!(env.sender_name, "mallory");
        assert_eq!(env.action, Action::Broadcast);
        assert_eq!(env.text, "hi");
        assert_eq!(env.payload["k"], 1);
    }

    #[test]
    fn test_envelope_defaults_and_unknown_action() {
        let env: Envelope = serde_json::from_str(r#"{"action": "dance"}"#).unwrap();
        assert_eq!(env.action, Action::Unknown);
        assert!(env.text.is_empty());
        assert!(env.payload.is_null());

        let env: Envelope = serde_json::from_str("{}").unwrap();
        assert_eq!(env.action, Action::Unknown);
    }

    #[test]
    fn test_envelope_serialize() {
        let env = Envelope::new(Action::ListUsers, "").stamped("Alice");
        let json = serde_json::to_string(&env).unwrap();
        assert!(json.contains("\"nickname\":\"Alice\""));
        assert!(json.contains("\"action\":\"users\""));
        assert!(json.contains("\"data\":null"));
    }

    #[test]
    fn test_stamped_overwrites_sender() {
        let mut env = Envelope::new(Action::Broadcast, "hi");
        env.sender_name = "forged".to_string();
        let env = env.stamped("Bob");
        assert_eq!(env.sender_name, "Bob");
        assert_eq!(env.text, "hi");
    }

    #[test]
    fn test_credentials_ignore_extra_fields() {
        let creds: Credentials =
            serde_json::from_str(r#"{"nickname": "x", "token": "abc"}"#).unwrap();
        assert_eq!(creds.token, "abc");
    }

    #[test]
    fn test_admin_request_deserialize() {
        let json = r#"{"type": "create_room", "name": "lobby1", "token": "t"}"#;
        match serde_json::from_str::<AdminRequest>(json).unwrap() {
            AdminRequest::CreateRoom { name, token } => {
                assert_eq!(name, "lobby1");
                assert_eq!(token, "t");
            }
            _ => panic!("Wrong variant"),
        }

        let json = r#"{"type": "list_rooms"}"#;
        assert!(matches!(
            serde_json::from_str::<AdminRequest>(json).unwrap(),
            AdminRequest::ListRooms
        ));
    }

    #[test]
    fn test_error_code_serialize() {
        let name = RoomName::parse("lobby1").unwrap();
        let msg: AdminResponse = AppError::from(RegistryError::AlreadyExists(name)).into();
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"error\""));
        assert!(json.contains("\"code\":\"room_name_taken\""));
    }

    #[test]
    fn test_not_owner_maps_to_unauthorized() {
        let name = RoomName::parse("lobby1").unwrap();
        match AdminResponse::from(AppError::from(RegistryError::NotOwner(name))) {
            AdminResponse::Error { code, .. } => assert_eq!(code, ErrorCode::Unauthorized),
            _ => panic!("Wrong variant"),
        }
    }
}
