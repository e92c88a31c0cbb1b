//! Multi-room WebSocket Chat Server Library
//!
//! A WebSocket chat server built with tokio-tungstenite where every room
//! is an actor owning its own membership.
//!
//! # Features
//! - Named rooms, created and closed by their owners
//! - Token authentication through a pluggable [`UserChecker`]
//! - Broadcast, member listing and owner kicks inside a room
//! - Bounded per-session mailboxes; slow consumers are dropped
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - Each `Room` is an actor task; only it touches its member map
//! - `RoomRegistry` maps names to room handles behind one short lock
//! - Each connection runs a read loop feeding its room and a write task
//!   draining its mailbox
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use room_chat_server::{handle_connection, ChatConfig, ChatService, StaticUserChecker};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let checker = StaticUserChecker::default().with_user("secret", 1, "Alice");
//!     let service = Arc::new(ChatService::new(&ChatConfig::default(), Arc::new(checker)).unwrap());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         tokio::spawn(handle_connection(stream, service.clone()));
//!     }
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod member;
pub mod message;
pub mod registry;
pub mod room;
pub mod service;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use auth::{HttpUserChecker, StaticUser, StaticUserChecker, UserChecker};
pub use config::{ChatConfig, Config};
pub use error::{AppError, AuthError, DeliveryError, RegistryError};
pub use handler::handle_connection;
pub use member::{Identity, Member};
pub use message::{Action, AdminRequest, AdminResponse, Envelope, ErrorCode};
pub use registry::RoomRegistry;
pub use room::{Origin, Room, RoomHandle};
pub use service::ChatService;
pub use types::{RoomName, SessionId, UserId};
