//! Server configuration
//!
//! [`Config`] is the command line of the binary (with environment
//! fallbacks); [`ChatConfig`] is the part the library itself needs.

use std::sync::Arc;
use std::time::Duration;

use clap::builder::RangedU64ValueParser;
use clap::Parser;
use tracing::warn;

use crate::auth::{HttpUserChecker, StaticUser, StaticUserChecker, UserChecker};
use crate::member::DEFAULT_MAILBOX_CAPACITY;
use crate::registry::DEFAULT_ROOM_LIMIT;

/// Name of the room that exists from startup
pub const DEFAULT_ROOM: &str = "general";

/// Seconds a new session has to send its credentials
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// Library-level settings for [`ChatService`](crate::service::ChatService)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Maximum number of live rooms
    pub room_limit: usize,
    /// Outbound mailbox size per session
    pub mailbox_capacity: usize,
    /// Room seeded at startup, without an owner
    pub default_room: String,
    /// How long a session may take to present credentials
    pub handshake_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            room_limit: DEFAULT_ROOM_LIMIT,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            default_room: DEFAULT_ROOM.to_string(),
            handshake_timeout: Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS),
        }
    }
}

/// Command line arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "room_chat_server")]
#[command(about = "Multi-room WebSocket chat server", long_about = None)]
pub struct Config {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "CHAT_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Maximum number of rooms
    #[arg(long, env = "ROOM_LIMIT", default_value_t = DEFAULT_ROOM_LIMIT)]
    pub room_limit: usize,

    /// Outbound mailbox size per session (at least 1)
    #[arg(
        long,
        env = "MAILBOX_CAPACITY",
        default_value_t = DEFAULT_MAILBOX_CAPACITY,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub mailbox_capacity: usize,

    /// Seconds a session has to send its credentials (at least 1)
    #[arg(
        long,
        env = "HANDSHAKE_TIMEOUT",
        default_value_t = DEFAULT_HANDSHAKE_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub handshake_timeout_secs: u64,

    /// Room available from startup
    #[arg(long, env = "DEFAULT_ROOM", default_value = DEFAULT_ROOM)]
    pub default_room: String,

    /// Base URL of the authorization server
    #[arg(long, env = "AUTH_URL", requires = "api_url")]
    pub auth_url: Option<String>,

    /// Base URL of the account API
    #[arg(long, env = "API_URL", requires = "auth_url")]
    pub api_url: Option<String>,

    /// Static user (TOKEN=ID:NAME), used when no AUTH_URL is given
    #[arg(long = "user", value_name = "TOKEN=ID:NAME")]
    pub users: Vec<StaticUser>,
}

impl Config {
    /// Address to bind the listener to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            room_limit: self.room_limit,
            mailbox_capacity: self.mailbox_capacity,
            default_room: self.default_room.clone(),
            handshake_timeout: Duration::from_secs(self.handshake_timeout_secs),
        }
    }

    /// Build the authorization collaborator
    ///
    /// Uses the HTTP services when both URLs are set, otherwise the static
    /// token table from `--user`.
    pub fn user_checker(&self) -> Arc<dyn UserChecker> {
        match (&self.auth_url, &self.api_url) {
            (Some(auth), Some(api)) => Arc::new(HttpUserChecker::new(auth, api)),
            _ => {
                let checker = StaticUserChecker::new(self.users.clone());
                if checker.is_empty() {
                    warn!("No AUTH_URL and no --user given, every session will be rejected");
                }
                Arc::new(checker)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config =
            Config::try_parse_from(["room_chat_server", "-H", "0.0.0.0", "-p", "3000"]).unwrap();

        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.chat_config(), ChatConfig::default());
        assert!(config.users.is_empty());
    }

    #[test]
    fn test_static_users_from_args() {
        let config = Config::try_parse_from([
            "room_chat_server",
            "--port",
            "9000",
            "--room-limit",
            "5",
            "--user",
            "a=1:Alice",
            "--user",
            "b=2:Bob",
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.chat_config().room_limit, 5);
        assert_eq!(config.users.len(), 2);
        assert_eq!(config.users[1].display_name, "Bob");
    }

    #[test]
    fn test_bad_static_user_rejected() {
        assert!(Config::try_parse_from(["room_chat_server", "--user", "oops"]).is_err());
    }

    #[test]
    fn test_zero_mailbox_capacity_rejected() {
        let err = Config::try_parse_from(["room_chat_server", "--mailbox-capacity", "0"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let config =
            Config::try_parse_from(["room_chat_server", "--mailbox-capacity", "1"]).unwrap();
        assert_eq!(config.chat_config().mailbox_capacity, 1);
    }

    #[test]
    fn test_handshake_timeout() {
        let config =
            Config::try_parse_from(["room_chat_server", "--handshake-timeout-secs", "3"]).unwrap();
        assert_eq!(config.chat_config().handshake_timeout, Duration::from_secs(3));

        assert!(
            Config::try_parse_from(["room_chat_server", "--handshake-timeout-secs", "0"]).is_err()
        );
    }

    #[test]
    fn test_auth_url_requires_api_url() {
        assert!(
            Config::try_parse_from(["room_chat_server", "--auth-url", "http://auth"]).is_err()
        );
    }
}
