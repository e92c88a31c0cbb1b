//! Authorization collaborator
//!
//! Sessions and admin requests carry a bearer token. The server never
//! validates it itself: a [`UserChecker`] turns it into a user ID and a
//! display name.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::AuthError;
use crate::member::Identity;
use crate::types::UserId;

/// Token → identity lookup
#[async_trait]
pub trait UserChecker: Send + Sync {
    /// Validate a token and return the user it belongs to
    async fn authorize(&self, token: &str) -> Result<UserId, AuthError>;

    /// Fetch the display name of an authorized user
    async fn fetch_profile(&self, token: &str, user: UserId) -> Result<String, AuthError>;
}

/// Authorize a token and build the session identity
pub async fn authenticate(checker: &dyn UserChecker, token: &str) -> Result<Identity, AuthError> {
    let user = checker.authorize(token).await?;
    let display_name = checker.fetch_profile(token, user).await?;
    debug!("Token authorized as {} ({})", display_name, user);
    Ok(Identity::new(user, display_name))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    user_id: u64,
}

/// Checker backed by the authorization server and the account API
///
/// `POST {auth_url}/authorize` validates the token, `GET {api_url}/user/me`
/// returns the profile with the nickname at `account.nickname`.
#[derive(Debug, Clone)]
pub struct HttpUserChecker {
    client: reqwest::Client,
    auth_url: String,
    api_url: String,
}

impl HttpUserChecker {
    pub fn new(auth_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            auth_url: auth_url.into().trim_end_matches('/').to_string(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }
}

fn unavailable(err: reqwest::Error) -> AuthError {
    AuthError::Unavailable(err.to_string())
}

#[async_trait]
impl UserChecker for HttpUserChecker {
    async fn authorize(&self, token: &str) -> Result<UserId, AuthError> {
        let resp = self
            .client
            .post(format!("{}/authorize", self.auth_url))
            .header(reqwest::header::AUTHORIZATION, token)
            .send()
            .await
            .map_err(unavailable)?;

        if resp.status() != reqwest::StatusCode::OK {
            debug!("Authorization server answered {}", resp.status());
            return Err(AuthError::Unauthorized);
        }

        let body: TokenResponse = resp.json().await.map_err(unavailable)?;
        Ok(UserId(body.user_id))
    }

    async fn fetch_profile(&self, token: &str, _user: UserId) -> Result<String, AuthError> {
        let resp = self
            .client
            .get(format!("{}/user/me", self.api_url))
            .header(reqwest::header::AUTHORIZATION, token)
            .send()
            .await
            .map_err(unavailable)?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AuthError::Unauthorized);
        }

        let body: serde_json::Value = resp.json().await.map_err(unavailable)?;
        body["account"]["nickname"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AuthError::Unavailable("profile has no nickname".to_string()))
    }
}

/// A `TOKEN=ID:NAME` entry for [`StaticUserChecker`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticUser {
    pub token: String,
    pub id: UserId,
    pub display_name: String,
}

impl FromStr for StaticUser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || format!("expected TOKEN=ID:NAME, got '{}'", s);

        let (token, rest) = s.split_once('=').ok_or_else(err)?;
        let (id, name) = rest.split_once(':').ok_or_else(err)?;
        let id = id.parse::<u64>().map_err(|_| err())?;

        if token.is_empty() || name.is_empty() {
            return Err(err());
        }

        Ok(Self {
            token: token.to_string(),
            id: UserId(id),
            display_name: name.to_string(),
        })
    }
}

/// Checker with a fixed token table, for development and tests
#[derive(Debug, Clone, Default)]
pub struct StaticUserChecker {
    users: HashMap<String, StaticUser>,
}

impl StaticUserChecker {
    pub fn new(users: impl IntoIterator<Item = StaticUser>) -> Self {
        Self {
            users: users.into_iter().map(|u| (u.token.clone(), u)).collect(),
        }
    }

    /// Add a user, builder style
    pub fn with_user(mut self, token: &str, id: u64, display_name: &str) -> Self {
        self.users.insert(
            token.to_string(),
            StaticUser {
                token: token.to_string(),
                id: UserId(id),
                display_name: display_name.to_string(),
            },
        );
        self
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserChecker for StaticUserChecker {
    async fn authorize(&self, token: &str) -> Result<UserId, AuthError> {
        self.users
            .get(token)
            .map(|u| u.id)
            .ok_or(AuthError::Unauthorized)
    }

    async fn fetch_profile(&self, token: &str, user: UserId) -> Result<String, AuthError> {
        self.users
            .get(token)
            .filter(|u| u.id == user)
            .map(|u| u.display_name.clone())
            .ok_or(AuthError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_user_parse() {
        let user: StaticUser = "secret=42:Owner".parse().unwrap();
        assert_eq!(user.token, "secret");
        assert_eq!(user.id, UserId(42));
        assert_eq!(user.display_name, "Owner");

        // Display names may contain colons
        let user: StaticUser = "t=1:a:b".parse().unwrap();
        assert_eq!(user.display_name, "a:b");
    }

    #[test]
    fn test_static_user_parse_errors() {
        assert!("no-separator".parse::<StaticUser>().is_err());
        assert!("t=notanumber:Name".parse::<StaticUser>().is_err());
        assert!("t=1".parse::<StaticUser>().is_err());
        assert!("=1:Name".parse::<StaticUser>().is_err());
        assert!("t=1:".parse::<StaticUser>().is_err());
    }

    #[tokio::test]
    async fn test_authenticate_known_token() {
        let checker = StaticUserChecker::default().with_user("tok7", 7, "Seven");
        let identity = authenticate(&checker, "tok7").await.unwrap();

        assert_eq!(identity.id, UserId(7));
        assert_eq!(identity.display_name, "Seven");
    }

    #[tokio::test]
    async fn test_authenticate_unknown_token() {
        let checker = StaticUserChecker::default().with_user("tok7", 7, "Seven");
        assert_eq!(
            authenticate(&checker, "bogus").await.unwrap_err(),
            AuthError::Unauthorized
        );
    }

    #[tokio::test]
    async fn test_fetch_profile_requires_matching_user() {
        let checker = StaticUserChecker::default().with_user("tok7", 7, "Seven");
        assert!(checker.fetch_profile("tok7", UserId(8)).await.is_err());
    }

    #[tokio::test]
    async fn test_http_checker_unreachable_is_unavailable() {
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let checker = HttpUserChecker::new("http://127.0.0.1:9/", "http://127.0.0.1:9");
        match checker.authorize("tok").await {
            Err(AuthError::Unavailable(_)) => {}
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }
}
