//! 会话：令牌读写与 401 触发的会话清理。
//!
//! Session collaborators: token accessor, session store and navigation.
//!
//! Teardown is idempotent by construction: only the call that actually removes the access
//! token navigates, so concurrent 401s clear storage once and navigate once.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

pub const ACCESS_TOKEN_KEY: &str = "token";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Synchronous string-keyed credential accessor.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    /// Returns the removed value, `None` if nothing was stored.
    fn remove(&self, key: &str) -> Option<String>;
}

#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value.into());
        self
    }
}

impl TokenStore for InMemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.values
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) -> Option<String> {
        self.values
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .remove(key)
    }
}

/// Invoked on every terminal 401.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn reset_store(&self);
}

/// Does nothing; used when no session is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSession;

#[async_trait]
impl SessionStore for NoopSession {
    async fn reset_store(&self) {}
}

/// Route navigation.
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Current route is public and must not redirect to login.
    fn is_constant_route(&self) -> bool {
        false
    }

    async fn to_login(&self);
}

/// Clears credentials and sends the user to login.
pub struct AuthSession {
    tokens: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
}

impl AuthSession {
    pub fn new(tokens: Arc<dyn TokenStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self { tokens, navigator }
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }
}

#[async_trait]
impl SessionStore for AuthSession {
    async fn reset_store(&self) {
        let access = self.tokens.remove(ACCESS_TOKEN_KEY);
        self.tokens.remove(REFRESH_TOKEN_KEY);

        if access.is_none() {
            // already torn down by a concurrent call
            return;
        }
        warn!("session reset: credentials cleared");
        if self.navigator.is_constant_route() {
            info!("current route is constant, staying");
            return;
        }
        self.navigator.to_login().await;
    }
}
