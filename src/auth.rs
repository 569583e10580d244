//! Auth collaborator: sign-in, sign-out, and a current-user subscription
//!
//! A real identity provider can be plugged in behind [`AuthProvider`]. When
//! none is configured (or the configuration is unusable), the application
//! silently falls back to [`LocalAuthProvider`], which serves a canned demo
//! identity so the rest of the system keeps working offline.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// The signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
}

/// Identity provider seam: sign-in, sign-out, and a subscription delivering
/// the current user (or `None`) on every change.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self) -> Result<User>;

    async fn sign_out(&self) -> Result<()>;

    /// Current user without waiting for a change.
    fn current_user(&self) -> Option<User>;

    /// Subscribe to user changes.
    fn subscribe(&self) -> watch::Receiver<Option<User>>;
}

/// Local-only provider serving a canned demo identity.
pub struct LocalAuthProvider {
    demo_user: User,
    state: watch::Sender<Option<User>>,
}

impl LocalAuthProvider {
    #[must_use]
    pub fn new() -> Self {
        let demo_user = User {
            id: Uuid::new_v4().to_string(),
            display_name: "Demo Traveler".to_string(),
            email: None,
        };
        let (state, _) = watch::channel(None);
        Self { demo_user, state }
    }
}

impl Default for LocalAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    async fn sign_in(&self) -> Result<User> {
        self.state.send_replace(Some(self.demo_user.clone()));
        Ok(self.demo_user.clone())
    }

    async fn sign_out(&self) -> Result<()> {
        self.state.send_replace(None);
        Ok(())
    }

    fn current_user(&self) -> Option<User> {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.state.subscribe()
    }
}

/// Build the configured provider. Configuration errors fall back to the
/// local demo provider rather than failing startup.
#[must_use]
pub fn provider() -> Arc<dyn AuthProvider> {
    // No external provider is wired up yet; everything runs in demo mode.
    tracing::info!("using local demo auth provider");
    Arc::new(LocalAuthProvider::new())
}
