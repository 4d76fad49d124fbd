//! Scoped credential provider with an explicit lifecycle.
//!
//! Credentials are acquired once at process start, refreshed lazily when close
//! to expiry, and released on shutdown. Tool invocations only ever touch the
//! read-lock fast path; they never run an interactive auth flow.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AccessToken {
    secret: SecretString,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(secret: SecretString, expires_at: DateTime<Utc>) -> Self {
        Self { secret, expires_at }
    }

    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True once the token is within `margin` of its expiry.
    pub fn needs_refresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at - margin <= now
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential source failure: {0}")]
    Source(String),
    #[error("credential provider has been released")]
    Released,
}

/// Where tokens come from. Vendor OAuth flows live behind this seam.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch(&self) -> Result<AccessToken, CredentialError>;
}

/// Token source backed by a long-lived configured secret.
pub struct StaticTokenSource {
    token: SecretString,
    ttl: Duration,
}

impl StaticTokenSource {
    pub fn new(token: SecretString, ttl: Duration) -> Self {
        Self { token, ttl }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn fetch(&self) -> Result<AccessToken, CredentialError> {
        Ok(AccessToken::new(self.token.clone(), Utc::now() + self.ttl))
    }
}

enum CacheState {
    Active(Option<AccessToken>),
    Released,
}

pub struct CredentialProvider {
    source: Arc<dyn TokenSource>,
    refresh_margin: Duration,
    cached: RwLock<CacheState>,
}

impl CredentialProvider {
    pub fn new(source: Arc<dyn TokenSource>, refresh_margin: Duration) -> Self {
        Self { source, refresh_margin, cached: RwLock::new(CacheState::Active(None)) }
    }

    /// Eagerly fetch the first token. Called once during bootstrap so the
    /// first tool invocation does not pay the acquisition latency.
    pub async fn acquire(&self) -> Result<(), CredentialError> {
        let token = self.source.fetch().await?;
        let mut cached = self.cached.write().await;
        match &mut *cached {
            CacheState::Active(slot) => {
                *slot = Some(token);
                Ok(())
            }
            CacheState::Released => Err(CredentialError::Released),
        }
    }

    /// Current bearer secret, refreshing first if the cached token is close
    /// to expiry. Concurrent callers holding a fresh token never block on
    /// the write lock.
    pub async fn bearer(&self) -> Result<SecretString, CredentialError> {
        let now = Utc::now();

        {
            let cached = self.cached.read().await;
            match &*cached {
                CacheState::Released => return Err(CredentialError::Released),
                CacheState::Active(Some(token)) if !token.needs_refresh(now, self.refresh_margin) => {
                    return Ok(token.secret().clone());
                }
                CacheState::Active(_) => {}
            }
        }

        let mut cached = self.cached.write().await;
        match &mut *cached {
            CacheState::Released => Err(CredentialError::Released),
            CacheState::Active(slot) => {
                // Another task may have refreshed while we waited for the lock.
                if let Some(token) = slot.as_ref() {
                    if !token.needs_refresh(now, self.refresh_margin) {
                        return Ok(token.secret().clone());
                    }
                }
                let token = self.source.fetch().await?;
                let secret = token.secret().clone();
                *slot = Some(token);
                Ok(secret)
            }
        }
    }

    /// Drop the cached token so the next call refreshes. Used after an
    /// upstream auth rejection.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.write().await;
        if let CacheState::Active(slot) = &mut *cached {
            *slot = None;
        }
    }

    /// Shutdown: drop the token and refuse further use.
    pub async fn release(&self) {
        let mut cached = self.cached.write().await;
        *cached = CacheState::Released;
    }
}
