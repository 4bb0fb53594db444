//! Access-token resolution for identity-backed destinations.
//!
//! Refreshable providers exchange the stored refresh token on every call
//! unless a TTL cache is configured.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::config::GoogleConfig;
use crate::error::DeliveryError;
use crate::models::ProviderKind;
use crate::store::AccountStore;

/// Cached tokens expire this long before the provider says they do.
const EXPIRY_SKEW: Duration = Duration::from_secs(60);

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedCredentials {
    pub access_token: String,
    /// Never written to step checkpoints; a resumed instance only needs the access token.
    #[serde(skip_serializing, default)]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCredentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

struct CachedToken {
    credentials: ResolvedCredentials,
    expires_at: Instant,
}

pub struct CredentialResolver {
    accounts: Arc<dyn AccountStore>,
    client: reqwest::Client,
    google: GoogleConfig,
    cache_ttl: Option<Duration>,
    cache: DashMap<(String, ProviderKind), CachedToken>,
}

impl CredentialResolver {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        client: reqwest::Client,
        google: GoogleConfig,
        cache_ttl: Option<Duration>,
    ) -> Self {
        Self {
            accounts,
            client,
            google,
            cache_ttl,
            cache: DashMap::new(),
        }
    }

    pub async fn resolve(
        &self,
        user_id: &str,
        provider: ProviderKind,
    ) -> Result<ResolvedCredentials, DeliveryError> {
        let cache_key = (user_id.to_string(), provider);
        if let Some(cached) = self.cache.get(&cache_key) {
            if cached.expires_at > Instant::now() {
                return Ok(cached.credentials.clone());
            }
        }

        let account = self.accounts.find(user_id, provider).await?.ok_or_else(|| {
            DeliveryError::Credential(format!("no {provider} account for user {user_id}"))
        })?;

        // Notion tokens do not expire and carry no refresh token, so only
        // refreshable providers fail on a missing one.
        if !provider.is_refreshable() {
            let access_token = account.access_token.filter(|t| !t.is_empty()).ok_or_else(|| {
                DeliveryError::Credential(format!("{provider} account for user {user_id} has no access token"))
            })?;
            return Ok(ResolvedCredentials {
                access_token,
                refresh_token: account.refresh_token,
            });
        }

        let refresh_token = account
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                DeliveryError::Credential(format!(
                    "{provider} account for user {user_id} has no refresh token"
                ))
            })?;

        let token = self.refresh_google(&refresh_token).await?;
        tracing::debug!(user_id, %provider, "refreshed access token");

        if let Err(e) = self
            .accounts
            .update_access_token(user_id, provider, &token.access_token)
            .await
        {
            tracing::warn!(user_id, %provider, error = %e, "failed to store refreshed access token");
        }

        let credentials = ResolvedCredentials {
            access_token: token.access_token,
            refresh_token: Some(token.refresh_token.unwrap_or(refresh_token)),
        };

        if let Some(ttl) = self.cache_ttl {
            let ttl = token
                .expires_in
                .map(|secs| Duration::from_secs(secs).saturating_sub(EXPIRY_SKEW))
                .map_or(ttl, |provider_ttl| provider_ttl.min(ttl));
            self.cache.insert(
                cache_key,
                CachedToken {
                    credentials: credentials.clone(),
                    expires_at: Instant::now() + ttl,
                },
            );
        }

        Ok(credentials)
    }

    async fn refresh_google(&self, refresh_token: &str) -> Result<TokenResponse, DeliveryError> {
        let resp = self
            .client
            .post(&self.google.token_url)
            .form(&[
                ("client_id", self.google.client_id.as_str()),
                ("client_secret", self.google.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DeliveryError::Transient(format!(
                "token endpoint returned {status}"
            )));
        }
        if !status.is_success() {
            let body = crate::destinations::error_body(resp).await;
            return Err(DeliveryError::Credential(format!(
                "token refresh rejected with {status}: {body}"
            )));
        }

        resp.json::<TokenResponse>()
            .await
            .map_err(|e| DeliveryError::Credential(format!("invalid token response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_credentials_omit_refresh_token() {
        let credentials = ResolvedCredentials {
            access_token: "access".to_string(),
            refresh_token: Some("long-lived".to_string()),
        };

        let value = serde_json::to_value(&credentials).unwrap();

        assert_eq!(value, serde_json::json!({ "access_token": "access" }));
        let restored: ResolvedCredentials = serde_json::from_value(value).unwrap();
        assert_eq!(restored.refresh_token, None);
    }
}
