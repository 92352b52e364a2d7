use crate::common::{ClientError, ClientResult};
use crate::utils::EnvUtils;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// Environment variable holding a raw bearer token.
pub const TOKEN_ENV_VAR: &str = "AZPAGER_TOKEN";
/// Optional lifetime of [`TOKEN_ENV_VAR`] in seconds.
pub const TOKEN_EXPIRES_IN_ENV_VAR: &str = "AZPAGER_TOKEN_EXPIRES_IN";

const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// A bearer token and the instant it stops being valid.
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    pub fn expires_in(token: impl Into<String>, lifetime: Duration) -> Self {
        Self::new(token, Utc::now() + lifetime)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_on
    }

    /// True when the token expires within `window`.
    pub fn needs_refresh(&self, window: Duration) -> bool {
        Utc::now() + window >= self.expires_on
    }
}

/// Source of bearer tokens for a given scope.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self, scope: &str) -> ClientResult<AccessToken>;
}

/// Always hands out the same token, regardless of scope.
#[derive(Debug, Clone)]
pub struct StaticTokenCredential {
    token: AccessToken,
}

impl StaticTokenCredential {
    pub fn new(token: AccessToken) -> Self {
        Self { token }
    }

    /// Token with a one hour lifetime starting now.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self::new(AccessToken::expires_in(
            token,
            Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS),
        ))
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self, _scope: &str) -> ClientResult<AccessToken> {
        Ok(self.token.clone())
    }
}

/// Reads the token from [`TOKEN_ENV_VAR`] on every call, e.g. the output of
/// `az account get-access-token`.
#[derive(Debug, Clone, Default)]
pub struct EnvTokenCredential;

impl EnvTokenCredential {
    pub fn new() -> Self {
        Self
    }

    pub fn is_configured() -> bool {
        EnvUtils::has_non_empty_var(TOKEN_ENV_VAR)
    }
}

#[async_trait]
impl TokenCredential for EnvTokenCredential {
    async fn get_token(&self, scope: &str) -> ClientResult<AccessToken> {
        let token = EnvUtils::get_validated_var(TOKEN_ENV_VAR)
            .map_err(|e| ClientError::Configuration(e.to_string()))?;
        let lifetime = EnvUtils::get_parsed_var::<i64>(TOKEN_EXPIRES_IN_ENV_VAR)
            .map_err(|e| ClientError::Configuration(e.to_string()))?
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);

        log::debug!("Using token from {TOKEN_ENV_VAR} for scope {scope}");
        Ok(AccessToken::expires_in(token, Duration::seconds(lifetime)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::assert_ok;

    #[test]
    fn test_refresh_window() {
        let token = AccessToken::expires_in("t", Duration::minutes(3));
        assert!(!token.is_expired());
        assert!(token.needs_refresh(Duration::minutes(5)));
        assert!(!token.needs_refresh(Duration::minutes(1)));

        let expired = AccessToken::new("t", Utc::now() - Duration::seconds(1));
        assert!(expired.is_expired());
    }

    #[test]
    fn test_debug_redacts_token() {
        let token = AccessToken::expires_in("super-secret", Duration::hours(1));
        assert!(!format!("{token:?}").contains("super-secret"));
    }

    #[tokio::test]
    async fn test_static_credential_ignores_scope() {
        let credential = StaticTokenCredential::from_token("abc");
        let first = assert_ok!(credential.get_token("https://a/.default").await);
        let second = assert_ok!(credential.get_token("https://b/.default").await);
        assert_eq!(first.token, "abc");
        assert_eq!(second.token, "abc");
    }
}
