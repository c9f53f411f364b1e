//! Centralized configuration for the credential service.
//!
//! Static configuration comes from an optional TOML file plus
//! `CREDENTIAL__`-prefixed environment variables. Key material overrides
//! (`APP_KEY_ID`, `APP_SECRET_KEY`) are captured separately in
//! [`KeyEnvironment`] so the merge in [`crate::keys`] stays explicit.
//!
//! The config crate may lowercase keys, so every PascalCase field also
//! carries a lowercase alias.

use crate::error::CredentialError;
use crate::jwt::ScopeClaim;
use serde::Deserialize;
use std::env;
use std::fmt;

/// Environment variable overriding the configured key id.
pub const KEY_ID_ENV: &str = "APP_KEY_ID";
/// Environment variable overriding the configured secret.
pub const SECRET_KEY_ENV: &str = "APP_SECRET_KEY";
/// Environment variable naming the configuration file (without extension).
pub const CONFIG_PATH_ENV: &str = "CREDENTIAL_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/credential";

/// Upper bound for `JwtOptions.ExpiresInSeconds` (one year).
pub const MAX_EXPIRES_IN_SECONDS: i64 = 365 * 24 * 60 * 60;
/// Upper bound for `JwtOptions.RefreshTokenLifetimeDays` (ten years).
pub const MAX_REFRESH_TOKEN_LIFETIME_DAYS: i64 = 3650;

/// The `KeySetOptions` configuration section.
#[derive(Clone, Default, Deserialize)]
pub struct KeySetOptions {
    /// Signing algorithm name, e.g. `HS256` or `EdDSA`.
    #[serde(rename = "Alg", alias = "alg", default)]
    pub alg: Option<String>,
    /// JWK key type, `oct` or `OKP`.
    #[serde(rename = "KeyType", alias = "keytype", default)]
    pub key_type: Option<String>,
    /// Key id before base64url encoding.
    #[serde(rename = "KeyId", alias = "keyid", default)]
    pub key_id: Option<String>,
    /// HMAC secret, or base64 PKCS#8 Ed25519 key for `EdDSA`.
    #[serde(rename = "SecretKey", alias = "secretkey", default)]
    pub secret_key: Option<String>,
}

impl fmt::Debug for KeySetOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySetOptions")
            .field("alg", &self.alg)
            .field("key_type", &self.key_type)
            .field("key_id", &self.key_id)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Key overrides read from the process environment.
#[derive(Clone, Default)]
pub struct KeyEnvironment {
    /// Value of `APP_KEY_ID`.
    pub key_id: Option<String>,
    /// Value of `APP_SECRET_KEY`.
    pub secret_key: Option<String>,
}

impl KeyEnvironment {
    /// Capture the overrides once. Empty values count as unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            key_id: non_empty_env(KEY_ID_ENV),
            secret_key: non_empty_env(SECRET_KEY_ENV),
        }
    }
}

impl fmt::Debug for KeyEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyEnvironment")
            .field("key_id", &self.key_id)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The `JwtOptions` configuration section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JwtOptions {
    /// `iss` claim written into tokens.
    #[serde(rename = "Issuer", alias = "issuer")]
    pub issuer: Option<String>,
    /// `aud` claim written into tokens.
    #[serde(rename = "Audience", alias = "audience")]
    pub audience: Option<String>,
    /// Access token validity window in seconds.
    #[serde(rename = "ExpiresInSeconds", alias = "expiresinseconds")]
    pub expires_in_seconds: i64,
    /// Refresh token lifetime in days.
    #[serde(rename = "RefreshTokenLifetimeDays", alias = "refreshtokenlifetimedays")]
    pub refresh_token_lifetime_days: i64,
    /// Reject tokens whose `iss` differs from [`Self::issuer`].
    #[serde(rename = "ValidateIssuer", alias = "validateissuer")]
    pub validate_issuer: bool,
    /// Reject tokens whose `aud` differs from [`Self::audience`].
    #[serde(rename = "ValidateAudience", alias = "validateaudience")]
    pub validate_audience: bool,
    /// Leeway applied to `exp` in strict validation.
    #[serde(rename = "ClockSkewSeconds", alias = "clockskewseconds")]
    pub clock_skew_seconds: u64,
}

impl Default for JwtOptions {
    fn default() -> Self {
        Self {
            issuer: None,
            audience: None,
            expires_in_seconds: 300,
            refresh_token_lifetime_days: 7,
            validate_issuer: false,
            validate_audience: false,
            clock_skew_seconds: 0,
        }
    }
}

impl JwtOptions {
    /// Refresh token lifetime as a duration, saturating on out-of-range values.
    #[must_use]
    pub fn refresh_token_lifetime(&self) -> chrono::Duration {
        chrono::Duration::try_days(self.refresh_token_lifetime_days).unwrap_or(chrono::Duration::MAX)
    }

    fn validate(&self) -> Result<(), CredentialError> {
        if !(1..=MAX_EXPIRES_IN_SECONDS).contains(&self.expires_in_seconds) {
            return Err(CredentialError::config(format!(
                "JwtOptions.ExpiresInSeconds must be between 1 and {}",
                MAX_EXPIRES_IN_SECONDS
            )));
        }
        if !(1..=MAX_REFRESH_TOKEN_LIFETIME_DAYS).contains(&self.refresh_token_lifetime_days) {
            return Err(CredentialError::config(format!(
                "JwtOptions.RefreshTokenLifetimeDays must be between 1 and {}",
                MAX_REFRESH_TOKEN_LIFETIME_DAYS
            )));
        }
        if self.validate_issuer && self.issuer.is_none() {
            return Err(CredentialError::config(
                "JwtOptions.ValidateIssuer requires JwtOptions.Issuer",
            ));
        }
        if self.validate_audience && self.audience.is_none() {
            return Err(CredentialError::config(
                "JwtOptions.ValidateAudience requires JwtOptions.Audience",
            ));
        }
        Ok(())
    }
}

/// A user registered in the in-memory store at startup (`[[Users]]`).
#[derive(Clone, Deserialize)]
pub struct SeedUser {
    /// Stable user id, written into the `id` claim.
    #[serde(rename = "Id", alias = "id")]
    pub id: String,
    /// User name, written into the `sub` claim.
    #[serde(rename = "UserName", alias = "username")]
    pub user_name: String,
    /// Login address.
    #[serde(rename = "Email", alias = "email")]
    pub email: String,
    /// Initial password; hashed before it is stored.
    #[serde(rename = "Password", alias = "password")]
    pub password: String,
    /// Assigned role names.
    #[serde(rename = "Roles", alias = "roles", default)]
    pub roles: Vec<String>,
}

impl fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedUser")
            .field("id", &self.id)
            .field("user_name", &self.user_name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("roles", &self.roles)
            .finish()
    }
}

/// Scopes granted by a role (`[[Roles]]`).
#[derive(Debug, Clone, Deserialize)]
pub struct SeedRole {
    /// Role name as assigned to users.
    #[serde(rename = "Name", alias = "name")]
    pub name: String,
    /// `resource:action` scopes the role grants.
    #[serde(rename = "Scopes", alias = "scopes", default)]
    pub scopes: Vec<String>,
}

impl SeedRole {
    /// Parsed scopes.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::InvalidScope`] for the first malformed scope.
    pub fn scope_claims(&self) -> Result<Vec<ScopeClaim>, CredentialError> {
        self.scopes.iter().map(|scope| scope.parse()).collect()
    }
}

#[derive(Debug, Default, Deserialize)]
struct Sections {
    #[serde(rename = "KeySetOptions", alias = "keysetoptions", default)]
    key_set: KeySetOptions,
    #[serde(rename = "JwtOptions", alias = "jwtoptions", default)]
    jwt: JwtOptions,
    #[serde(rename = "Users", alias = "users", default)]
    users: Vec<SeedUser>,
    #[serde(rename = "Roles", alias = "roles", default)]
    roles: Vec<SeedRole>,
}

/// Credential service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Static key set section
    pub key_set: KeySetOptions,
    /// Environment key overrides
    pub key_environment: KeyEnvironment,
    /// Token options section
    pub jwt: JwtOptions,
    /// Users seeded into the in-memory store
    pub users: Vec<SeedUser>,
    /// Role scope grants seeded into the in-memory store
    pub roles: Vec<SeedRole>,
}

impl Config {
    /// Load configuration from `.env`, the config file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or validation fails.
    pub fn load() -> Result<Self, CredentialError> {
        dotenvy::dotenv().ok();

        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let sections: Sections = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(config::Environment::with_prefix("CREDENTIAL").separator("__"))
            .build()?
            .try_deserialize()?;

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_env("PORT", 8080)?,
            key_set: sections.key_set,
            key_environment: KeyEnvironment::from_env(),
            jwt: sections.jwt,
            users: sections.users,
            roles: sections.roles,
        };

        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from explicit sections, skipping all ambient sources.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn from_sections(
        key_set: KeySetOptions,
        key_environment: KeyEnvironment,
        jwt: JwtOptions,
    ) -> Result<Self, CredentialError> {
        let config = Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            key_set,
            key_environment,
            jwt,
            users: Vec::new(),
            roles: Vec::new(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), CredentialError> {
        if self.port == 0 {
            return Err(CredentialError::config("PORT must be between 1 and 65535"));
        }
        for role in &self.roles {
            role.scope_claims().map_err(|e| {
                CredentialError::config(format!("Roles.{} has an invalid scope: {}", role.name, e))
            })?;
        }
        self.jwt.validate()
    }
}

/// Parse environment variable with default value.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, CredentialError>
where
    T::Err: fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .parse()
            .map_err(|e| CredentialError::config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_options_defaults() {
        let options = JwtOptions::default();
        assert_eq!(options.expires_in_seconds, 300);
        assert_eq!(options.refresh_token_lifetime(), chrono::Duration::days(7));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_non_positive_window_rejected() {
        let options = JwtOptions {
            expires_in_seconds: 0,
            ..JwtOptions::default()
        };
        assert!(matches!(options.validate(), Err(CredentialError::Config(_))));
    }

    #[test]
    fn test_oversized_access_window_rejected() {
        for expires_in_seconds in [MAX_EXPIRES_IN_SECONDS + 1, i64::MAX] {
            let options = JwtOptions {
                expires_in_seconds,
                ..JwtOptions::default()
            };
            assert!(matches!(options.validate(), Err(CredentialError::Config(_))));
        }

        let at_limit = JwtOptions {
            expires_in_seconds: MAX_EXPIRES_IN_SECONDS,
            ..JwtOptions::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn test_oversized_refresh_lifetime_rejected() {
        for refresh_token_lifetime_days in [MAX_REFRESH_TOKEN_LIFETIME_DAYS + 1, 1_000_000_000, i64::MAX] {
            let jwt = JwtOptions {
                refresh_token_lifetime_days,
                ..JwtOptions::default()
            };
            let result = Config::from_sections(KeySetOptions::default(), KeyEnvironment::default(), jwt);
            assert!(matches!(result, Err(CredentialError::Config(_))));
        }
    }

    #[test]
    fn test_issuer_validation_requires_issuer() {
        let options = JwtOptions {
            validate_issuer: true,
            ..JwtOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_sections_deserialize_pascal_case() {
        let sections: Sections = serde_json::from_value(serde_json::json!({
            "KeySetOptions": { "Alg": "HS512", "KeyId": "kid-1" },
            "JwtOptions": { "ExpiresInSeconds": 600, "Issuer": "identity" }
        }))
        .unwrap();

        assert_eq!(sections.key_set.alg.as_deref(), Some("HS512"));
        assert_eq!(sections.key_set.key_id.as_deref(), Some("kid-1"));
        assert!(sections.key_set.secret_key.is_none());
        assert_eq!(sections.jwt.expires_in_seconds, 600);
        assert_eq!(sections.jwt.refresh_token_lifetime_days, 7);
    }

    #[test]
    fn test_sections_deserialize_lowercased_keys() {
        let sections: Sections = serde_json::from_value(serde_json::json!({
            "keysetoptions": { "alg": "EdDSA", "keytype": "OKP" }
        }))
        .unwrap();

        assert_eq!(sections.key_set.alg.as_deref(), Some("EdDSA"));
        assert_eq!(sections.key_set.key_type.as_deref(), Some("OKP"));
    }

    #[test]
    fn test_seed_sections_deserialize() {
        let sections: Sections = serde_json::from_value(serde_json::json!({
            "Users": [{
                "Id": "u1", "UserName": "alice", "Email": "alice@example.com",
                "Password": "correct horse", "Roles": ["editor"]
            }],
            "Roles": [{ "Name": "editor", "Scopes": ["article:edit"] }]
        }))
        .unwrap();

        assert_eq!(sections.users.len(), 1);
        assert_eq!(sections.users[0].roles, vec!["editor".to_string()]);
        assert!(!format!("{:?}", sections.users[0]).contains("correct horse"));
        assert_eq!(sections.roles[0].scope_claims().unwrap()[0].to_string(), "article:edit");
    }

    #[test]
    fn test_malformed_seed_scope_rejected() {
        let mut config =
            Config::from_sections(KeySetOptions::default(), KeyEnvironment::default(), JwtOptions::default())
                .unwrap();
        config.roles.push(SeedRole {
            name: "editor".to_string(),
            scopes: vec!["no-separator".to_string()],
        });
        assert!(matches!(config.validate(), Err(CredentialError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let options = KeySetOptions {
            secret_key: Some("super-secret-value-that-must-not-leak".to_string()),
            ..KeySetOptions::default()
        };
        let environment = KeyEnvironment {
            key_id: None,
            secret_key: Some("another-secret-value-that-must-not-leak".to_string()),
        };

        assert!(!format!("{:?}", options).contains("must-not-leak"));
        assert!(!format!("{:?}", environment).contains("must-not-leak"));
    }

    #[test]
    fn test_from_sections_validates() {
        let jwt = JwtOptions {
            expires_in_seconds: -5,
            ..JwtOptions::default()
        };
        let result = Config::from_sections(KeySetOptions::default(), KeyEnvironment::default(), jwt);
        assert!(result.is_err());
    }
}
