//! HTTP surface.
//!
//! Token failures of any kind answer `401` with one sanitized message.

pub mod error;
pub mod handlers;

pub use error::ApiError;

use crate::config::Config;
use crate::confirmation::ConfirmationFlow;
use crate::error::CredentialError;
use crate::jwks::JwksPublisher;
use crate::jwt::{ScopeClaim, TokenIssuer, TokenValidator};
use crate::keys::KeyMaterialProvider;
use crate::metrics;
use crate::refresh::RefreshTokenRotator;
use crate::session::SessionIssuer;
use crate::storage::{
    CredentialStore, InMemoryCredentialStore, InMemoryRefreshTokenRepository, InMemoryRoleStore, LoggingDelivery,
    RefreshTokenRepository, RoleStore, TokenDelivery,
};
use axum::{
    extract::{MatchedPath, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Published key set.
    pub jwks: Arc<JwksPublisher>,
    /// Strict and lifetime-exempt validation.
    pub validator: Arc<TokenValidator>,
    /// First token pair after login.
    pub sessions: Arc<SessionIssuer>,
    /// Refresh exchange and revocation.
    pub rotator: Arc<RefreshTokenRotator>,
    /// Password reset and email confirmation.
    pub confirmations: Arc<ConfirmationFlow>,
    /// Login lookups and password checks.
    pub credentials: Arc<dyn CredentialStore>,
}

/// Storage collaborators the service runs against.
pub struct Collaborators {
    /// Refresh token rows.
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    /// Users, passwords and opaque tokens.
    pub credentials: Arc<dyn CredentialStore>,
    /// Role assignments and scope grants.
    pub roles: Arc<dyn RoleStore>,
    /// Out-of-band token sender.
    pub delivery: Arc<dyn TokenDelivery>,
}

impl Collaborators {
    /// In-memory stores seeded from `config.users` and `config.roles`, with a
    /// delivery that only logs.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::InvalidScope`] for a malformed role scope and
    /// [`CredentialError::Internal`] if a seed password cannot be hashed.
    pub async fn in_memory(config: &Config) -> Result<Self, CredentialError> {
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let roles = Arc::new(InMemoryRoleStore::new());

        for role in &config.roles {
            let scopes: Vec<ScopeClaim> = role.scope_claims()?;
            roles.grant_scopes(&role.name, scopes).await;
        }
        for user in &config.users {
            credentials
                .add_user(&user.id, &user.user_name, &user.email, &user.password)
                .await?;
            let assigned: Vec<&str> = user.roles.iter().map(String::as_str).collect();
            roles.assign_roles(&user.id, &assigned).await;
        }
        info!(users = config.users.len(), roles = config.roles.len(), "Seeded in-memory stores");

        Ok(Self {
            refresh_tokens: Arc::new(InMemoryRefreshTokenRepository::new()),
            credentials,
            roles,
            delivery: Arc::new(LoggingDelivery::new()),
        })
    }
}

impl AppState {
    /// Resolve key material and wire every component.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::SigningKeyInvalid`] if the signing secret is
    /// unusable and [`CredentialError::Config`] for inconsistent token options.
    pub fn build(config: &Config, collaborators: Collaborators) -> Result<Self, CredentialError> {
        let keys = Arc::new(KeyMaterialProvider::new(&config.key_set, &config.key_environment)?);
        let jwks = Arc::new(JwksPublisher::new(&keys));
        let issuer = Arc::new(TokenIssuer::new(keys.clone(), &config.jwt)?);
        let validator = Arc::new(TokenValidator::new(keys, &config.jwt)?);

        let rotator = Arc::new(RefreshTokenRotator::new(
            collaborators.refresh_tokens,
            collaborators.roles.clone(),
            issuer.clone(),
            validator.clone(),
            config.jwt.refresh_token_lifetime(),
        ));
        let sessions = Arc::new(SessionIssuer::new(collaborators.roles, issuer, rotator.clone()));
        let confirmations = Arc::new(ConfirmationFlow::new(
            collaborators.credentials.clone(),
            collaborators.delivery,
        ));

        Ok(Self {
            jwks,
            validator,
            sessions,
            rotator,
            confirmations,
            credentials: collaborators.credentials,
        })
    }
}

/// Every route, with per-route latency tracking.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/keys", get(handlers::keys))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::render_metrics))
        .route("/login", post(handlers::login))
        .route("/token/refresh", post(handlers::refresh))
        .route("/token/revoke", post(handlers::revoke))
        .route("/password/forgot", post(handlers::forgot_password))
        .route("/password/confirm", post(handlers::confirm_reset_token))
        .route("/password/reset", post(handlers::reset_password))
        .route("/email/request", post(handlers::request_email_confirmation))
        .route("/email/confirm", post(handlers::confirm_email))
        .route_layer(middleware::from_fn(track_latency))
        .with_state(state)
}

async fn track_latency(path: MatchedPath, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let response = next.run(request).await;
    metrics::record_http_latency(path.as_str(), started.elapsed().as_secs_f64());
    response
}
