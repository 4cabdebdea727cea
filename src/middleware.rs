//! Axum wiring: middleware functions and extractors.
//!
//! ```rust,no_run
//! use axum::{middleware, routing::get, Router};
//! use axum_bearer_gate::{
//!     enforce_permissions, require_auth, Acl, AclConfig, AuthConfig, AuthPipeline, AuthUser,
//! };
//!
//! async fn me(user: AuthUser) -> String {
//!     user.to_value().to_string()
//! }
//!
//! # async fn example() -> Result<(), axum_bearer_gate::AuthError> {
//! let pipeline = AuthPipeline::new(AuthConfig::new("secret").ignore_path("/health"))?;
//! let acl = Acl::new(AclConfig::new())?;
//! let read_users = acl.require_permissions([["user:read"]])?;
//!
//! let app: Router = Router::new()
//!     .route("/me", get(me))
//!     .route_layer(middleware::from_fn_with_state(read_users, enforce_permissions))
//!     .route("/health", get(|| async { "ok" }))
//!     .layer(middleware::from_fn_with_state(pipeline, require_auth));
//! # Ok(())
//! # }
//! ```

use axum::extract::{FromRequestParts, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::request::Parts;

use crate::acl::PermissionGuard;
use crate::claims::AttachedUser;
use crate::error::{AuthError, ConfigError};
use crate::pipeline::AuthPipeline;

/// Authentication middleware, for `from_fn_with_state(pipeline, require_auth)`.
///
/// Runs the [`AuthPipeline`] and hands the request on, or rejects it with the
/// pipeline's [`AuthError`].
pub async fn require_auth(
    State(pipeline): State<AuthPipeline>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    pipeline.authenticate(&mut req).await?;
    Ok(next.run(req).await)
}

/// Permission middleware, for `from_fn_with_state(guard, enforce_permissions)`.
///
/// Must run after [`require_auth`].
pub async fn enforce_permissions(
    State(guard): State<PermissionGuard>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    guard.check_request(&req)?;
    Ok(next.run(req).await)
}

/// Axum extractor: the user attached by [`require_auth`].
///
/// Rejects with [`ConfigError::MissingUser`] when the pipeline did not attach
/// one (no pipeline mounted, bypassed route, or anonymous request).
#[derive(Debug, Clone)]
pub struct AuthUser(pub AttachedUser);

impl std::ops::Deref for AuthUser {
    type Target = AttachedUser;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AttachedUser>()
            .cloned()
            .map(AuthUser)
            .ok_or(ConfigError::MissingUser.into())
    }
}

/// Like [`AuthUser`] but yields `None` when no user was attached.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(Option<AttachedUser>);

impl OptionalAuthUser {
    pub fn into_inner(self) -> Option<AttachedUser> {
        self.0
    }
    pub fn user(&self) -> Option<&AttachedUser> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<AttachedUser>().cloned()))
    }
}
