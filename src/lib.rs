//! # axum-bearer-gate
//!
//! Bearer-token authentication and declarative permission checks for
//! [Axum](https://docs.rs/axum) services.
//!
//! An [`AuthPipeline`] checks the `Authorization: Bearer …` header, verifies
//! the token's signature under a shared secret and hands the decoded token to
//! an optional [`ValidationHook`].  The claims the hook produces are attached
//! to the request, where an [`Acl`] guard can require permissions from them.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use axum::{middleware, routing::get, Router};
//! use axum_bearer_gate::{
//!     enforce_permissions, require_auth, Acl, AclConfig, AuthConfig, AuthPipeline, AuthUser,
//!     ValidationHook, ValidationResult,
//! };
//! use serde_json::json;
//!
//! async fn orders(user: AuthUser) -> String {
//!     format!("hello {}", user.to_value()["name"])
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let hook = ValidationHook::deferred(|token| async move {
//!         // Look the subject up, decide, and return the claims to attach.
//!         let name = token.payload.get("name").cloned().unwrap_or_default();
//!         ValidationResult::valid(json!({"name": name, "permissions": "orders:read"}))
//!             .into_output()
//!     });
//!
//!     let pipeline = AuthPipeline::new(
//!         AuthConfig::new("your-jwt-secret")
//!             .validation_hook(hook)
//!             .ignore_path("/health"),
//!     )
//!     .unwrap();
//!     let acl = Acl::new(AclConfig::new()).unwrap();
//!
//!     let app: Router = Router::new()
//!         .route("/orders", get(orders))
//!         .route_layer(middleware::from_fn_with_state(
//!             acl.require_permissions([["orders:read"]]).unwrap(),
//!             enforce_permissions,
//!         ))
//!         .route("/health", get(|| async { "ok" }))
//!         .layer(middleware::from_fn_with_state(pipeline, require_auth));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```
//!
//! ## Environment variables (`AuthConfig::from_env`)
//!
//! This crate does **not** load `.env` files.
//!
//! | Variable              | Required | Default  | Notes                       |
//! |-----------------------|----------|----------|-----------------------------|
//! | `JWT_SECRET`          | **yes**  | —        |                             |
//! | `AUTH_IGNORED_PATHS`  | no       | *(none)* | Comma-separated exact paths |
//! | `AUTH_REQUIRED`       | no       | `true`   | `false` or `0` to disable   |
//! | `AUTH_ATTACHMENT_KEY` | no       | `user`   |                             |
//!
//! ## Errors
//!
//! Every failure is an [`AuthError`].  As a response it renders as JSON
//! `{"type": …, "message": …, "status": …}`: `401` for the authorization
//! family, `500` for misconfiguration and hook failures.

pub mod acl;
pub mod claims;
pub mod config;
pub mod error;
pub mod hook;
pub mod middleware;
pub mod pipeline;
pub mod token;

pub use acl::{Acl, PermissionGuard, PermissionRequirement, granted_permissions};
pub use claims::{AttachedUser, Attachments, DecodedToken, ValidationResult};
pub use config::{AclConfig, AuthConfig};
pub use error::{AuthError, ConfigError, HookError};
pub use hook::{BoxFuture, Completion, HookOutput, ValidationHook};
pub use middleware::{AuthUser, OptionalAuthUser, enforce_permissions, require_auth};
pub use pipeline::{AuthOutcome, AuthPipeline};
pub use token::{CodecError, JwtCodec, TokenCodec};
