//! The authentication pipeline.
//!
//! A request moves through these checks, stopping at the first that decides
//! its fate:
//!
//! 1. `OPTIONS` requests and ignored paths pass untouched.
//! 2. The `Authorization` header must read `Bearer <credential>`; otherwise
//!    [`AuthError::BadScheme`], or a pass without a user when authorization
//!    is not required.
//! 3. The credential must decode as a token ([`AuthError::BadToken`]).
//! 4. Its signature must verify under the signing secret
//!    ([`AuthError::Unauthorized`]).
//! 5. The validation hook must accept it ([`AuthError::Unauthorized`] when
//!    it does not; its own errors are passed through as they are).
//!
//! On success the user is attached to the request.

use std::sync::Arc;

use axum::extract::OriginalUri;
use http::{HeaderValue, Method, Request, header};

use crate::claims::{AttachedUser, Attachments};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::hook::{NormalizedHook, Verdict};

/// How a request made it through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Pre-flight request or ignored path; no checks ran.
    Bypassed,
    /// No usable credential, tolerated because authorization is not required.
    Anonymous,
    /// Token verified and accepted by the hook.
    Authenticated,
}

/// Validates bearer tokens against one frozen [`AuthConfig`].
///
/// Cheap to clone; clones share the config and the normalized hook.
#[derive(Clone)]
pub struct AuthPipeline {
    inner: Arc<Inner>,
}

struct Inner {
    config: AuthConfig,
    hook: NormalizedHook,
}

impl std::fmt::Debug for AuthPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthPipeline")
            .field("config", &self.inner.config)
            .finish()
    }
}

impl AuthPipeline {
    /// Validate `config` and normalize its hook.  Misconfiguration is
    /// reported here, never per request.
    pub fn new(config: impl Into<AuthConfig>) -> Result<Self, AuthError> {
        let config = config.into();
        config.validate()?;
        let hook = NormalizedHook::new(config.validation_hook.clone());
        Ok(Self {
            inner: Arc::new(Inner { config, hook }),
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.inner.config
    }

    /// Run the full pipeline on `req`, attaching the user on success.
    pub async fn authenticate<B>(&self, req: &mut Request<B>) -> Result<AuthOutcome, AuthError> {
        let config = &self.inner.config;

        if self.is_bypassed(req) {
            tracing::debug!(method = %req.method(), path = request_path(req), "authentication bypassed");
            return Ok(AuthOutcome::Bypassed);
        }

        let token = match extract_bearer(req.headers().get(header::AUTHORIZATION)) {
            Ok(token) => token.to_owned(),
            Err(reason) if !config.authorization_required => {
                tracing::debug!(reason, "no bearer credential; continuing anonymously");
                return Ok(AuthOutcome::Anonymous);
            }
            Err(reason) => {
                tracing::warn!(reason, path = request_path(req), "rejected authorization header");
                return Err(AuthError::bad_scheme(reason));
            }
        };

        if let Some(user) = self.validate_token(&token).await? {
            attach(req, &config.attachment_key, user);
        }
        Ok(AuthOutcome::Authenticated)
    }

    /// Decode, verify and run the hook on a bare credential.
    ///
    /// `Ok(None)` means the hook accepted the token without producing claims.
    pub async fn validate_token(&self, token: &str) -> Result<Option<AttachedUser>, AuthError> {
        let config = &self.inner.config;

        // Decoding is cheap and rejects garbage before any signature work.
        let decoded = config.codec.decode(token).map_err(|e| {
            tracing::debug!(error = %e, "token failed to decode");
            AuthError::BadToken
        })?;

        config
            .codec
            .verify(token, &config.signing_secret)
            .map_err(|e| {
                tracing::warn!(error = %e, "token verification failed");
                AuthError::Unauthorized
            })?;

        match self.inner.hook.run(decoded).await? {
            Verdict::Accepted(user) => Ok(user),
            Verdict::Rejected => {
                tracing::warn!("validation hook rejected token");
                Err(AuthError::Unauthorized)
            }
        }
    }

    fn is_bypassed<B>(&self, req: &Request<B>) -> bool {
        req.method() == Method::OPTIONS
            || self.inner.config.ignored_paths.contains(request_path(req))
    }
}

/// Path the client asked for, before any router nesting stripped a prefix.
fn request_path<B>(req: &Request<B>) -> &str {
    req.extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path())
        .unwrap_or_else(|| req.uri().path())
}

/// Split `<scheme> <credential>` on the first space and require the bearer
/// scheme.  The error is a short reason for the rejection.
fn extract_bearer(header: Option<&HeaderValue>) -> Result<&str, &'static str> {
    let header = header.ok_or("missing authorization header")?;
    let header = header
        .to_str()
        .map_err(|_| "authorization header is not visible ASCII")?;

    let (scheme, credential) = header
        .split_once(' ')
        .ok_or("expected \"<scheme> <credential>\"")?;
    if scheme.is_empty() || credential.is_empty() {
        return Err("expected \"<scheme> <credential>\"");
    }
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err("unsupported authorization scheme");
    }
    Ok(credential)
}

fn attach<B>(req: &mut Request<B>, key: &str, user: AttachedUser) {
    let value = user.to_value();
    let extensions = req.extensions_mut();
    match extensions.get_mut::<Attachments>() {
        Some(attachments) => attachments.insert(key, value),
        None => {
            let mut attachments = Attachments::default();
            attachments.insert(key, value);
            extensions.insert(attachments);
        }
    }
    extensions.insert(user);
}
