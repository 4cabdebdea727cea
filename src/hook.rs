//! Validation hooks.
//!
//! A hook receives the decoded token once its signature has been verified
//! and decides whether the request may proceed.  Three calling conventions
//! are supported, picked explicitly by the caller:
//!
//! | Constructor                     | Hook shape                                   |
//! |---------------------------------|----------------------------------------------|
//! | [`ValidationHook::sync`]        | returns its result directly                  |
//! | [`ValidationHook::callback`]    | settles a [`Completion`] with `(error, result)` |
//! | [`ValidationHook::deferred`]    | returns a future                             |
//!
//! All of them are turned into one future-returning function when the
//! pipeline is built; nothing is inspected per request.
//!
//! ```rust
//! use axum_bearer_gate::{ValidationHook, ValidationResult};
//! use serde_json::json;
//!
//! let hook = ValidationHook::deferred(|token| async move {
//!     let name = token.payload.get("name").cloned().unwrap_or_default();
//!     ValidationResult::valid(json!({ "name": name })).into_output()
//! });
//! # let _ = hook;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::claims::{AttachedUser, DecodedToken, ValidationResult};
use crate::error::{AuthError, HookError};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a hook produces: a JSON value to be read as a [`ValidationResult`].
pub type HookOutput = Result<Value, HookError>;

type SyncFn = dyn Fn(&DecodedToken) -> HookOutput + Send + Sync;
type CallbackFn = dyn Fn(DecodedToken, Completion) + Send + Sync;
type DeferredFn = dyn Fn(DecodedToken) -> BoxFuture<'static, HookOutput> + Send + Sync;
type NormalizedFuture = BoxFuture<'static, Result<Option<Value>, HookError>>;
type NormalizedFn = dyn Fn(DecodedToken) -> NormalizedFuture + Send + Sync;

/// Caller-supplied validation hook.
#[derive(Clone)]
pub enum ValidationHook {
    Sync(Arc<SyncFn>),
    Callback(Arc<CallbackFn>),
    Deferred(Arc<DeferredFn>),
}

impl std::fmt::Debug for ValidationHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let style = match self {
            Self::Sync(_) => "Sync",
            Self::Callback(_) => "Callback",
            Self::Deferred(_) => "Deferred",
        };
        f.debug_tuple("ValidationHook").field(&style).finish()
    }
}

impl ValidationHook {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&DecodedToken) -> HookOutput + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(DecodedToken, Completion) + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    pub fn deferred<F, Fut>(f: F) -> Self
    where
        F: Fn(DecodedToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HookOutput> + Send + 'static,
    {
        Self::Deferred(Arc::new(move |token| -> BoxFuture<'static, HookOutput> {
            Box::pin(f(token))
        }))
    }
}

/// Completion handle given to callback-style hooks.
///
/// Settling consumes the handle, so a hook can settle at most once.  Dropping
/// it unsettled fails the request.
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<Result<Option<Value>, HookError>>,
}

impl Completion {
    /// Node-style settlement: an error rejects, otherwise `result` resolves.
    pub fn complete(self, error: Option<HookError>, result: Option<Value>) {
        let outcome = match error {
            Some(err) => Err(err),
            None => Ok(result),
        };
        // The receiver only goes away if the request future was dropped.
        let _ = self.tx.send(outcome);
    }

    pub fn resolve(self, result: impl Into<Value>) {
        self.complete(None, Some(result.into()));
    }

    pub fn reject(self, error: impl Into<HookError>) {
        self.complete(Some(error.into()), None);
    }
}

#[derive(Debug, thiserror::Error)]
#[error("validation hook dropped its completion without settling it")]
struct Unsettled;

/// A hook after normalization, ready to be invoked per request.
#[derive(Clone)]
pub(crate) enum NormalizedHook {
    Noop,
    Custom(Arc<NormalizedFn>),
}

/// Outcome of running the hook against a verified token.
pub(crate) enum Verdict {
    Accepted(Option<AttachedUser>),
    Rejected,
}

impl NormalizedHook {
    pub(crate) fn new(hook: Option<ValidationHook>) -> Self {
        let Some(hook) = hook else {
            return Self::Noop;
        };

        let f: Arc<NormalizedFn> = match hook {
            ValidationHook::Sync(f) => Arc::new(move |token: DecodedToken| -> NormalizedFuture {
                let output = f(&token).map(Some);
                Box::pin(async move { output })
            }),
            ValidationHook::Deferred(f) => Arc::new(move |token: DecodedToken| -> NormalizedFuture {
                let fut = f(token);
                Box::pin(async move { fut.await.map(Some) })
            }),
            ValidationHook::Callback(f) => Arc::new(move |token: DecodedToken| -> NormalizedFuture {
                let (tx, rx) = oneshot::channel();
                f(token, Completion { tx });
                Box::pin(async move {
                    match rx.await {
                        Ok(outcome) => outcome,
                        Err(_) => Err(Box::new(Unsettled) as HookError),
                    }
                })
            }),
        };
        Self::Custom(f)
    }

    pub(crate) async fn run(&self, token: DecodedToken) -> Result<Verdict, AuthError> {
        match self {
            Self::Noop => Ok(Verdict::Accepted(Some(AttachedUser::Synthetic(token)))),
            Self::Custom(f) => {
                let output = f(token).await.map_err(AuthError::Hook)?;
                let result = ValidationResult::from_output(output)?;
                if result.is_valid {
                    Ok(Verdict::Accepted(result.claims.map(AttachedUser::Claims)))
                } else {
                    Ok(Verdict::Rejected)
                }
            }
        }
    }
}
