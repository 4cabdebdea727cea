use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value};

/// Error raised by a caller-supplied validation hook.
///
/// It is carried through [`AuthError::Hook`] untouched, so callers can
/// `downcast_ref` back to their own error type.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Serialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: &'static str,
    message: String,
    status: u16,
    #[serde(flatten)]
    context: Map<String, Value>,
}

/// Errors from authentication and permission checks.
///
/// `BadScheme`, `BadToken` and `Unauthorized` form the authorization family
/// (see [`is_authorization`](Self::is_authorization)); `Config` signals misuse
/// of the library and `Hook` is whatever the validation hook failed with.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("The provided scheme is invalid.")]
    BadScheme { exact_message: Option<String> },

    #[error("The provided token is invalid.")]
    BadToken,

    #[error("The current user does not have access to the requested resource.")]
    Unauthorized,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Hook(HookError),
}

/// Caller or configuration mistakes.  These never mean "the request was
/// rejected"; they mean the gate was wired up or fed incorrectly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Was expecting a non-empty String for \"{option}\"")]
    InvalidOption { option: &'static str },

    #[error("Expected the validation hook to return an Object. Got \"{observed}\".")]
    InvalidHookResult { observed: &'static str },

    #[error(
        "Was expecting the permissions property to be of type \"string\" or \"array\". Found \"{observed}\"."
    )]
    InvalidPermissionType { observed: &'static str },

    #[error("Was expecting type object, found \"{observed}\" for {field}")]
    MissingAttachment { field: String, observed: &'static str },

    #[error("{0}")]
    InvalidPermissionSpec(&'static str),

    #[error("Was expecting an authenticated user on the request, found none")]
    MissingUser,
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidOption { .. } => "INVALID_OPTION",
            Self::InvalidHookResult { .. } => "INVALID_HOOK_RESULT",
            Self::InvalidPermissionType { .. } => "INVALID_PERMISSION_TYPE",
            Self::MissingAttachment { .. } => "MISSING_ATTACHMENT",
            Self::InvalidPermissionSpec(_) => "INVALID_PERMISSION_SPEC",
            Self::MissingUser => "MISSING_USER",
        }
    }
}

impl AuthError {
    pub fn bad_scheme(exact_message: impl Into<String>) -> Self {
        Self::BadScheme {
            exact_message: Some(exact_message.into()),
        }
    }

    pub fn hook(err: impl Into<HookError>) -> Self {
        Self::Hook(err.into())
    }

    /// Stable type tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadScheme { .. } => "BAD_SCHEME_ERROR",
            Self::BadToken => "BAD_TOKEN_ERROR",
            Self::Unauthorized => "UNAUTHORIZED_ERROR",
            Self::Config(_) => "TYPE_ERROR",
            Self::Hook(_) => "HOOK_ERROR",
        }
    }

    /// `true` for a rejected request, `false` for misuse or a hook failure.
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::BadScheme { .. } | Self::BadToken | Self::Unauthorized)
    }

    /// Structured context attached to the error, if any.
    pub fn context(&self) -> Map<String, Value> {
        let mut ctx = Map::new();
        match self {
            Self::BadScheme {
                exact_message: Some(msg),
            } => {
                ctx.insert("exactMessage".into(), msg.clone().into());
            }
            Self::Config(err) => {
                ctx.insert("code".into(), err.code().into());
                match err {
                    ConfigError::InvalidOption { option } => {
                        ctx.insert("option".into(), (*option).into());
                    }
                    ConfigError::InvalidHookResult { observed }
                    | ConfigError::InvalidPermissionType { observed } => {
                        ctx.insert("observed".into(), (*observed).into());
                    }
                    ConfigError::MissingAttachment { field, observed } => {
                        ctx.insert("field".into(), field.clone().into());
                        ctx.insert("observed".into(), (*observed).into());
                    }
                    ConfigError::InvalidPermissionSpec(_) | ConfigError::MissingUser => {}
                }
            }
            _ => {}
        }
        ctx
    }

    pub fn status(&self) -> StatusCode {
        if self.is_authorization() {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
            status: status.as_u16(),
            context: self.context(),
        };

        (status, axum::Json(body)).into_response()
    }
}
