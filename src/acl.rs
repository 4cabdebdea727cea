//! Declarative permission checks.
//!
//! A [`PermissionRequirement`] is an OR of ANDs: a list of permission sets,
//! satisfied when every permission of at least one set is granted.  Granted
//! permissions come from the user attached by the
//! [`AuthPipeline`](crate::AuthPipeline), either as a space-separated string
//! (`"user:read user:write"`) or as an array of strings.
//!
//! ```rust
//! use axum_bearer_gate::{Acl, AclConfig};
//!
//! let acl = Acl::new(AclConfig::new()).unwrap();
//! // (user:read AND user:write) OR admin
//! let guard = acl
//!     .require_permissions([vec!["user:read", "user:write"], vec!["admin"]])
//!     .unwrap();
//! # let _ = guard;
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use http::Request;
use serde_json::Value;

use crate::claims::{Attachments, observed_type};
use crate::config::AclConfig;
use crate::error::{AuthError, ConfigError};

const NOT_A_LIST_OF_ARRAYS: &str =
    "The permissions chain has to be a list of arrays. Found offending type.";
const NOT_ONLY_STRINGS: &str =
    "The permissions block should only contain strings. Found offending type.";
const NO_PERMISSION_SETS: &str = "The permissions chain must contain at least one permission set.";

/// Permission sets of which at least one must be fully granted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRequirement {
    sets: Vec<Vec<String>>,
}

impl PermissionRequirement {
    pub fn new<I, S, P>(sets: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let sets: Vec<Vec<String>> = sets
            .into_iter()
            .map(|set| set.into_iter().map(Into::into).collect())
            .collect();
        if sets.is_empty() {
            return Err(ConfigError::InvalidPermissionSpec(NO_PERMISSION_SETS));
        }
        Ok(Self { sets })
    }

    /// Build from data, e.g. a route table loaded from JSON:
    /// `[["user:read", "user:write"], ["admin"]]`.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let Value::Array(sets) = value else {
            return Err(ConfigError::InvalidPermissionSpec(NOT_A_LIST_OF_ARRAYS));
        };

        let mut parsed = Vec::with_capacity(sets.len());
        for set in sets {
            let Value::Array(permissions) = set else {
                return Err(ConfigError::InvalidPermissionSpec(NOT_A_LIST_OF_ARRAYS));
            };
            let permissions = permissions
                .iter()
                .map(|p| p.as_str().map(str::to_owned))
                .collect::<Option<Vec<_>>>()
                .ok_or(ConfigError::InvalidPermissionSpec(NOT_ONLY_STRINGS))?;
            parsed.push(permissions);
        }
        Self::new(parsed)
    }

    pub fn sets(&self) -> &[Vec<String>] {
        &self.sets
    }

    /// `true` when some set is a subset of `granted`.
    pub fn is_satisfied_by(&self, granted: &HashSet<&str>) -> bool {
        self.sets
            .iter()
            .any(|set| set.iter().all(|p| granted.contains(p.as_str())))
    }
}

/// Normalize a user's permissions value into a set of granted permissions.
///
/// Strings are split on whitespace; arrays contribute their string
/// elements.  Anything else is a type error.
pub fn granted_permissions(value: &Value) -> Result<HashSet<&str>, ConfigError> {
    match value {
        Value::String(s) => Ok(s.split_whitespace().collect()),
        Value::Array(items) => Ok(items.iter().filter_map(Value::as_str).collect()),
        other => Err(ConfigError::InvalidPermissionType {
            observed: observed_type(Some(other)),
        }),
    }
}

/// Permission evaluator bound to one [`AclConfig`].
#[derive(Debug, Clone)]
pub struct Acl {
    config: Arc<AclConfig>,
}

impl Acl {
    pub fn new(config: AclConfig) -> Result<Self, AuthError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &AclConfig {
        &self.config
    }

    /// Guard requiring any one of `sets` to be fully granted.
    pub fn require_permissions<I, S, P>(&self, sets: I) -> Result<PermissionGuard, AuthError>
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Ok(self.guard(PermissionRequirement::new(sets)?))
    }

    /// Like [`require_permissions`](Self::require_permissions), for a
    /// requirement held as JSON.
    pub fn require_permissions_value(&self, sets: &Value) -> Result<PermissionGuard, AuthError> {
        Ok(self.guard(PermissionRequirement::from_value(sets)?))
    }

    pub fn guard(&self, requirement: PermissionRequirement) -> PermissionGuard {
        PermissionGuard {
            config: self.config.clone(),
            requirement: Arc::new(requirement),
        }
    }
}

/// A fixed requirement, checked per request.  Cheap to clone.
#[derive(Debug, Clone)]
pub struct PermissionGuard {
    config: Arc<AclConfig>,
    requirement: Arc<PermissionRequirement>,
}

impl PermissionGuard {
    pub fn requirement(&self) -> &PermissionRequirement {
        &self.requirement
    }

    /// Check the user found at the configured attachment key.
    pub fn check(&self, attachments: Option<&Attachments>) -> Result<(), AuthError> {
        let config = &self.config;

        let user = attachments.and_then(|a| a.get(&config.attachment_key));
        let user = match user {
            Some(v) if !v.is_null() => v,
            _ => {
                return Err(ConfigError::MissingAttachment {
                    field: config.attachment_key.clone(),
                    observed: observed_type(user),
                }
                .into());
            }
        };

        let permissions = user.get(&config.permissions_key);
        let permissions = match permissions {
            Some(v) if !v.is_null() => v,
            _ => {
                return Err(ConfigError::MissingAttachment {
                    field: config.permissions_key.clone(),
                    observed: observed_type(permissions),
                }
                .into());
            }
        };

        let granted = granted_permissions(permissions)?;
        if self.requirement.is_satisfied_by(&granted) {
            Ok(())
        } else {
            tracing::warn!(
                required = ?self.requirement.sets(),
                "permission denied"
            );
            Err(AuthError::Unauthorized)
        }
    }

    pub fn check_request<B>(&self, req: &Request<B>) -> Result<(), AuthError> {
        self.check(req.extensions().get::<Attachments>())
    }
}
