use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{AuthError, ConfigError};
use crate::hook::ValidationHook;
use crate::token::{JwtCodec, TokenCodec};

pub const DEFAULT_ATTACHMENT_KEY: &str = "user";
pub const DEFAULT_PERMISSIONS_KEY: &str = "permissions";

/// Configuration for one [`AuthPipeline`](crate::AuthPipeline).
///
/// Build with [`new`](Self::new) (or `From<&str>`, which takes just the
/// secret) and the chained setters, or with [`from_env`](Self::from_env).
/// The pipeline validates it once and never mutates it afterwards.
#[derive(Clone)]
pub struct AuthConfig {
    pub signing_secret: String,
    pub validation_hook: Option<ValidationHook>,
    pub ignored_paths: HashSet<String>,
    pub authorization_required: bool,
    pub attachment_key: String,
    pub codec: Arc<dyn TokenCodec>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print the secret
        f.debug_struct("AuthConfig")
            .field("validation_hook", &self.validation_hook)
            .field("ignored_paths", &self.ignored_paths)
            .field("authorization_required", &self.authorization_required)
            .field("attachment_key", &self.attachment_key)
            .finish_non_exhaustive()
    }
}

impl AuthConfig {
    /// Config with defaults: no hook, nothing ignored, authorization
    /// required, user attached under `"user"`, HS256 codec.
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            validation_hook: None,
            ignored_paths: HashSet::new(),
            authorization_required: true,
            attachment_key: DEFAULT_ATTACHMENT_KEY.into(),
            codec: Arc::new(JwtCodec::default()),
        }
    }

    /// Build from environment variables already set in the process.
    ///
    /// | Variable              | Required | Default | Notes                          |
    /// |-----------------------|----------|---------|--------------------------------|
    /// | `JWT_SECRET`          | **yes**  | —       |                                |
    /// | `AUTH_IGNORED_PATHS`  | no       | *(none)*| Comma-separated exact paths    |
    /// | `AUTH_REQUIRED`       | no       | `true`  | `false` or `0` to disable      |
    /// | `AUTH_ATTACHMENT_KEY` | no       | `user`  |                                |
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, AuthError> {
        let secret = var("JWT_SECRET").ok_or(ConfigError::InvalidOption {
            option: "signingSecret",
        })?;

        let ignored_paths: Vec<String> = var("AUTH_IGNORED_PATHS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let authorization_required = var("AUTH_REQUIRED")
            .map(|v| !(v == "false" || v == "0"))
            .unwrap_or(true);

        let attachment_key =
            var("AUTH_ATTACHMENT_KEY").unwrap_or_else(|| DEFAULT_ATTACHMENT_KEY.into());

        let config = Self::new(secret)
            .ignored_paths(ignored_paths)
            .authorization_required(authorization_required)
            .attachment_key(attachment_key);
        config.validate()?;
        Ok(config)
    }

    pub fn validation_hook(mut self, hook: ValidationHook) -> Self {
        self.validation_hook = Some(hook);
        self
    }
    pub fn ignore_path(mut self, path: impl Into<String>) -> Self {
        self.ignored_paths.insert(path.into());
        self
    }
    pub fn ignored_paths(mut self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.ignored_paths = paths.into_iter().map(Into::into).collect();
        self
    }
    pub fn authorization_required(mut self, v: bool) -> Self {
        self.authorization_required = v;
        self
    }
    pub fn attachment_key(mut self, v: impl Into<String>) -> Self {
        self.attachment_key = v.into();
        self
    }
    pub fn codec(mut self, codec: impl TokenCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_secret.is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "signingSecret",
            });
        }
        if self.attachment_key.is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "attachmentKey",
            });
        }
        Ok(())
    }
}

impl From<&str> for AuthConfig {
    fn from(secret: &str) -> Self {
        Self::new(secret)
    }
}

impl From<String> for AuthConfig {
    fn from(secret: String) -> Self {
        Self::new(secret)
    }
}

/// Where the permission evaluator finds the user and its permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclConfig {
    pub attachment_key: String,
    pub permissions_key: String,
}

impl Default for AclConfig {
    fn default() -> Self {
        Self {
            attachment_key: DEFAULT_ATTACHMENT_KEY.into(),
            permissions_key: DEFAULT_PERMISSIONS_KEY.into(),
        }
    }
}

impl AclConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attachment_key(mut self, v: impl Into<String>) -> Self {
        self.attachment_key = v.into();
        self
    }
    pub fn permissions_key(mut self, v: impl Into<String>) -> Self {
        self.permissions_key = v.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attachment_key.is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "attachmentKey",
            });
        }
        if self.permissions_key.is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "permissionsKey",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> Result<AuthConfig, AuthError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AuthConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn env_requires_secret() {
        assert!(matches!(
            from_vars(&[]),
            Err(AuthError::Config(ConfigError::InvalidOption { option: "signingSecret" }))
        ));
        assert!(matches!(
            from_vars(&[("JWT_SECRET", "")]),
            Err(AuthError::Config(ConfigError::InvalidOption { option: "signingSecret" }))
        ));
    }

    #[test]
    fn env_defaults() {
        let cfg = from_vars(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(cfg.signing_secret, "s3cret");
        assert!(cfg.authorization_required);
        assert_eq!(cfg.attachment_key, "user");
        assert!(cfg.ignored_paths.is_empty());
    }

    #[test]
    fn env_ignored_paths_are_trimmed_and_filtered() {
        let cfg = from_vars(&[
            ("JWT_SECRET", "s"),
            ("AUTH_IGNORED_PATHS", " /health, ,/metrics ,,"),
        ])
        .unwrap();
        let expected: HashSet<String> = ["/health", "/metrics"].map(String::from).into();
        assert_eq!(cfg.ignored_paths, expected);
    }

    #[test]
    fn env_authorization_required_flag() {
        for (value, expected) in [("false", false), ("0", false), ("true", true), ("1", true)] {
            let cfg = from_vars(&[("JWT_SECRET", "s"), ("AUTH_REQUIRED", value)]).unwrap();
            assert_eq!(cfg.authorization_required, expected, "AUTH_REQUIRED={value}");
        }
    }

    #[test]
    fn env_attachment_key() {
        let cfg = from_vars(&[("JWT_SECRET", "s"), ("AUTH_ATTACHMENT_KEY", "account")]).unwrap();
        assert_eq!(cfg.attachment_key, "account");

        assert!(matches!(
            from_vars(&[("JWT_SECRET", "s"), ("AUTH_ATTACHMENT_KEY", "")]),
            Err(AuthError::Config(ConfigError::InvalidOption { option: "attachmentKey" }))
        ));
    }

    #[test]
    fn defaults() {
        let cfg = AuthConfig::from("abc");
        assert_eq!(cfg.signing_secret, "abc");
        assert!(cfg.authorization_required);
        assert_eq!(cfg.attachment_key, "user");
        assert!(cfg.ignored_paths.is_empty());
        assert!(cfg.validation_hook.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_secret_rejected() {
        assert_eq!(
            AuthConfig::new("").validate(),
            Err(ConfigError::InvalidOption {
                option: "signingSecret"
            })
        );
    }

    #[test]
    fn empty_attachment_key_rejected() {
        assert!(AuthConfig::new("s").attachment_key("").validate().is_err());
    }

    #[test]
    fn debug_hides_secret() {
        let rendered = format!("{:?}", AuthConfig::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn acl_defaults_and_validation() {
        let cfg = AclConfig::new();
        assert_eq!(cfg.attachment_key, "user");
        assert_eq!(cfg.permissions_key, "permissions");
        assert!(cfg.validate().is_ok());

        assert_eq!(
            AclConfig::new().attachment_key("").validate(),
            Err(ConfigError::InvalidOption {
                option: "attachmentKey"
            })
        );
        assert_eq!(
            AclConfig::new().permissions_key("").validate(),
            Err(ConfigError::InvalidOption {
                option: "permissionsKey"
            })
        );
    }
}
