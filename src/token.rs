use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde_json::{Map, Value};

use crate::claims::DecodedToken;
use crate::error::ConfigError;

/// Failures reported by a [`TokenCodec`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token verification failed: {0}")]
    Verification(#[from] jsonwebtoken::errors::Error),
}

/// Decodes and verifies bearer tokens.
///
/// `decode` only has to establish that the token is structurally sound;
/// `verify` decides whether it is trustworthy under `secret`.
pub trait TokenCodec: Send + Sync {
    fn decode(&self, token: &str) -> Result<DecodedToken, CodecError>;

    fn verify(&self, token: &str, secret: &str) -> Result<(), CodecError>;
}

/// Compact-JWS codec backed by `jsonwebtoken`, using a single HMAC algorithm.
///
/// Verification checks the signature and, when the claims are present,
/// `exp` and `nbf`.  No claim is required and `aud` is not checked.
#[derive(Debug, Clone)]
pub struct JwtCodec {
    algorithm: Algorithm,
    leeway: u64,
}

impl Default for JwtCodec {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::HS256,
            leeway: 0,
        }
    }
}

impl JwtCodec {
    /// HS256 with no leeway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use another HMAC algorithm (`HS384`, `HS512`).
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Result<Self, ConfigError> {
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(ConfigError::InvalidOption { option: "algorithm" });
        }
        self.algorithm = algorithm;
        Ok(self)
    }

    /// Clock skew tolerated on `exp` / `nbf`, in seconds.
    pub fn leeway(mut self, seconds: u64) -> Self {
        self.leeway = seconds;
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.leeway = self.leeway;
        validation
    }
}

impl TokenCodec for JwtCodec {
    fn decode(&self, token: &str) -> Result<DecodedToken, CodecError> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CodecError::Malformed("expected three segments".into()));
        };

        Ok(DecodedToken {
            header: decode_segment(header, "header")?,
            payload: decode_segment(payload, "payload")?,
            signature: signature.to_owned(),
        })
    }

    fn verify(&self, token: &str, secret: &str) -> Result<(), CodecError> {
        decode::<Value>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &self.validation(),
        )?;
        Ok(())
    }
}

fn decode_segment(segment: &str, name: &str) -> Result<Map<String, Value>, CodecError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| CodecError::Malformed(format!("{name} is not base64url: {e}")))?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CodecError::Malformed(format!("{name} is not a JSON object"))),
        Err(e) => Err(CodecError::Malformed(format!("{name} is not JSON: {e}"))),
    }
}
