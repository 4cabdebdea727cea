use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

use crate::error::ConfigError;
use crate::hook::HookOutput;

/// A token split into its three parts.  Header and payload are kept as
/// untyped JSON objects; nothing beyond this shape is assumed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedToken {
    pub header: Map<String, Value>,
    pub payload: Map<String, Value>,
    pub signature: String,
}

impl DecodedToken {
    /// The claims carried by the token.
    pub fn claims(&self) -> &Map<String, Value> {
        &self.payload
    }
}

/// What a validation hook resolves with.
///
/// Serialized as `{"isValid": bool, "claims": …}`.  Hooks hand back a JSON
/// value so that a malformed result can be reported instead of being ruled out
/// by the type system; build one with [`valid`](Self::valid) or
/// [`invalid`](Self::invalid) and hand it back with
/// [`into_output`](Self::into_output).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<Value>,
}

impl ValidationResult {
    pub fn valid(claims: impl Into<Value>) -> Self {
        Self {
            is_valid: true,
            claims: Some(claims.into()),
        }
    }

    pub fn invalid() -> Self {
        Self {
            is_valid: false,
            claims: None,
        }
    }

    /// Wrap as a successful hook output.
    pub fn into_output(self) -> HookOutput {
        Ok(self.into())
    }

    /// Interpret raw hook output.  `None` stands for "settled without a value".
    pub fn from_output(output: Option<Value>) -> Result<Self, ConfigError> {
        let observed = observed_type(output.as_ref());
        match output {
            Some(Value::Object(mut map)) => Ok(Self {
                is_valid: map.get("isValid").is_some_and(truthy),
                claims: map.remove("claims"),
            }),
            _ => Err(ConfigError::InvalidHookResult { observed }),
        }
    }
}

impl From<ValidationResult> for Value {
    fn from(result: ValidationResult) -> Self {
        json!(result)
    }
}

/// The user placed on a request after successful authentication.
#[derive(Debug, Clone, PartialEq)]
pub enum AttachedUser {
    /// Claims produced by a real validation hook, verbatim.
    Claims(Value),
    /// No hook was configured: the whole decoded token, unvalidated beyond
    /// its signature.
    Synthetic(DecodedToken),
}

impl AttachedUser {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::Synthetic(_))
    }

    /// JSON form as stored in [`Attachments`].
    pub fn to_value(&self) -> Value {
        match self {
            Self::Claims(claims) => claims.clone(),
            Self::Synthetic(_) => json!(self),
        }
    }
}

#[derive(Serialize)]
struct SyntheticUser<'a> {
    #[serde(rename = "isNoop")]
    is_noop: bool,
    #[serde(flatten)]
    token: &'a DecodedToken,
}

/// Claims serialize as themselves; a synthetic user becomes
/// `{"isNoop": true, "header": …, "payload": …, "signature": …}`.
impl Serialize for AttachedUser {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Claims(claims) => claims.serialize(serializer),
            Self::Synthetic(token) => SyntheticUser {
                is_noop: true,
                token,
            }
            .serialize(serializer),
        }
    }
}

/// Name-keyed values attached to a request, stored as a request extension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attachments(Map<String, Value>);

impl Attachments {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

impl From<Map<String, Value>> for Attachments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Type name reported in error messages.  `None` is an absent value.
pub fn observed_type(value: Option<&Value>) -> &'static str {
    match value {
        None => "undefined",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
