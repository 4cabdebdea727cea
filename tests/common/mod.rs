//! Shared helpers for the integration tests.

#![allow(dead_code)]

use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, header};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};

pub const SECRET: &str = "integration-secret";

/// HS256 token signed with [`SECRET`].
pub fn token(claims: &Value) -> String {
    token_with(claims, SECRET)
}

pub fn token_with(claims: &Value, secret: &str) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub fn default_claims() -> Value {
    json!({"sub": "1234567890", "name": "John Doe", "iat": 1516239022})
}

pub fn get_request(path: &str, authorization: Option<&str>) -> Request<Body> {
    request("GET", path, authorization)
}

pub fn request(method: &str, path: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}
