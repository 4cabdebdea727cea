//! Permission guards mounted behind the authentication middleware.

mod common;

use axum::http::StatusCode;
use axum::{Router, middleware, routing::get};
use axum_bearer_gate::{
    Acl, AclConfig, AuthConfig, AuthPipeline, PermissionGuard, ValidationHook, ValidationResult,
    enforce_permissions, require_auth,
};
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{SECRET, bearer, body_json, default_claims, get_request, token};

/// App whose hook attaches `user` for every verified token.
fn app(user: Value, guard: PermissionGuard) -> Router {
    let hook = ValidationHook::sync(move |_| Ok(ValidationResult::valid(user.clone()).into()));
    let pipeline = AuthPipeline::new(AuthConfig::new(SECRET).validation_hook(hook)).unwrap();

    Router::new()
        .route("/users", get(|| async { "users" }))
        .route_layer(middleware::from_fn_with_state(guard, enforce_permissions))
        .layer(middleware::from_fn_with_state(pipeline, require_auth))
}

fn acl() -> Acl {
    Acl::new(AclConfig::new()).unwrap()
}

async fn status_of(app: Router) -> (StatusCode, Value) {
    let res = app
        .oneshot(get_request("/users", Some(&bearer(&token(&default_claims())))))
        .await
        .unwrap();
    let status = res.status();
    if status.is_success() {
        // The success handler returns plain text; only error bodies are JSON.
        return (status, Value::Null);
    }
    (status, body_json(res).await)
}

#[tokio::test]
async fn matching_set_is_let_through() {
    let guard = acl().require_permissions([["user:read", "user:write"]]).unwrap();
    let user = json!({"permissions": "user:read user:write user:delete"});
    let (status, _) = status_of(app(user, guard)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn partial_set_is_rejected() {
    let guard = acl().require_permissions([["user:read", "user:write"]]).unwrap();
    let user = json!({"permissions": ["user:read"]});
    let (status, body) = status_of(app(user, guard)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["type"], "UNAUTHORIZED_ERROR");
}

#[tokio::test]
async fn alternative_set_is_enough() {
    let guard = acl()
        .require_permissions([vec!["user:read", "user:write"], vec!["admin"]])
        .unwrap();
    let (status, _) = status_of(app(json!({"permissions": "admin"}), guard)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn requirement_loaded_from_json() {
    let guard = acl()
        .require_permissions_value(&json!([["reports:view"]]))
        .unwrap();
    let (status, _) = status_of(app(json!({"permissions": ["reports:view"]}), guard)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_permissions_is_a_type_error() {
    let guard = acl().require_permissions([["user:read"]]).unwrap();
    let (status, body) = status_of(app(json!({"name": "John Doe"}), guard)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["type"], "TYPE_ERROR");
    assert_eq!(body["code"], "MISSING_ATTACHMENT");
    assert_eq!(body["field"], "permissions");
    assert_eq!(body["observed"], "undefined");
}

#[tokio::test]
async fn permissions_of_wrong_type_is_a_type_error() {
    let guard = acl().require_permissions([["user:read"]]).unwrap();
    let (status, body) = status_of(app(json!({"permissions": 42}), guard)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INVALID_PERMISSION_TYPE");
    assert_eq!(body["observed"], "number");
}

#[tokio::test]
async fn guard_without_authentication_reports_missing_user() {
    let guard = acl().require_permissions([["user:read"]]).unwrap();
    let app = Router::new()
        .route("/users", get(|| async { "users" }))
        .route_layer(middleware::from_fn_with_state(guard, enforce_permissions));

    let res = app.oneshot(get_request("/users", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(res).await;
    assert_eq!(
        body["message"],
        "Was expecting type object, found \"undefined\" for user"
    );
}

#[tokio::test]
async fn bypassed_route_reaches_guard_without_user() {
    let guard = acl().require_permissions([["user:read"]]).unwrap();
    let pipeline = AuthPipeline::new(AuthConfig::new(SECRET).ignore_path("/users")).unwrap();
    let app = Router::new()
        .route("/users", get(|| async { "users" }))
        .route_layer(middleware::from_fn_with_state(guard, enforce_permissions))
        .layer(middleware::from_fn_with_state(pipeline, require_auth));

    let res = app.oneshot(get_request("/users", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(res).await["field"], "user");
}
