mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tabali::auth::create_access_token;
use tabali::config::Config;
use tabali::domain::account::Actor;
use tabali::domain::catalog::PricingType;
use tabali::domain::{NewCatalogService, ServiceRepository};
use tabali::infrastructure::SeaOrmServiceRepository;
use tabali::server::build_router;
use tower::ServiceExt;

use common::{book, setup, Fixture, PASSWORD};

fn app(fx: &Fixture) -> Router {
    build_router(fx.db.clone(), &Config::default())
}

fn bearer(actor: &Actor) -> String {
    format!(
        "Bearer {}",
        create_access_token(&actor.user_id, actor.role).unwrap()
    )
}

fn json_request(method: &str, uri: &str, actor: Option<&Actor>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(actor) = actor {
        builder = builder.header(header::AUTHORIZATION, bearer(actor));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, actor: Option<&Actor>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(actor) = actor {
        builder = builder.header(header::AUTHORIZATION, bearer(actor));
    }
    builder.body(Body::empty()).unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check_is_public() {
    let fx = setup().await;
    let response = app(&fx).oneshot(get("/api/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "tabali");
}

#[tokio::test]
async fn missing_token_is_rejected_with_the_error_body() {
    let fx = setup().await;
    let response = app(&fx)
        .oneshot(get("/api/v1/reservations", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = read_json(response).await;
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "authentication_error");
    assert_eq!(body["status_code"], 401);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn register_then_login() {
    let fx = setup().await;
    let app = app(&fx);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/register",
            None,
            json!({
                "email": "New.Client@Test.local",
                "password": PASSWORD,
                "first_name": "Nadia",
                "last_name": "Tazi",
                "user_type": "client"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["user"]["email"], "new.client@test.local");
    assert!(body["user"].get("password_hash").is_none());

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            None,
            json!({ "email": "new.client@test.local", "password": PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let tokens = read_json(response).await;
    assert_eq!(tokens["token_type"], "Bearer");
    let access = tokens["access_token"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", access))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let me = read_json(response).await;
    assert_eq!(me["full_name"], "Nadia Tazi");
    assert!(me["client_profile"].is_object());

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/login",
            None,
            json!({ "email": "new.client@test.local", "password": "wrong-password" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admins_cannot_self_register() {
    let fx = setup().await;
    let response = app(&fx)
        .oneshot(json_request(
            "POST",
            "/api/v1/auth/register",
            None,
            json!({
                "email": "boss@test.local",
                "password": PASSWORD,
                "first_name": "Big",
                "last_name": "Boss",
                "user_type": "admin"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let fx = setup().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/reservations")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, bearer(&fx.client))
        .body(Body::from("{not json"))
        .unwrap();

    let response = app(&fx).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn reservation_flow_over_http() {
    let fx = setup().await;
    let app = app(&fx);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/reservations",
            Some(&fx.client),
            json!({
                "provider_service_id": fx.offer_id,
                "scheduled_at": "2025-06-01T09:00:00Z",
                "address": "12 rue des Lilas",
                "description": "Two bedroom flat"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = read_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["status"], "pending");

    // The client may not confirm
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/reservations/{}/confirm", id),
            Some(&fx.client),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(read_json(response).await["code"], "permission_error");

    // Skipping ahead is a conflict
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/reservations/{}/transition", id),
            Some(&fx.provider),
            json!({ "status": "completed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(read_json(response).await["code"], "invalid_transition");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/reservations/{}/confirm", id),
            Some(&fx.provider),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["status"], "confirmed");

    let response = app
        .clone()
        .oneshot(get(&format!("/api/v1/reservations/{}", id), Some(&fx.client)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let detail = read_json(response).await;
    assert_eq!(detail["reservation"]["status"], "confirmed");
    assert_eq!(detail["can_be_cancelled"], true);
    assert_eq!(detail["is_terminal"], false);
    assert_eq!(detail["duration_display"], "2h");
    assert_eq!(
        detail["next_statuses"],
        json!(["in_progress", "cancelled", "cancelled_by_provider"])
    );

    let response = app
        .oneshot(get(
            &format!("/api/v1/reservations/{}/history", id),
            Some(&fx.client),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_reservation_is_not_found() {
    let fx = setup().await;
    let response = app(&fx)
        .oneshot(get("/api/v1/reservations/does-not-exist", Some(&fx.admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(response).await["code"], "not_found");
}

#[tokio::test]
async fn history_is_admin_only_and_exports_csv() {
    let fx = setup().await;
    book(&fx).await;
    let app = app(&fx);

    let response = app
        .clone()
        .oneshot(get("/api/v1/history", Some(&fx.client)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(get("/api/v1/history?action=reservation", Some(&fx.admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = read_json(response).await;
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["action"], "reservation");

    let response = app
        .oneshot(get("/api/v1/history/export", Some(&fx.admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(csv.starts_with("id,created_at,action"));
}

#[tokio::test]
async fn catalog_is_browsable_without_a_token() {
    let fx = setup().await;
    let response = app(&fx)
        .oneshot(get("/api/v1/services?q=clean", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["name"], "Deep cleaning");
}

#[tokio::test]
async fn popular_services_rank_by_bookings() {
    let fx = setup().await;
    let quieter = SeaOrmServiceRepository::new(fx.db.clone())
        .create(NewCatalogService {
            name: "Air conditioning check".to_string(),
            description: None,
            category_id: fx.category_id.clone(),
            service_type: None,
            pricing_type: PricingType::Hourly,
            base_price: 40.0,
            estimated_duration: None,
        })
        .await
        .unwrap();
    book(&fx).await;
    book(&fx).await;

    let response = app(&fx)
        .oneshot(get("/api/v1/services/popular", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["services"][0]["id"], fx.service_id.as_str());
    assert_eq!(body["services"][0]["popularity_score"], 2);
    assert_eq!(body["services"][1]["id"], quieter.id.as_str());
    assert_eq!(body["services"][1]["popularity_score"], 0);
}

#[tokio::test]
async fn login_over_http_keeps_forwarded_address_and_agent() {
    let fx = setup().await;
    let app = app(&fx);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "198.51.100.23, 10.0.0.2")
        .header(header::USER_AGENT, "Mozilla/5.0 (X11; Linux x86_64)")
        .body(Body::from(
            json!({ "email": "provider@test.local", "password": PASSWORD }).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get("/api/v1/history?action=login", Some(&fx.admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = read_json(response).await;
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["ip_address"], "198.51.100.23");
    assert_eq!(
        page["results"][0]["user_agent"],
        "Mozilla/5.0 (X11; Linux x86_64)"
    );
}
