use axum::{Router, routing::get};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{DeploymentImpl, routes};

pub mod extract;

pub fn router(deployment: DeploymentImpl) -> Router {
    let api_routes = Router::new()
        .merge(routes::auth::router())
        .merge(routes::devices::router())
        .merge(routes::status::router());

    let allow_any_origin = deployment.config().cors_allow_any_origin;
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .with_state(deployment);

    let app = if allow_any_origin {
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        app
    };
    app.layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
    };
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use db::DBService;
    use services::services::{
        config::Config,
        store::{InMemoryDeviceStore, SqlDeviceStore},
    };
    use tower::ServiceExt;

    use crate::DeploymentImpl;

    fn setup_deployment() -> DeploymentImpl {
        let config = Config {
            app_password: Some(SecretString::from("sekrit")),
            ..Config::default()
        };
        DeploymentImpl::with_store(config, Arc::new(InMemoryDeviceStore::new()))
    }

    async fn send(
        deployment: &DeploymentImpl,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = super::router(deployment.clone())
            .oneshot(request)
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn register(deployment: &DeploymentImpl, device_id: &str, task_name: &str) {
        let (status, _) = send(
            deployment,
            Method::POST,
            "/api/devices",
            Some(json!({ "deviceId": device_id, "taskName": task_name })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    async fn report(deployment: &DeploymentImpl, device_id: &str, status: &str, timestamp: &str) {
        let (code, _) = send(
            deployment,
            Method::POST,
            "/api/status",
            Some(json!({ "deviceId": device_id, "status": status, "timestamp": timestamp })),
        )
        .await;
        assert_eq!(code, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn health_is_public() {
        let deployment = setup_deployment();
        let (status, body) = send(&deployment, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn register_then_report_reflects_latest_status() {
        let deployment = setup_deployment();

        let (status, body) = send(
            &deployment,
            Method::POST,
            "/api/devices",
            Some(json!({ "deviceId": "dev-1", "taskName": "Feed fish" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Device registered successfully.");
        assert_eq!(body["device"]["deviceId"], "dev-1");
        assert_eq!(body["device"]["taskName"], "Feed fish");
        assert!(body["device"]["createdAt"].as_str().unwrap().ends_with('Z'));

        let (_, fresh) = send(&deployment, Method::GET, "/api/devices/dev-1", None).await;
        assert_eq!(fresh["currentStatus"], "NOT_DONE");
        assert_eq!(fresh["lastUpdatedAt"], fresh["updatedAt"]);

        report(&deployment, "dev-1", "NOT_DONE", "2024-01-01T00:00:00Z").await;
        let (status, body) = send(
            &deployment,
            Method::POST,
            "/api/status",
            Some(json!({
                "deviceId": "dev-1",
                "status": "DONE",
                "timestamp": "2024-01-01T08:00:00Z"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Status recorded successfully.");
        assert_eq!(body["log"]["deviceId"], "dev-1");
        assert_eq!(body["log"]["status"], "DONE");
        assert_eq!(body["log"]["timestamp"], "2024-01-01T08:00:00Z");
        assert!(body["log"]["logId"].is_string());

        let (status, device) = send(&deployment, Method::GET, "/api/devices/dev-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(device["deviceId"], "dev-1");
        assert_eq!(device["taskName"], "Feed fish");
        assert_eq!(device["currentStatus"], "DONE");
        assert_eq!(device["lastUpdatedAt"], "2024-01-01T08:00:00Z");
    }

    #[tokio::test]
    async fn list_devices_is_newest_first() {
        let deployment = setup_deployment();
        register(&deployment, "dev-1", "Feed fish").await;
        register(&deployment, "dev-2", "Water plants").await;
        report(&deployment, "dev-1", "DONE", "2024-01-01T08:00:00Z").await;

        let (status, body) = send(&deployment, Method::GET, "/api/devices", None).await;
        assert_eq!(status, StatusCode::OK);
        let devices = body["devices"].as_array().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0]["deviceId"], "dev-2");
        assert_eq!(devices[0]["currentStatus"], "NOT_DONE");
        assert_eq!(devices[1]["deviceId"], "dev-1");
        assert_eq!(devices[1]["currentStatus"], "DONE");
    }

    #[tokio::test]
    async fn duplicate_registration_is_conflict() {
        let deployment = setup_deployment();
        register(&deployment, "dev-1", "Feed fish").await;

        let (status, body) = send(
            &deployment,
            Method::POST,
            "/api/devices",
            Some(json!({ "deviceId": "dev-1", "taskName": "Again" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "This device ID already exists.");
    }

    #[tokio::test]
    async fn delete_twice_is_not_found() {
        let deployment = setup_deployment();
        register(&deployment, "dev-2", "Water plants").await;
        report(&deployment, "dev-2", "DONE", "2024-01-01T08:00:00Z").await;

        let (status, body) = send(&deployment, Method::DELETE, "/api/devices/dev-2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["message"],
            "Device and associated data deleted successfully."
        );

        let (status, _) = send(&deployment, Method::DELETE, "/api/devices/dev-2", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&deployment, Method::GET, "/api/devices/dev-2/history", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rename_with_reset_clears_history() {
        let deployment = setup_deployment();
        register(&deployment, "dev-1", "Feed fish").await;
        report(&deployment, "dev-1", "DONE", "2024-01-01T08:00:00Z").await;

        let (status, body) = send(
            &deployment,
            Method::PUT,
            "/api/devices/dev-1/task",
            Some(json!({ "taskName": "Feed cat", "resetHistory": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Device information updated successfully.");
        assert_eq!(body["device"]["taskName"], "Feed cat");

        let (_, history) =
            send(&deployment, Method::GET, "/api/devices/dev-1/history", None).await;
        assert_eq!(history["taskName"], "Feed cat");
        assert_eq!(history["history"], json!([]));
        assert!(history.get("pageInfo").is_none());

        let (_, device) = send(&deployment, Method::GET, "/api/devices/dev-1", None).await;
        assert_eq!(device["currentStatus"], "NOT_DONE");

        let (status, body) = send(
            &deployment,
            Method::PUT,
            "/api/devices/dev-1/task",
            Some(json!({ "taskName": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Task name is required and must be a non-empty string."
        );
    }

    #[tokio::test]
    async fn history_supports_filters_and_pagination() {
        let deployment = setup_deployment();
        register(&deployment, "dev-1", "Feed fish").await;
        for day in 1..=5 {
            report(&deployment, "dev-1", "DONE", &format!("2024-01-0{day}T12:00:00Z")).await;
        }

        let (status, body) = send(
            &deployment,
            Method::GET,
            "/api/devices/dev-1/history?limit=2&offset=2",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deviceId"], "dev-1");
        let timestamps: Vec<&str> = body["history"]
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["timestamp"].as_str().unwrap())
            .collect();
        assert_eq!(timestamps, vec!["2024-01-03T12:00:00Z", "2024-01-02T12:00:00Z"]);
        assert_eq!(
            body["pageInfo"],
            json!({
                "totalCount": 5,
                "currentPage": 2,
                "totalPages": 3,
                "hasNextPage": true,
                "hasPreviousPage": true
            })
        );

        let (_, body) = send(
            &deployment,
            Method::GET,
            "/api/devices/dev-1/history?startDate=2024-01-02&endDate=2024-01-03&order=asc",
            None,
        )
        .await;
        let timestamps: Vec<&str> = body["history"]
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["timestamp"].as_str().unwrap())
            .collect();
        assert_eq!(timestamps, vec!["2024-01-02T12:00:00Z", "2024-01-03T12:00:00Z"]);

        let (status, body) = send(
            &deployment,
            Method::GET,
            "/api/devices/dev-1/history?limit=0",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "limit must be a positive integer.");
    }

    #[tokio::test]
    async fn history_rejects_offsets_outside_the_bindable_range() {
        let sql_store = SqlDeviceStore::new(DBService::new("sqlite::memory:").await.unwrap());
        let deployments = [
            ("memory", setup_deployment()),
            (
                "sqlite",
                DeploymentImpl::with_store(Config::default(), Arc::new(sql_store)),
            ),
        ];

        for (name, deployment) in deployments {
            register(&deployment, "dev-1", "Feed fish").await;
            report(&deployment, "dev-1", "DONE", "2024-01-01T12:00:00Z").await;

            for uri in [
                "/api/devices/dev-1/history?limit=2&offset=18446744073709551615",
                "/api/devices/dev-1/history?limit=1&offset=9223372036854775808",
            ] {
                let (status, body) = send(&deployment, Method::GET, uri, None).await;
                assert_eq!(status, StatusCode::BAD_REQUEST, "{name} {uri}");
                assert_eq!(body["message"], "offset must be a non-negative integer.");
            }

            let (status, body) = send(
                &deployment,
                Method::GET,
                "/api/devices/dev-1/history?limit=1&offset=9223372036854775807",
                None,
            )
            .await;
            assert_eq!(status, StatusCode::OK, "{name}");
            assert_eq!(body["history"], json!([]), "{name}");
            assert_eq!(body["pageInfo"]["hasNextPage"], false, "{name}");
        }
    }

    #[tokio::test]
    async fn status_for_unknown_device_is_not_found() {
        let deployment = setup_deployment();
        let (status, body) = send(
            &deployment,
            Method::POST,
            "/api/status",
            Some(json!({
                "deviceId": "ghost",
                "status": "DONE",
                "timestamp": "2024-01-01T08:00:00Z"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Device with ID ghost not found.");
    }

    #[tokio::test]
    async fn malformed_bodies_are_bad_requests() {
        let deployment = setup_deployment();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/devices")
            .body(Body::from("{\"deviceId\": "))
            .unwrap();
        let response = super::router(deployment.clone())
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Invalid JSON format.");

        let (status, body) = send(
            &deployment,
            Method::POST,
            "/api/status",
            Some(json!({ "deviceId": 7, "status": "DONE", "timestamp": "2024-01-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid request body.");

        let (status, body) = send(
            &deployment,
            Method::POST,
            "/api/status",
            Some(json!({ "deviceId": "dev-1", "status": "MAYBE", "timestamp": "2024-01-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Status must be either \"DONE\" or \"NOT_DONE\".");
    }

    #[tokio::test]
    async fn auth_checks_shared_password() {
        let deployment = setup_deployment();

        let (status, body) = send(
            &deployment,
            Method::POST,
            "/api/auth",
            Some(json!({ "password": "sekrit" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "message": "Login successful." }));

        let (status, body) = send(
            &deployment,
            Method::POST,
            "/api/auth",
            Some(json!({ "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "success": false, "message": "Invalid password." }));

        let (status, body) = send(&deployment, Method::POST, "/api/auth", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Password is required.");
    }

    #[tokio::test]
    async fn auth_without_configured_password_is_server_error() {
        let deployment =
            DeploymentImpl::with_store(Config::default(), Arc::new(InMemoryDeviceStore::new()));
        let (status, body) = send(
            &deployment,
            Method::POST,
            "/api/auth",
            Some(json!({ "password": "anything" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Server error: APP_PASSWORD is not defined.");
    }
}
