pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod services;
pub mod storage;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::services::ProfilePictureService;

pub struct AppState {
    pub config: Config,
    pub profile_pictures: Arc<ProfilePictureService>,
}

/// Build the HTTP router for the service
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_upload_bytes = state.config.server.max_upload_bytes;

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/v1/users/:user_id/profile-picture",
            post(handlers::profile::upload_profile_picture)
                .get(handlers::profile::get_profile_picture),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::db::MockUserRepository;
    use crate::models::User;
    use crate::storage::{MockObjectStore, ObjectStoreClient, StorageError};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    const BOUNDARY: &str = "profile-test-boundary";

    fn user(id: Uuid, url: Option<&str>) -> User {
        User {
            id,
            username: "user".to_string(),
            email: "user@example.com".to_string(),
            profile_picture_url: url.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn app_with(config: Config, users: MockUserRepository, store: MockObjectStore) -> Router {
        let storage = ObjectStoreClient::new(Arc::new(store), config.storage.clone());
        let service = ProfilePictureService::new(Arc::new(users), Arc::new(storage));
        router(Arc::new(AppState {
            config,
            profile_pictures: Arc::new(service),
        }))
    }

    fn app(users: MockUserRepository, store: MockObjectStore) -> Router {
        app_with(Config::default(), users, store)
    }

    fn existing_user() -> MockUserRepository {
        let mut users = MockUserRepository::new();
        users
            .expect_get_by_id()
            .returning(|id| Ok(Some(user(id, None))));
        users
    }

    fn working_store() -> MockObjectStore {
        let mut store = MockObjectStore::new();
        store.expect_bucket_exists().returning(|_| Ok(true));
        store.expect_put_object().returning(|_, _, _, _| Ok(()));
        store
    }

    fn multipart_body(field: &str, filename: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(user_id: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/users/{user_id}/profile-picture"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_health_check() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(MockUserRepository::new(), MockObjectStore::new()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "profile-service");
    }

    #[tokio::test]
    async fn test_upload_returns_url_and_message() {
        let mut users = existing_user();
        users
            .expect_update_profile_picture_url()
            .times(1)
            .returning(|id, url| Ok(Some(user(id, Some(url)))));

        let mut store = MockObjectStore::new();
        store.expect_bucket_exists().returning(|_| Ok(true));
        store
            .expect_put_object()
            .withf(|bucket, key, body, content_type| {
                bucket == "user-profiles"
                    && key.ends_with(".png")
                    && &body[..] == b"png bytes"
                    && content_type.as_deref() == Some("image/png")
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let request = upload_request(
            &Uuid::new_v4().to_string(),
            multipart_body("file", "photo.png", b"png bytes"),
        );
        let (status, body) = send(app(users, store), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Profile picture updated successfully");
        let url = body["url"].as_str().unwrap();
        assert!(url.starts_with("http://localhost:9000/user-profiles/"));
        assert!(url.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_upload_for_unknown_user_is_404() {
        let mut users = MockUserRepository::new();
        users.expect_get_by_id().returning(|_| Ok(None));

        let request = upload_request(
            &Uuid::new_v4().to_string(),
            multipart_body("file", "photo.png", b"png bytes"),
        );
        let (status, body) = send(app(users, MockObjectStore::new()), request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "detail": "User not found" }));
    }

    #[tokio::test]
    async fn test_storage_failure_is_500() {
        let mut users = existing_user();
        users.expect_update_profile_picture_url().never();

        let mut store = MockObjectStore::new();
        store.expect_bucket_exists().returning(|bucket| {
            Err(StorageError::BucketCheck {
                bucket: bucket.to_string(),
                source: "connection refused".into(),
            })
        });

        let request = upload_request(
            &Uuid::new_v4().to_string(),
            multipart_body("file", "photo.png", b"png bytes"),
        );
        let (status, body) = send(app(users, store), request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "detail": "Internal server error" }));
    }

    #[tokio::test]
    async fn test_unpersisted_url_is_500() {
        let mut users = existing_user();
        users
            .expect_update_profile_picture_url()
            .returning(|_, _| Ok(None));

        let request = upload_request(
            &Uuid::new_v4().to_string(),
            multipart_body("file", "photo.png", b"png bytes"),
        );
        let (status, body) = send(app(users, working_store()), request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "detail": "Failed to update user profile" }));
    }

    #[tokio::test]
    async fn test_missing_file_field_is_400() {
        let request = upload_request(
            &Uuid::new_v4().to_string(),
            multipart_body("avatar", "photo.png", b"png bytes"),
        );
        let (status, body) =
            send(app(MockUserRepository::new(), MockObjectStore::new()), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "detail": "No file provided" }));
    }

    #[tokio::test]
    async fn test_non_multipart_body_is_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/users/{}/profile-picture", Uuid::new_v4()))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, _) =
            send(app(MockUserRepository::new(), MockObjectStore::new()), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_user_id_is_400() {
        let request = upload_request("not-a-uuid", multipart_body("file", "photo.png", b"x"));
        let (status, _) =
            send(app(MockUserRepository::new(), MockObjectStore::new()), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_body_is_413() {
        let mut config = Config::default();
        config.server.max_upload_bytes = 64;

        let request = upload_request(
            &Uuid::new_v4().to_string(),
            multipart_body("file", "photo.png", &[0u8; 256]),
        );
        let (status, _) = send(
            app_with(config, MockUserRepository::new(), MockObjectStore::new()),
            request,
        )
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_oversized_chunked_body_is_413() {
        let mut config = Config::default();
        config.server.max_upload_bytes = 256;

        let mut users = existing_user();
        users.expect_update_profile_picture_url().never();

        let mut store = MockObjectStore::new();
        store.expect_bucket_exists().returning(|_| Ok(true));
        store.expect_put_object().never();
        store.expect_create_multipart_upload().never();

        // No Content-Length, so the limit is only hit while streaming
        let chunks = multipart_body("file", "photo.png", &[7u8; 4096])
            .chunks(100)
            .map(|chunk| Ok::<_, std::io::Error>(chunk.to_vec()))
            .collect::<Vec<_>>();
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/users/{}/profile-picture", Uuid::new_v4()))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from_stream(futures::stream::iter(chunks)))
            .unwrap();

        let (status, body) = send(app_with(config, users, store), request).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body, json!({ "detail": "File too large" }));
    }

    #[tokio::test]
    async fn test_get_profile_picture() {
        let id = Uuid::new_v4();
        let mut users = MockUserRepository::new();
        users
            .expect_get_by_id()
            .returning(|id| Ok(Some(user(id, Some("http://localhost:9000/user-profiles/a.png")))));

        let request = Request::builder()
            .uri(format!("/api/v1/users/{id}/profile-picture"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(users, MockObjectStore::new()), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "user_id": id,
                "url": "http://localhost:9000/user-profiles/a.png",
            })
        );
    }

    #[tokio::test]
    async fn test_storage_config_is_shared_with_client() {
        let config = Config {
            storage: StorageConfig {
                default_bucket: "avatars".to_string(),
                ..StorageConfig::default()
            },
            ..Config::default()
        };

        let mut users = existing_user();
        users
            .expect_update_profile_picture_url()
            .returning(|id, url| Ok(Some(user(id, Some(url)))));

        let mut store = MockObjectStore::new();
        store
            .expect_bucket_exists()
            .withf(|bucket| bucket == "avatars")
            .returning(|_| Ok(true));
        store.expect_put_object().returning(|_, _, _, _| Ok(()));

        let request = upload_request(
            &Uuid::new_v4().to_string(),
            multipart_body("file", "photo.png", b"png bytes"),
        );
        let (status, body) = send(app_with(config, users, store), request).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["url"]
            .as_str()
            .unwrap()
            .starts_with("http://localhost:9000/avatars/"));
    }
}
