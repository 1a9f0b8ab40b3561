use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;
use xm_messaging::InMemoryBroker;
use xm_server::{
    api::app_router,
    build_state,
    clients::{IpLocationClient, IpLocationError},
    config::Config,
};

const WAIT: Duration = Duration::from_secs(2);

struct StubIpLocation {
    country: Option<&'static str>,
}

#[async_trait]
impl IpLocationClient for StubIpLocation {
    async fn country(&self, _ip: &str) -> Result<String, IpLocationError> {
        self.country
            .map(str::to_string)
            .ok_or_else(|| IpLocationError::Lookup("service unavailable".to_string()))
    }
}

struct TestApp {
    _tmp: TempDir,
    router: Router,
    broker: Arc<InMemoryBroker>,
}

async fn test_app(country: Option<&'static str>) -> TestApp {
    let tmp = tempdir().unwrap();
    let db_path = tmp.path().join("test.db").to_string_lossy().to_string();
    let config = Config::from_lookup(|key| match key {
        "XM_DB_PATH" => Some(db_path.clone()),
        _ => None,
    })
    .unwrap();

    let broker = Arc::new(InMemoryBroker::new());
    let state = build_state(&config, broker.clone(), Arc::new(StubIpLocation { country }))
        .await
        .unwrap();

    TestApp {
        _tmp: tmp,
        router: app_router(state, &config),
        broker,
    }
}

impl TestApp {
    async fn send(&self, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-real-ip", "81.4.128.1")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn create(&self, name: &str, code: &str, country: &str) -> Value {
        let body = json!({
            "name": name,
            "code": code,
            "country": country,
            "website": "https://www.xm.com",
            "phone": "+357 25 029933",
        })
        .to_string();
        let (status, json) = self.send(Method::POST, "/api/companies", Some(&body)).await;
        assert_eq!(status, StatusCode::CREATED, "unexpected body: {json}");
        json
    }
}

#[tokio::test]
async fn healthz_is_ok() {
    let app = test_app(Some("CY")).await;
    let (status, json) = app.send(Method::GET, "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn create_returns_company_and_publishes_event() {
    let app = test_app(Some("CY")).await;

    let created = app.create("XM", "XM01", "Cyprus").await;
    let id = created["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());
    assert_eq!(created["name"], "XM");
    assert_eq!(created["website"], "https://www.xm.com");

    let messages = app.broker.wait_for_messages(1, WAIT).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].routing_key, "company.created");
    assert_eq!(messages[0].content_type, "application/json");
    let event: Value = serde_json::from_slice(&messages[0].body).unwrap();
    assert_eq!(event["id"], id.as_str());
    assert_eq!(event["code"], "XM01");
}

#[tokio::test]
async fn create_from_other_country_is_unauthorized() {
    let app = test_app(Some("GR")).await;

    let body = json!({"name": "XM"}).to_string();
    let (status, json) = app.send(Method::POST, "/api/companies", Some(&body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json, json!({"error": "Key_InvalidRequestOrigin"}));

    let (_, list) = app.send(Method::GET, "/api/companies", None).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn failed_location_lookup_is_unauthorized() {
    let app = test_app(None).await;
    let (status, _) = app
        .send(Method::DELETE, "/api/companies/anything", None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_with_empty_body_is_rejected() {
    let app = test_app(Some("CY")).await;
    let (status, json) = app.send(Method::POST, "/api/companies", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json,
        json!({
            "errorKey": "Key_InvalidRequestPayload",
            "errors": {"payload": "Key_EmptyRequestBody"}
        })
    );
}

#[tokio::test]
async fn create_with_invalid_json_is_rejected() {
    let app = test_app(Some("CY")).await;
    let (status, json) = app
        .send(Method::POST, "/api/companies", Some("{\"name\": "))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["errors"]["payload"], "Key_InvalidJSON");
}

#[tokio::test]
async fn create_with_missing_field_reports_first_failure() {
    let app = test_app(Some("CY")).await;
    let body = json!({"code": "XM01", "country": "Cyprus"}).to_string();
    let (status, json) = app.send(Method::POST, "/api/companies", Some(&body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json,
        json!({"errorKey": "Key_InvalidFields", "errors": {"name": "Key_Required"}})
    );
    assert!(app.broker.messages().is_empty());
}

#[tokio::test]
async fn duplicate_code_is_internal_error() {
    let app = test_app(Some("CY")).await;
    app.create("XM", "XM01", "Cyprus").await;

    let body = json!({
        "name": "Other",
        "code": "XM01",
        "country": "Greece",
        "website": "https://other.example",
        "phone": "+30 210 0000000",
    })
    .to_string();
    let (status, json) = app.send(Method::POST, "/api/companies", Some(&body)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json, json!({"error": "Key_InternalError"}));
}

#[tokio::test]
async fn get_returns_company_or_not_found() {
    let app = test_app(Some("CY")).await;
    let created = app.create("XM", "XM01", "Cyprus").await;
    let id = created["id"].as_str().unwrap();

    let (status, json) = app
        .send(Method::GET, &format!("/api/companies/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, created);

    let (status, json) = app
        .send(Method::GET, "/api/companies/does-not-exist", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json, Value::Null);
}

#[tokio::test]
async fn list_applies_query_filters() {
    let app = test_app(Some("CY")).await;
    let wanted = app.create("Alpha", "A1", "Cyprus").await;
    app.create("Beta", "B1", "Cyprus").await;
    app.create("Alpha", "A2", "Greece").await;

    let (status, all) = app.send(Method::GET, "/api/companies", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (status, filtered) = app
        .send(Method::GET, "/api/companies?name=Alpha&country=Cyprus", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(filtered, json!([wanted]));

    let (_, ignored_empty) = app
        .send(Method::GET, "/api/companies?name=&country=Greece", None)
        .await;
    assert_eq!(ignored_empty.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn update_replaces_fields_and_publishes_event() {
    let app = test_app(Some("CY")).await;
    let created = app.create("XM", "XM01", "Cyprus").await;
    let id = created["id"].as_str().unwrap();

    let body = json!({
        "name": "XM Global",
        "code": "XM01",
        "country": "Cyprus",
        "website": "https://www.xm.com/global",
        "phone": "+357 25 029933",
    })
    .to_string();
    let (status, json) = app
        .send(Method::PUT, &format!("/api/companies/{id}"), Some(&body))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], id);
    assert_eq!(json["name"], "XM Global");
    assert_eq!(json["website"], "https://www.xm.com/global");

    let messages = app.broker.wait_for_messages(2, WAIT).await;
    assert_eq!(messages[1].routing_key, "company.updated");
}

#[tokio::test]
async fn update_validates_input_and_missing_company() {
    let app = test_app(Some("CY")).await;
    let created = app.create("XM", "XM01", "Cyprus").await;
    let id = created["id"].as_str().unwrap();

    let invalid = json!({
        "name": "XM",
        "code": "XM01",
        "country": "Cyprus",
        "website": "not a url",
        "phone": "+357 25 029933",
    })
    .to_string();
    let (status, json) = app
        .send(Method::PUT, &format!("/api/companies/{id}"), Some(&invalid))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["errors"]["website"], "Key_InvalidValue");

    let (status, _) = app
        .send(Method::PUT, "/api/companies/missing", Some(&invalid))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_company_and_publishes_id() {
    let app = test_app(Some("CY")).await;
    let created = app.create("XM", "XM01", "Cyprus").await;
    let id = created["id"].as_str().unwrap();

    let (status, json) = app
        .send(Method::DELETE, &format!("/api/companies/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, Value::Null);

    let (status, _) = app
        .send(Method::GET, &format!("/api/companies/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/companies/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let messages = app.broker.wait_for_messages(2, WAIT).await;
    assert_eq!(messages[1].routing_key, "company.deleted");
    assert_eq!(messages[1].body_str(), json!({"id": id}).to_string());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_creates_all_commit() {
    let app = Arc::new(test_app(Some("CY")).await);

    let mut handles = Vec::new();
    for n in 0..12 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            app.create(&format!("Company {n}"), &format!("C{n:02}"), "Cyprus")
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let (status, all) = app.send(Method::GET, "/api/companies", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 12);
    assert_eq!(app.broker.wait_for_messages(12, WAIT).await.len(), 12);
}
