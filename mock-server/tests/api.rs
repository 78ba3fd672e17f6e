use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, app_requiring_session, Page};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

async fn send(app: &Router, request: Request<String>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn detail(response: axum::response::Response) -> Value {
    let body: Value = body_json(response).await;
    body["detail"].clone()
}

fn session_cookie(response: &axum::response::Response) -> String {
    let raw = response
        .headers()
        .get(http::header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    raw.split(';').next().unwrap().to_string()
}

// --- health ---

#[tokio::test]
async fn health_reports_ok() {
    let resp = send(&app(), empty_request("GET", "/health")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

// --- legacy collections ---

#[tokio::test]
async fn list_unknown_collection_is_empty_page() {
    let resp = send(&app(), empty_request("GET", "/api/camera-info?page=1&page_size=100")).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let page: Page = body_json(resp).await;
    assert!(page.items.is_empty());
    assert_eq!(page.total, 0);
    assert_eq!(page.page_size, 100);
}

#[tokio::test]
async fn create_generates_id_and_pages() {
    let app = app();
    for name in ["a", "b", "c"] {
        let resp = send(&app, json_request("POST", "/api/media-info", &json!({ "title": name }))).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = body_json(resp).await;
        assert!(!created["id"].as_str().unwrap().is_empty());
    }

    let resp = send(&app, empty_request("GET", "/api/media-info?page=2&page_size=2")).await;
    let page: Page = body_json(resp).await;
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0]["title"], "c");
}

#[tokio::test]
async fn channel_without_ch_id_is_422() {
    let resp = send(
        &app(),
        json_request("POST", "/api/video-conversion-info", &json!({ "area": "north" })),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let detail = detail(resp).await;
    assert_eq!(detail[0]["loc"], json!(["body", "ch_id"]));
    assert_eq!(detail[0]["msg"], "Field required");
}

#[tokio::test]
async fn update_and_delete_channel() {
    let app = app();
    send(
        &app,
        json_request("POST", "/api/video-conversion-info", &json!({ "ch_id": "ch1", "fps": "15" })),
    )
    .await;

    let resp = send(
        &app,
        json_request("PUT", "/api/video-conversion-info/ch1", &json!({ "ch_id": "ch1", "fps": "30" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = body_json(resp).await;
    assert_eq!(updated["fps"], "30");

    let resp = send(&app, empty_request("DELETE", "/api/video-conversion-info/ch1")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = send(&app, empty_request("DELETE", "/api/video-conversion-info/ch1")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(detail(resp).await, "Record not found");
}

// --- bulk query ---

#[tokio::test]
async fn unknown_table_is_404() {
    let resp = send(
        &app(),
        json_request("POST", "/api/get-db-array", &json!({ "target": "/NOPE/" })),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(detail(resp).await, "Table NOPE not found");
}

#[tokio::test]
async fn rows_are_lower_cased_and_filtered() {
    let app = app();
    for id in ["c1", "c2", "c3"] {
        let resp = send(
            &app,
            json_request(
                "POST",
                "/api/rest-access-page/MGMT_CCTV",
                &json!({ "CCTV_ID": id, "LOCATION": "gate" }),
            ),
        )
        .await;
        let created: Value = body_json(resp).await;
        assert_eq!(created["cctv_id"], id);
    }

    let query = json!({
        "target": "/MGMT_CCTV/",
        "layout": [{ "field": "*" }],
        "query": [{ "cctv_id": "c1" }, { "cctv_id": "c3" }],
        "where": "",
        "order": "cctv_id desc",
    });
    let resp = send(&app, json_request("POST", "/api/get-db-array", &query)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let rows: Vec<Value> = body_json(resp).await;
    let ids: Vec<&str> = rows.iter().map(|r| r["cctv_id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["c3", "c1"]);
    assert_eq!(rows[0]["location"], "gate");
}

// --- composite REST ---

#[tokio::test]
async fn rest_put_validation() {
    let app = app();
    send(
        &app,
        json_request("POST", "/api/rest-access-page/MGMT_FMS", &json!({ "fms_id": "f1", "fms_name": "old" })),
    )
    .await;

    let resp = send(
        &app,
        json_request("PUT", "/api/rest-access-page/MGMT_FMS", &json!({ "fms_name": "x" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(detail(resp).await, "Key field FMS_ID not found");

    let resp = send(
        &app,
        json_request("PUT", "/api/rest-access-page/MGMT_FMS", &json!({ "FMS_ID": "f1" })),
    )
    .await;
    assert_eq!(detail(resp).await, "No fields to update");

    let resp = send(
        &app,
        json_request("PUT", "/api/rest-access-page/MGMT_FMS", &json!({ "FMS_ID": "zz", "fms_name": "x" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(
        &app,
        json_request("PUT", "/api/rest-access-page/MGMT_FMS", &json!({ "FMS_ID": "f1", "FMS_NAME": "new" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let row: Value = body_json(resp).await;
    assert_eq!(row, json!({ "fms_id": "f1", "fms_name": "new" }));
}

#[tokio::test]
async fn rest_delete_composite_key() {
    let app = app();
    for code in ["01", "02"] {
        send(
            &app,
            json_request(
                "POST",
                "/api/rest-access-page/MGMT_CODE",
                &json!({ "grp_gbn": "C", "grp_code": "HQ", "code": code, "code_name": "x" }),
            ),
        )
        .await;
    }

    let resp = send(&app, empty_request("DELETE", "/api/rest-access-page/MGMT_CODE")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(detail(resp).await, "Key parameter not found");

    let resp = send(
        &app,
        empty_request("DELETE", "/api/rest-access-page/MGMT_CODE?GRP_GBN=C&GRP_CODE=HQ&CODE=01"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let deleted: Value = body_json(resp).await;
    assert_eq!(deleted["code"], "01");

    let resp = send(&app, empty_request("GET", "/api/rest-access-page/MGMT_CODE?grp_code=HQ")).await;
    let rows: Vec<Value> = body_json(resp).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["code"], "02");
}

#[tokio::test]
async fn rest_delete_single_key() {
    let app = app();
    send(
        &app,
        json_request("POST", "/api/rest-access-page/MGMT_MEDIA_INFO", &json!({ "seq": 7 })),
    )
    .await;

    let resp = send(&app, empty_request("DELETE", "/api/rest-access-page/MGMT_MEDIA_INFO?key=7")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&app, empty_request("DELETE", "/api/rest-access-page/MGMT_MEDIA_INFO?key=7")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- sessions ---

#[tokio::test]
async fn session_lifecycle() {
    let app = app();

    let resp = send(&app, empty_request("GET", "/api/auth/me")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(detail(resp).await, "Not authenticated");

    let resp = send(
        &app,
        json_request("POST", "/api/auth/login", &json!({ "user_id": "admin", "password": "nope" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = send(
        &app,
        json_request("POST", "/api/auth/login", &json!({ "user_id": "admin", "password": "admin" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = session_cookie(&resp);
    assert!(cookie.starts_with("vms_session="));

    let me = Request::builder()
        .uri("/api/auth/me")
        .header(http::header::COOKIE, &cookie)
        .body(String::new())
        .unwrap();
    let resp = send(&app, me).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["user"]["id"], "admin");

    let logout = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .header(http::header::COOKIE, &cookie)
        .body(String::new())
        .unwrap();
    assert_eq!(send(&app, logout).await.status(), StatusCode::OK);

    let me = Request::builder()
        .uri("/api/auth/me")
        .header(http::header::COOKIE, &cookie)
        .body(String::new())
        .unwrap();
    assert_eq!(send(&app, me).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_requires_user_id() {
    let resp = send(
        &app(),
        json_request("POST", "/api/auth/login", &json!({ "password": "admin" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(detail(resp).await, "user_id required");
}

#[tokio::test]
async fn guarded_data_endpoints_need_a_session() {
    let app = app_requiring_session();

    let resp = send(&app, empty_request("GET", "/api/camera-info")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = send(
        &app,
        json_request("POST", "/api/auth/login", &json!({ "user_id": "admin", "password": "admin" })),
    )
    .await;
    let cookie = session_cookie(&resp);

    let list = Request::builder()
        .uri("/api/camera-info")
        .header(http::header::COOKIE, &cookie)
        .body(String::new())
        .unwrap();
    assert_eq!(send(&app, list).await.status(), StatusCode::OK);
}
