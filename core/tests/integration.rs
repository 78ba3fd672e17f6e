//! Store lifecycles against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives the console's stores
//! over real HTTP through `ReqwestTransport`, covering both backend flavours
//! and the cookie session. Validates that request building, the transport
//! and response parsing agree with the server end-to-end.

use serde_json::{json, Map, Value};
use vms_core::stores::{Camera, CommonCode, VideoConversion};
use vms_core::{ApiConfig, ApiError, AuthUser, Console};

/// Serve the mock backend on a background thread; returns its base URL.
fn start_mock(require_session: bool) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            let app = if require_session {
                mock_server::app_requiring_session()
            } else {
                mock_server::app()
            };
            mock_server::serve(listener, app).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn console(base_url: &str) -> Console {
    Console::new(ApiConfig::new(base_url)).unwrap()
}

fn patch(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(fields) => fields,
        _ => panic!("patch must be an object"),
    }
}

async fn login(console: &Console) {
    let response = console
        .api
        .post("/auth/login", Some(&json!({ "user_id": "admin", "password": "admin" })))
        .await
        .unwrap();
    let data: Value = response.into_data().unwrap();
    let user: AuthUser = serde_json::from_value(data["user"].clone()).unwrap();
    console.auth.login(user);
}

#[tokio::test]
async fn camera_lifecycle_through_tables() {
    let console = console(&start_mock(false));
    let cameras = &console.cameras;

    // Step 1: empty table.
    cameras.fetch_cameras(true).await;
    assert_eq!(cameras.total_count(), 0);
    assert!(cameras.error().is_none());

    // Step 2: create two cameras.
    for (id, location) in [("c1", "gate"), ("c2", "tunnel")] {
        let camera = Camera {
            cctv_id: id.to_string(),
            location: location.to_string(),
            ..Camera::default()
        };
        let created = cameras.create_camera(&camera).await.unwrap().unwrap();
        assert_eq!(created.cctv_id, id);
        assert_eq!(created.alive_yn, "N");
    }
    assert_eq!(cameras.total_count(), 2);

    // Step 3: a forced refresh sees both.
    cameras.fetch_cameras(true).await;
    assert_eq!(cameras.total_count(), 2);
    assert_eq!(cameras.search("tunn").len(), 1);

    // Step 4: update replaces the cached element.
    let updated = cameras
        .update_camera("c1", patch(json!({ "location": "north gate" })))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.location, "north gate");
    assert_eq!(cameras.get_by_id("c1").unwrap().location, "north gate");

    // Step 5: bulk delete with one unknown id fails partially.
    let err = cameras
        .delete_cameras(&["c2".to_string(), "nope".to_string()])
        .await
        .unwrap_err();
    match err {
        ApiError::PartialDelete { deleted, failed, .. } => {
            assert_eq!(deleted, vec!["c2".to_string()]);
            assert_eq!(failed, vec!["nope".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(cameras.total_count(), 2);
    assert!(cameras.error().unwrap().contains("Record not found"));

    // Step 6: the backend dropped c2; a refresh reconciles.
    cameras.fetch_cameras(true).await;
    assert_eq!(cameras.total_count(), 1);
    assert!(cameras.error().is_none());

    // Step 7: single delete.
    cameras.delete_camera("c1").await.unwrap().unwrap();
    assert_eq!(cameras.total_count(), 0);
}

#[tokio::test]
async fn common_codes_use_composite_keys() {
    let console = console(&start_mock(false));
    let codes = &console.common_codes;

    for (code, name) in [("01", "Seoul"), ("02", "Busan")] {
        let record = CommonCode {
            grp_gbn: "C".to_string(),
            grp_code: "HQ".to_string(),
            code: code.to_string(),
            code_name: name.to_string(),
            ..CommonCode::default()
        };
        codes.create_common_code(&record).await.unwrap().unwrap();
    }

    let updated = codes
        .update_common_code("C", "HQ", "02", patch(json!({ "code_name": "Busan HQ" })))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.code_name, "Busan HQ");
    assert_eq!(codes.code_name("HQ", "02").as_deref(), Some("Busan HQ"));

    codes
        .delete_common_codes(&["C_HQ_01".to_string()])
        .await
        .unwrap()
        .unwrap();

    codes.fetch_common_codes(true).await;
    let remaining = codes.items();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].code, "02");
}

#[tokio::test]
async fn channel_lifecycle_through_legacy_collection() {
    let console = console(&start_mock(false));
    let channels = &console.video_conversions;

    let code = CommonCode {
        grp_gbn: "C".to_string(),
        grp_code: "HQ".to_string(),
        code: "01".to_string(),
        code_name: "Seoul".to_string(),
        ..CommonCode::default()
    };
    console.common_codes.create_common_code(&code).await.unwrap();
    console.common_codes.clear();

    for ch_id in ["ch1", "ch2"] {
        let channel = VideoConversion {
            ch_id: ch_id.to_string(),
            hq_code: Some("01".to_string()),
            fps: Some("15".to_string()),
            ..VideoConversion::default()
        };
        channels.create_video_conversion(&channel).await.unwrap().unwrap();
    }

    // Paging plus enrichment through the common-code store.
    channels.fetch_video_conversions(true).await;
    assert_eq!(channels.total_count(), 2);
    assert_eq!(
        channels.get_by_id("ch1").unwrap().hq_name.as_deref(),
        Some("Seoul")
    );

    let updated = channels
        .batch_update(
            &["ch1".to_string(), "ch2".to_string()],
            patch(json!({ "fps": "30" })),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.len(), 2);
    assert!(channels
        .items()
        .iter()
        .all(|c| c.fps.as_deref() == Some("30")));

    channels
        .delete_video_conversions(&["ch1".to_string(), "ch2".to_string()])
        .await
        .unwrap()
        .unwrap();
    channels.fetch_video_conversions(true).await;
    assert_eq!(channels.total_count(), 0);
}

#[tokio::test]
async fn missing_channel_key_reports_field_error() {
    let console = console(&start_mock(false));
    let channel = VideoConversion::default();

    let err = console
        .video_conversions
        .create_video_conversion(&channel)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(422));
    assert_eq!(
        console.video_conversions.error().as_deref(),
        Some("body.ch_id: Field required")
    );
}

#[tokio::test]
async fn session_lifecycle() {
    let console = console(&start_mock(false));

    console.auth.fetch_user().await;
    assert!(console.auth.auth_ready());
    assert!(!console.auth.is_authenticated());

    login(&console).await;
    let me: Value = console
        .api
        .get("/auth/me", Vec::new())
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(me["user"]["id"], "admin");

    console.auth.logout().await.unwrap();
    assert!(!console.auth.is_authenticated());

    let err = console.api.get("/auth/me", Vec::new()).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn expired_session_tears_down_on_data_401() {
    let console = console(&start_mock(true));

    login(&console).await;
    console.cameras.fetch_cameras(true).await;
    assert!(console.cameras.error().is_none());

    // Drop the server-side session behind the store's back.
    console.api.post("/auth/logout", None).await.unwrap();
    assert!(console.auth.is_authenticated());

    console.cameras.fetch_cameras(true).await;
    assert!(!console.auth.is_authenticated());
    assert_eq!(
        console.cameras.error().as_deref(),
        Some("Not authenticated")
    );
}

#[tokio::test]
async fn unreachable_backend_reports_connectivity() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let console = console(&format!("http://{addr}"));
    console.media.fetch_media_list(true).await;

    assert_eq!(
        console.media.error().as_deref(),
        Some(vms_core::error::CONNECTIVITY_MESSAGE)
    );
}
