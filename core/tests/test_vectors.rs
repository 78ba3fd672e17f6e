//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results. Comparing parsed JSON (not raw strings) avoids
//! false negatives from field-ordering differences.

use serde_json::Value;
use vms_core::error::parse_backend_error;
use vms_core::{ApiError, DbArrayQuery, HttpMethod, HttpRequest, HttpResponse, RecordKey, VmsClient};

const BASE_URL: &str = "http://localhost:8000/api";

fn client() -> VmsClient {
    VmsClient::new(BASE_URL)
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn pairs(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|pair| {
            let pair = pair.as_array().unwrap();
            (
                pair[0].as_str().unwrap().to_string(),
                pair[1].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

fn simulated(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().to_string(),
    }
}

/// Method, URL, query and JSON body of `req` against `expected`.
fn assert_request(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: url");
    if let Some(query) = expected.get("query") {
        assert_eq!(req.query, pairs(query), "{name}: query");
    }

    let body: Value = req
        .body
        .as_deref()
        .map(|raw| serde_json::from_str(raw).unwrap())
        .unwrap_or(Value::Null);
    assert_eq!(body, expected["body"], "{name}: body");
}

// ---------------------------------------------------------------------------
// Legacy pages
// ---------------------------------------------------------------------------

#[test]
fn list_page_test_vectors() {
    let raw = include_str!("../../test-vectors/list_page.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];

        let req = c.build_list_page(
            input["endpoint"].as_str().unwrap(),
            input["page"].as_u64().unwrap(),
            input["page_size"].as_u64().unwrap(),
        )
        .unwrap();
        assert_request(name, &req, &case["expected_request"]);

        let page = c.parse_page::<Value>(simulated(case)).unwrap();
        assert_eq!(serde_json::to_value(&page).unwrap(), case["expected_result"], "{name}: parsed page");
    }
}

// ---------------------------------------------------------------------------
// Bulk query
// ---------------------------------------------------------------------------

#[test]
fn db_array_test_vectors() {
    let raw = include_str!("../../test-vectors/db_array.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];

        let mut query = DbArrayQuery::all().order_by(input["order"].as_str().unwrap());
        for (field, value) in pairs(&input["filters"]) {
            query = query.filter(&field, value);
        }
        let req = c.build_get_db_array(input["table"].as_str().unwrap(), &query).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        let rows = c.parse_db_array::<Value>(simulated(case)).unwrap();
        assert_eq!(Value::Array(rows), case["expected_result"], "{name}: parsed rows");
    }
}

// ---------------------------------------------------------------------------
// Composite REST
// ---------------------------------------------------------------------------

#[test]
fn rest_access_test_vectors() {
    let raw = include_str!("../../test-vectors/rest_access.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];

        let key = match &input["key"] {
            Value::Null => None,
            Value::String(value) => Some(RecordKey::from(value.as_str())),
            composite => Some(RecordKey::Composite(pairs(composite))),
        };
        let data = match &input["data"] {
            Value::Null => None,
            data => Some(data),
        };
        let req = c
            .build_rest_access(
                input["table"].as_str().unwrap(),
                parse_method(input["method"].as_str().unwrap()),
                data,
                key.as_ref(),
            )
            .unwrap();
        assert_request(name, &req, &case["expected_request"]);
    }
}

// ---------------------------------------------------------------------------
// Error normalisation
// ---------------------------------------------------------------------------

#[test]
fn backend_error_test_vectors() {
    let raw = include_str!("../../test-vectors/backend_errors.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let err = ApiError::Http {
            status: case["status"].as_u64().unwrap() as u16,
            body: case["body"].as_str().unwrap().to_string(),
        };
        assert_eq!(parse_backend_error(&err), case["expected"].as_str().unwrap(), "{name}");
    }
}
