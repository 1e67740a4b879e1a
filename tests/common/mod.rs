//! A local stand-in for the ToolResults REST API and the OAuth2 token
//! endpoint, served with axum on an ephemeral port.
//!
//! Scenario (history `bh.fenix`, filter `org.mozilla.fenix.debug`):
//!
//! - page 1 of executions: `e1` complete/failure, `e2` in progress,
//!   `e3` complete/success; page 2 (`pageToken=p2`): `e4` complete/failure,
//!   created an hour ago.
//! - `e1`: step `s1` failed (cases testSearch failed, testHome passed with
//!   its status omitted as the API does for the zero value),
//!   step `s2` passed; one failed environment.
//! - `e3`: step `s5` failed with tool output testFlake; one passing environment.
//! - `e4`: step `s9` failed (case testLogin failed); one flaky environment.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, Request, State};
use axum::http::{header::AUTHORIZATION, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::{json, Value};

pub const ACCESS_TOKEN: &str = "fake-access-token";
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
pub const SERVICE_ACCOUNT: &str = include_str!("../fixtures/service_account.json");

const API: &str = "/toolresults/v1beta3/projects/{project}";

type Params = Path<HashMap<String, String>>;

#[derive(Default)]
pub struct FakeApi {
    requests: Mutex<Vec<String>>,
}

pub struct FakeServer {
    pub addr: SocketAddr,
    api: Arc<FakeApi>,
}

impl FakeServer {
    pub fn base_url(&self) -> String {
        format!("http://{}/toolresults/v1beta3/", self.addr)
    }

    pub fn token_uri(&self) -> String {
        format!("http://{}/token", self.addr)
    }

    /// Fixture service-account JSON with its token URI pointed at this server.
    pub fn service_account_json(&self) -> String {
        let mut sa: Value = serde_json::from_str(SERVICE_ACCOUNT).unwrap();
        sa["token_uri"] = Value::String(self.token_uri());
        sa.to_string()
    }

    /// Path and query of every request received so far.
    pub fn requests(&self) -> Vec<String> {
        self.api.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, fragment: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.contains(fragment))
            .collect()
    }
}

pub async fn spawn() -> FakeServer {
    let api = Arc::new(FakeApi::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(api.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    FakeServer { addr, api }
}

fn router(api: Arc<FakeApi>) -> Router {
    Router::new()
        .route("/token", post(token))
        .route(&format!("{API}/histories"), get(histories))
        .route(&format!("{API}/histories/{{history}}/executions"), get(executions))
        .route(
            &format!("{API}/histories/{{history}}/executions/{{execution}}"),
            get(execution),
        )
        .route(
            &format!("{API}/histories/{{history}}/executions/{{execution}}/steps"),
            get(steps),
        )
        .route(
            &format!("{API}/histories/{{history}}/executions/{{execution}}/steps/{{step}}"),
            get(step),
        )
        .route(
            &format!("{API}/histories/{{history}}/executions/{{execution}}/steps/{{step}}/testCases"),
            get(test_cases),
        )
        .route(
            &format!(
                "{API}/histories/{{history}}/executions/{{execution}}/steps/{{step}}/testCases/{{case}}"
            ),
            get(test_case),
        )
        .route(
            &format!("{API}/histories/{{history}}/executions/{{execution}}/environments"),
            get(environments),
        )
        .route(
            &format!("{API}/histories/{{history}}/executions/{{execution}}/environments/{{env}}"),
            get(environment),
        )
        .layer(middleware::from_fn_with_state(api.clone(), record_and_authorize))
        .with_state(api)
}

async fn record_and_authorize(State(api): State<Arc<FakeApi>>, req: Request, next: Next) -> Response {
    let uri = req.uri().to_string();
    api.requests.lock().unwrap().push(uri);

    if req.uri().path() != "/token" {
        let bearer = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        if bearer.as_deref() != Some(&format!("Bearer {}", ACCESS_TOKEN)) {
            return error(StatusCode::UNAUTHORIZED, "missing or invalid bearer token");
        }
    }
    next.run(req).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "code": status.as_u16(), "message": message } })),
    )
        .into_response()
}

async fn token(Form(form): Form<HashMap<String, String>>) -> Response {
    let grant_ok = form.get("grant_type").map(String::as_str) == Some(JWT_BEARER_GRANT);
    let assertion_ok = form
        .get("assertion")
        .map(|a| a.split('.').count() == 3)
        .unwrap_or(false);
    if !grant_ok || !assertion_ok {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        )
            .into_response();
    }
    Json(json!({
        "access_token": ACCESS_TOKEN,
        "expires_in": 3599,
        "token_type": "Bearer"
    }))
    .into_response()
}

async fn histories(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    match query.get("filterByName").map(String::as_str) {
        Some("org.mozilla.fenix.debug") => Json(json!({
            "histories": [
                { "historyId": "bh.fenix", "name": "org.mozilla.fenix.debug", "displayName": "Fenix debug" }
            ]
        })),
        _ => Json(json!({})),
    }
}

fn execution_json(id: &str) -> Option<Value> {
    let recent = (chrono::Utc::now() - chrono::Duration::hours(1)).timestamp();
    let value = match id {
        "e1" => json!({
            "executionId": "e1",
            "state": "complete",
            "outcome": { "summary": "failure" },
            "creationTime": { "seconds": "1700000000", "nanos": 0 },
            "testExecutionMatrixId": "matrix-abc"
        }),
        "e2" => json!({
            "executionId": "e2",
            "state": "inProgress",
            "creationTime": { "seconds": "1700000100" },
            "testExecutionMatrixId": "matrix-running"
        }),
        "e3" => json!({
            "executionId": "e3",
            "state": "complete",
            "outcome": { "summary": "success" },
            "creationTime": { "seconds": "1700000200" },
            "testExecutionMatrixId": "matrix-ghi"
        }),
        "e4" => json!({
            "executionId": "e4",
            "state": "complete",
            "outcome": { "summary": "failure" },
            "creationTime": { "seconds": recent.to_string() },
            "testExecutionMatrixId": "matrix-def"
        }),
        // Missing executionId and an unknown state.
        "garbled" => json!({ "state": "finished" }),
        _ => return None,
    };
    Some(value)
}

async fn executions(Path(params): Params, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    if params.get("history").map(String::as_str) != Some("bh.fenix") {
        return Json(json!({}));
    }
    match query.get("pageToken").map(String::as_str) {
        Some("p2") => Json(json!({ "executions": [execution_json("e4")] })),
        _ => Json(json!({
            "executions": [execution_json("e1"), execution_json("e2"), execution_json("e3")],
            "nextPageToken": "p2"
        })),
    }
}

async fn execution(Path(params): Params) -> Response {
    match execution_json(&params["execution"]) {
        Some(value) => Json(value).into_response(),
        None => error(StatusCode::NOT_FOUND, "execution not found"),
    }
}

fn step_json(id: &str) -> Option<Value> {
    let value = match id {
        "s1" => json!({
            "stepId": "s1",
            "name": "Instrumentation test",
            "outcome": { "summary": "failure" },
            "dimensionValue": [{ "key": "Model", "value": "Pixel2.arm" }],
            "testExecutionStep": {
                "testTiming": { "testProcessDuration": { "seconds": "431" } },
                "toolExecution": {
                    "toolOutputs": [
                        { "output": { "fileUri": "gs://test-lab/logcat" } },
                        { "testCase": { "name": "testSearch", "className": "org.mozilla.fenix.ui.SearchTest" } }
                    ]
                }
            }
        }),
        "s2" => json!({
            "stepId": "s2",
            "outcome": { "summary": "success" },
            "testExecutionStep": { "testTiming": { "testProcessDuration": { "seconds": "12" } } }
        }),
        "s5" => json!({
            "stepId": "s5",
            "outcome": { "summary": "failure" },
            "dimensionValue": [{ "key": "Model", "value": "Pixel3" }],
            "testExecutionStep": {
                "testTiming": { "testProcessDuration": { "seconds": "90" } },
                "toolExecution": { "toolOutputs": [{ "testCase": { "name": "testFlake" } }] }
            }
        }),
        "s9" => json!({
            "stepId": "s9",
            "outcome": { "summary": "failure" },
            "testExecutionStep": { "testTiming": { "testProcessDuration": { "seconds": 12 } } }
        }),
        _ => return None,
    };
    Some(value)
}

async fn steps(Path(params): Params) -> Json<Value> {
    let ids: &[&str] = match params["execution"].as_str() {
        "e1" => &["s1", "s2"],
        "e3" => &["s5"],
        "e4" => &["s9"],
        _ => &[],
    };
    let steps: Vec<Value> = ids.iter().filter_map(|id| step_json(id)).collect();
    Json(json!({ "steps": steps }))
}

async fn step(Path(params): Params) -> Response {
    match step_json(&params["step"]) {
        Some(value) => Json(value).into_response(),
        None => error(StatusCode::NOT_FOUND, "step not found"),
    }
}

fn test_cases_json(step: &str) -> Vec<Value> {
    match step {
        "s1" => vec![
            json!({
                "testCaseId": "1",
                "testCaseReference": { "name": "testSearch", "className": "org.mozilla.fenix.ui.SearchTest" },
                "status": "failed",
                "elapsedTime": { "seconds": "31" }
            }),
            json!({
                "testCaseId": "2",
                "testCaseReference": { "name": "testHome", "className": "org.mozilla.fenix.ui.HomeTest" }
            }),
        ],
        "s5" => vec![json!({
            "testCaseId": "1",
            "testCaseReference": { "name": "testFlake" },
            "status": "flaky"
        })],
        "s9" => vec![json!({
            "testCaseId": "1",
            "testCaseReference": { "name": "testLogin", "className": "org.mozilla.fenix.ui.LoginTest" },
            "status": "failed"
        })],
        _ => Vec::new(),
    }
}

async fn test_cases(Path(params): Params) -> Json<Value> {
    let cases = test_cases_json(&params["step"]);
    if cases.is_empty() {
        return Json(json!({}));
    }
    Json(json!({ "testCases": cases }))
}

async fn test_case(Path(params): Params) -> Response {
    test_cases_json(&params["step"])
        .into_iter()
        .find(|c| c["testCaseId"] == params["case"].as_str())
        .map(|c| Json(c).into_response())
        .unwrap_or_else(|| error(StatusCode::NOT_FOUND, "test case not found"))
}

fn environments_json(execution: &str) -> Vec<Value> {
    let env = |id: &str, summary: &str| {
        json!({
            "environmentId": id,
            "displayName": "Pixel 2, API Level 28",
            "environmentResult": { "outcome": { "summary": summary }, "state": "complete" },
            "dimensionValue": [{ "key": "Model", "value": "Pixel2.arm" }]
        })
    };
    match execution {
        "e1" => vec![env("env1", "failure")],
        "e3" => vec![env("env3", "success")],
        "e4" => vec![env("env4", "flaky")],
        _ => Vec::new(),
    }
}

async fn environments(Path(params): Params) -> Json<Value> {
    Json(json!({ "environments": environments_json(&params["execution"]) }))
}

async fn environment(Path(params): Params) -> Response {
    environments_json(&params["execution"])
        .into_iter()
        .find(|e| e["environmentId"] == params["env"].as_str())
        .map(|e| Json(e).into_response())
        .unwrap_or_else(|| error(StatusCode::NOT_FOUND, "environment not found"))
}
