//! Server lifecycle tests against a real listener

use api_server::{ApiServer, ApiState, DEFAULT_MAX_BODY_BYTES};
use sdk::{BuildRequest, BuildSubmitter, EngineError, SecretString, SubmitHandle};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Collect(Mutex<Vec<BuildRequest>>);

impl BuildSubmitter for Collect {
    fn submit(&self, request: BuildRequest) -> Result<(), EngineError> {
        self.0.lock().unwrap().push(request);
        Ok(())
    }
}

async fn start(collect: Arc<Collect>) -> ApiServer {
    let state = ApiState {
        submitter: SubmitHandle::new(collect),
        secret: Some(SecretString::from("topsecret")),
        max_body_bytes: DEFAULT_MAX_BODY_BYTES,
    };
    ApiServer::start("127.0.0.1:0".parse().unwrap(), state)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_round_two_request_is_queued_over_http() {
    let collect = Arc::new(Collect::default());
    let server = start(Arc::clone(&collect)).await;
    let base = format!("http://{}", server.local_addr());

    let response = reqwest::Client::new()
        .post(format!("{}/api/build", base))
        .json(&json!({
            "email": "dev@example.org",
            "secret": "topsecret",
            "task": "sales-dashboard",
            "round": 2,
            "nonce": "n-2",
            "brief": "Add a total row",
            "checks": ["#total-sales shows the sum"],
            "evaluation_url": "http://127.0.0.1:9/notify",
            "attachments": [{"name": "data.csv", "url": "data:text/csv;base64,YSxi"}]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let ack: Value = response.json().await.unwrap();
    assert_eq!(ack["round"], 2);

    let queued = collect.0.lock().unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].task, "sales-dashboard");
    assert_eq!(queued[0].attachments[0].name, "data.csv");
    drop(queued);

    server.shutdown().await;
}

#[tokio::test]
async fn test_status_endpoint_reports_version() {
    let server = start(Arc::new(Collect::default())).await;
    let status: Value = reqwest::get(format!("http://{}/api/status", server.local_addr()))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(status["status"], "running");
    assert_eq!(status["version"], env!("CARGO_PKG_VERSION"));
    server.shutdown().await;
}

#[tokio::test]
async fn test_out_of_range_round_is_rejected() {
    let collect = Arc::new(Collect::default());
    let server = start(Arc::clone(&collect)).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/api/build", server.local_addr()))
        .json(&json!({
            "email": "dev@example.org",
            "secret": "topsecret",
            "task": "t",
            "round": 3,
            "nonce": "n",
            "brief": "b",
            "checks": [],
            "evaluation_url": "http://127.0.0.1:9/notify"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "round must be 1 or 2");
    assert_eq!(body["hint"], "Fix the request body and resubmit");
    assert!(collect.0.lock().unwrap().is_empty());
    server.shutdown().await;
}
