//! Shared wiremock fixtures for the Pipedrive and completion endpoints.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use pipedrive_lookup::{
    ActionOptions, Client, Config, DiagnosticEvent, DiagnosticLevel, DiagnosticsCallbacks,
};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "pd_test_token";

/// Collects every diagnostic event emitted during a test.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<DiagnosticEvent>>>);

impl EventLog {
    pub fn callbacks(&self) -> DiagnosticsCallbacks {
        let sink = self.0.clone();
        DiagnosticsCallbacks::default().on_event(move |event| {
            sink.lock().expect("event log poisoned").push(event);
        })
    }

    pub fn at_level(&self, level: DiagnosticLevel) -> Vec<DiagnosticEvent> {
        self.0
            .lock()
            .expect("event log poisoned")
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }
}

pub fn api_base(server: &MockServer) -> String {
    format!("{}/api/v1", server.uri())
}

/// Client pointed at the mock server, recording diagnostics into `log`.
pub fn client_for_server(server: &MockServer, log: &EventLog) -> Client {
    Client::new(Config {
        company_domain: Some("acme".into()),
        api_key: Some(API_KEY.into()),
        base_url: Some(api_base(server)),
        diagnostics: Some(log.callbacks()),
        ..Default::default()
    })
    .expect("client creation should succeed")
}

pub fn options_for_server(server: &MockServer, log: &EventLog) -> ActionOptions {
    ActionOptions {
        pipedrive_base_url: Some(api_base(server)),
        completion_base_url: Some(format!("{}/v1", server.uri())),
        diagnostics: Some(log.callbacks()),
        ..Default::default()
    }
}

/// Search response body wrapping each record in `{result_score, item}`.
pub fn search_body(hits: Vec<(f64, Value)>) -> Value {
    let items: Vec<Value> = hits
        .into_iter()
        .map(|(score, item)| json!({ "result_score": score, "item": item }))
        .collect();
    json!({ "success": true, "data": { "items": items } })
}

pub fn data_body(data: Value) -> Value {
    json!({ "success": true, "data": data })
}

pub async fn mount_json(server: &MockServer, route: &str, status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_search(server: &MockServer, collection: &str, body: Value) {
    mount_json(server, &format!("/api/v1/{collection}/search"), 200, body).await;
}

pub fn pipedrive_error(message: &str) -> Value {
    json!({ "success": false, "error": message, "errorCode": 404, "error_info": null })
}
