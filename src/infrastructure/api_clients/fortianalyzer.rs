//! FortiAnalyzer JSON-RPC reporting API client
//!
//! Owns one authenticated session against the appliance and sequences the
//! calls needed to obtain a finished report: login, submit, poll, download,
//! delete. All authenticated operations share a single envelope decoder that
//! translates the appliance's `error` object / nested `status.code` pattern
//! into typed failures.

use std::time::Duration;

use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::ApplianceConfig;
use crate::domain::report::{Progress, TaskId};

const JSONRPC_VERSION: &str = "2.0";
const REPORT_APIVER: i64 = 3;

/// Which protocol call produced a failure. Carried on errors so logs and
/// diagnostics name the operation instead of a bare status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Login,
    Submit,
    Poll,
    Download,
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Login => "login",
            Operation::Submit => "report submission",
            Operation::Poll => "progress poll",
            Operation::Download => "report download",
            Operation::Delete => "report deletion",
        };
        f.write_str(name)
    }
}

/// Failures of the report-acquisition protocol.
///
/// Transport failures (connection refused, timeout, non-2xx) are distinct
/// from appliance-reported failures (non-zero status in an otherwise
/// successful HTTP exchange); both carry code and message where available.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("not authenticated: login is required before {operation}")]
    NotAuthenticated { operation: Operation },

    #[error("authentication rejected by appliance (code {code}): {message}")]
    Auth { code: i64, message: String },

    #[error("{operation} rejected by appliance (code {code}): {message}")]
    Appliance {
        operation: Operation,
        code: i64,
        message: String,
    },

    #[error("malformed response envelope during {operation}: {reason}")]
    Envelope { operation: Operation, reason: String },
}

impl SessionError {
    fn envelope(operation: Operation, reason: impl Into<String>) -> Self {
        Self::Envelope {
            operation,
            reason: reason.into(),
        }
    }

    /// Appliance-reported failure, typed by the operation that hit it.
    fn appliance(operation: Operation, code: i64, message: String) -> Self {
        match operation {
            Operation::Login => Self::Auth { code, message },
            _ => Self::Appliance {
                operation,
                code,
                message,
            },
        }
    }
}

/// Client for the FortiAnalyzer JSON-RPC reporting API.
///
/// One session drives at most one job at a time; the session token is owned
/// exclusively by this instance and never shared.
pub struct FortiAnalyzerClient {
    http: Client,
    endpoint: String,
    adom: String,
    session: Option<String>,
}

impl FortiAnalyzerClient {
    /// Create a client targeting `https://{host}/jsonrpc`.
    pub fn new(config: &ApplianceConfig) -> Result<Self, SessionError> {
        let endpoint = format!("https://{}/jsonrpc", config.host);
        Self::with_endpoint(config, endpoint)
    }

    /// Create a client with an explicit endpoint URL, for appliances reached
    /// through a proxy or nonstandard path.
    pub fn with_endpoint(
        config: &ApplianceConfig,
        endpoint: impl Into<String>,
    ) -> Result<Self, SessionError> {
        if !config.verify_tls {
            // Appliances commonly present self-signed certificates.
            warn!("TLS certificate verification is disabled for the appliance endpoint");
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .danger_accept_invalid_certs(!config.verify_tls)
            .user_agent(concat!("fortipage/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SessionError::Transport)?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            adom: config.adom.clone(),
            session: None,
        })
    }

    /// Whether `login` has succeeded on this session.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Authenticate against the appliance and store the session token.
    ///
    /// A non-zero status code leaves the session unauthenticated; the
    /// appliance's message is preserved on the error. No retry is attempted.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), SessionError> {
        let request = json!({
            "url": "/sys/login/user",
            "data": {
                "user": username,
                "passwd": password,
            },
        });

        let envelope = self.call(Operation::Login, "exec", request, None).await?;
        Self::decode(Operation::Login, &envelope)?;

        let token = envelope
            .get("session")
            .and_then(Value::as_str)
            .ok_or_else(|| SessionError::envelope(Operation::Login, "missing session token"))?;

        self.session = Some(token.to_string());
        info!(user = %username, "authenticated against appliance");
        Ok(())
    }

    /// Submit a scheduled report run and return its task identifier.
    pub async fn submit_report(
        &self,
        device: &str,
        layout_id: i64,
        time_period: &str,
    ) -> Result<TaskId, SessionError> {
        let session = self.require_session(Operation::Submit)?;
        let request = json!({
            "apiver": REPORT_APIVER,
            "url": format!("/report/adom/{}/run", self.adom),
            "schedule": "1",
            "schedule-param": {
                "device": device,
                "layout-id": layout_id,
                "time-period": time_period,
            },
        });

        let envelope = self
            .call(Operation::Submit, "add", request, Some(session))
            .await?;
        let result = Self::decode(Operation::Submit, &envelope)?;

        // The appliance has been observed returning the tid both as a
        // number and as a string; normalize to an opaque identifier.
        let tid = match result.get("tid") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(SessionError::envelope(
                    Operation::Submit,
                    "missing task identifier",
                ));
            }
        };

        info!(task_id = %tid, device = %device, layout_id, "report run submitted");
        Ok(TaskId::new(tid))
    }

    /// Query the completion percentage of a report run.
    ///
    /// Retry and pacing are the caller's responsibility; a single envelope
    /// error here is reported, not retried.
    pub async fn report_progress(&self, task_id: &TaskId) -> Result<Progress, SessionError> {
        let session = self.require_session(Operation::Poll)?;
        let request = json!({
            "apiver": REPORT_APIVER,
            "url": format!("/report/adom/{}/run/{}", self.adom, task_id),
        });

        let envelope = self
            .call(Operation::Poll, "get", request, Some(session))
            .await?;
        let result = Self::decode(Operation::Poll, &envelope)?;

        let percent = result
            .get("progress-percent")
            .and_then(Value::as_i64)
            .ok_or_else(|| SessionError::envelope(Operation::Poll, "missing progress-percent"))?;

        let progress = Progress::new(percent)
            .map_err(|e| SessionError::envelope(Operation::Poll, e.to_string()))?;
        debug!(task_id = %task_id, percent = progress.percent(), "polled report progress");
        Ok(progress)
    }

    /// Download the finished report as raw XML text, returned verbatim.
    pub async fn download_report(&self, task_id: &TaskId) -> Result<String, SessionError> {
        let session = self.require_session(Operation::Download)?;
        let request = json!({
            "apiver": REPORT_APIVER,
            "data-type": "text",
            "format": "xml",
            "url": format!("/report/adom/{}/reports/data/{}", self.adom, task_id),
        });

        let envelope = self
            .call(Operation::Download, "get", request, Some(session))
            .await?;
        let result = Self::decode(Operation::Download, &envelope)?;

        let data = result
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| SessionError::envelope(Operation::Download, "missing report data"))?;

        info!(task_id = %task_id, bytes = data.len(), "report downloaded");
        Ok(data.to_string())
    }

    /// Remove the report's data from the appliance.
    ///
    /// Best-effort from the pipeline's point of view: a failure here never
    /// invalidates an already-downloaded payload.
    pub async fn delete_report(&self, task_id: &TaskId) -> Result<(), SessionError> {
        let session = self.require_session(Operation::Delete)?;
        let request = json!({
            "apiver": REPORT_APIVER,
            "url": format!("/report/adom/{}/reports/data/{}", self.adom, task_id),
        });

        let envelope = self
            .call(Operation::Delete, "delete", request, Some(session))
            .await?;
        Self::decode(Operation::Delete, &envelope)?;

        info!(task_id = %task_id, "remote report deleted");
        Ok(())
    }

    /// Fail fast, without network I/O, when called out of order.
    fn require_session(&self, operation: Operation) -> Result<&str, SessionError> {
        self.session
            .as_deref()
            .ok_or(SessionError::NotAuthenticated { operation })
    }

    /// Issue one JSON-RPC POST and return the raw response envelope.
    async fn call(
        &self,
        operation: Operation,
        method: &str,
        request: Value,
        session: Option<&str>,
    ) -> Result<Value, SessionError> {
        let mut body = json!({
            "id": "1",
            "jsonrpc": JSONRPC_VERSION,
            "method": method,
            "params": [request],
        });
        if let Some(token) = session {
            body["session"] = Value::String(token.to_string());
        }

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        response
            .json::<Value>()
            .await
            .map_err(|e| SessionError::envelope(operation, format!("invalid JSON body: {e}")))
    }

    /// Shared envelope decoder for all five operations.
    ///
    /// Success is the absence of a top-level `error` object and a nested
    /// `status.code` of zero (or no status at all); anything else becomes a
    /// typed failure carrying the appliance-supplied code and message.
    fn decode(operation: Operation, envelope: &Value) -> Result<Value, SessionError> {
        if let Some(error) = envelope.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(-1);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown appliance error")
                .to_string();
            return Err(SessionError::appliance(operation, code, message));
        }

        let result = envelope
            .get("result")
            .ok_or_else(|| SessionError::envelope(operation, "missing result"))?;

        // Login answers with a one-element result array; the report calls
        // answer with a bare object.
        let result = match result {
            Value::Array(items) => items
                .first()
                .ok_or_else(|| SessionError::envelope(operation, "empty result array"))?,
            other => other,
        };

        if let Some(status) = result.get("status") {
            let code = status.get("code").and_then(Value::as_i64).unwrap_or(0);
            if code != 0 {
                let message = status
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown appliance error")
                    .to_string();
                return Err(SessionError::appliance(operation, code, message));
            }
        }

        Ok(result.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn test_config() -> ApplianceConfig {
        ApplianceConfig {
            host: "analyzer.example.net".to_string(),
            username: "reporter".to_string(),
            password: "secret".to_string(),
            adom: "root".to_string(),
            verify_tls: true,
            timeout_seconds: 5,
        }
    }

    fn client_for(server: &Server) -> FortiAnalyzerClient {
        FortiAnalyzerClient::with_endpoint(&test_config(), server.url())
            .expect("failed to build test client")
    }

    fn login_ok_body() -> String {
        serde_json::json!({
            "id": "1",
            "result": [{"status": {"code": 0, "message": "OK"}, "url": "/sys/login/user"}],
            "session": "token-abc",
        })
        .to_string()
    }

    async fn logged_in_client(server: &mut Server) -> FortiAnalyzerClient {
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(serde_json::json!({"method": "exec"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(login_ok_body())
            .create_async()
            .await;

        let mut client = client_for(server);
        client.login("reporter", "secret").await.unwrap();
        mock.assert_async().await;
        client
    }

    #[tokio::test]
    async fn login_stores_session_token() {
        let mut server = Server::new_async().await;
        let client = logged_in_client(&mut server).await;
        assert!(client.is_authenticated());
    }

    #[tokio::test]
    async fn login_failure_leaves_session_unauthenticated() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "id": "1",
                    "result": [{"status": {"code": -22, "message": "Login fail"}}],
                })
                .to_string(),
            )
            .create_async()
            .await;

        let mut client = client_for(&server);
        let err = client.login("reporter", "wrong").await.unwrap_err();
        mock.assert_async().await;

        match err {
            SessionError::Auth { code, message } => {
                assert_eq!(code, -22);
                assert_eq!(message, "Login fail");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn operations_before_login_issue_no_network_call() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server);
        let task = TaskId::new("42");

        let err = client.submit_report("FGT-1", 7, "today").await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::NotAuthenticated {
                operation: Operation::Submit
            }
        ));
        assert!(matches!(
            client.report_progress(&task).await.unwrap_err(),
            SessionError::NotAuthenticated { .. }
        ));
        assert!(matches!(
            client.download_report(&task).await.unwrap_err(),
            SessionError::NotAuthenticated { .. }
        ));
        assert!(matches!(
            client.delete_report(&task).await.unwrap_err(),
            SessionError::NotAuthenticated { .. }
        ));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn submit_returns_task_id_and_attaches_session() {
        let mut server = Server::new_async().await;
        let client = logged_in_client(&mut server).await;

        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(serde_json::json!({"method": "add"})),
                Matcher::PartialJson(serde_json::json!({"session": "token-abc"})),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({"id": "1", "result": {"tid": 42}}).to_string())
            .create_async()
            .await;

        let task = client.submit_report("FGT-1", 7, "today").await.unwrap();
        mock.assert_async().await;
        assert_eq!(task.as_str(), "42");
    }

    #[tokio::test]
    async fn submit_surfaces_top_level_error_object() {
        let mut server = Server::new_async().await;
        let client = logged_in_client(&mut server).await;

        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(serde_json::json!({"method": "add"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "id": "1",
                    "error": {"code": -6, "message": "Invalid url"},
                })
                .to_string(),
            )
            .create_async()
            .await;

        let err = client.submit_report("FGT-1", 7, "today").await.unwrap_err();
        mock.assert_async().await;
        match err {
            SessionError::Appliance {
                operation,
                code,
                message,
            } => {
                assert_eq!(operation, Operation::Submit);
                assert_eq!(code, -6);
                assert_eq!(message, "Invalid url");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn poll_returns_progress_percent() {
        let mut server = Server::new_async().await;
        let client = logged_in_client(&mut server).await;

        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(serde_json::json!({"method": "get"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({"id": "1", "result": {"progress-percent": 70}}).to_string(),
            )
            .expect(2)
            .create_async()
            .await;

        let task = TaskId::new("42");
        // Idempotent for a non-terminal job: repeated polls keep answering.
        let first = client.report_progress(&task).await.unwrap();
        let second = client.report_progress(&task).await.unwrap();
        mock.assert_async().await;
        assert_eq!(first.percent(), 70);
        assert_eq!(second.percent(), 70);
        assert!(!first.is_complete());
    }

    #[tokio::test]
    async fn poll_rejects_out_of_range_progress() {
        let mut server = Server::new_async().await;
        let client = logged_in_client(&mut server).await;

        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(serde_json::json!({"method": "get"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({"id": "1", "result": {"progress-percent": 250}}).to_string(),
            )
            .create_async()
            .await;

        let err = client.report_progress(&TaskId::new("42")).await.unwrap_err();
        mock.assert_async().await;
        assert!(matches!(
            err,
            SessionError::Envelope {
                operation: Operation::Poll,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn download_returns_report_text_verbatim() {
        let mut server = Server::new_async().await;
        let client = logged_in_client(&mut server).await;

        let xml = "<FortiAnalyzer_Report></FortiAnalyzer_Report>\r\n";
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(
                serde_json::json!({"method": "get", "params": [{"data-type": "text"}]}),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({"id": "1", "result": {"data": xml}}).to_string())
            .create_async()
            .await;

        let data = client.download_report(&TaskId::new("42")).await.unwrap();
        mock.assert_async().await;
        assert_eq!(data, xml);
    }

    #[tokio::test]
    async fn delete_reports_nested_status_failure() {
        let mut server = Server::new_async().await;
        let client = logged_in_client(&mut server).await;

        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(serde_json::json!({"method": "delete"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "id": "1",
                    "result": {"status": {"code": -3, "message": "Object does not exist"}},
                })
                .to_string(),
            )
            .create_async()
            .await;

        let err = client.delete_report(&TaskId::new("42")).await.unwrap_err();
        mock.assert_async().await;
        match err {
            SessionError::Appliance {
                operation, code, ..
            } => {
                assert_eq!(operation, Operation::Delete);
                assert_eq!(code, -3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_2xx_is_a_transport_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(502)
            .create_async()
            .await;

        let mut client = client_for(&server);
        let err = client.login("reporter", "secret").await.unwrap_err();
        mock.assert_async().await;
        assert!(matches!(err, SessionError::Transport(_)));
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn missing_result_is_a_malformed_envelope() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::json!({"id": "1"}).to_string())
            .create_async()
            .await;

        let mut client = client_for(&server);
        let err = client.login("reporter", "secret").await.unwrap_err();
        mock.assert_async().await;
        assert!(matches!(
            err,
            SessionError::Envelope {
                operation: Operation::Login,
                ..
            }
        ));
    }
}
