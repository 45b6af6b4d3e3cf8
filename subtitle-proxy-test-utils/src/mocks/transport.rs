//! Scripted in-memory implementation of [`RemoteTransport`]

use crate::builders::fixtures;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use subtitle_proxy_core::protocol::{ProtocolError, RemoteTransport, Result, Value};

/// How the mock answers `LogIn`
#[derive(Debug, Clone)]
pub enum LoginBehavior {
    /// Issue a fresh token
    Accept,
    /// Answer with a non-success status line such as `"401 Unauthorized"`
    Reject(String),
    /// Fail at the transport level
    Unreachable(String),
}

/// A call observed by the mock
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub params: Vec<Value>,
    pub started_at: Instant,
}

impl RecordedCall {
    /// Session token passed as the first parameter, if any
    pub fn token(&self) -> Option<&str> {
        self.params.first().and_then(Value::as_str)
    }
}

/// Mock OpenSubtitles endpoint
///
/// Answers `LogIn`, `LogOut`, `ServerInfo`, `SearchSubtitles` and
/// `DownloadSubtitles` like the real server, validating session tokens.
/// Replies queued with [`MockTransport::push_reply`] take precedence over the
/// built-in behavior for their method.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use subtitle_proxy_core::{SessionClient, SessionConfig};
/// use subtitle_proxy_test_utils::{MockTransport, SearchRecordBuilder};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = Arc::new(MockTransport::new());
/// transport.add_search_record(SearchRecordBuilder::new("12345").build());
///
/// let client = SessionClient::new(SessionConfig::default(), transport.clone());
/// client.ensure_session().await?;
/// assert_eq!(transport.call_count("LogIn"), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MockTransport {
    behavior: Arc<Mutex<MockBehavior>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

struct MockBehavior {
    login: LoginBehavior,
    issued_tokens: u32,
    valid_tokens: HashSet<String>,
    search_records: Vec<Value>,
    downloads: HashMap<String, String>,
    scripted: HashMap<String, VecDeque<Result<Value>>>,
    delay: Duration,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            login: LoginBehavior::Accept,
            issued_tokens: 0,
            valid_tokens: HashSet::new(),
            search_records: Vec::new(),
            downloads: HashMap::new(),
            scripted: HashMap::new(),
            delay: Duration::ZERO,
        }
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every reply by `delay`
    pub fn with_delay(self, delay: Duration) -> Self {
        self.behavior().delay = delay;
        self
    }

    pub fn set_login_behavior(&self, login: LoginBehavior) {
        self.behavior().login = login;
    }

    /// Record returned by every `SearchSubtitles` call
    pub fn add_search_record(&self, record: Value) {
        self.behavior().search_records.push(record);
    }

    /// Serve `content` gzip-compressed and base64-encoded for `file_id`
    pub fn add_download(&self, file_id: &str, content: &str) {
        self.add_raw_download(file_id, fixtures::encode_payload(content));
    }

    /// Serve an already encoded payload for `file_id`
    pub fn add_raw_download(&self, file_id: &str, encoded: impl Into<String>) {
        self.behavior()
            .downloads
            .insert(file_id.to_string(), encoded.into());
    }

    /// Queue a one-off reply for the next call to `method`
    pub fn push_reply(&self, method: &str, reply: Result<Value>) {
        self.behavior()
            .scripted
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Forget every issued token, as the server does when sessions time out
    pub fn revoke_sessions(&self) {
        self.behavior().valid_tokens.clear();
    }

    /// All calls in arrival order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.log().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.log()
            .iter()
            .filter(|call| call.method == method)
            .cloned()
            .collect()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.log().iter().filter(|call| call.method == method).count()
    }

    pub fn methods(&self) -> Vec<String> {
        self.log().iter().map(|call| call.method.clone()).collect()
    }

    /// Smallest gap between the starts of consecutive calls
    pub fn min_gap(&self) -> Option<Duration> {
        let calls = self.log();
        calls
            .windows(2)
            .map(|pair| pair[1].started_at.duration_since(pair[0].started_at))
            .min()
    }

    fn behavior(&self) -> std::sync::MutexGuard<'_, MockBehavior> {
        self.behavior.lock().expect("mock behavior lock poisoned")
    }

    fn log(&self) -> std::sync::MutexGuard<'_, Vec<RecordedCall>> {
        self.calls.lock().expect("mock call log lock poisoned")
    }

    fn respond(&self, method: &str, params: &[Value]) -> Result<Value> {
        let mut behavior = self.behavior();

        if let Some(reply) = behavior
            .scripted
            .get_mut(method)
            .and_then(VecDeque::pop_front)
        {
            return reply;
        }

        match method {
            "LogIn" => match behavior.login.clone() {
                LoginBehavior::Accept => {
                    behavior.issued_tokens += 1;
                    let token = format!("mock-token-{}", behavior.issued_tokens);
                    behavior.valid_tokens.insert(token.clone());
                    Ok(Value::structure([
                        ("status", Value::from("200 OK")),
                        ("token", Value::from(token)),
                        ("seconds", Value::Double(0.004)),
                    ]))
                }
                LoginBehavior::Reject(status) => Ok(fixtures::status(&status)),
                LoginBehavior::Unreachable(message) => Err(ProtocolError::transport(message)),
            },
            "LogOut" => {
                if let Some(token) = params.first().and_then(Value::as_str) {
                    behavior.valid_tokens.remove(token);
                }
                Ok(fixtures::status("200 OK"))
            }
            "ServerInfo" => Ok(Value::structure([
                ("xmlrpc_version", Value::from("0.1")),
                ("application", Value::from("OpenSuber v0.2")),
                ("users_online_total", Value::Int(4821)),
                ("subs_subtitle_files", Value::from("6413920")),
            ])),
            "SearchSubtitles" | "DownloadSubtitles" => {
                let token = params.first().and_then(Value::as_str).unwrap_or_default();
                if !behavior.valid_tokens.contains(token) {
                    return Ok(fixtures::status("406 No session"));
                }

                if method == "SearchSubtitles" {
                    Ok(fixtures::data_response(behavior.search_records.clone()))
                } else {
                    let records = params
                        .get(1)
                        .and_then(Value::as_array)
                        .unwrap_or(&[])
                        .iter()
                        .filter_map(Value::as_str)
                        .filter_map(|id| {
                            behavior.downloads.get(id).map(|data| {
                                Value::structure([
                                    ("idsubtitlefile", Value::from(id)),
                                    ("data", Value::from(data.as_str())),
                                ])
                            })
                        })
                        .collect();
                    Ok(fixtures::data_response(records))
                }
            }
            other => Err(ProtocolError::fault(
                1,
                format!("server error. requested method [{other}] does not exist"),
            )),
        }
    }
}

#[async_trait]
impl RemoteTransport for MockTransport {
    async fn invoke(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        self.log().push(RecordedCall {
            method: method.to_string(),
            params: params.clone(),
            started_at: Instant::now(),
        });

        let delay = self.behavior().delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.respond(method, &params)
    }

    fn endpoint(&self) -> &str {
        "mock://opensubtitles"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(reply: &Value) -> String {
        reply.get_str("token").unwrap().to_string()
    }

    #[tokio::test]
    async fn test_login_issues_distinct_tokens() {
        let mock = MockTransport::new();
        let first = mock.invoke("LogIn", Vec::new()).await.unwrap();
        let second = mock.invoke("LogIn", Vec::new()).await.unwrap();

        assert_ne!(token(&first), token(&second));
        assert_eq!(mock.call_count("LogIn"), 2);
    }

    #[tokio::test]
    async fn test_unknown_token_is_rejected() {
        let mock = MockTransport::new();
        let reply = mock
            .invoke("SearchSubtitles", vec![Value::from("bogus")])
            .await
            .unwrap();
        assert_eq!(reply.get_str("status"), Some("406 No session"));
    }

    #[tokio::test]
    async fn test_revoked_sessions() {
        let mock = MockTransport::new();
        let login = mock.invoke("LogIn", Vec::new()).await.unwrap();
        let params = vec![Value::from(token(&login)), Value::Array(Vec::new())];

        let reply = mock.invoke("SearchSubtitles", params.clone()).await.unwrap();
        assert_eq!(reply.get_str("status"), Some("200 OK"));

        mock.revoke_sessions();
        let reply = mock.invoke("SearchSubtitles", params).await.unwrap();
        assert_eq!(reply.get_str("status"), Some("406 No session"));
    }

    #[tokio::test]
    async fn test_scripted_reply_takes_precedence() {
        let mock = MockTransport::new();
        mock.push_reply("LogIn", Err(ProtocolError::transport("down")));

        assert!(mock.invoke("LogIn", Vec::new()).await.is_err());
        assert!(mock.invoke("LogIn", Vec::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_download_only_returns_known_ids() {
        let mock = MockTransport::new();
        mock.add_download("1", "text");
        let login = mock.invoke("LogIn", Vec::new()).await.unwrap();

        let reply = mock
            .invoke(
                "DownloadSubtitles",
                vec![
                    Value::from(token(&login)),
                    Value::Array(vec![Value::from("1"), Value::from("2")]),
                ],
            )
            .await
            .unwrap();
        assert_eq!(reply.get("data").and_then(Value::as_array).unwrap().len(), 1);
    }
}
