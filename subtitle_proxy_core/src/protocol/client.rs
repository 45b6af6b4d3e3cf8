//! Session-authenticated protocol client with rate limiting
//!
//! [`SessionClient`] owns the remote session token and the process-wide rate
//! gate. Every outbound request (login, logout and authenticated calls) goes
//! through the gate, and every authenticated call is retried at most once
//! after a fresh login when the server rejects the token.

use crate::protocol::codec::{self, Value};
use crate::protocol::error::{ProtocolError, Result, StatusCode};
use crate::protocol::rate_limit::RateLimiter;
use crate::protocol::state::{SessionState, StateTransition};
use crate::protocol::transport::RemoteTransport;
use crate::security::SecureString;
use chrono::{DateTime, Utc};
use log::{debug, trace, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Session client configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Account name, empty for anonymous sessions
    pub username: String,
    /// Account password
    pub password: SecureString,
    /// Interface language sent with `LogIn`
    pub language: String,
    /// Registered user agent
    pub user_agent: String,
    /// Upper bound for a single remote invocation
    pub request_timeout: Duration,
    /// Minimum spacing between outbound calls
    pub min_call_interval: Duration,
    /// Token lifetime before a fresh login is forced
    pub session_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: SecureString::default(),
            language: crate::protocol::DEFAULT_LANGUAGE.to_string(),
            user_agent: crate::protocol::DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(30),
            min_call_interval: crate::protocol::MIN_CALL_INTERVAL,
            session_ttl: crate::protocol::SESSION_TTL,
        }
    }
}

impl SessionConfig {
    /// Whether an account name was configured
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }
}

/// Public view of the session, never carrying the token
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub state: &'static str,
    pub authenticated: bool,
    pub username: Option<String>,
    pub obtained_at: Option<DateTime<Utc>>,
    pub age_secs: Option<u64>,
}

/// Rate-limited, session-authenticated remote client
pub struct SessionClient {
    config: SessionConfig,
    transport: Arc<dyn RemoteTransport>,
    rate_limiter: RateLimiter,
    session: Mutex<SessionState>,
}

impl SessionClient {
    pub fn new(config: SessionConfig, transport: Arc<dyn RemoteTransport>) -> Self {
        debug!(
            "Creating session client for {} (user: {})",
            transport.endpoint(),
            if config.has_credentials() {
                config.username.as_str()
            } else {
                "<anonymous>"
            }
        );
        let rate_limiter = RateLimiter::new(config.min_call_interval);
        Self {
            config,
            transport,
            rate_limiter,
            session: Mutex::new(SessionState::LoggedOut),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    /// Snapshot of the current session state
    pub async fn state(&self) -> SessionState {
        self.session.lock().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.lock().await.is_authenticated()
    }

    pub async fn session_info(&self) -> SessionInfo {
        let state = self.session.lock().await;
        let age = state.age();
        SessionInfo {
            state: state.name(),
            authenticated: state.is_authenticated(),
            username: self
                .config
                .has_credentials()
                .then(|| self.config.username.clone()),
            obtained_at: age
                .and_then(|age| chrono::Duration::from_std(age).ok())
                .map(|age| Utc::now() - age),
            age_secs: age.map(|age| age.as_secs()),
        }
    }

    /// Make sure a usable token is held and return it
    ///
    /// Holds the session lock for the whole login exchange, so concurrent
    /// callers share a single login.
    pub async fn ensure_session(&self) -> Result<String> {
        let mut state = self.session.lock().await;

        if let Some(token) = state.fresh_token(self.config.session_ttl) {
            trace!("Reusing session token");
            return Ok(token.to_string());
        }

        if state.is_authenticated() {
            debug!(
                "Session token outlived {:?}, logging in again",
                self.config.session_ttl
            );
        } else if *state == SessionState::LoggingIn {
            // A previous login was cancelled mid-flight
            debug!("Discarding abandoned login");
            *state = SessionState::LoggedOut;
        }

        Self::transition(&mut state, SessionState::LoggingIn);
        match self.login().await {
            Ok(token) => {
                debug!("Login successful");
                Self::transition(
                    &mut state,
                    SessionState::Authenticated {
                        token: token.clone(),
                        obtained_at: Instant::now(),
                    },
                );
                Ok(token)
            }
            Err(e) => {
                warn!("Login failed: {e}");
                Self::transition(&mut state, SessionState::LoggedOut);
                Err(match e {
                    ProtocolError::AuthenticationFailed { .. } => e,
                    other => ProtocolError::authentication_failed(other.to_string()),
                })
            }
        }
    }

    /// Invoke an authenticated remote method
    ///
    /// The session token is prepended to `args`. When the server rejects the
    /// token the session is marked expired, a fresh login is performed and
    /// the call is retried exactly once.
    pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        let token = self.ensure_session().await?;

        match self.invoke_authenticated(method, &token, args.clone()).await {
            Err(e) if e.requires_reauth() => {
                warn!("{method} rejected the session ({e}), re-authenticating");
                self.expire(&token).await;
                let token = self.ensure_session().await?;
                self.invoke_authenticated(method, &token, args).await
            }
            other => other,
        }
    }

    /// End the session, best effort
    ///
    /// The client always ends `LoggedOut`, even when the remote call fails.
    pub async fn logout(&self) {
        let mut state = self.session.lock().await;
        let previous = std::mem::replace(&mut *state, SessionState::LoggedOut);

        if let SessionState::Authenticated { token, .. } = previous {
            debug!("Logging out");
            match self.invoke("LogOut", vec![Value::from(token)]).await {
                Ok(_) => debug!("Logout successful"),
                Err(e) => warn!("Logout failed, dropping session anyway: {e}"),
            }
        } else {
            trace!("Logout requested while {previous}, nothing to do");
        }
    }

    /// Unauthenticated `ServerInfo` passthrough for health checks
    pub async fn server_info(&self) -> Result<Value> {
        self.invoke("ServerInfo", Vec::new()).await
    }

    async fn login(&self) -> Result<String> {
        let params = vec![
            Value::from(self.config.username.as_str()),
            Value::from(self.config.password.expose()),
            Value::from(self.config.language.as_str()),
            Value::from(self.config.user_agent.as_str()),
        ];

        let response = self.invoke("LogIn", params).await?;
        let status = response.get_str("status").unwrap_or("");
        match StatusCode::parse(status) {
            Some(code) if code.is_success() => response
                .get_str("token")
                .map(str::to_string)
                .ok_or_else(|| ProtocolError::authentication_failed("login response carried no token")),
            _ => Err(ProtocolError::authentication_failed(if status.is_empty() {
                "login response carried no status"
            } else {
                status
            })),
        }
    }

    async fn invoke_authenticated(
        &self,
        method: &str,
        token: &str,
        args: Vec<Value>,
    ) -> Result<Value> {
        let mut params = Vec::with_capacity(args.len() + 1);
        params.push(Value::from(token));
        params.extend(args);

        let response = self.invoke(method, params).await?;
        Self::check_status(method, &response)?;
        Ok(response)
    }

    /// Single rate-limited, timeout-bounded remote invocation
    async fn invoke(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let permit = self.rate_limiter.acquire().await;
        trace!(
            "Sending {} after waiting {:?}",
            codec::describe_call(method, &params),
            permit.waited()
        );

        let result = match timeout(
            self.config.request_timeout,
            self.transport.invoke(method, params),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!("{method} timed out after {:?}", self.config.request_timeout);
                Err(ProtocolError::Timeout(self.config.request_timeout))
            }
        };
        drop(permit);
        result
    }

    /// Reject responses whose `status` member is not a success line
    fn check_status(method: &str, response: &Value) -> Result<()> {
        let Some(status) = response.get_str("status") else {
            return Ok(());
        };
        match StatusCode::parse(status) {
            Some(code) if code.is_success() => Ok(()),
            Some(code) => {
                debug!("{method} returned status {status}");
                Err(code.into_error(status))
            }
            None => Err(ProtocolError::invalid_response("status line", status)),
        }
    }

    /// Mark the session expired if it still holds the rejected token
    async fn expire(&self, failed_token: &str) {
        let mut state = self.session.lock().await;
        let matches = matches!(
            &*state,
            SessionState::Authenticated { token, .. } if token == failed_token
        );
        if matches {
            Self::transition(&mut state, SessionState::Expired);
        } else {
            trace!("Session already replaced, not expiring");
        }
    }

    fn transition(state: &mut SessionState, next: SessionState) {
        if let Some(error) = StateTransition::new(state, &next).validation_error() {
            warn!("{error}");
        }
        trace!("Session state: {} -> {}", state.name(), next.name());
        *state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    /// Scripted transport returning queued replies in order
    struct ScriptedTransport {
        replies: StdMutex<VecDeque<Result<Value>>>,
        calls: StdMutex<Vec<(String, Vec<Value>, Instant)>>,
        delay: Duration,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Result<Value>>) -> Arc<Self> {
            Self::with_delay(replies, Duration::ZERO)
        }

        fn with_delay(replies: Vec<Result<Value>>, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                replies: StdMutex::new(replies.into()),
                calls: StdMutex::new(Vec::new()),
                delay,
            })
        }

        fn methods(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(m, _, _)| m.clone())
                .collect()
        }

        fn params(&self, index: usize) -> Vec<Value> {
            self.calls.lock().unwrap()[index].1.clone()
        }
    }

    #[async_trait]
    impl RemoteTransport for ScriptedTransport {
        async fn invoke(&self, method: &str, params: Vec<Value>) -> Result<Value> {
            self.calls
                .lock()
                .unwrap()
                .push((method.to_string(), params, Instant::now()));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(status("200 OK")))
        }

        fn endpoint(&self) -> &str {
            "scripted://remote"
        }
    }

    fn status(line: &str) -> Value {
        Value::structure([("status", Value::from(line))])
    }

    fn login_ok(token: &str) -> Result<Value> {
        Ok(Value::structure([
            ("status", Value::from("200 OK")),
            ("token", Value::from(token)),
        ]))
    }

    fn client(transport: Arc<ScriptedTransport>) -> SessionClient {
        SessionClient::new(
            SessionConfig {
                username: "alice".to_string(),
                password: SecureString::new("hunter2"),
                min_call_interval: Duration::from_millis(10),
                request_timeout: Duration::from_millis(500),
                ..Default::default()
            },
            transport,
        )
    }

    #[tokio::test]
    async fn test_login_once_then_reuse_token() {
        let transport = ScriptedTransport::new(vec![login_ok("tok-1")]);
        let client = client(transport.clone());

        assert_eq!(client.ensure_session().await.unwrap(), "tok-1");
        assert_eq!(client.ensure_session().await.unwrap(), "tok-1");
        assert!(client.is_authenticated().await);
        assert_eq!(transport.methods(), vec!["LogIn"]);

        let params = transport.params(0);
        assert_eq!(params[0].as_str(), Some("alice"));
        assert_eq!(params[1].as_str(), Some("hunter2"));
        assert_eq!(params[2].as_str(), Some("en"));
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let transport = ScriptedTransport::new(vec![Ok(status("401 Unauthorized"))]);
        let client = client(transport);

        let err = client.ensure_session().await.unwrap_err();
        assert!(matches!(err, ProtocolError::AuthenticationFailed { .. }));
        assert!(err.to_string().contains("401"));
        assert_eq!(client.state().await, SessionState::LoggedOut);
    }

    #[tokio::test]
    async fn test_login_network_failure_is_authentication_failure() {
        let transport =
            ScriptedTransport::new(vec![Err(ProtocolError::transport("connection refused"))]);
        let client = client(transport);

        let err = client.ensure_session().await.unwrap_err();
        assert!(matches!(err, ProtocolError::AuthenticationFailed { .. }));
        assert!(!client.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_call_prepends_token() {
        let transport = ScriptedTransport::new(vec![login_ok("tok-1"), Ok(status("200 OK"))]);
        let client = client(transport.clone());

        client
            .call("SearchSubtitles", vec![Value::Array(vec![])])
            .await
            .unwrap();

        assert_eq!(transport.methods(), vec!["LogIn", "SearchSubtitles"]);
        let params = transport.params(1);
        assert_eq!(params[0].as_str(), Some("tok-1"));
        assert_eq!(params.len(), 2);
    }

    #[tokio::test]
    async fn test_single_reauth_on_invalid_session() {
        let transport = ScriptedTransport::new(vec![
            login_ok("tok-1"),
            Ok(status("406 No session")),
            login_ok("tok-2"),
            Ok(status("200 OK")),
        ]);
        let client = client(transport.clone());

        client.call("SearchSubtitles", Vec::new()).await.unwrap();

        assert_eq!(
            transport.methods(),
            vec!["LogIn", "SearchSubtitles", "LogIn", "SearchSubtitles"]
        );
        assert_eq!(transport.params(3)[0].as_str(), Some("tok-2"));
    }

    #[tokio::test]
    async fn test_second_rejection_is_surfaced() {
        let transport = ScriptedTransport::new(vec![
            login_ok("tok-1"),
            Ok(status("401 Unauthorized")),
            login_ok("tok-2"),
            Ok(status("401 Unauthorized")),
        ]);
        let client = client(transport.clone());

        let err = client.call("SearchSubtitles", Vec::new()).await.unwrap_err();
        assert!(err.requires_reauth());
        assert_eq!(transport.methods().len(), 4);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let transport = ScriptedTransport::new(vec![
            login_ok("tok-1"),
            Ok(status("503 Service Unavailable")),
        ]);
        let client = client(transport.clone());

        let err = client.call("SearchSubtitles", Vec::new()).await.unwrap_err();
        assert!(matches!(err, ProtocolError::ServerError { code: 503, .. }));
        assert_eq!(transport.methods(), vec!["LogIn", "SearchSubtitles"]);
    }

    #[tokio::test]
    async fn test_call_times_out() {
        let transport = ScriptedTransport::with_delay(
            vec![login_ok("tok-1"), Ok(status("200 OK"))],
            Duration::from_millis(100),
        );
        let client = SessionClient::new(
            SessionConfig {
                request_timeout: Duration::from_millis(50),
                min_call_interval: Duration::ZERO,
                ..Default::default()
            },
            transport,
        );

        let err = client.call("SearchSubtitles", Vec::new()).await.unwrap_err();
        // The login itself times out first
        assert!(matches!(err, ProtocolError::AuthenticationFailed { .. }));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_session_ttl_forces_login() {
        let transport = ScriptedTransport::new(vec![login_ok("tok-1"), login_ok("tok-2")]);
        let client = SessionClient::new(
            SessionConfig {
                session_ttl: Duration::ZERO,
                min_call_interval: Duration::ZERO,
                ..Default::default()
            },
            transport.clone(),
        );

        assert_eq!(client.ensure_session().await.unwrap(), "tok-1");
        assert_eq!(client.ensure_session().await.unwrap(), "tok-2");
        assert_eq!(transport.methods(), vec!["LogIn", "LogIn"]);
    }

    #[tokio::test]
    async fn test_logout_always_ends_logged_out() {
        let transport = ScriptedTransport::new(vec![
            login_ok("tok-1"),
            Err(ProtocolError::transport("connection reset")),
        ]);
        let client = client(transport.clone());

        client.ensure_session().await.unwrap();
        client.logout().await;

        assert_eq!(client.state().await, SessionState::LoggedOut);
        assert_eq!(transport.methods(), vec!["LogIn", "LogOut"]);
        assert_eq!(transport.params(1)[0].as_str(), Some("tok-1"));

        // Nothing to do the second time
        client.logout().await;
        assert_eq!(transport.methods().len(), 2);
    }

    #[tokio::test]
    async fn test_session_info_hides_token() {
        let transport = ScriptedTransport::new(vec![login_ok("secret-token")]);
        let client = client(transport);

        let info = client.session_info().await;
        assert_eq!(info.state, "logged_out");
        assert!(info.obtained_at.is_none());

        client.ensure_session().await.unwrap();
        let info = client.session_info().await;
        assert!(info.authenticated);
        assert_eq!(info.username.as_deref(), Some("alice"));
        assert!(info.obtained_at.is_some());
        assert!(!format!("{info:?}").contains("secret-token"));
    }

    #[tokio::test]
    async fn test_calls_are_spaced() {
        let transport = ScriptedTransport::new(vec![login_ok("tok-1")]);
        let client = SessionClient::new(
            SessionConfig {
                min_call_interval: Duration::from_millis(100),
                ..Default::default()
            },
            transport.clone(),
        );

        client.call("ServerInfo", Vec::new()).await.unwrap();
        client.call("ServerInfo", Vec::new()).await.unwrap();

        let calls = transport.calls.lock().unwrap();
        for pair in calls.windows(2) {
            assert!(pair[1].2 - pair[0].2 >= Duration::from_millis(95));
        }
    }
}
