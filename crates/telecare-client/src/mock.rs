//! Mock transport for testing

use crate::envelope::Envelope;
use crate::error::{ClientError, ClientResult};
use crate::request::ApiRequest;
use crate::transport::{TokenStore, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// Canned outcome for a mocked path
#[derive(Debug, Clone)]
pub enum MockReply {
    /// `{success: true, data}`
    Data(Value),
    /// A full envelope, passed through `into_result`
    Envelope(Envelope),
    /// A transport failure with `message`
    Fail(String),
    /// An HTTP status failure; 401 also clears the token
    Status(u16, String),
}

#[derive(Debug, Clone)]
struct Scripted {
    reply: MockReply,
    delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct Route {
    fallback: Option<MockReply>,
    delay: Option<Duration>,
    queued: VecDeque<Scripted>,
}

#[derive(Debug, Default)]
struct MockState {
    routes: HashMap<String, Route>,
    calls: Vec<ApiRequest>,
}

/// In-memory [`Transport`] that routes by request path
///
/// Every request is recorded before it is answered. Queued replies are
/// consumed first, then the path's standing reply. Unknown paths answer 404.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    tokens: TokenStore,
}

impl MockTransport {
    /// Create an empty mock
    pub fn new() -> Self {
        Self::default()
    }

    fn with_route(&self, path: &str, update: impl FnOnce(&mut Route)) -> &Self {
        let mut state = self.state.lock();
        update(state.routes.entry(path.to_string()).or_default());
        self
    }

    /// Answer `path` with `{success: true, data}` until told otherwise
    pub fn respond(&self, path: &str, data: Value) -> &Self {
        self.with_route(path, |route| route.fallback = Some(MockReply::Data(data)))
    }

    /// Answer `path` with a full envelope until told otherwise
    pub fn respond_envelope(&self, path: &str, envelope: Envelope) -> &Self {
        self.with_route(path, |route| {
            route.fallback = Some(MockReply::Envelope(envelope));
        })
    }

    /// Fail `path` with `message` until told otherwise
    pub fn fail(&self, path: &str, message: impl Into<String>) -> &Self {
        let message = message.into();
        self.with_route(path, |route| route.fallback = Some(MockReply::Fail(message)))
    }

    /// Answer `path` with an HTTP error status until told otherwise
    pub fn fail_status(&self, path: &str, status: u16, message: impl Into<String>) -> &Self {
        let message = message.into();
        self.with_route(path, |route| {
            route.fallback = Some(MockReply::Status(status, message));
        })
    }

    /// Delay every standing reply on `path`
    pub fn delay(&self, path: &str, delay: Duration) -> &Self {
        self.with_route(path, |route| route.delay = Some(delay))
    }

    /// Queue a one-shot reply for the next call to `path`
    pub fn enqueue(&self, path: &str, reply: MockReply, delay: Option<Duration>) -> &Self {
        self.with_route(path, |route| route.queued.push_back(Scripted { reply, delay }))
    }

    /// Every request seen so far
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.state.lock().calls.clone()
    }

    /// Requests seen for `path`
    pub fn calls_to(&self, path: &str) -> Vec<ApiRequest> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|request| request.path == path)
            .cloned()
            .collect()
    }

    /// Number of requests seen for `path`
    pub fn call_count(&self, path: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|request| request.path == path)
            .count()
    }

    /// Forget recorded requests, keeping routes
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn next_reply(&self, request: &ApiRequest) -> Scripted {
        let mut state = self.state.lock();
        state.calls.push(request.clone());

        let Some(route) = state.routes.get_mut(&request.path) else {
            return Scripted {
                reply: MockReply::Status(404, format!("no mock route for {}", request.path)),
                delay: None,
            };
        };

        if let Some(scripted) = route.queued.pop_front() {
            return scripted;
        }

        Scripted {
            reply: route.fallback.clone().unwrap_or_else(|| {
                MockReply::Status(404, format!("no mock reply for {}", request.path))
            }),
            delay: route.delay,
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> ClientResult<Envelope> {
        let Scripted { reply, delay } = self.next_reply(&request);

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            MockReply::Data(data) => Ok(Envelope::ok(data)),
            MockReply::Envelope(envelope) => envelope.into_result(),
            MockReply::Fail(message) => Err(ClientError::mock(message)),
            MockReply::Status(401, message) => {
                self.tokens.clear();
                Err(ClientError::unauthorized(message))
            }
            MockReply::Status(status, message) => Err(ClientError::status(status, message)),
        }
    }

    fn tokens(&self) -> &TokenStore {
        &self.tokens
    }
}
