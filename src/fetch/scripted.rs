//! Scripted sessions and probers for state machine tests

use crate::federation::Prober;
use crate::fetch::session::{FetchSession, RawResponse, SessionFactory};
use crate::HarvestError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Responder = dyn Fn(&str, &str) -> RawResponse + Send + Sync;

#[derive(Debug, Default)]
struct ScriptLog {
    binds: Vec<String>,
    requests: Vec<(String, String)>,
}

/// Session factory whose sessions answer from a closure of (endpoint, path)
#[derive(Clone)]
pub(crate) struct ScriptedSessions {
    responder: Arc<Responder>,
    log: Arc<Mutex<ScriptLog>>,
}

impl ScriptedSessions {
    pub(crate) fn new(responder: impl Fn(&str, &str) -> RawResponse + Send + Sync + 'static) -> Self {
        Self {
            responder: Arc::new(responder),
            log: Arc::new(Mutex::new(ScriptLog::default())),
        }
    }

    /// Every endpoint a session was opened for, in order
    pub(crate) fn binds(&self) -> Vec<String> {
        self.log.lock().unwrap().binds.clone()
    }

    /// Every (endpoint, path) requested, in order
    pub(crate) fn requests(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().requests.clone()
    }

    pub(crate) fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|(_, path)| path).collect()
    }
}

impl SessionFactory for ScriptedSessions {
    fn open(&self, endpoint: &str) -> Result<Box<dyn FetchSession>, HarvestError> {
        self.log.lock().unwrap().binds.push(endpoint.to_string());
        Ok(Box::new(ScriptedSession {
            endpoint: endpoint.to_string(),
            responder: self.responder.clone(),
            log: self.log.clone(),
        }))
    }
}

struct ScriptedSession {
    endpoint: String,
    responder: Arc<Responder>,
    log: Arc<Mutex<ScriptLog>>,
}

#[async_trait]
impl FetchSession for ScriptedSession {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get(&self, path: &str) -> RawResponse {
        self.log
            .lock()
            .unwrap()
            .requests
            .push((self.endpoint.clone(), path.to_string()));
        (self.responder)(&self.endpoint, path)
    }
}

/// Prober that passes a fixed set of endpoints and counts its calls
pub(crate) struct StaticProber {
    passing: Vec<String>,
    calls: AtomicUsize,
}

impl StaticProber {
    pub(crate) fn passing(endpoints: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            passing: endpoints.iter().map(|e| e.to_string()).collect(),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for StaticProber {
    async fn probe(&self, endpoints: &[String]) -> Vec<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        endpoints
            .iter()
            .filter(|endpoint| self.passing.contains(*endpoint))
            .cloned()
            .collect()
    }
}

pub(crate) fn ok(body: &str) -> RawResponse {
    RawResponse::Http {
        status: 200,
        body: body.to_string(),
    }
}

/// Renders a feed page of (item class, post id) pairs and an optional cursor
pub(crate) fn item_page(items: &[(&str, u64)], cursor: Option<&str>) -> String {
    let mut html = String::from(r#"<html><body><div class="timeline">"#);
    for (class, id) in items {
        html.push_str(&format!(
            r##"<div class="{class}"><a class="tweet-link" href="/acct1/status/{id}#m"></a><div class="tweet-body"><div class="tweet-header"><a class="fullname" href="/acct1">Account One</a><a class="username" href="/acct1">@acct1</a><span class="tweet-date"><a href="/acct1/status/{id}#m" title="Jan 10, 2023 · 12:00 PM UTC">Jan 10</a></span></div><div class="tweet-content media-body">post {id}</div></div></div>"##
        ));
    }
    if let Some(cursor) = cursor {
        html.push_str(&format!(
            r#"<div class="show-more"><a href="{cursor}">Load more</a></div>"#
        ));
    }
    html.push_str("</div></body></html>");
    html
}
