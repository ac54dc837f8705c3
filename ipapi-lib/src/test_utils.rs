use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use http::{HeaderMap, HeaderValue, StatusCode};
use tokio::time::Instant;
use url::Url;

use crate::{
    Result,
    transport::{Transport, UpstreamReply},
};

/// A transport which plays back prepared replies in order and records
/// every request made through it.
///
/// Replies can be delayed with [`ScriptedTransport::reply_after`], which
/// uses the Tokio clock, so tests can run with a paused clock.
///
/// # Panic
///
/// Panics when asked for more replies than were prepared, which surfaces as
/// [`ErrorKind::WorkerGone`](crate::ErrorKind::WorkerGone) in the test.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedTransport {
    inner: Arc<Mutex<Script>>,
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<(Duration, UpstreamReply)>,
    calls: Vec<(Url, Instant)>,
}

impl ScriptedTransport {
    /// Append a reply which is returned immediately
    pub(crate) fn reply(self, status: u16, headers: &[(&'static str, &str)], body: &str) -> Self {
        self.reply_after(Duration::ZERO, status, headers, body)
    }

    /// Append a reply which is returned after `delay`
    pub(crate) fn reply_after(
        self,
        delay: Duration,
        status: u16,
        headers: &[(&'static str, &str)],
        body: &str,
    ) -> Self {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            header_map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        let reply = UpstreamReply {
            status: StatusCode::from_u16(status).unwrap(),
            headers: header_map,
            body: body.as_bytes().to_vec(),
        };
        self.inner.lock().unwrap().replies.push_back((delay, reply));
        self
    }

    /// URLs of all requests made so far, in order
    pub(crate) fn calls(&self) -> Vec<Url> {
        let script = self.inner.lock().unwrap();
        script.calls.iter().map(|(url, _)| url.clone()).collect()
    }

    /// Points in time at which the requests were made, in order
    pub(crate) fn call_times(&self) -> Vec<Instant> {
        let script = self.inner.lock().unwrap();
        script.calls.iter().map(|(_, at)| *at).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, url: &Url) -> Result<UpstreamReply> {
        let (delay, reply) = {
            let mut script = self.inner.lock().unwrap();
            script.calls.push((url.clone(), Instant::now()));
            script
                .replies
                .pop_front()
                .unwrap_or_else(|| panic!("Unexpected upstream request to {url}"))
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(reply)
    }
}
