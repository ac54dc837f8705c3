//! The single lookup worker.
//!
//! The worker drains the submission queue strictly in order, one lookup at
//! a time, so that all lookups of a [`Geolocator`](crate::Geolocator) share
//! one view of the upstream rate limit. Every dequeued lookup gets exactly
//! one [`LookupResult`], failures included.
use std::time::Duration;

use http::StatusCode;
use log::{debug, warn};
use tokio::{sync::mpsc, time::sleep};

use crate::{
    Config, ErrorKind, LookupResult,
    queue::LookupRequest,
    ratelimit,
    transport::Transport,
};

/// Outcome of one lookup: the result to deliver and an optional pause to
/// observe before the next lookup starts
type Outcome = (LookupResult, Option<Duration>);

pub(crate) struct Worker {
    receiver: mpsc::Receiver<LookupRequest>,
    config: Config,
    transport: Box<dyn Transport>,
}

impl Worker {
    pub(crate) fn new(
        receiver: mpsc::Receiver<LookupRequest>,
        config: Config,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            receiver,
            config,
            transport,
        }
    }

    /// Serve lookups until every submitter is gone and the queue is empty
    pub(crate) async fn run(mut self) {
        while let Some(request) = self.receiver.recv().await {
            let LookupRequest {
                address,
                slot,
                permit,
            } = request;

            if slot.is_closed() {
                debug!("Skipping lookup of {address:?}, nobody is waiting for it");
                drop(permit);
                continue;
            }

            let (result, pause) = self.lookup(&address).await;
            // The lookup is done; free its slot before waking the caller so
            // that an immediate resubmit is admitted
            drop(permit);
            if slot.send(result).is_err() {
                debug!("Result for {address:?} was dropped by the caller");
            }

            if let Some(pause) = pause {
                debug!(
                    "Rate limit window exhausted, pausing for {}",
                    humantime::format_duration(pause)
                );
                sleep(pause).await;
            }
        }
        debug!("Lookup queue closed, stopping worker");
    }

    /// Look up a single address, retrying while the upstream throttles us
    async fn lookup(&self, address: &str) -> Outcome {
        let url = match self.config.request_url(address) {
            Ok(url) => url,
            Err(e) => return (LookupResult::fail(address, e.details()), None),
        };
        let max_attempts = self.config.max_attempts.max(1);

        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!("Looking up {address:?} (attempt {attempt}/{max_attempts})");

            let reply = match self.transport.fetch(&url).await {
                Ok(reply) => reply,
                Err(e) => {
                    debug!("Lookup of {address:?} failed: {e}");
                    return (LookupResult::fail(address, e.details()), None);
                }
            };

            match reply.status {
                StatusCode::OK => {
                    let pause = ratelimit::pause_after_success(&reply.headers, &self.config);
                    let result = serde_json::from_slice::<LookupResult>(&reply.body)
                        .unwrap_or_else(|e| {
                            LookupResult::fail(address, ErrorKind::MalformedBody(e).to_string())
                        });
                    return (result, pause);
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    let backoff = ratelimit::throttled_backoff(&reply.headers, &self.config);
                    if attempt >= max_attempts {
                        warn!(
                            "Giving up on {address:?}, still rate limited after {attempt} attempt(s)"
                        );
                        let error = ErrorKind::RateLimitExceeded { attempts: attempt };
                        let pause = Some(backoff).filter(|b| !b.is_zero());
                        return (LookupResult::fail(address, error.to_string()), pause);
                    }
                    if !backoff.is_zero() {
                        warn!(
                            "Rate limited while looking up {address:?}, retrying in {}",
                            humantime::format_duration(backoff)
                        );
                        sleep(backoff).await;
                    }
                }
                status => {
                    debug!("Lookup of {address:?} returned {status}");
                    let error = ErrorKind::UpstreamStatus(status);
                    return (LookupResult::fail(address, error.to_string()), None);
                }
            }
        }
    }
}
