//! Rate limit awareness for the lookup worker.
//!
//! The upstream shares one request budget between all callers of an IP
//! address. Every reply carries the state of that budget, which decides how
//! long the worker waits before it talks to the upstream again.

mod headers;

use std::time::Duration;

use http::HeaderMap;
use log::{debug, warn};

use crate::Config;

pub(crate) use headers::RateLimitWindow;

/// How long to wait before retrying after a throttled (429) reply.
///
/// - Requests left in the window: retry right away.
/// - Window exhausted: wait for the reset plus the configured buffer.
/// - Headers unreadable: wait the configured fallback duration.
pub(crate) fn throttled_backoff(headers: &HeaderMap, config: &Config) -> Duration {
    match RateLimitWindow::parse(headers, &config.remaining_header, &config.reset_header) {
        Ok(RateLimitWindow::Open { remaining }) => {
            debug!("Throttled with {remaining} request(s) left in window, retrying immediately");
            Duration::ZERO
        }
        Ok(window) => window.wait(config.backoff_buffer),
        Err(e) => {
            warn!(
                "Rate limit header unavailable ({e}), falling back to {}",
                humantime::format_duration(config.fallback_backoff)
            );
            config.fallback_backoff
        }
    }
}

/// How long to pause after a successful reply before serving the next
/// lookup, if at all.
///
/// Only an exhausted window causes a pause. Missing headers are not an
/// error here since the upstream already answered.
pub(crate) fn pause_after_success(headers: &HeaderMap, config: &Config) -> Option<Duration> {
    match RateLimitWindow::parse(headers, &config.remaining_header, &config.reset_header) {
        Ok(RateLimitWindow::Open { .. }) => None,
        Ok(window) => Some(window.wait(config.backoff_buffer)),
        Err(e) => {
            debug!("No rate limit information in reply: {e}");
            None
        }
    }
}
