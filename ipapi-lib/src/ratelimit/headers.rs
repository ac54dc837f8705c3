//! Handle the rate limiting headers of the upstream service.
//!
//! The free endpoint reports its window with two plain integer headers,
//! the number of requests left (`X-Rl`) and the seconds until the window
//! resets (`X-Ttl`). Their names are configurable.

use std::time::Duration;

use http::HeaderMap;

use crate::ErrorKind;

/// The rate limit window as reported by a single upstream reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RateLimitWindow {
    /// Requests are left in the current window
    Open {
        /// Number of requests left
        remaining: u64,
    },
    /// No further request will be served before the window resets
    Exhausted {
        /// Time until the window resets
        reset: Duration,
    },
}

impl RateLimitWindow {
    /// Read the window from `headers`.
    ///
    /// The reset header is only consulted once the window is exhausted, so
    /// a reply with requests left doesn't need to carry it.
    /// Header names are matched case-insensitively.
    pub(crate) fn parse(
        headers: &HeaderMap,
        remaining_header: &str,
        reset_header: &str,
    ) -> Result<Self, ErrorKind> {
        let remaining = parse_header_value(headers, remaining_header)?;
        if remaining > 0 {
            return Ok(Self::Open { remaining });
        }
        Ok(Self::Exhausted {
            reset: Duration::from_secs(parse_header_value(headers, reset_header)?),
        })
    }

    /// How long to wait before the next request, `buffer` included
    pub(crate) const fn wait(&self, buffer: Duration) -> Duration {
        match *self {
            Self::Open { .. } => Duration::ZERO,
            Self::Exhausted { reset } => reset.saturating_add(buffer),
        }
    }
}

/// Helper method to parse a numeric header value
fn parse_header_value(headers: &HeaderMap, header_name: &str) -> Result<u64, ErrorKind> {
    if let Some(value) = headers.get(header_name)
        && let Ok(value_str) = value.to_str()
        && let Ok(number) = value_str.trim().parse::<u64>()
    {
        return Ok(number);
    }
    Err(ErrorKind::RateLimitHeader(header_name.into()))
}
