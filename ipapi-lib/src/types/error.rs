use http::StatusCode;
use thiserror::Error;

/// Possible errors when interacting with `ipapi_lib`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The submission queue already holds as many queued and in-flight
    /// lookups as it was configured for
    #[error("Too many requests in queue (capacity: {capacity})")]
    QueueFull {
        /// The configured queue capacity
        capacity: usize,
    },

    /// The worker went away before it could deliver a result.
    /// This only happens when the runtime is torn down.
    #[error("Lookup worker has shut down before delivering a result")]
    WorkerGone,

    /// The worker could not be spawned because no Tokio runtime is running
    #[error("Cannot start lookup worker outside of a Tokio runtime")]
    NoRuntime,

    /// Network error while talking to the upstream service
    #[error("Network error while trying to reach the lookup endpoint")]
    Transport(#[source] reqwest::Error),

    /// The upstream service answered with an unexpected status code
    #[error("Upstream service responded with {0}")]
    UpstreamStatus(StatusCode),

    /// The response body could not be parsed into a lookup result
    #[error("Malformed response body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    /// The attempt budget ran out while the upstream was still throttling us
    #[error("Rate limit exceeded after {attempts} attempt(s)")]
    RateLimitExceeded {
        /// Number of attempts made for the request
        attempts: u32,
    },

    /// A rate limit header was missing or could not be read
    #[error("Unable to read rate limit header `{0}`")]
    RateLimitHeader(String),

    /// The configured endpoint cannot serve as a base URL
    #[error("Invalid lookup endpoint `{0}`")]
    InvalidEndpoint(String),

    /// A field name which the upstream service does not know
    #[error("Unknown response field `{0}`")]
    InvalidField(String),

    /// The underlying HTTP client could not be created
    #[error("Failed to build HTTP client")]
    BuildClient(#[source] reqwest::Error),

    /// The given header could not be parsed.
    /// A possible error when converting a `HeaderValue` from a string or byte
    /// slice.
    #[error("Header could not be parsed.")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
}

impl ErrorKind {
    /// Whether this error was raised at submission time rather than
    /// delivered through a lookup result
    #[must_use]
    pub const fn is_admission_error(&self) -> bool {
        matches!(self, Self::QueueFull { .. } | Self::NoRuntime)
    }

    /// A human-readable message suitable for the `message` field of a
    /// synthesized lookup result.
    ///
    /// Transport errors carry their cause, since the top-level `reqwest`
    /// message alone is rarely helpful.
    #[must_use]
    pub fn details(&self) -> String {
        match self {
            Self::Transport(e) if e.is_timeout() => format!("{self}: request timed out"),
            Self::Transport(e) => match std::error::Error::source(e) {
                Some(source) => format!("{self}: {source}"),
                None => format!("{self}: {e}"),
            },
            _ => self.to_string(),
        }
    }
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::QueueFull { capacity: c1 }, Self::QueueFull { capacity: c2 }) => c1 == c2,
            (Self::Transport(e1), Self::Transport(e2))
            | (Self::BuildClient(e1), Self::BuildClient(e2)) => e1.to_string() == e2.to_string(),
            (Self::UpstreamStatus(s1), Self::UpstreamStatus(s2)) => s1 == s2,
            (Self::MalformedBody(e1), Self::MalformedBody(e2)) => e1.to_string() == e2.to_string(),
            (
                Self::RateLimitExceeded { attempts: a1 },
                Self::RateLimitExceeded { attempts: a2 },
            ) => a1 == a2,
            (Self::RateLimitHeader(h1), Self::RateLimitHeader(h2))
            | (Self::InvalidEndpoint(h1), Self::InvalidEndpoint(h2))
            | (Self::InvalidField(h1), Self::InvalidField(h2)) => h1 == h2,
            (Self::WorkerGone, Self::WorkerGone)
            | (Self::NoRuntime, Self::NoRuntime)
            | (Self::InvalidHeader(_), Self::InvalidHeader(_)) => true,
            _ => false,
        }
    }
}

impl Eq for ErrorKind {}

#[cfg(test)]
mod tests {
    use super::ErrorKind;
    use http::StatusCode;

    #[test]
    fn test_admission_errors() {
        assert!(ErrorKind::QueueFull { capacity: 1 }.is_admission_error());
        assert!(ErrorKind::NoRuntime.is_admission_error());
        assert!(!ErrorKind::WorkerGone.is_admission_error());
        assert!(!ErrorKind::UpstreamStatus(StatusCode::FORBIDDEN).is_admission_error());
    }

    #[test]
    fn test_details_without_source() {
        let err = ErrorKind::UpstreamStatus(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            err.details(),
            "Upstream service responded with 503 Service Unavailable"
        );
        assert_eq!(
            ErrorKind::RateLimitExceeded { attempts: 2 }.details(),
            "Rate limit exceeded after 2 attempt(s)"
        );
    }
}
