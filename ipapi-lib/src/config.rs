//! Configuration of a [`Geolocator`](crate::Geolocator).
//!
//! A [`Config`] is an immutable value which gets moved into the lookup
//! worker when it starts. Use [`Config::builder`] to override individual
//! settings; everything else falls back to the defaults below, which match
//! the limits of the free ip-api.com endpoint.
#![allow(clippy::module_name_repetitions)]
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use typed_builder::TypedBuilder;
use url::Url;

use crate::{ErrorKind, Fields, Result};

/// Default lookup endpoint of the free tier, `http://ip-api.com/json/`.
pub const DEFAULT_ENDPOINT: &str = "http://ip-api.com/json/";
/// Default number of queued and in-flight lookups, 50.
pub const DEFAULT_CAPACITY: usize = 50;
/// Default number of upstream attempts per lookup, 2.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
/// Default safety margin added to every rate limit reset, 1 second.
pub const DEFAULT_BACKOFF_BUFFER: Duration = Duration::from_secs(1);
/// Default wait when the rate limit headers can't be read, 10 seconds.
pub const DEFAULT_FALLBACK_BACKOFF: Duration = Duration::from_secs(10);
/// Default timeout per upstream attempt, 10 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default name of the header holding the number of remaining requests.
pub const DEFAULT_REMAINING_HEADER: &str = "X-Rl";
/// Default name of the header holding the seconds until the limit resets.
pub const DEFAULT_RESET_HEADER: &str = "X-Ttl";
/// Default user agent, `ipapi/<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("ipapi/", env!("CARGO_PKG_VERSION"));

fn default_endpoint() -> Url {
    // A constant which is known to parse
    Url::parse(DEFAULT_ENDPOINT).unwrap_or_else(|_| unreachable!("default endpoint is valid"))
}

/// Settings for the lookup worker and its HTTP transport.
#[derive(TypedBuilder, Debug, Clone, Deserialize)]
#[builder(field_defaults(default, setter(into)))]
#[builder(builder_method(doc = "
Create a builder for building a `Config`.

On the builder call, call methods with same name as its fields to set their values.

Finally, call `.build()` to create the instance of `Config`.
"))]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the lookup endpoint.
    /// The address gets appended as the last path segment.
    #[builder(default_code = "default_endpoint()")]
    pub endpoint: Url,
    /// Response fields to request from the upstream.
    pub fields: Fields,
    /// Localization of city, region and country names, e.g. `de` or `pt-BR`.
    pub lang: Option<String>,
    /// Optional API key for the commercial endpoint.
    /// Only ever sent upstream, never logged.
    pub api_key: Option<SecretString>,
    /// Maximum number of lookups that may be queued or in flight at once.
    /// Further submissions get rejected until a result is delivered.
    #[builder(default = DEFAULT_CAPACITY)]
    pub capacity: usize,
    /// Maximum number of upstream attempts per lookup,
    /// including attempts made after waiting for the rate limit to reset.
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
    /// Added on top of every rate limit reset before the next request.
    #[builder(default = DEFAULT_BACKOFF_BUFFER)]
    #[serde(with = "humantime_serde")]
    pub backoff_buffer: Duration,
    /// How long to wait when throttled without usable rate limit headers.
    #[builder(default = DEFAULT_FALLBACK_BACKOFF)]
    #[serde(with = "humantime_serde")]
    pub fallback_backoff: Duration,
    /// Timeout for a single upstream attempt.
    /// A timeout is reported like any other network error.
    #[builder(default = DEFAULT_TIMEOUT)]
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Header carrying the number of requests left in the current window.
    #[builder(default_code = "String::from(DEFAULT_REMAINING_HEADER)")]
    pub remaining_header: String,
    /// Header carrying the number of seconds until the window resets.
    #[builder(default_code = "String::from(DEFAULT_RESET_HEADER)")]
    pub reset_header: String,
    /// User agent sent with every lookup.
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)")]
    pub user_agent: String,
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Config {
    /// Build the upstream URL for looking up `address`.
    ///
    /// The address is percent-encoded into a single path segment, so
    /// arbitrary user input can't alter the request. An empty address
    /// makes the upstream look up the caller's own IP.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidEndpoint`] if the endpoint can't be used
    /// as a base URL (e.g. `mailto:` or `data:` URLs).
    pub fn request_url(&self, address: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| ErrorKind::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .push(address);

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("fields", &self.fields.to_string());
            if let Some(lang) = self.lang.as_deref().filter(|l| !l.is_empty()) {
                query.append_pair("lang", lang);
            }
            if let Some(key) = self
                .api_key
                .as_ref()
                .map(ExposeSecret::expose_secret)
                .filter(|k| !k.is_empty())
            {
                query.append_pair("key", key);
            }
        }

        Ok(url)
    }

    /// Check that the configuration can serve lookups.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidEndpoint`] if the endpoint can't be used
    /// as a base URL.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.cannot_be_a_base() {
            return Err(ErrorKind::InvalidEndpoint(self.endpoint.to_string()));
        }
        Ok(())
    }
}
