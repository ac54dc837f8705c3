//! `ipapi` is a rate limit aware client for the [ip-api.com](https://ip-api.com)
//! geolocation API.
//!
//! The free endpoint allows a fixed number of requests per minute per
//! client IP and bans clients which keep ignoring the limit. A
//! [`Geolocator`] funnels all lookups through a bounded queue that is served
//! by a single background worker. The worker watches the rate limit headers
//! of every reply and waits for the window to reset whenever it runs out.
//!
//! "Hello world" example:
//! ```no_run
//! use ipapi_lib::{Config, Geolocator, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let geolocator = Geolocator::new(Config::default())?;
//!   let result = geolocator.lookup("8.8.8.8").await?;
//!   println!("{}", result);
//!   Ok(())
//! }
//! ```
//!
//! Lookups can also be submitted without waiting for them. The queue rejects
//! submissions beyond its capacity instead of blocking:
//!
//! ```no_run
//! use ipapi_lib::{Config, Field, Fields, Geolocator, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let config = Config::builder()
//!       .fields([Field::Status, Field::Country, Field::City].into_iter().collect::<Fields>())
//!       .capacity(10_usize)
//!       .build();
//!   let geolocator = Geolocator::new(config)?;
//!
//!   let handles = ["8.8.8.8", "1.1.1.1"]
//!       .into_iter()
//!       .map(|address| geolocator.submit(address))
//!       .collect::<Result<Vec<_>>>()?;
//!   for handle in handles {
//!       println!("{}", handle.await?);
//!   }
//!   Ok(())
//! }
//! ```
#![allow(clippy::module_name_repetitions)]

mod queue;
mod ratelimit;
mod types;
mod worker;

pub mod config;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_utils;

pub use crate::{
    config::Config,
    queue::{Geolocator, LookupHandle},
    transport::{HttpTransport, Transport, UpstreamReply},
    types::{ErrorKind, Field, Fields, LookupResult, Result, STATUS_FAIL, STATUS_SUCCESS},
};
