//! The submission side of the lookup queue.
//!
//! A [`Geolocator`] admits at most `capacity` lookups at once, counting
//! both queued lookups and the one the worker is currently serving.
//! Submitting never blocks: once the queue is full, [`Geolocator::submit`]
//! fails right away with [`ErrorKind::QueueFull`].
use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, PoisonError},
    task::{Context, Poll},
};

use log::debug;
use tokio::{
    runtime::Handle,
    sync::{OwnedSemaphorePermit, Semaphore, mpsc, oneshot},
};

use crate::{
    Config, ErrorKind, LookupResult, Result,
    transport::{HttpTransport, Transport},
    worker::Worker,
};

/// A lookup waiting in the queue
pub(crate) struct LookupRequest {
    pub(crate) address: String,
    /// Written exactly once by the worker
    pub(crate) slot: oneshot::Sender<LookupResult>,
    /// Held until the lookup has finished
    pub(crate) permit: OwnedSemaphorePermit,
}

/// Rate limit aware geolocation client.
///
/// All lookups submitted through a `Geolocator` (and its clones) are served
/// by a single background worker, one after another and in submission
/// order. The worker is spawned on the current Tokio runtime the first time
/// a lookup gets submitted, or explicitly with [`Geolocator::start`].
///
/// ```no_run
/// use ipapi_lib::{Config, Geolocator, Result};
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let geolocator = Geolocator::new(Config::default())?;
///     let result = geolocator.lookup("8.8.8.8").await?;
///     println!("{result}");
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Geolocator {
    sender: mpsc::Sender<LookupRequest>,
    permits: Arc<Semaphore>,
    capacity: usize,
    /// The not yet started worker; taken exactly once
    worker: Arc<Mutex<Option<Worker>>>,
}

impl std::fmt::Debug for Geolocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Geolocator")
            .field("capacity", &self.capacity)
            .field("pending", &self.pending())
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

impl Geolocator {
    /// Create a client which talks to the upstream over HTTP.
    ///
    /// # Errors
    ///
    /// Returns an `Err` if the endpoint can't be used as a base URL
    /// or the HTTP client can't be built from `config`.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }

    /// Create a client which performs its upstream attempts through
    /// `transport`
    #[must_use]
    pub fn with_transport<T: Transport + 'static>(config: Config, transport: T) -> Self {
        let capacity = config.capacity;
        // A zero-sized channel is not allowed; the semaphore enforces the cap
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = Worker::new(receiver, config, Box::new(transport));

        Self {
            sender,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }

    /// Spawn the lookup worker on the current Tokio runtime.
    ///
    /// Calling this more than once, or concurrently, is harmless:
    /// only the first call spawns the worker.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NoRuntime`] if called outside of a Tokio runtime
    /// before the worker was started.
    pub fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_none() {
            return Ok(());
        }

        let handle = Handle::try_current().map_err(|_| ErrorKind::NoRuntime)?;
        if let Some(worker) = worker.take() {
            debug!("Starting lookup worker (capacity: {})", self.capacity);
            handle.spawn(worker.run());
        }
        Ok(())
    }

    /// Whether the worker has been spawned
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Queue a lookup of `address` and return a handle to its result.
    ///
    /// The address is passed to the upstream as is; an empty address looks
    /// up the public IP of the caller. The worker is started if it isn't
    /// running yet.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::QueueFull`] if `capacity` lookups are already queued
    ///   or in flight. Nothing is queued in that case.
    /// - [`ErrorKind::NoRuntime`] if the worker has to be started outside of
    ///   a Tokio runtime.
    pub fn submit<S: Into<String>>(&self, address: S) -> Result<LookupHandle> {
        self.start()?;

        let permit = Arc::clone(&self.permits)
            .try_acquire_owned()
            .map_err(|_| ErrorKind::QueueFull {
                capacity: self.capacity,
            })?;

        let address = address.into();
        let (slot, receiver) = oneshot::channel();
        let request = LookupRequest {
            address: address.clone(),
            slot,
            permit,
        };

        self.sender.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ErrorKind::QueueFull {
                capacity: self.capacity,
            },
            mpsc::error::TrySendError::Closed(_) => ErrorKind::WorkerGone,
        })?;

        Ok(LookupHandle { address, receiver })
    }

    /// Look up `address` and wait for the result.
    ///
    /// Shorthand for [`Geolocator::submit`] followed by awaiting the handle.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Geolocator::submit`] and
    /// [`ErrorKind::WorkerGone`] if the worker was torn down before
    /// delivering a result.
    pub async fn lookup<S: Into<String>>(&self, address: S) -> Result<LookupResult> {
        self.submit(address)?.await
    }

    /// Number of lookups currently queued or in flight
    #[must_use]
    pub fn pending(&self) -> usize {
        self.capacity.saturating_sub(self.permits.available_permits())
    }

    /// Maximum number of lookups that may be queued or in flight
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Handle to the result of a submitted lookup.
///
/// Resolves exactly once. Dropping the handle before the worker got to the
/// lookup cancels it, and no upstream request is made for it.
#[derive(Debug)]
pub struct LookupHandle {
    address: String,
    receiver: oneshot::Receiver<LookupResult>,
}

impl LookupHandle {
    /// The address this handle is waiting for
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Future for LookupHandle {
    type Output = Result<LookupResult>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.map_err(|_| ErrorKind::WorkerGone))
    }
}
