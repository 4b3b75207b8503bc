//! Single-owner worker serializing access to one store
//!
//! One thread exclusively owns the [`Store`] and drains a request
//! channel; every handle clone talks to that same thread, so the engine
//! never sees concurrent mutation and needs no locks. Appends are
//! fire-and-forget (rejections are logged, not returned); queries and
//! flushes block the caller until the worker replies.
//!
//! The worker exits after the last handle is dropped, flushing the
//! buffer on the way out.

use crate::store::{Store, StoreConfig};
use crate::{ArtifactInfo, Result, Row, TideError, Timestamp};
use crossbeam_channel::{bounded, unbounded, Sender};
use std::path::PathBuf;
use std::thread;
use tracing::{error, info, warn};

enum Request {
    Append {
        timestamp: Option<Timestamp>,
        payload: Vec<u8>,
    },
    Flush(Sender<Result<()>>),
    QueryRange {
        from: f64,
        to: f64,
        reply: Sender<Result<Vec<Row>>>,
    },
    QueryMultiple {
        keys: Vec<f64>,
        reply: Sender<Result<Vec<Option<Vec<u8>>>>>,
    },
    Count(Sender<Result<usize>>),
    CountFiles(Sender<Result<Vec<ArtifactInfo>>>),
    Oldest(Sender<Result<Option<Timestamp>>>),
    Newest(Sender<Option<Timestamp>>),
}

/// Cloneable handle to a store owned by a worker thread
#[derive(Clone)]
pub struct StoreHandle {
    requests: Sender<Request>,
}

impl StoreHandle {
    /// Open the store and spawn its worker thread
    pub fn spawn(dir: impl Into<PathBuf>, config: StoreConfig) -> Result<Self> {
        let mut store = Store::open(dir, config)?;
        let (requests, inbox) = unbounded::<Request>();

        thread::spawn(move || {
            for request in inbox {
                handle_request(&mut store, request);
            }
            if let Err(e) = store.flush() {
                error!("final flush failed: {}", e);
            }
            info!("store worker shut down");
        });

        Ok(Self { requests })
    }

    /// Submit a row; failures are logged by the worker, not returned
    pub fn append(&self, timestamp: Option<Timestamp>, payload: Vec<u8>) {
        let _ = self.requests.send(Request::Append { timestamp, payload });
    }

    /// Rewrite the `current` file, blocking until done
    pub fn flush(&self) -> Result<()> {
        let (reply, response) = bounded(1);
        self.send(Request::Flush(reply))?;
        response.recv().map_err(|_| TideError::Disconnected)?
    }

    /// Rows with `from <= timestamp <= to`, ascending
    pub fn query_range(&self, from: f64, to: f64) -> Result<Vec<Row>> {
        let (reply, response) = bounded(1);
        self.send(Request::QueryRange { from, to, reply })?;
        response.recv().map_err(|_| TideError::Disconnected)?
    }

    /// Resolve each key to its payload, preserving request order
    pub fn query_multiple(&self, keys: Vec<f64>) -> Result<Vec<Option<Vec<u8>>>> {
        let (reply, response) = bounded(1);
        self.send(Request::QueryMultiple { keys, reply })?;
        response.recv().map_err(|_| TideError::Disconnected)?
    }

    /// Total row count across all artifacts
    pub fn count(&self) -> Result<usize> {
        let (reply, response) = bounded(1);
        self.send(Request::Count(reply))?;
        response.recv().map_err(|_| TideError::Disconnected)?
    }

    /// Per-artifact metadata
    pub fn count_files(&self) -> Result<Vec<ArtifactInfo>> {
        let (reply, response) = bounded(1);
        self.send(Request::CountFiles(reply))?;
        response.recv().map_err(|_| TideError::Disconnected)?
    }

    /// First timestamp of the oldest artifact
    pub fn oldest(&self) -> Result<Option<Timestamp>> {
        let (reply, response) = bounded(1);
        self.send(Request::Oldest(reply))?;
        response.recv().map_err(|_| TideError::Disconnected)?
    }

    /// The store's current ingestion watermark
    pub fn newest(&self) -> Result<Option<Timestamp>> {
        let (reply, response) = bounded(1);
        self.send(Request::Newest(reply))?;
        response.recv().map_err(|_| TideError::Disconnected)
    }

    fn send(&self, request: Request) -> Result<()> {
        self.requests
            .send(request)
            .map_err(|_| TideError::Disconnected)
    }
}

fn handle_request(store: &mut Store, request: Request) {
    match request {
        Request::Append { timestamp, payload } => {
            if let Err(e) = store.append(timestamp, payload) {
                warn!("append dropped: {}", e);
            }
        }
        Request::Flush(reply) => {
            let _ = reply.send(store.flush());
        }
        Request::QueryRange { from, to, reply } => {
            let _ = reply.send(store.query_range(from, to));
        }
        Request::QueryMultiple { keys, reply } => {
            let _ = reply.send(store.query_multiple(&keys));
        }
        Request::Count(reply) => {
            let _ = reply.send(store.count());
        }
        Request::CountFiles(reply) => {
            let _ = reply.send(store.count_files());
        }
        Request::Oldest(reply) => {
            let _ = reply.send(store.oldest());
        }
        Request::Newest(reply) => {
            let _ = reply.send(store.newest());
        }
    }
}
