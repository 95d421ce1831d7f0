//! Per-source lookup worker.
//!
//! Each poller owns one song source on a dedicated worker thread, so a slow
//! or stalled database never blocks clipboard sampling or the other source,
//! and every query against a connection is serialized by construction.
//! Failures are reported to the status sink; the poller itself stays usable
//! and the next batch reattempts the connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;

use log::{debug, error};
use tokio::sync::broadcast;

use crate::config::Config;
use crate::hash_extractor::HashType;
use crate::protocol::{LookupMessage, Message, ResolvedBatch, StatusMessage};
use crate::song_source::{
    LookupRequest, ResolutionResult, SongSource, SourceError, SupportedHashes,
};

enum PollJob {
    Single(LookupRequest),
    Batch(Vec<LookupRequest>, SyncSender<Option<Vec<ResolutionResult>>>),
}

/// Handle to one source's worker thread, plus its chain-side flags.
pub struct SourcePoller {
    source_name: &'static str,
    supported: SupportedHashes,
    enabled: bool,
    reconnect_required: Arc<AtomicBool>,
    job_sender: Sender<PollJob>,
}

impl SourcePoller {
    /// Spawns the worker thread owning `source`. The worker re-reads the
    /// shared config snapshot whenever it has to (re)open the source, so
    /// path changes take effect on the next reconnect.
    pub fn new(
        source: Box<dyn SongSource>,
        config: Arc<Mutex<Config>>,
        bus_producer: broadcast::Sender<Message>,
    ) -> Self {
        let source_name = source.name();
        let supported = source.supported_hashes();
        let reconnect_required = Arc::new(AtomicBool::new(false));
        let (job_sender, job_receiver) = mpsc::channel();
        let worker = PollWorker {
            source,
            config,
            bus_producer,
            reconnect_required: Arc::clone(&reconnect_required),
        };
        thread::spawn(move || worker.run(job_receiver));
        Self {
            source_name,
            supported,
            enabled: true,
            reconnect_required,
            job_sender,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source_name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn supports(&self, hash_type: HashType) -> bool {
        self.supported.supports(hash_type)
    }

    /// Forces a close + reopen before the next query. The call itself does
    /// no I/O; the worker honors the flag when the next job runs.
    pub fn set_reconnect_required(&mut self, required: bool) {
        self.reconnect_required.store(required, Ordering::SeqCst);
    }

    /// Runs a single lookup off-thread. The outcome arrives on the bus as a
    /// one-result batch, or not at all after a reported failure.
    pub fn poll(&self, request: LookupRequest) {
        let _ = self.job_sender.send(PollJob::Single(request));
    }

    /// Runs a batch lookup off-thread and waits for the outcome.
    /// `None` means the source failed and the failure has been reported.
    pub fn poll_all(&self, requests: Vec<LookupRequest>) -> Option<Vec<ResolutionResult>> {
        let (reply_sender, reply_receiver) = mpsc::sync_channel(1);
        if self
            .job_sender
            .send(PollJob::Batch(requests, reply_sender))
            .is_err()
        {
            return None;
        }
        reply_receiver.recv().unwrap_or(None)
    }
}

struct PollWorker {
    source: Box<dyn SongSource>,
    config: Arc<Mutex<Config>>,
    bus_producer: broadcast::Sender<Message>,
    reconnect_required: Arc<AtomicBool>,
}

impl PollWorker {
    fn run(mut self, jobs: Receiver<PollJob>) {
        while let Ok(job) = jobs.recv() {
            match job {
                PollJob::Single(request) => self.run_single(request),
                PollJob::Batch(requests, reply) => {
                    let outcome = self.run_batch(&requests);
                    let _ = reply.send(outcome);
                }
            }
        }
        debug!("{}: poller worker shutting down", self.source.name());
    }

    fn ensure_open(&mut self) -> Result<(), SourceError> {
        if self.reconnect_required.swap(false, Ordering::SeqCst) && self.source.is_open() {
            self.source.close()?;
        }
        if !self.source.is_open() {
            let config = {
                let state = self.config.lock().expect("config state lock poisoned");
                state.clone()
            };
            self.source.open(&config)?;
        }
        Ok(())
    }

    fn run_single(&mut self, request: LookupRequest) {
        let outcome = self
            .ensure_open()
            .and_then(|_| self.source.find(&request));
        match outcome {
            Ok(result) => {
                let _ = self.bus_producer.send(Message::Lookup(LookupMessage::Resolved(
                    ResolvedBatch {
                        source: Some(self.source.name()),
                        results: vec![result],
                    },
                )));
            }
            Err(error) => self.report(&error),
        }
    }

    fn run_batch(&mut self, requests: &[LookupRequest]) -> Option<Vec<ResolutionResult>> {
        match self
            .ensure_open()
            .and_then(|_| self.source.find_all(requests))
        {
            Ok(results) => Some(results),
            Err(error) => {
                self.report(&error);
                None
            }
        }
    }

    fn report(&self, source_error: &SourceError) {
        let message = match source_error {
            SourceError::Configuration(name) => {
                format!("{}: root path is not configured", name)
            }
            _ => format!(
                "{}: cannot access the song database ({}); check that the file exists and is readable",
                self.source.name(),
                source_error
            ),
        };
        error!("{}", message);
        let _ = self
            .bus_producer
            .send(Message::Status(StatusMessage::Error(message)));
    }
}
