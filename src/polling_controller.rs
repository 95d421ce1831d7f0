//! Ordered source chain with batch fallback aggregation.
//!
//! The controller owns every poller in configured order and drives
//! multi-source resolution: each enabled source receives the hashes the
//! previous sources could not resolve, found rows are delivered on the bus
//! as soon as a step completes, and whatever survives the whole chain is
//! delivered as a terminal "not found" batch. Every request therefore ends
//! in exactly one outcome, found or confirmed absent.

use log::debug;
use tokio::sync::broadcast;

use crate::protocol::{LookupMessage, Message, ResolvedBatch};
use crate::song_source::{LookupRequest, ResolutionResult};
use crate::source_poller::SourcePoller;

pub struct PollingController {
    pollers: Vec<SourcePoller>,
    fallback_enabled: bool,
    bus_producer: broadcast::Sender<Message>,
}

impl PollingController {
    pub fn new(bus_producer: broadcast::Sender<Message>, fallback_enabled: bool) -> Self {
        Self {
            pollers: Vec::new(),
            fallback_enabled,
            bus_producer,
        }
    }

    /// Appends a poller to the chain; order of addition is fallback
    /// precedence.
    pub fn add_poller(&mut self, poller: SourcePoller) {
        self.pollers.push(poller);
    }

    pub fn poller_mut(&mut self, source_name: &str) -> Option<&mut SourcePoller> {
        self.pollers
            .iter_mut()
            .find(|poller| poller.source_name() == source_name)
    }

    pub fn is_fallback_enabled(&self) -> bool {
        self.fallback_enabled
    }

    pub fn set_fallback_enabled(&mut self, fallback_enabled: bool) {
        self.fallback_enabled = fallback_enabled;
    }

    /// Dispatches one request to the first enabled poller that can serve
    /// its hash type. That poller's outcome is final; single-request
    /// dispatch never falls through to later sources.
    pub fn poll(&self, request: LookupRequest) -> bool {
        match self
            .pollers
            .iter()
            .find(|poller| poller.is_enabled() && poller.supports(request.hash_type))
        {
            Some(poller) => {
                poller.poll(request);
                true
            }
            None => {
                debug!(
                    "no enabled source can serve a {:?} lookup for {}",
                    request.hash_type, request.hash
                );
                false
            }
        }
    }

    /// Resolves a de-duplicated request batch across the chain.
    ///
    /// Steps run strictly one after another: the poller's batch is awaited
    /// before the next source is considered, so found-deliveries never
    /// interleave and arrive in chain order. A failed source contributes
    /// nothing and the chain moves on.
    pub fn poll_all(&self, requests: Vec<LookupRequest>) {
        let mut remaining = requests;
        let mut last_polled: Option<&'static str> = None;

        for poller in self.pollers.iter().filter(|poller| poller.is_enabled()) {
            if remaining.is_empty() {
                break;
            }
            let step_requests: Vec<LookupRequest> = remaining
                .iter()
                .filter(|request| poller.supports(request.hash_type))
                .cloned()
                .collect();
            if !step_requests.is_empty() {
                last_polled = Some(poller.source_name());
                if let Some(results) = poller.poll_all(step_requests) {
                    let found: Vec<ResolutionResult> = results
                        .into_iter()
                        .filter(|result| result.song.is_some())
                        .collect();
                    if !found.is_empty() {
                        remaining.retain(|request| {
                            !found.iter().any(|result| {
                                result.hash_type == request.hash_type
                                    && result.hash == request.hash
                            })
                        });
                        self.deliver(Some(poller.source_name()), found);
                    }
                }
            }
            if !self.fallback_enabled {
                break;
            }
        }

        if !remaining.is_empty() {
            let results = remaining.iter().map(ResolutionResult::absent).collect();
            self.deliver(last_polled, results);
        }
    }

    fn deliver(&self, source: Option<&'static str>, results: Vec<ResolutionResult>) {
        let _ = self
            .bus_producer
            .send(Message::Lookup(LookupMessage::Resolved(ResolvedBatch {
                source,
                results,
            })));
    }
}
