//! Drives the resolution pipeline from clipboard changes.
//!
//! The manager owns the polling controller and serializes chain polls: a
//! clipboard event is fully resolved (all of its deliveries published)
//! before the next event is looked at, so reconciliation passes for
//! different events never interleave.

use std::sync::{Arc, Mutex};

use log::{debug, warn};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::{Receiver, Sender};

use crate::config::{Config, SourceConfig};
use crate::hash_extractor::extract_hashes;
use crate::polling_controller::PollingController;
use crate::protocol::{ClipboardMessage, ConfigMessage, LookupMessage, Message};
use crate::song_source::LookupRequest;
use crate::source_poller::SourcePoller;
use crate::{beatoraja_source, lr2_source};

pub struct LookupManager {
    controller: PollingController,
    config_state: Arc<Mutex<Config>>,
    last_config: Config,
    bus_consumer: Receiver<Message>,
    bus_producer: Sender<Message>,
}

impl LookupManager {
    pub fn new(
        controller: PollingController,
        config_state: Arc<Mutex<Config>>,
        bus_consumer: Receiver<Message>,
        bus_producer: Sender<Message>,
    ) -> Self {
        let last_config = {
            let state = config_state.lock().expect("config state lock poisoned");
            state.clone()
        };
        Self {
            controller,
            config_state,
            last_config,
            bus_consumer,
            bus_producer,
        }
    }

    pub fn run(&mut self) {
        loop {
            match self.bus_consumer.blocking_recv() {
                Ok(Message::Clipboard(ClipboardMessage::Changed(text))) => {
                    self.handle_clipboard_text(&text);
                }
                Ok(Message::Config(ConfigMessage::Changed(config))) => {
                    self.apply_config(config);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("lookup manager lagged, skipped {} bus message(s)", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    fn handle_clipboard_text(&mut self, text: &str) {
        let tokens = extract_hashes(text);
        if tokens.is_empty() {
            return;
        }
        debug!("clipboard: {} hash token(s) detected", tokens.len());
        let _ = self
            .bus_producer
            .send(Message::Lookup(LookupMessage::HashesDetected(
                tokens.clone(),
            )));
        let requests: Vec<LookupRequest> = tokens
            .into_iter()
            .map(|token| LookupRequest {
                hash_type: token.hash_type,
                hash: token.value,
            })
            .collect();
        self.controller.poll_all(requests);
    }

    fn apply_config(&mut self, next: Config) {
        {
            let mut state = self.config_state.lock().expect("config state lock poisoned");
            *state = next.clone();
        }
        let previous = std::mem::replace(&mut self.last_config, next.clone());

        self.controller
            .set_fallback_enabled(next.chain.fallback_enabled);
        Self::apply_source_config(
            self.controller.poller_mut(beatoraja_source::SOURCE_NAME),
            &previous.beatoraja,
            &next.beatoraja,
        );
        Self::apply_source_config(
            self.controller.poller_mut(lr2_source::SOURCE_NAME),
            &previous.lr2,
            &next.lr2,
        );
    }

    fn apply_source_config(
        poller: Option<&mut SourcePoller>,
        previous: &SourceConfig,
        next: &SourceConfig,
    ) {
        let Some(poller) = poller else {
            return;
        };
        poller.set_enabled(next.enabled && !next.root_path.is_empty());
        if previous.root_path != next.root_path {
            // The reopen happens lazily on the poller's next query.
            poller.set_reconnect_required(true);
        }
    }
}
