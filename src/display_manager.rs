//! Owns the ordered watch list and renders it.
//!
//! The manager is the only mutator of the record list; because every
//! mutation happens inside its single-threaded loop, reconciliation for
//! one delivery is naturally a critical section.

use log::{debug, error, info};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;

use crate::protocol::{LookupMessage, Message, ResolvedBatch, StatusMessage};
use crate::reconciler::{self, DisplayRecord};

pub struct DisplayManager {
    records: Vec<DisplayRecord>,
    bus_consumer: Receiver<Message>,
}

impl DisplayManager {
    pub fn new(bus_consumer: Receiver<Message>) -> Self {
        Self {
            records: Vec::new(),
            bus_consumer,
        }
    }

    pub fn run(&mut self) {
        loop {
            match self.bus_consumer.blocking_recv() {
                Ok(message) => self.handle_message(message),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    }

    fn handle_message(&mut self, message: Message) {
        match message {
            Message::Lookup(LookupMessage::HashesDetected(tokens)) => {
                for token in &tokens {
                    self.records.insert(0, DisplayRecord::pending(token));
                }
                self.render();
            }
            Message::Lookup(LookupMessage::Resolved(batch)) => {
                self.apply_batch(batch);
            }
            Message::Status(StatusMessage::Info(text)) => info!("{}", text),
            Message::Status(StatusMessage::Error(text)) => error!("{}", text),
            _ => {}
        }
    }

    fn apply_batch(&mut self, batch: ResolvedBatch) {
        if let Some(source) = batch.source {
            debug!("{}: delivered {} result(s)", source, batch.results.len());
        }
        reconciler::reconcile(&mut self.records, &batch.results);
        self.render();
    }

    fn render(&self) {
        info!("watch list ({} entries)", self.records.len());
        for (index, record) in self.records.iter().enumerate() {
            let md5 = if record.md5.is_empty() {
                "-"
            } else {
                record.md5.as_str()
            };
            let sha256 = if record.sha256.is_empty() {
                "-"
            } else {
                record.sha256.as_str()
            };
            info!("{:>3}. {}  md5={} sha256={}", index + 1, record.title, md5, sha256);
        }
    }
}
