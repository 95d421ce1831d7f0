//! Event-bus protocol shared by all runtime components.
//!
//! This module defines the message payloads exchanged between the clipboard
//! watcher, the lookup pipeline, and the watch-list owner.

use crate::config::Config;
use crate::hash_extractor::HashToken;
use crate::song_source::ResolutionResult;

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone)]
pub enum Message {
    Clipboard(ClipboardMessage),
    Lookup(LookupMessage),
    Config(ConfigMessage),
    Status(StatusMessage),
}

/// Clipboard-domain notifications.
#[derive(Debug, Clone)]
pub enum ClipboardMessage {
    /// The clipboard holds new text that differs from the last sample.
    Changed(String),
}

/// Lookup-domain commands and notifications.
#[derive(Debug, Clone)]
pub enum LookupMessage {
    /// Hash tokens were detected in new clipboard text, in scan order.
    /// The watch-list owner creates a pending row per token.
    HashesDetected(Vec<HashToken>),
    /// One delivery step of a chain poll.
    Resolved(ResolvedBatch),
}

/// A batch of resolution outcomes delivered by one chain step.
///
/// Results from one source keep the caller's request order. A terminal
/// batch carries `song: None` results for every hash no source knew.
#[derive(Debug, Clone)]
pub struct ResolvedBatch {
    /// Source the batch is attributed to. `None` when the chain had no
    /// enabled source to attribute a terminal batch to.
    pub source: Option<&'static str>,
    pub results: Vec<ResolutionResult>,
}

/// Runtime configuration updates.
#[derive(Debug, Clone)]
pub enum ConfigMessage {
    Changed(Config),
}

/// Human-readable reports for the status sink.
#[derive(Debug, Clone)]
pub enum StatusMessage {
    Info(String),
    Error(String),
}
