//! Clipboard watcher that resolves BMS chart hashes against local song
//! databases.
//!
//! The pipeline: a timer samples the system clipboard, hash-shaped tokens
//! are extracted from new text, an ordered chain of read-only song sources
//! (beatoraja first, LR2 second) resolves them with fallback, and the
//! outcomes are reconciled into a deduplicated watch list.

pub mod beatoraja_source;
pub mod clipboard_watcher;
pub mod config;
pub mod display_manager;
pub mod hash_extractor;
pub mod lookup_manager;
pub mod lr2_source;
pub mod polling_controller;
pub mod protocol;
pub mod reconciler;
pub mod song_source;
pub mod source_poller;
