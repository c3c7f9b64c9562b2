// Fetch Relay - Core
//
// This crate provides the gateway and the download orchestrator of the
// fetch-relay pipeline: scrape a listing page for hosted download links,
// hand a selection to the relay step over the message bus, then drain the
// remote store onto local disk.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
