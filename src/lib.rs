//! Outgoing fax spooler
//!
//! Picks up queued outgoing faxes for this server, rasterizes their PDFs with
//! Ghostscript, writes Asterisk call files and moves them into the Asterisk
//! outgoing spool.

pub mod config;
pub mod db;
pub mod heartbeat;
pub mod models;
pub mod pipeline;
pub mod poller;
pub mod services;
pub mod store;
