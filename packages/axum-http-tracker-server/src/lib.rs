//! The HTTP tracker frontend, built on [`axum`].
//!
//! Decodes announce and scrape query strings into the canonical request
//! model, invokes the hook chain and writes the bencoded response. Failures
//! are served as `failure reason` dictionaries with HTTP status 200, per
//! BitTorrent convention.
pub mod server;
pub mod v1;

pub use server::{HttpServer, RunningHttpServer};
