//! Wire types and functions for the BitTorrent HTTP tracker protocol
//! (BEP 3).
//!
//! The [`bencode`] module implements the encoding the responses are written
//! in. The [`v1`] module parses announce and scrape query strings into
//! request types and renders the canonical responses into bencoded bodies.
pub mod bencode;
pub mod v1;
