//! Bencoded response bodies.
pub mod announce;
pub mod error;
pub mod scrape;
