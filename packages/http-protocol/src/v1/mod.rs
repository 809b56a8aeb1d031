//! Version 1 of the HTTP tracker protocol: announce and scrape over URL
//! query strings, bencoded response bodies.
pub mod query;
pub mod requests;
pub mod responses;
