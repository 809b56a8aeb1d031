//! The chihaya tracker application.
//!
//! This crate wires the library packages together: it loads the
//! configuration, builds the peer store and the hook chain, starts the
//! configured frontends and background jobs, and coordinates graceful
//! shutdown.
pub mod app;
pub mod bootstrap;
pub mod console;
pub mod container;
