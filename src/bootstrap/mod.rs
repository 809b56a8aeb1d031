//! Application startup: configuration loading, logging and the background
//! job definitions.
pub mod app;
pub mod jobs;
pub mod logging;
