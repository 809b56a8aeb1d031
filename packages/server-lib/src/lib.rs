//! Common server functionality shared by the tracker frontends.
pub mod signals;
