//! Client code for reqcache.
//!
//! This crate provides the network side of a cache session: a blocking
//! reqwest transport implementing [`reqcache_core::Transport`].

pub mod transport;

pub use transport::{HttpTransport, TransportConfig, map_reqwest_error};
