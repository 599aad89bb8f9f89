//! HTTP surface of the statification lifecycle.

pub mod api;
pub mod metrics;
pub mod state;
