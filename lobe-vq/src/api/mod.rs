//! HTTP API

mod handlers;

pub use handlers::*;
