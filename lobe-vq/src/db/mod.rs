//! Database queries for the verification queue service

pub mod progressions;
pub mod recordings;
pub mod sessions;
pub mod users;
pub mod verifications;
