//! Data models for La Mesa

mod attendance;
mod user;

pub use attendance::*;
pub use user::*;
