//! Request and response models for the mail API.

mod message;
mod statistics;

pub use message::*;
pub use statistics::*;
