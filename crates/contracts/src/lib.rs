//! # Contracts
//!
//! Shared data model and interface contracts of the capture player.
//! Format readers, decoders, the playback engine and the CLI depend only on
//! this crate to talk to each other.
//!
//! ## Time Model
//! - Capture timestamps are device microseconds (`u64`)
//! - Stream-local frame positions are `u32`

mod callbacks;
mod decoder;
mod device;
mod error;
mod format_reader;
mod playback_config;
mod sample;
mod stream;

pub use callbacks::{EndOfStreamCallback, SampleCallback};
pub use decoder::*;
pub use device::*;
pub use error::*;
pub use format_reader::*;
pub use playback_config::*;
pub use sample::*;
pub use stream::*;
