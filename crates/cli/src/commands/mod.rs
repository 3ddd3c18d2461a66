//! Command implementations.

mod info;
mod play;
mod synth;
mod validate;

pub use info::run_info;
pub use play::run_play;
pub use synth::run_synth;
pub use validate::run_validate;
