//! Consumer callbacks invoked by the playback worker

use std::sync::Arc;

use crate::Sample;

/// Sample callback type
///
/// Invoked once per dispatched sample, in delivery order, on the worker thread.
/// Uses `Arc` so the engine can clone it out of the state lock before calling.
pub type SampleCallback = Arc<dyn Fn(Sample) + Send + Sync>;

/// End-of-stream callback type
///
/// Invoked once when indexing is complete and the prefetch buffer drains,
/// and not again until the engine is reset.
pub type EndOfStreamCallback = Arc<dyn Fn() + Send + Sync>;
