//! # Pipeline Module
//!
//! Orchestrates a full similarity run.
//!
//! ## Pipeline Stages
//! 1. **Scan** - Discover images under the given roots (skipped when an
//!    explicit image list is supplied)
//! 2. **Compare** - Worker threads pull pairs from the scheduler, score
//!    them and append qualifying pairs to the four result lists
//! 3. **Sort** - Each list is ordered by distance, ties by path
//!
//! ## Parallelism
//! A fixed pool of scoped threads, one per hardware thread by default.
//! Images decode lazily inside the scheduler, outside any lock. The driving
//! thread polls progress and the cancellation token between sleeps.

mod cancellation;
mod executor;
mod results;

pub use cancellation::CancellationToken;
pub use executor::{Pipeline, PipelineBuilder, PipelineConfig, PipelineResult};
pub use results::{FolderFilter, MaxAge, PairFilter, ResultSet};
