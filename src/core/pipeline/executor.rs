//! Pipeline execution implementation.

use super::{CancellationToken, ResultSet};
use crate::core::codec::{Codec, ImageCodec};
use crate::core::pair::ImagePair;
use crate::core::scanner::{ImageScanner, ScanConfig, WalkDirScanner};
use crate::core::scheduler::PairScheduler;
use crate::core::scorer::SimilarityScorer;
use crate::error::{CompareError, ImagePairError};
use crate::events::{
    null_sender, CompareEvent, CompareProgress, Event, EventSender, PipelineEvent, PipelinePhase,
    PipelineSummary,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

/// Result of pipeline execution
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    /// The four sorted candidate lists
    pub results: ResultSet,
    /// Images handed to the comparison
    pub total_images: usize,
    /// Images that could not be opened or decoded
    pub failed_images: Vec<PathBuf>,
    /// Distinct pairs considered, self-pairs excluded
    pub comparisons: usize,
    /// Non-fatal errors from the scanning phase
    pub scan_errors: Vec<String>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Roots to scan, used when no explicit image list is given
    pub paths: Vec<PathBuf>,
    /// Explicit image list; skips the scanning phase
    pub images: Option<Vec<PathBuf>>,
    /// Comparison threads, 0 for one per hardware thread
    pub workers: usize,
    /// How often the driving thread reports progress and checks for cancellation
    pub poll_interval: Duration,
    /// Scanner configuration
    pub scan_config: ScanConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            images: None,
            workers: 0,
            poll_interval: Duration::from_millis(100),
            scan_config: ScanConfig::default(),
        }
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    codec: Option<Arc<dyn Codec>>,
    cancellation: CancellationToken,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            codec: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Directories (or single files) to scan
    pub fn paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.config.paths = paths;
        self
    }

    /// Compare exactly these images instead of scanning.
    /// The list should already be absolute and free of duplicates.
    pub fn images(mut self, images: Vec<PathBuf>) -> Self {
        self.config.images = Some(images);
        self
    }

    /// Set the image codec
    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Number of comparison threads, 0 for the default
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Token the caller can use to stop the run
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Set scanner configuration
    pub fn scan_config(mut self, config: ScanConfig) -> Self {
        self.config.scan_config = config;
        self
    }

    /// Include hidden files
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.scan_config.include_hidden = include;
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        Pipeline {
            config: self.config,
            codec: self.codec.unwrap_or_else(|| Arc::new(ImageCodec::new())),
            cancellation: self.cancellation,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared by the comparison workers
#[derive(Default)]
struct Shared {
    results: Mutex<ResultSet>,
    failure: Mutex<Option<CompareError>>,
    abort: AtomicBool,
    comparisons: AtomicUsize,
    pairs_found: AtomicUsize,
}

impl Shared {
    fn fail(&self, error: CompareError) {
        let mut failure = lock(&self.failure);
        if failure.is_none() {
            *failure = Some(error);
        }
        self.abort.store(true, Ordering::SeqCst);
    }
}

/// Results stay usable after a worker panic; the panic itself is reported
/// through the join handle.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The similar image pipeline
pub struct Pipeline {
    config: PipelineConfig,
    codec: Arc<dyn Codec>,
    cancellation: CancellationToken,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Token observed by this pipeline
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Run the pipeline without events
    pub fn run(&self) -> Result<PipelineResult, ImagePairError> {
        self.run_with_events(&null_sender())
    }

    /// Run the pipeline with event reporting
    pub fn run_with_events(&self, events: &EventSender) -> Result<PipelineResult, ImagePairError> {
        let start_time = Instant::now();
        events.send(Event::Pipeline(PipelineEvent::Started));

        let outcome = self.execute(events, start_time);
        match &outcome {
            Err(ImagePairError::Compare(CompareError::Cancelled)) => {
                tracing::warn!("Comparison cancelled");
                events.send(Event::Pipeline(PipelineEvent::Cancelled));
            }
            Err(e) => {
                tracing::error!("{}", e);
                events.send(Event::Pipeline(PipelineEvent::Error {
                    message: e.to_string(),
                }));
            }
            Ok(_) => {}
        }
        outcome
    }

    fn execute(
        &self,
        events: &EventSender,
        start_time: Instant,
    ) -> Result<PipelineResult, ImagePairError> {
        let (images, scan_errors) = match &self.config.images {
            Some(images) => (images.clone(), Vec::new()),
            None => {
                events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
                    phase: PipelinePhase::Scanning,
                }));
                let scanner = WalkDirScanner::new(self.config.scan_config.clone());
                let scan = scanner.scan_with_events(&self.config.paths, events)?;
                let errors = scan.errors.iter().map(|e| e.to_string()).collect();
                (scan.images, errors)
            }
        };

        if self.cancellation.is_cancelled() {
            return Err(CompareError::Cancelled.into());
        }

        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Comparing,
        }));

        let total_images = images.len();
        let total_comparisons = total_images * total_images.saturating_sub(1) / 2;
        events.send(Event::Compare(CompareEvent::Started {
            total_images,
            total_comparisons,
        }));

        let workers = self.worker_count();
        tracing::info!(
            "Comparing {} images ({} pairs) on {} workers",
            total_images,
            total_comparisons,
            workers
        );

        let scheduler = PairScheduler::new(images, self.codec.clone());
        let shared = Shared::default();
        self.compare(&scheduler, &shared, workers, total_comparisons, events)?;

        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Sorting,
        }));

        let mut results = shared
            .results
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        results.sort();

        let failed_images: Vec<PathBuf> = scheduler
            .decoded()
            .into_iter()
            .filter(|record| !record.is_ok())
            .map(|record| {
                events.send(Event::Compare(CompareEvent::ImageSkipped {
                    path: record.path().to_path_buf(),
                    status: record.status().to_string(),
                }));
                record.path().to_path_buf()
            })
            .collect();

        let comparisons = shared.comparisons.load(Ordering::SeqCst);
        events.send(Event::Compare(CompareEvent::Completed {
            comparisons,
            pairs_found: results.len(),
        }));

        let duration_ms = start_time.elapsed().as_millis() as u64;
        tracing::info!(
            "Found {} visual, {} temporal, {} geospatial, {} combined pairs in {} ms",
            results.visual.len(),
            results.temporal.len(),
            results.geospatial.len(),
            results.combined.len(),
            duration_ms
        );

        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: PipelineSummary {
                total_images,
                failed_images: failed_images.len(),
                visual_pairs: results.visual.len(),
                temporal_pairs: results.temporal.len(),
                geospatial_pairs: results.geospatial.len(),
                combined_pairs: results.combined.len(),
                duration_ms,
            },
        }));

        Ok(PipelineResult {
            results,
            total_images,
            failed_images,
            comparisons,
            scan_errors,
            duration_ms,
        })
    }

    /// Drive the worker pool until the pair space is exhausted, a worker
    /// fails, or the run is cancelled
    fn compare(
        &self,
        scheduler: &PairScheduler,
        shared: &Shared,
        workers: usize,
        total_comparisons: usize,
        events: &EventSender,
    ) -> Result<(), CompareError> {
        let scorer = SimilarityScorer::new();

        thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| s.spawn(|| self.work(scheduler, &scorer, shared)))
                .collect();

            loop {
                let finished = handles.iter().all(|h| h.is_finished());

                if self.cancellation.is_cancelled() {
                    shared.abort.store(true, Ordering::SeqCst);
                }

                events.send(Event::Compare(CompareEvent::Progress(CompareProgress {
                    fraction: scheduler.progress(),
                    comparisons_completed: shared.comparisons.load(Ordering::Relaxed),
                    total_comparisons,
                    pairs_found: shared.pairs_found.load(Ordering::Relaxed),
                })));

                if finished {
                    break;
                }
                thread::sleep(self.config.poll_interval);
            }

            let mut panicked = false;
            for handle in handles {
                panicked |= handle.join().is_err();
            }
            if panicked {
                return Err(CompareError::WorkerPanicked);
            }
            Ok(())
        })?;

        if let Some(error) = lock(&shared.failure).take() {
            return Err(error);
        }
        if self.cancellation.is_cancelled() {
            return Err(CompareError::Cancelled);
        }
        Ok(())
    }

    fn work(&self, scheduler: &PairScheduler, scorer: &SimilarityScorer, shared: &Shared) {
        loop {
            if shared.abort.load(Ordering::SeqCst) || self.cancellation.is_cancelled() {
                break;
            }

            let (a, b) = match scheduler.next_pair() {
                Ok(Some(pair)) => pair,
                Ok(None) => break,
                Err(e) => {
                    shared.fail(e);
                    break;
                }
            };

            if Arc::ptr_eq(&a, &b) {
                continue;
            }
            shared.comparisons.fetch_add(1, Ordering::Relaxed);
            if !SimilarityScorer::should_score(&a, &b) {
                continue;
            }

            let pair = ImagePair::new(a, b);
            let hits = scorer.score(&pair).categories();
            if hits.is_empty() {
                continue;
            }

            shared.pairs_found.fetch_add(hits.len(), Ordering::Relaxed);
            let mut results = lock(&shared.results);
            for (category, distance) in hits {
                results.push(category, pair.with_distance(distance));
            }
        }
    }

    fn worker_count(&self) -> usize {
        match self.config.workers {
            0 => thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codec::DecodedImage;
    use crate::core::metadata::NoMetadata;
    use crate::error::DecodeError;
    use crate::events::EventChannel;
    use std::path::Path;
    use tempfile::TempDir;

    /// Every file decodes to the same 8x8 gradient
    struct GradientCodec;

    impl Codec for GradientCodec {
        fn decode(&self, _path: &Path, _bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
            let mut pixels = Vec::with_capacity(8 * 8 * 4);
            for y in 0..8u8 {
                for x in 0..8u8 {
                    pixels.extend_from_slice(&[x * 30, y * 30, 100, 255]);
                }
            }
            DecodedImage::new(8, 8, pixels, Box::new(NoMetadata))
        }
    }

    /// Codec whose decoder thread is gone
    struct DeadCodec;

    impl Codec for DeadCodec {
        fn decode(&self, _path: &Path, _bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
            Err(DecodeError::Unavailable {
                reason: "decoder offline".to_string(),
            })
        }
    }

    /// Panics on any decode
    struct PanickingCodec;

    impl Codec for PanickingCodec {
        fn decode(&self, _path: &Path, _bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
            panic!("decoder bug");
        }
    }

    fn files(dir: &TempDir, n: usize) -> Vec<PathBuf> {
        (0..n)
            .map(|i| {
                let path = dir.path().join(format!("img_{i}.raw"));
                std::fs::write(&path, [i as u8 + 1; 8]).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn pipeline_builder_creates_pipeline() {
        let pipeline = Pipeline::builder()
            .paths(vec![PathBuf::from("/photos")])
            .workers(3)
            .poll_interval(Duration::from_millis(5))
            .build();

        assert_eq!(pipeline.config.workers, 3);
        assert_eq!(pipeline.worker_count(), 3);
        assert_eq!(pipeline.config.poll_interval, Duration::from_millis(5));
    }

    #[test]
    fn default_worker_count_is_positive() {
        let pipeline = Pipeline::builder().build();
        assert!(pipeline.worker_count() >= 1);
    }

    #[test]
    fn pipeline_handles_empty_directory() {
        let temp_dir = TempDir::new().unwrap();

        let result = Pipeline::builder()
            .paths(vec![temp_dir.path().to_path_buf()])
            .poll_interval(Duration::from_millis(1))
            .build()
            .run()
            .unwrap();

        assert_eq!(result.total_images, 0);
        assert_eq!(result.comparisons, 0);
        assert!(result.results.is_empty());
    }

    #[test]
    fn identical_images_pair_visually() {
        let temp_dir = TempDir::new().unwrap();
        let images = files(&temp_dir, 3);

        let result = Pipeline::builder()
            .images(images)
            .codec(Arc::new(GradientCodec))
            .workers(2)
            .poll_interval(Duration::from_millis(1))
            .build()
            .run()
            .unwrap();

        assert_eq!(result.total_images, 3);
        assert_eq!(result.comparisons, 3);
        assert_eq!(result.results.visual.len(), 3);
        assert!(result.results.visual.iter().all(|p| p.distance == 0.0));
        assert!(result.results.temporal.is_empty());
        assert!(result.results.geospatial.is_empty());
    }

    #[test]
    fn unreadable_images_are_reported_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let mut images = files(&temp_dir, 2);
        images.push(temp_dir.path().join("missing.raw"));

        let result = Pipeline::builder()
            .images(images)
            .codec(Arc::new(GradientCodec))
            .poll_interval(Duration::from_millis(1))
            .build()
            .run()
            .unwrap();

        assert_eq!(result.failed_images, vec![temp_dir.path().join("missing.raw")]);
        assert_eq!(result.comparisons, 3);
        assert_eq!(result.results.visual.len(), 1);
    }

    #[test]
    fn codec_failure_aborts_the_run() {
        let temp_dir = TempDir::new().unwrap();
        let (sender, receiver) = EventChannel::new();

        let err = Pipeline::builder()
            .images(files(&temp_dir, 4))
            .codec(Arc::new(DeadCodec))
            .workers(4)
            .poll_interval(Duration::from_millis(1))
            .build()
            .run_with_events(&sender)
            .unwrap_err();

        assert!(matches!(
            err,
            ImagePairError::Compare(CompareError::CodecUnavailable { .. })
        ));
        drop(sender);
        assert!(receiver
            .iter()
            .any(|e| matches!(e, Event::Pipeline(PipelineEvent::Error { .. }))));
    }

    #[test]
    fn decoder_panic_fails_the_run_without_hanging() {
        let temp_dir = TempDir::new().unwrap();

        let err = Pipeline::builder()
            .images(files(&temp_dir, 3))
            .codec(Arc::new(PanickingCodec))
            .workers(4)
            .poll_interval(Duration::from_millis(1))
            .build()
            .run()
            .unwrap_err();

        assert!(matches!(
            err,
            ImagePairError::Compare(CompareError::WorkerPanicked)
        ));
    }

    #[test]
    fn cancelled_before_start_reports_cancellation() {
        let temp_dir = TempDir::new().unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let (sender, receiver) = EventChannel::new();

        let err = Pipeline::builder()
            .images(files(&temp_dir, 3))
            .codec(Arc::new(GradientCodec))
            .cancellation(token)
            .build()
            .run_with_events(&sender)
            .unwrap_err();

        assert!(matches!(err, ImagePairError::Compare(CompareError::Cancelled)));
        drop(sender);
        assert!(receiver
            .iter()
            .any(|e| matches!(e, Event::Pipeline(PipelineEvent::Cancelled))));
    }

    #[test]
    fn completed_run_emits_summary() {
        let temp_dir = TempDir::new().unwrap();
        let (sender, receiver) = EventChannel::new();

        Pipeline::builder()
            .images(files(&temp_dir, 2))
            .codec(Arc::new(GradientCodec))
            .poll_interval(Duration::from_millis(1))
            .build()
            .run_with_events(&sender)
            .unwrap();
        drop(sender);

        let summary = receiver.iter().find_map(|e| match e {
            Event::Pipeline(PipelineEvent::Completed { summary }) => Some(summary),
            _ => None,
        });
        let summary = summary.expect("completion event");
        assert_eq!(summary.total_images, 2);
        assert_eq!(summary.visual_pairs, 1);
    }
}
