//! # Scorer Module
//!
//! Turns two decoded images into the distances that decide which lists the
//! pair joins.
//!
//! ## Categories
//! - **Visual**: transform-invariant intensity grid distance
//! - **Temporal**: closest capture times
//! - **Geospatial**: great-circle distance between capture positions
//! - **Combined**: visual distance blended with a metadata score

pub mod thresholds;
mod visual;

pub use visual::{grid_distance, visual_distance, VisualMatch};

use crate::core::image::ImageRecord;
use crate::core::pair::ImagePair;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use thresholds::*;

/// The four result lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Visual,
    Temporal,
    Geospatial,
    Combined,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Visual,
        Category::Temporal,
        Category::Geospatial,
        Category::Combined,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Visual => write!(f, "visual"),
            Category::Temporal => write!(f, "temporal"),
            Category::Geospatial => write!(f, "geospatial"),
            Category::Combined => write!(f, "combined"),
        }
    }
}

/// Everything computed for one pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub visual: VisualMatch,
    /// Smallest gap between capture times; `None` if either image has none
    pub temporal: Option<Duration>,
    /// Meters between capture positions; `None` if either is unknown
    pub geospatial: Option<f64>,
    /// Larger aspect ratio over the smaller, after undoing any rotation
    pub aspect_ratio: f64,
    /// Raw sum of the metadata terms
    pub metadata_sum: f64,
    /// Blend of visual distance and normalized metadata sum, in [0, 1]
    pub combined: f64,
}

impl Score {
    /// Temporal distance in seconds
    pub fn temporal_secs(&self) -> Option<f64> {
        self.temporal
            .map(|d| d.num_milliseconds() as f64 / 1000.0)
    }

    /// Distance to stamp on a pair placed in `category`
    pub fn distance(&self, category: Category) -> Option<f64> {
        match category {
            Category::Visual => Some(self.visual.distance),
            Category::Temporal => self.temporal_secs(),
            Category::Geospatial => self.geospatial,
            Category::Combined => Some(self.combined),
        }
    }

    /// Whether the pair qualifies for `category`
    pub fn qualifies(&self, category: Category) -> bool {
        match category {
            Category::Visual => self.visual.distance < VISUAL_THRESHOLD,
            Category::Temporal => self
                .temporal_secs()
                .is_some_and(|secs| secs < TEMPORAL_THRESHOLD_SECS),
            Category::Geospatial => self
                .geospatial
                .is_some_and(|meters| meters < GEOSPATIAL_THRESHOLD_M),
            Category::Combined => {
                let mismatched = self.aspect_ratio > ASPECT_RATIO_LIMIT && !self.visual.cropped;
                self.combined < COMBINED_THRESHOLD && !mismatched
            }
        }
    }

    /// Every category the pair qualifies for, with its distance
    pub fn categories(&self) -> Vec<(Category, f64)> {
        Category::ALL
            .into_iter()
            .filter(|c| self.qualifies(*c))
            .filter_map(|c| self.distance(c).map(|d| (c, d)))
            .collect()
    }
}

/// Scores image pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimilarityScorer;

impl SimilarityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Whether a pair should be scored at all: never an image against
    /// itself, never an image that failed to decode.
    pub fn should_score(a: &ImageRecord, b: &ImageRecord) -> bool {
        !std::ptr::eq(a, b) && a.is_ok() && b.is_ok()
    }

    /// Score a pair of decoded images
    pub fn score(&self, pair: &ImagePair) -> Score {
        let (a, b) = (pair.first(), pair.second());
        let visual = visual_distance(a, b);
        let temporal = pair.time_distance();
        let geospatial = pair.location_distance();
        let aspect_ratio = aspect_ratio_mismatch(a, b, visual.aspect_ratio_flipped);

        let (ma, mb) = (a.metadata(), b.metadata());
        let metadata_sum = time_term(ma.times.is_empty(), mb.times.is_empty(), temporal)
            + location_term(ma.position.is_some(), mb.position.is_some(), geospatial)
            + text_term(&ma.make_model, &mb.make_model, MAKE_MODEL_WEIGHTS)
            + text_term(&ma.camera_id, &mb.camera_id, CAMERA_ID_WEIGHTS)
            + text_term(&ma.image_id, &mb.image_id, IMAGE_ID_WEIGHTS)
            + aspect_term(aspect_ratio, visual.cropped);

        let (lo, hi) = (raw_minimum(), raw_maximum());
        let normalized = ((metadata_sum - lo) / (hi - lo)).clamp(0.0, 1.0);
        let combined = VISUAL_WEIGHT * visual.distance.min(1.0) + METADATA_WEIGHT * normalized;

        Score {
            visual,
            temporal,
            geospatial,
            aspect_ratio,
            metadata_sum,
            combined,
        }
    }
}

fn aspect_ratio_mismatch(a: &ImageRecord, b: &ImageRecord, flipped: bool) -> f64 {
    let (ar1, ar2) = (a.aspect_ratio(), b.aspect_ratio());
    if ar1 <= 0.0 || ar2 <= 0.0 {
        return 1.0;
    }
    // comparing against the rotated second image, ar1 / (1 / ar2)
    if flipped {
        let p = ar1 * ar2;
        return p.max(1.0 / p);
    }
    (ar1 / ar2).max(ar2 / ar1)
}

fn time_term(a_empty: bool, b_empty: bool, gap: Option<Duration>) -> f64 {
    if a_empty && b_empty {
        return 0.0;
    }
    let Some(gap) = gap else {
        return 1.0;
    };

    let secs = gap.num_milliseconds() as f64 / 1000.0;
    if secs < TIME_CLOSE_SECS {
        TIME_TERM.min * (1.0 - secs / TIME_CLOSE_SECS)
    } else if secs > TIME_FAR_SECS {
        TIME_TERM.max
    } else {
        0.0
    }
}

fn location_term(a_known: bool, b_known: bool, meters: Option<f64>) -> f64 {
    match meters {
        Some(d) if d < LOCATION_CLOSE_M => LOCATION_TERM.min * (1.0 - d / LOCATION_CLOSE_M).powi(2),
        Some(d) if d > LOCATION_FAR_M => LOCATION_TERM.max,
        Some(_) => 0.0,
        None if a_known != b_known => 1.0,
        None => 0.0,
    }
}

fn text_term(a: &str, b: &str, weights: TextWeights) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => 0.0,
        (true, false) | (false, true) => weights.one_missing,
        (false, false) if a == b => weights.equal,
        (false, false) => weights.different,
    }
}

fn aspect_term(ratio: f64, cropped: bool) -> f64 {
    if cropped {
        return 0.0;
    }
    ((ratio - 1.0) / ASPECT_PENALTY_SPAN).clamp(ASPECT_RATIO_TERM.min, ASPECT_RATIO_TERM.max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::codec::DecodedImage;
    use crate::core::metadata::{MetadataTag, TagMap};
    use std::sync::Arc;

    fn decoded(width: u32, height: u32, tags: TagMap, f: impl Fn(u32, u32) -> [u8; 3]) -> DecodedImage {
        let mut pixels = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let [r, g, b] = f(x, y);
                pixels.extend_from_slice(&[r, g, b, 255]);
            }
        }
        DecodedImage::new(width, height, pixels, Box::new(tags)).unwrap()
    }

    fn gradient(x: u32, y: u32) -> [u8; 3] {
        [(x * 4) as u8, (y * 2) as u8, ((x + y) % 200) as u8]
    }

    fn record(path: &str, width: u32, height: u32, tags: TagMap) -> Arc<ImageRecord> {
        Arc::new(ImageRecord::from_decoded(path, &decoded(width, height, tags, gradient)))
    }

    fn pair(a: &Arc<ImageRecord>, b: &Arc<ImageRecord>) -> ImagePair {
        ImagePair::new(a.clone(), b.clone())
    }

    #[test]
    fn text_terms() {
        assert_eq!(text_term("", "", IMAGE_ID_WEIGHTS), 0.0);
        assert_eq!(text_term("a", "", IMAGE_ID_WEIGHTS), 2.0);
        assert_eq!(text_term("", "b", CAMERA_ID_WEIGHTS), 1.0);
        assert_eq!(text_term("a", "a", IMAGE_ID_WEIGHTS), -10.0);
        assert_eq!(text_term("a", "b", MAKE_MODEL_WEIGHTS), 5.0);
    }

    #[test]
    fn time_terms() {
        assert_eq!(time_term(true, true, None), 0.0);
        assert_eq!(time_term(false, true, None), 1.0);
        assert_eq!(time_term(false, false, Some(Duration::zero())), -5.0);
        assert!((time_term(false, false, Some(Duration::hours(24))) - -2.5).abs() < 1e-12);
        assert_eq!(time_term(false, false, Some(Duration::days(5))), 0.0);
        assert_eq!(time_term(false, false, Some(Duration::days(21))), 5.0);
    }

    #[test]
    fn location_terms() {
        assert_eq!(location_term(false, false, None), 0.0);
        assert_eq!(location_term(true, false, None), 1.0);
        assert_eq!(location_term(true, true, Some(0.0)), -5.0);
        assert!((location_term(true, true, Some(5_000.0)) - -1.25).abs() < 1e-12);
        assert_eq!(location_term(true, true, Some(50_000.0)), 0.0);
        assert_eq!(location_term(true, true, Some(150_000.0)), 5.0);
    }

    #[test]
    fn aspect_terms() {
        assert_eq!(aspect_term(1.0, false), 0.0);
        assert!((aspect_term(1.375, false) - 0.5).abs() < 1e-12);
        assert_eq!(aspect_term(3.0, false), 1.0);
        assert_eq!(aspect_term(3.0, true), 0.0);
    }

    #[test]
    fn identical_images_score_zero_visual() {
        let a = record("/p/a.png", 32, 24, TagMap::new());
        let b = record("/p/b.png", 32, 24, TagMap::new());

        let score = SimilarityScorer::new().score(&pair(&a, &b));

        assert_eq!(score.visual.distance, 0.0);
        assert!(!score.visual.cropped);
        assert!(score.qualifies(Category::Visual));
        assert!(score.qualifies(Category::Combined));
        assert!(!score.qualifies(Category::Temporal));
        assert!(!score.qualifies(Category::Geospatial));
        assert_eq!(score.temporal, None);
        assert_eq!(score.geospatial, None);
    }

    #[test]
    fn score_is_symmetric() {
        let a = record("/p/a.png", 32, 24, TagMap::new().text(MetadataTag::Make, "Canon"));
        let b = Arc::new(ImageRecord::from_decoded(
            "/p/b.png",
            &decoded(20, 30, TagMap::new(), |x, y| [(y * 8) as u8, (x * 3) as u8, 9]),
        ));
        let scorer = SimilarityScorer::new();

        let ab = scorer.score(&ImagePair::new(a.clone(), b.clone()));
        let ba = scorer.score(&ImagePair::new(b, a));

        assert_eq!(ab, ba);
    }

    #[test]
    fn combined_stays_in_unit_range() {
        let best = TagMap::new()
            .text(MetadataTag::DateTimeOriginal, "2020:01:01 00:00:00")
            .text(MetadataTag::Make, "Canon")
            .text(MetadataTag::BodySerialNumber, "1")
            .text(MetadataTag::ImageUniqueId, "x")
            .rationals(MetadataTag::GpsLatitude, vec![(10, 1), (0, 1), (0, 1)])
            .text(MetadataTag::GpsLatitudeRef, "N")
            .rationals(MetadataTag::GpsLongitude, vec![(10, 1), (0, 1), (0, 1)])
            .text(MetadataTag::GpsLongitudeRef, "E");
        let a = record("/p/a.png", 16, 16, best.clone());
        let b = record("/p/b.png", 16, 16, best);

        let score = SimilarityScorer::new().score(&pair(&a, &b));

        assert_eq!(score.metadata_sum, raw_minimum());
        assert_eq!(score.combined, 0.0);

        let c = Arc::new(ImageRecord::from_decoded(
            "/p/c.png",
            &decoded(
                64,
                16,
                TagMap::new()
                    .text(MetadataTag::DateTimeOriginal, "2010:01:01 00:00:00")
                    .text(MetadataTag::Make, "Nikon")
                    .text(MetadataTag::BodySerialNumber, "2")
                    .text(MetadataTag::ImageUniqueId, "y")
                    .rationals(MetadataTag::GpsLatitude, vec![(50, 1), (0, 1), (0, 1)])
                    .text(MetadataTag::GpsLatitudeRef, "S")
                    .rationals(MetadataTag::GpsLongitude, vec![(10, 1), (0, 1), (0, 1)])
                    .text(MetadataTag::GpsLongitudeRef, "W"),
                |x, _| if x % 2 == 0 { [255, 255, 255] } else { [0, 0, 0] },
            ),
        ));

        let worst = SimilarityScorer::new().score(&pair(&a, &c));

        assert!(worst.combined >= 0.0 && worst.combined <= 1.0);
        assert!(worst.metadata_sum > 20.0);
        assert!(!worst.qualifies(Category::Combined));
    }

    #[test]
    fn matching_image_ids_pull_combined_down() {
        let a = record("/p/a.png", 16, 16, TagMap::new().text(MetadataTag::ImageUniqueId, "same"));
        let b = record("/p/b.png", 16, 16, TagMap::new().text(MetadataTag::ImageUniqueId, "same"));
        let c = record("/p/c.png", 16, 16, TagMap::new().text(MetadataTag::ImageUniqueId, "other"));
        let scorer = SimilarityScorer::new();

        let same = scorer.score(&pair(&a, &b));
        let different = scorer.score(&pair(&a, &c));

        assert!(same.combined < different.combined);
        assert_eq!(different.metadata_sum - same.metadata_sum, 20.0);
    }

    #[test]
    fn close_capture_times_qualify_as_temporal() {
        let a = record(
            "/p/a.png",
            16,
            16,
            TagMap::new().text(MetadataTag::DateTimeOriginal, "2020:01:01 00:00:00"),
        );
        let b = record(
            "/p/b.png",
            16,
            16,
            TagMap::new().text(MetadataTag::DateTimeOriginal, "2020:01:01 00:00:10"),
        );

        let score = SimilarityScorer::new().score(&pair(&a, &b));

        assert_eq!(score.temporal_secs(), Some(10.0));
        assert!(score.qualifies(Category::Temporal));
        let categories = score.categories();
        assert!(categories.contains(&(Category::Temporal, 10.0)));
        assert!(categories.iter().any(|(c, _)| *c == Category::Combined));
    }

    #[test]
    fn wide_aspect_mismatch_is_never_combined() {
        let a = record("/p/a.png", 16, 16, TagMap::new());
        let wide = Arc::new(ImageRecord::from_decoded(
            "/p/wide.png",
            &decoded(64, 16, TagMap::new(), |_, _| [0, 0, 0]),
        ));
        let score = Score {
            visual: VisualMatch {
                distance: 0.0,
                aspect_ratio_flipped: false,
                cropped: false,
            },
            temporal: None,
            geospatial: None,
            aspect_ratio: aspect_ratio_mismatch(&a, &wide, false),
            metadata_sum: 0.0,
            combined: 0.1,
        };

        assert_eq!(score.aspect_ratio, 4.0);
        assert!(!score.qualifies(Category::Combined));
        assert!(Score {
            visual: VisualMatch {
                cropped: true,
                ..score.visual
            },
            ..score
        }
        .qualifies(Category::Combined));
    }

    #[test]
    fn rotated_aspect_ratio_is_undone() {
        let a = record("/p/a.png", 40, 20, TagMap::new());
        let b = record("/p/b.png", 20, 40, TagMap::new());

        assert_eq!(aspect_ratio_mismatch(&a, &b, true), 1.0);
        assert_eq!(aspect_ratio_mismatch(&a, &b, false), 4.0);
    }

    #[test]
    fn self_pairs_and_failed_images_are_not_scored() {
        let a = record("/p/a.png", 8, 8, TagMap::new());
        let b = record("/p/b.png", 8, 8, TagMap::new());

        assert!(!SimilarityScorer::should_score(&a, &a));
        assert!(SimilarityScorer::should_score(&a, &b));
    }
}
