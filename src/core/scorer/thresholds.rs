//! Fixed scoring constants.

/// Pairs below this visual distance are reported as visually similar
pub const VISUAL_THRESHOLD: f64 = 0.37;

/// Pairs taken less than this many seconds apart are reported as temporal matches
pub const TEMPORAL_THRESHOLD_SECS: f64 = 24.0 * 60.0 * 60.0;

/// Pairs taken less than this many meters apart are reported as geospatial matches
pub const GEOSPATIAL_THRESHOLD_M: f64 = 10_000.0;

/// Pairs below this combined score are reported as likely duplicates
pub const COMBINED_THRESHOLD: f64 = 0.40;

/// Aspect ratio mismatch above which an uncropped pair never counts as combined match
pub const ASPECT_RATIO_LIMIT: f64 = 1.75;

/// Weight of the visual distance in the combined score
pub const VISUAL_WEIGHT: f64 = 0.6;

/// Weight of the normalized metadata sum in the combined score
pub const METADATA_WEIGHT: f64 = 0.4;

/// Inclusive bounds of one combined-score term
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermRange {
    pub min: f64,
    pub max: f64,
}

pub const TIME_TERM: TermRange = TermRange { min: -5.0, max: 5.0 };
pub const LOCATION_TERM: TermRange = TermRange { min: -5.0, max: 5.0 };
pub const MAKE_MODEL_TERM: TermRange = TermRange { min: -2.0, max: 5.0 };
pub const CAMERA_ID_TERM: TermRange = TermRange { min: -2.0, max: 5.0 };
pub const IMAGE_ID_TERM: TermRange = TermRange { min: -10.0, max: 10.0 };
pub const ASPECT_RATIO_TERM: TermRange = TermRange { min: 0.0, max: 1.0 };

pub const ALL_TERMS: [TermRange; 6] = [
    TIME_TERM,
    LOCATION_TERM,
    MAKE_MODEL_TERM,
    CAMERA_ID_TERM,
    IMAGE_ID_TERM,
    ASPECT_RATIO_TERM,
];

/// Capture times closer than this pull the score down
pub const TIME_CLOSE_SECS: f64 = 48.0 * 60.0 * 60.0;
/// Capture times further apart than this push the score up
pub const TIME_FAR_SECS: f64 = 20.0 * 24.0 * 60.0 * 60.0;

/// Positions closer than this pull the score down
pub const LOCATION_CLOSE_M: f64 = 10_000.0;
/// Positions further apart than this push the score up
pub const LOCATION_FAR_M: f64 = 100_000.0;

/// Aspect ratio mismatch (minus one) that earns the full penalty
pub const ASPECT_PENALTY_SPAN: f64 = 0.75;

/// Contribution of one text field to the combined score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextWeights {
    pub equal: f64,
    pub one_missing: f64,
    pub different: f64,
}

pub const MAKE_MODEL_WEIGHTS: TextWeights = TextWeights {
    equal: -2.0,
    one_missing: 1.0,
    different: 5.0,
};

pub const CAMERA_ID_WEIGHTS: TextWeights = TextWeights {
    equal: -2.0,
    one_missing: 1.0,
    different: 5.0,
};

pub const IMAGE_ID_WEIGHTS: TextWeights = TextWeights {
    equal: -10.0,
    one_missing: 2.0,
    different: 10.0,
};

/// Lowest possible raw metadata sum
pub fn raw_minimum() -> f64 {
    ALL_TERMS.iter().map(|t| t.min).sum()
}

/// Highest possible raw metadata sum
pub fn raw_maximum() -> f64 {
    ALL_TERMS.iter().map(|t| t.max).sum()
}
