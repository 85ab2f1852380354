//! # Pair Module
//!
//! Two images reported together, with the distance of the list they sit in.

use crate::core::image::ImageRecord;
use chrono::{DateTime, Duration, Utc};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Two images and a category-specific distance.
///
/// The older file (by last write time) always comes first.
#[derive(Debug, Clone)]
pub struct ImagePair {
    first: Arc<ImageRecord>,
    second: Arc<ImageRecord>,
    /// Distance in the units of the list holding this pair
    pub distance: f64,
}

impl ImagePair {
    pub fn new(a: Arc<ImageRecord>, b: Arc<ImageRecord>) -> Self {
        let (first, second) = if b.modified() < a.modified() { (b, a) } else { (a, b) };
        Self {
            first,
            second,
            distance: 0.0,
        }
    }

    /// Copy of this pair with `distance` stamped
    pub fn with_distance(&self, distance: f64) -> Self {
        Self {
            distance,
            ..self.clone()
        }
    }

    pub fn first(&self) -> &Arc<ImageRecord> {
        &self.first
    }

    pub fn second(&self) -> &Arc<ImageRecord> {
        &self.second
    }

    /// Whichever of the two paths sorts first
    pub fn smaller_path(&self) -> &Path {
        self.first.path().min(self.second.path())
    }

    /// Whichever of the two paths sorts last
    pub fn larger_path(&self) -> &Path {
        self.first.path().max(self.second.path())
    }

    /// Time since the more recently written of the two files
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        let newest = self.first.modified().max(self.second.modified())?;
        Some(now - newest)
    }

    pub fn is_in_same_folder(&self) -> bool {
        self.first.path().parent() == self.second.path().parent()
    }

    /// Smallest gap between any capture time of one image and any of the other
    pub fn time_distance(&self) -> Option<Duration> {
        let a = &self.first.metadata().times;
        let b = &self.second.metadata().times;
        a.iter()
            .flat_map(|t1| b.iter().map(move |t2| (*t1 - *t2).abs()))
            .min()
    }

    /// Great-circle distance between the two capture positions, in meters
    pub fn location_distance(&self) -> Option<f64> {
        let a = self.first.metadata().position?;
        let b = self.second.metadata().position?;
        Some(a.distance_to(&b))
    }

    /// Order by distance, then by each pair's smaller path, then its larger one
    pub fn rank(&self, other: &ImagePair) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.smaller_path().cmp(other.smaller_path()))
            .then_with(|| self.larger_path().cmp(other.larger_path()))
    }

    /// One-line summary such as "Distance 0.012, 10 seconds, 250 meters"
    pub fn description(&self) -> String {
        let mut text = format!("Distance {:.3}", self.distance);
        if let Some(gap) = self.time_distance() {
            text.push_str(", ");
            text.push_str(&humanize_duration(gap));
        }
        if let Some(meters) = self.location_distance() {
            text.push_str(", ");
            text.push_str(&humanize_distance(meters));
        }
        text
    }
}

impl fmt::Display for ImagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <-> {} ({})",
            self.first.path().display(),
            self.second.path().display(),
            self.description()
        )
    }
}

impl Serialize for ImagePair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ImagePair", 3)?;
        state.serialize_field("first", self.first.path())?;
        state.serialize_field("second", self.second.path())?;
        state.serialize_field("distance", &self.distance)?;
        state.end()
    }
}

/// Coarse human wording for a duration: "3 days", "1 second"
pub fn humanize_duration(duration: Duration) -> String {
    let seconds = duration.num_seconds().abs();
    let s = seconds as f64;
    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;
    const YEAR: i64 = 365 * DAY;

    if seconds > 2 * YEAR {
        format!("{} years", (s / YEAR as f64).round())
    } else if seconds > YEAR {
        format!("{} months", (s / (30 * DAY) as f64).round())
    } else if seconds > 2 * DAY {
        format!("{} days", (s / DAY as f64).round())
    } else if seconds > 2 * HOUR {
        format!("{} hours", (s / HOUR as f64).round())
    } else if seconds > 2 * MINUTE {
        format!("{} minutes", (s / MINUTE as f64).round())
    } else if seconds == 1 {
        "1 second".to_string()
    } else {
        format!("{} seconds", seconds)
    }
}

/// Meters below 3 km, whole kilometers above
pub fn humanize_distance(meters: f64) -> String {
    if meters > 3_000.0 {
        format!("{} kilometers", (meters / 1000.0).round())
    } else {
        let rounded = meters.round();
        if rounded == 1.0 {
            "1 meter".to_string()
        } else {
            format!("{} meters", rounded)
        }
    }
}
