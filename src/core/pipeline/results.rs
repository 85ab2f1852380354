//! Result lists and the filters applied to them for display.

use crate::core::pair::ImagePair;
use crate::core::scorer::Category;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The four ranked lists produced by a comparison run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultSet {
    pub visual: Vec<ImagePair>,
    pub temporal: Vec<ImagePair>,
    pub geospatial: Vec<ImagePair>,
    pub combined: Vec<ImagePair>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: Category) -> &[ImagePair] {
        match category {
            Category::Visual => &self.visual,
            Category::Temporal => &self.temporal,
            Category::Geospatial => &self.geospatial,
            Category::Combined => &self.combined,
        }
    }

    fn get_mut(&mut self, category: Category) -> &mut Vec<ImagePair> {
        match category {
            Category::Visual => &mut self.visual,
            Category::Temporal => &mut self.temporal,
            Category::Geospatial => &mut self.geospatial,
            Category::Combined => &mut self.combined,
        }
    }

    /// Append a pair, already stamped with its distance, to one list
    pub fn push(&mut self, category: Category, pair: ImagePair) {
        self.get_mut(category).push(pair);
    }

    /// Sort every list by distance, ties by each pair's smaller then larger path
    pub fn sort(&mut self) {
        for category in Category::ALL {
            self.get_mut(category).sort_by(|a, b| a.rank(b));
        }
    }

    /// Total pairs across all lists
    pub fn len(&self) -> usize {
        Category::ALL.iter().map(|c| self.get(*c).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy keeping only pairs that pass `filter`, order preserved
    pub fn filtered(&self, filter: &PairFilter, now: DateTime<Utc>) -> ResultSet {
        let mut out = ResultSet::new();
        for category in Category::ALL {
            *out.get_mut(category) = self
                .get(category)
                .iter()
                .filter(|p| filter.accepts(p, now))
                .cloned()
                .collect();
        }
        out
    }
}

/// Where the two images of a pair may live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FolderFilter {
    #[default]
    Any,
    Same,
    Different,
}

/// How recently the newer file of a pair must have been written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxAge {
    #[default]
    Unlimited,
    Year,
    Month,
    Week,
    Day,
}

impl MaxAge {
    pub fn duration(&self) -> Option<Duration> {
        match self {
            MaxAge::Unlimited => None,
            MaxAge::Year => Some(Duration::days(366)),
            MaxAge::Month => Some(Duration::days(31)),
            MaxAge::Week => Some(Duration::days(7)),
            MaxAge::Day => Some(Duration::days(1)),
        }
    }
}

/// Display-time restrictions on which pairs are shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairFilter {
    pub folder: FolderFilter,
    pub max_age: MaxAge,
}

impl PairFilter {
    pub fn accepts(&self, pair: &ImagePair, now: DateTime<Utc>) -> bool {
        let folder_ok = match self.folder {
            FolderFilter::Any => true,
            FolderFilter::Same => pair.is_in_same_folder(),
            FolderFilter::Different => !pair.is_in_same_folder(),
        };

        let age_ok = match self.max_age.duration() {
            None => true,
            Some(limit) => pair.age(now).is_some_and(|age| age < limit),
        };

        folder_ok && age_ok
    }

    pub fn is_unrestricted(&self) -> bool {
        *self == PairFilter::default()
    }
}
