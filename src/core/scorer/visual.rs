//! Transform-invariant intensity grid distance.

use crate::core::image::{ImageRecord, IntensityGrid, Transform, GRID_SIZE};
use serde::{Deserialize, Serialize};

/// Visual distance between two images and how it was reached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualMatch {
    /// Mean per-cell color difference, 0 for identical grids
    pub distance: f64,
    /// The best match rotated or mirrored one image across a diagonal
    pub aspect_ratio_flipped: bool,
    /// The best match compared square crops rather than whole images
    pub cropped: bool,
}

/// Smallest mean cell difference between `a` and any transform of `b`,
/// with the transform that produced it.
pub fn grid_distance(a: &IntensityGrid, b: &IntensityGrid) -> (f64, Transform) {
    let mut best = f64::INFINITY;
    let mut winner = Transform::None;

    for transform in Transform::ALL {
        let mut sum = 0.0;
        for y in 0..GRID_SIZE {
            for x in 0..GRID_SIZE {
                sum += a.get(x, y, Transform::None).difference(&b.get(x, y, transform));
            }
            if sum > best {
                break;
            }
        }
        if sum < best {
            best = sum;
            winner = transform;
        }
    }

    (best / (GRID_SIZE * GRID_SIZE) as f64, winner)
}

/// Compare whole images and their corner crops, keeping the closest match.
///
/// The two records are put in path order first, so swapping the arguments
/// gives an identical result.
pub fn visual_distance(a: &ImageRecord, b: &ImageRecord) -> VisualMatch {
    let (a, b) = if b.path() < a.path() { (b, a) } else { (a, b) };
    let (ga, gb) = (a.grids(), b.grids());

    let (distance, transform) = grid_distance(&ga.whole, &gb.whole);
    let mut best = VisualMatch {
        distance,
        aspect_ratio_flipped: transform.swaps_axes(),
        cropped: false,
    };

    let crops = [
        (&ga.top_left, &gb.top_left),
        (&ga.top_left, &gb.bottom_right),
        (&ga.bottom_right, &gb.bottom_right),
    ];
    for (ca, cb) in crops {
        let (distance, transform) = grid_distance(ca, cb);
        if distance < best.distance {
            best = VisualMatch {
                distance,
                aspect_ratio_flipped: transform.swaps_axes(),
                cropped: true,
            };
        }
    }

    best
}
