//! 8×8 block-average color grids.

use crate::core::codec::DecodedImage;
use serde::{Deserialize, Serialize};

/// Blocks per side of an intensity grid
pub const GRID_SIZE: usize = 8;

/// Normalized average color of one block, each channel in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Intensity {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Intensity {
    /// Sum of absolute channel differences
    pub fn difference(&self, other: &Intensity) -> f64 {
        (self.r as f64 - other.r as f64).abs()
            + (self.g as f64 - other.g as f64).abs()
            + (self.b as f64 - other.b as f64).abs()
    }
}

/// The eight symmetries of a square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transform {
    None,
    Rotate90,
    Rotate180,
    Rotate270,
    FlipHorizontal,
    FlipVertical,
    /// Mirror across the top-left to bottom-right diagonal
    FlipNwSe,
    /// Mirror across the bottom-left to top-right diagonal
    FlipSwNe,
}

impl Transform {
    pub const ALL: [Transform; 8] = [
        Transform::None,
        Transform::Rotate90,
        Transform::Rotate180,
        Transform::Rotate270,
        Transform::FlipHorizontal,
        Transform::FlipVertical,
        Transform::FlipNwSe,
        Transform::FlipSwNe,
    ];

    /// Whether the transform swaps width and height
    pub fn swaps_axes(&self) -> bool {
        matches!(
            self,
            Transform::Rotate90 | Transform::Rotate270 | Transform::FlipNwSe | Transform::FlipSwNe
        )
    }

    /// Source cell (x, y) that lands at (x, y) after the transform
    fn source(&self, x: usize, y: usize) -> (usize, usize) {
        let last = GRID_SIZE - 1;
        match self {
            Transform::None => (x, y),
            Transform::Rotate90 => (last - y, x),
            Transform::Rotate180 => (last - x, last - y),
            Transform::Rotate270 => (y, last - x),
            Transform::FlipHorizontal => (last - x, y),
            Transform::FlipVertical => (x, last - y),
            Transform::FlipNwSe => (y, x),
            Transform::FlipSwNe => (last - y, last - x),
        }
    }
}

/// Coarse visual summary of an image region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntensityGrid {
    cells: [[Intensity; GRID_SIZE]; GRID_SIZE],
}

impl IntensityGrid {
    /// Build a grid from raw cells, `cells[y][x]`
    pub fn from_cells(cells: [[Intensity; GRID_SIZE]; GRID_SIZE]) -> Self {
        Self { cells }
    }

    /// Cell at (x, y) as seen through `transform`
    pub fn get(&self, x: usize, y: usize, transform: Transform) -> Intensity {
        let (xt, yt) = transform.source(x, y);
        self.cells[yt][xt]
    }

    /// Summarize the pixels in `[left, right) × [top, bottom)`.
    ///
    /// The region is split into 8×8 blocks, each at least one pixel wide,
    /// and each block's channels are averaged. If every block is black
    /// but some pixels are not fully transparent, alpha is used as grey.
    /// Finally all channels of all blocks are stretched jointly to [0, 1];
    /// a uniform region yields an all-zero grid.
    ///
    /// # Panics
    /// If the region is empty or extends past the image.
    pub fn from_region(image: &DecodedImage, left: u32, top: u32, right: u32, bottom: u32) -> Self {
        assert!(
            left < right && top < bottom && right <= image.width && bottom <= image.height,
            "region {}..{} x {}..{} outside {}x{} image",
            left,
            right,
            top,
            bottom,
            image.width,
            image.height
        );

        let width = (right - left) as u64;
        let height = (bottom - top) as u64;
        let edge = |origin: u32, size: u64, k: usize| origin + (size * k as u64 / GRID_SIZE as u64) as u32;

        let mut sums = [[[0f64; 4]; GRID_SIZE]; GRID_SIZE];
        let mut rgb_content = false;
        let mut alpha_content = false;

        for by in 0..GRID_SIZE {
            let y0 = edge(top, height, by);
            let y1 = edge(top, height, by + 1).max(y0 + 1);
            for bx in 0..GRID_SIZE {
                let x0 = edge(left, width, bx);
                let x1 = edge(left, width, bx + 1).max(x0 + 1);

                let mut acc = [0u64; 4];
                for y in y0..y1 {
                    for x in x0..x1 {
                        let px = image.pixel(x, y);
                        for (sum, channel) in acc.iter_mut().zip(px) {
                            *sum += channel as u64;
                        }
                    }
                }

                let count = ((x1 - x0) as u64 * (y1 - y0) as u64) as f64;
                for (avg, sum) in sums[by][bx].iter_mut().zip(acc) {
                    *avg = sum as f64 / count;
                }
                rgb_content |= acc[0] != 0 || acc[1] != 0 || acc[2] != 0;
                alpha_content |= acc[3] != 0;
            }
        }

        if alpha_content && !rgb_content {
            for cell in sums.iter_mut().flatten() {
                let a = cell[3];
                cell[..3].fill(a);
            }
        }

        let (min, max) = sums
            .iter()
            .flatten()
            .flat_map(|cell| cell[..3].iter().copied())
            .fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
        let range = max - min;

        let mut cells = [[Intensity::default(); GRID_SIZE]; GRID_SIZE];
        if range > 0.0 {
            for (row, sum_row) in cells.iter_mut().zip(&sums) {
                for (cell, sum) in row.iter_mut().zip(sum_row) {
                    *cell = Intensity {
                        r: ((sum[0] - min) / range) as f32,
                        g: ((sum[1] - min) / range) as f32,
                        b: ((sum[2] - min) / range) as f32,
                    };
                }
            }
        }

        Self { cells }
    }
}

/// The three grids kept per image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntensityGrids {
    /// Whole image
    pub whole: IntensityGrid,
    /// Largest square anchored at the top-left corner
    pub top_left: IntensityGrid,
    /// Largest square anchored at the bottom-right corner
    pub bottom_right: IntensityGrid,
}

impl IntensityGrids {
    pub fn from_image(image: &DecodedImage) -> Self {
        let (w, h) = (image.width, image.height);
        let side = w.min(h);

        Self {
            whole: IntensityGrid::from_region(image, 0, 0, w, h),
            top_left: IntensityGrid::from_region(image, 0, 0, side, side),
            bottom_right: IntensityGrid::from_region(image, w - side, h - side, w, h),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::NoMetadata;

    fn image(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> DecodedImage {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&f(x, y));
            }
        }
        DecodedImage::new(width, height, pixels, Box::new(NoMetadata)).unwrap()
    }

    fn all_cells(grid: &IntensityGrid) -> Vec<Intensity> {
        let mut out = Vec::new();
        for y in 0..GRID_SIZE {
            for x in 0..GRID_SIZE {
                out.push(grid.get(x, y, Transform::None));
            }
        }
        out
    }

    #[test]
    fn cells_are_normalized_to_unit_range() {
        let img = image(32, 24, |x, y| [(x * 8) as u8, (y * 10) as u8, 50, 255]);
        let grid = IntensityGrid::from_region(&img, 0, 0, 32, 24);
        let cells = all_cells(&grid);

        for c in &cells {
            for v in [c.r, c.g, c.b] {
                assert!((0.0..=1.0).contains(&v), "{v} out of range");
            }
        }
        let max = cells.iter().flat_map(|c| [c.r, c.g, c.b]).fold(0f32, f32::max);
        let min = cells.iter().flat_map(|c| [c.r, c.g, c.b]).fold(1f32, f32::min);
        assert_eq!(max, 1.0);
        assert_eq!(min, 0.0);
    }

    #[test]
    fn uniform_image_gives_zero_grid() {
        let img = image(10, 10, |_, _| [200, 100, 50, 255]);
        let grid = IntensityGrid::from_region(&img, 0, 0, 10, 10);

        assert!(all_cells(&grid).iter().all(|c| *c == Intensity::default()));
    }

    #[test]
    fn tiny_images_still_fill_every_block() {
        let img = image(3, 2, |x, y| [(x * 100) as u8, (y * 100) as u8, 0, 255]);
        let grid = IntensityGrid::from_region(&img, 0, 0, 3, 2);

        assert_eq!(grid.get(0, 0, Transform::None).r, 0.0);
        assert!(grid.get(7, 7, Transform::None).r > 0.0);
    }

    #[test]
    fn alpha_stands_in_for_black_pixels() {
        let img = image(16, 16, |x, _| [0, 0, 0, if x < 8 { 0 } else { 255 }]);
        let grid = IntensityGrid::from_region(&img, 0, 0, 16, 16);

        let left = grid.get(0, 0, Transform::None);
        let right = grid.get(7, 0, Transform::None);
        assert_eq!(left, Intensity { r: 0.0, g: 0.0, b: 0.0 });
        assert_eq!(right, Intensity { r: 1.0, g: 1.0, b: 1.0 });
    }

    #[test]
    fn transforms_index_expected_cells() {
        let mut cells = [[Intensity::default(); GRID_SIZE]; GRID_SIZE];
        // marker at x=1, y=0
        cells[0][1] = Intensity { r: 1.0, g: 0.0, b: 0.0 };
        let grid = IntensityGrid::from_cells(cells);
        let marked = |t| {
            let mut hits = Vec::new();
            for y in 0..GRID_SIZE {
                for x in 0..GRID_SIZE {
                    if grid.get(x, y, t).r == 1.0 {
                        hits.push((x, y));
                    }
                }
            }
            hits
        };

        assert_eq!(marked(Transform::None), vec![(1, 0)]);
        assert_eq!(marked(Transform::Rotate180), vec![(6, 7)]);
        assert_eq!(marked(Transform::FlipHorizontal), vec![(6, 0)]);
        assert_eq!(marked(Transform::FlipVertical), vec![(1, 7)]);
        assert_eq!(marked(Transform::FlipNwSe), vec![(0, 1)]);
        assert_eq!(marked(Transform::Rotate90), vec![(0, 6)]);
        assert_eq!(marked(Transform::Rotate270), vec![(7, 1)]);
        assert_eq!(marked(Transform::FlipSwNe), vec![(7, 6)]);
    }

    #[test]
    fn crops_cover_opposite_corners() {
        // left half dark, right half bright
        let img = image(40, 20, |x, _| if x < 20 { [0, 0, 0, 255] } else { [255, 255, 255, 255] });
        let grids = IntensityGrids::from_image(&img);

        // the top-left square is all dark and the bottom-right square all bright
        let tl = all_cells(&grids.top_left);
        let br = all_cells(&grids.bottom_right);
        assert!(tl.iter().all(|c| *c == Intensity::default()));
        assert!(br.iter().all(|c| *c == Intensity::default()));
        assert_ne!(grids.whole, grids.top_left);
    }

    #[test]
    fn axis_swapping_transforms() {
        let swapping: Vec<_> = Transform::ALL.iter().filter(|t| t.swaps_axes()).collect();
        assert_eq!(swapping.len(), 4);
        assert!(!Transform::Rotate180.swaps_axes());
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn region_must_lie_inside_the_image() {
        let img = image(4, 4, |_, _| [0, 0, 0, 255]);
        IntensityGrid::from_region(&img, 0, 0, 5, 4);
    }
}
