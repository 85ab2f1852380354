//! Integration tests for the pipeline module.
//!
//! These tests run the default codec over real PNG files and verify:
//! - Empty directories and nonexistent paths
//! - Corrupt files reported without failing the run
//! - Identical and rotated copies paired, unrelated images left out
//! - JSON serialization of the result

use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;
use similar_image_finder::core::pipeline::Pipeline;
use similar_image_finder::core::scorer::Category;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn gradient() -> image::RgbaImage {
    image::RgbaImage::from_fn(32, 24, |x, y| {
        image::Rgba([(x * 8) as u8, (y * 10) as u8, ((x + y) * 4) as u8, 255])
    })
}

fn stripes() -> image::RgbaImage {
    image::RgbaImage::from_fn(32, 24, |x, _| {
        if x % 2 == 0 {
            image::Rgba([255, 255, 255, 255])
        } else {
            image::Rgba([0, 0, 0, 255])
        }
    })
}

fn save(image: &image::RgbaImage, path: &Path) {
    image.save(path).unwrap();
}

fn pipeline(root: &Path) -> Pipeline {
    Pipeline::builder()
        .paths(vec![root.to_path_buf()])
        .poll_interval(Duration::from_millis(1))
        .build()
}

fn names(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

#[test]
fn pipeline_handles_empty_directory() {
    let temp_dir = TempDir::new().unwrap();

    let result = pipeline(temp_dir.path()).run().unwrap();

    assert_eq!(result.total_images, 0);
    assert!(result.results.is_empty());
}

#[test]
fn pipeline_handles_nonexistent_path() {
    let result = pipeline(Path::new("/nonexistent/path/that/does/not/exist"))
        .run()
        .unwrap();

    assert_eq!(result.total_images, 0);
    assert_eq!(result.scan_errors.len(), 1);
}

#[test]
fn pipeline_handles_corrupt_file_gracefully() {
    let temp_dir = TempDir::new().unwrap();
    let corrupt = temp_dir.child("corrupt.jpg");
    corrupt.write_binary(b"this is not a valid image file").unwrap();
    save(&gradient(), temp_dir.child("photo.png").path());

    let result = pipeline(temp_dir.path()).run().unwrap();

    assert_eq!(result.total_images, 2);
    assert_eq!(result.comparisons, 1);
    assert_eq!(result.failed_images.len(), 1);
    assert_eq!(names(&result.failed_images[0]), "corrupt.jpg");
    assert!(result.results.is_empty());
}

#[test]
fn copies_and_rotations_pair_visually() {
    let temp_dir = TempDir::new().unwrap();
    temp_dir.child("trip").create_dir_all().unwrap();
    temp_dir.child("backup").create_dir_all().unwrap();

    let original = gradient();
    save(&original, temp_dir.child("trip/original.png").path());
    save(&original, temp_dir.child("backup/copy.png").path());
    save(
        &image::imageops::rotate90(&original),
        temp_dir.child("trip/rotated.png").path(),
    );
    save(&stripes(), temp_dir.child("trip/stripes.png").path());

    let result = pipeline(temp_dir.path()).run().unwrap();

    assert_eq!(result.total_images, 4);
    assert_eq!(result.comparisons, 6);
    assert!(result.failed_images.is_empty());

    let visual = result.results.get(Category::Visual);
    assert_eq!(visual.len(), 3);
    for pair in visual {
        assert!(pair.distance < 1e-9, "{}", pair);
        assert_ne!(names(pair.first().path()), "stripes.png");
        assert_ne!(names(pair.second().path()), "stripes.png");
    }
    assert!(result.results.temporal.is_empty());
    assert!(result.results.geospatial.is_empty());
}

#[test]
fn worker_count_does_not_change_results() {
    let temp_dir = TempDir::new().unwrap();
    let base = gradient();
    for i in 0..6u32 {
        let shifted = image::RgbaImage::from_fn(32, 24, |x, y| {
            let p = base.get_pixel(x, y).0;
            image::Rgba([p[0], p[1], p[2].saturating_add((i * 3) as u8), 255])
        });
        save(&shifted, temp_dir.child(format!("img_{i}.png")).path());
    }
    save(&stripes(), temp_dir.child("stripes.png").path());

    let run = |workers: usize| {
        let result = Pipeline::builder()
            .paths(vec![temp_dir.path().to_path_buf()])
            .workers(workers)
            .poll_interval(Duration::from_millis(1))
            .build()
            .run()
            .unwrap();
        Category::ALL
            .iter()
            .map(|c| {
                let mut entries: Vec<(PathBuf, PathBuf, u64)> = result
                    .results
                    .get(*c)
                    .iter()
                    .map(|p| {
                        (
                            p.first().path().to_path_buf(),
                            p.second().path().to_path_buf(),
                            p.distance.to_bits(),
                        )
                    })
                    .collect();
                entries.sort();
                entries
            })
            .collect::<Vec<_>>()
    };

    let single = run(1);
    assert!(!single[0].is_empty());
    assert_eq!(single, run(8));
}

#[test]
fn tied_pairs_sort_the_same_on_every_run() {
    let temp_dir = TempDir::new().unwrap();
    for name in ["a.png", "b.png", "c.png"] {
        save(&gradient(), temp_dir.child(name).path());
    }

    let order = || {
        let result = Pipeline::builder()
            .paths(vec![temp_dir.path().to_path_buf()])
            .workers(8)
            .poll_interval(Duration::from_millis(1))
            .build()
            .run()
            .unwrap();
        result
            .results
            .visual
            .iter()
            .map(|p| (names(p.smaller_path()), names(p.larger_path())))
            .collect::<Vec<_>>()
    };

    let expected = vec![
        ("a.png".to_string(), "b.png".to_string()),
        ("a.png".to_string(), "c.png".to_string()),
        ("b.png".to_string(), "c.png".to_string()),
    ];
    for _ in 0..5 {
        assert_eq!(order(), expected);
    }
}

#[test]
fn result_serializes_to_json() {
    let temp_dir = TempDir::new().unwrap();
    save(&gradient(), temp_dir.child("a.png").path());
    save(&gradient(), temp_dir.child("b.png").path());

    let result = pipeline(temp_dir.path()).run().unwrap();
    let json = serde_json::to_string(&result).unwrap();

    let expected = predicate::str::contains("\"visual\"")
        .and(predicate::str::contains("a.png"))
        .and(predicate::str::contains("b.png"))
        .and(predicate::str::contains("\"distance\":0.0"));
    assert!(expected.eval(&json), "{}", json);

    let out = temp_dir.child("pairs.json");
    out.write_str(&json).unwrap();
    out.assert(predicate::path::exists());
}
