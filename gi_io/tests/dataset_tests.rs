//! Integration tests over a small on-disk dataset.

use std::fs;
use std::path::Path;

use gi_io::prelude::*;
use image::{GrayImage, Luma, Rgb, RgbImage};

fn touch_png(path: &Path, size: u32) {
    RgbImage::from_pixel(size, size, Rgb([10, 20, 30])).save(path).unwrap();
}

fn touch_mask(path: &Path, size: u32) {
    GrayImage::from_pixel(size, size, Luma([255])).save(path).unwrap();
}

/// Two objects, three views each. Object `b_2` has no mask.
fn build_dataset(root: &Path) -> DatasetConfig {
    for dir in ["trn", "trn_rgb", "trn_msk"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }

    let mut config = DatasetConfig::new(root);
    config.gi_size = 8;
    config.rgb_size = 8;
    config.selected_views = vec!["view000".to_string(), "view001".to_string()];

    for object in ["a_1", "b_2"] {
        for view in ["view000", "view001", "view002"] {
            touch_png(&root.join("trn_rgb").join(format!("{object}_{view}.png")), 16);
        }
        touch_png(&root.join("trn").join(config.geometry_file(object)), 8);
        touch_png(&root.join("trn").join(config.normal_file(object)), 8);
    }
    touch_mask(&root.join("trn_msk").join(config.mask_file("a_1")), 8);
    // Unrelated file with no geometry image.
    touch_png(&root.join("trn_rgb").join("c_3_view000.png"), 16);
    config
}

#[test]
fn pairs_follow_view_filter_and_skip_missing_masks() {
    let dir = tempfile::tempdir().unwrap();
    let config = build_dataset(dir.path());

    let paths = list_pairs(&config, Split::Train).unwrap();

    assert_eq!(paths.len(), 2);
    assert_eq!(paths.masks.len(), 2);
    assert!(paths.rgb[0].ends_with("a_1_view000.png"));
    assert!(paths.rgb[1].ends_with("a_1_view001.png"));
    assert!(paths.geometry[0]
        .primary
        .ends_with("a_1_arcSmi_8_flatGI.png"));
    assert_eq!(paths.geometry[0].secondary, None);
}

#[test]
fn pairs_without_masks() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = build_dataset(dir.path());
    config.use_mask = false;

    let paths = list_pairs(&config, Split::Train).unwrap();
    assert_eq!(paths.len(), 4);
    assert!(paths.masks.is_empty());
    assert_eq!(paths.unique_geometry().len(), 2);
}

#[test]
fn six_channel_mode_requires_normals() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = build_dataset(dir.path());
    config.use_mask = false;
    config.gi_channels = 6;
    fs::remove_file(dir.path().join("trn").join(config.normal_file("b_2"))).unwrap();

    let paths = list_pairs(&config, Split::Train).unwrap();
    assert_eq!(paths.len(), 2);
    assert!(paths.geometry.iter().all(|g| g.secondary.is_some()));
}

#[test]
fn missing_split_directory() {
    let dir = tempfile::tempdir().unwrap();
    let config = build_dataset(dir.path());
    let err = list_pairs(&config, Split::Validation).unwrap_err();
    assert!(matches!(err, GiIoError::MissingDirectory { .. }));
}

#[test]
fn real_photographs_list_every_png() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = build_dataset(dir.path());
    config.test_on_real = true;

    let paths = list_pairs(&config, Split::Train).unwrap();
    assert_eq!(paths.len(), 7);
    assert!(paths.geometry.is_empty());
}

#[test]
fn decoded_samples_have_configured_sizes() {
    let dir = tempfile::tempdir().unwrap();
    let config = build_dataset(dir.path());
    let paths = list_pairs(&config, Split::Train).unwrap();

    let pool = DecodePool::new(2).unwrap();
    let samples = pool.decode_samples(&paths, &config).unwrap();

    assert_eq!(samples.len(), 2);
    for sample in &samples {
        assert_eq!(sample.rgb.len(), 3 * 8 * 8);
        assert_eq!(sample.geometry.len(), 3 * 8 * 8);
        let mask = sample.mask.as_ref().unwrap();
        assert_eq!(mask.len(), 8 * 8);
        assert!(sample.rgb.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
    // Constant color survives the resize.
    assert!((samples[0].rgb[0] - 10.0 / 255.0).abs() < 1e-4);
}

#[test]
fn mean_shape_written_for_training_split() {
    let dir = tempfile::tempdir().unwrap();
    let config = build_dataset(dir.path());
    let paths = list_pairs(&config, Split::Train).unwrap();
    let model_dir = dir.path().join("model");

    let off = ensure_mean_shape(&config, Split::Train, &paths, &model_dir)
        .unwrap()
        .unwrap();
    let mesh = gi_core::read_off_file(off).unwrap();
    assert_eq!(mesh.vertex_count(), 64);
    assert_eq!(mesh.face_count(), 0);
}

#[test]
fn parameter_log_lists_views() {
    let dir = tempfile::tempdir().unwrap();
    let config = build_dataset(dir.path());
    let path = write_parameter_log(&dir.path().join("model"), &config.parameter_entries()).unwrap();

    let text = fs::read_to_string(path).unwrap();
    assert!(text.contains("gi_size: 8\n"));
    assert!(text.ends_with("selected_views:\nview000\nview001\n"));
}
