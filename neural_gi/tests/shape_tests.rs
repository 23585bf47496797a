//! Shape tracking across blocks and the full network.

use burn::backend::NdArray;
use burn::prelude::*;

use neural_gi::{
    config::AutoencoderConfig,
    nn::{Autoencoder, Block, ResidualBlockConfig, ResidualUpsamplingBlockConfig},
    predict, NeuralGiError,
};

type TestBackend = NdArray;

#[test]
fn test_strided_block_matches_shape_query() {
    let device = Default::default();
    for (size, stride) in [(16, 2), (15, 2), (9, 3), (8, 1)] {
        let filters = if stride == 1 { 4 } else { 6 };
        let block: Block<TestBackend> = ResidualBlockConfig::new(4, filters, 3)
            .with_stride(stride)
            .init(&device)
            .unwrap()
            .into();

        let x = Tensor::<TestBackend, 4>::ones([2, 4, size, size], &device);
        let expected = block.output_shape([2, 4, size, size]).unwrap();
        assert_eq!(block.apply(x, None).dims(), expected, "size {size} stride {stride}");
        if stride == 1 {
            assert_eq!(expected, [2, 4, size, size]);
        }
    }
}

#[test]
fn test_strided_block_rejects_input_below_kernel() {
    let device = Default::default();
    let block = ResidualBlockConfig::new(4, 8, 3)
        .with_stride(2)
        .init::<TestBackend>(&device)
        .unwrap();
    assert!(matches!(
        block.output_shape([1, 4, 2, 2]),
        Err(NeuralGiError::Shape { .. })
    ));
}

#[test]
fn test_upsampling_output_size() {
    let device = Default::default();
    let block = ResidualUpsamplingBlockConfig::new(4, 8, 2)
        .init::<TestBackend>(&device)
        .unwrap();

    for h in [1, 2, 5] {
        let x = Tensor::<TestBackend, 4>::ones([1, 4, h, h], &device);
        let y = block.apply(x, None);
        // (H - 1) * s + k
        assert_eq!(y.dims(), [1, 8, (h - 1) * 2 + 2, (h - 1) * 2 + 2]);
        assert_eq!(block.output_shape([1, 4, h, h]).unwrap(), y.dims());
    }
}

#[test]
fn test_down_then_up_restores_size() {
    let device = Default::default();
    let down = ResidualBlockConfig::new(4, 8, 3)
        .with_stride(2)
        .init::<TestBackend>(&device)
        .unwrap();
    let up = ResidualUpsamplingBlockConfig::new(8, 4, 2)
        .init::<TestBackend>(&device)
        .unwrap();

    let x = Tensor::<TestBackend, 4>::ones([1, 4, 16, 16], &device);
    let y = up.apply(down.apply(x, None), None);
    assert_eq!(y.dims(), [1, 4, 16, 16]);
}

#[test]
fn test_round_trip_sizes() {
    for size in [128, 192, 256] {
        let config = AutoencoderConfig::default().with_input_size(size);
        assert!(config.validate().is_ok(), "size {size}");
        assert_eq!(config.output_shape(), [1, 3, size, size]);
    }
    for size in [32, 64, 96, 100] {
        let config = AutoencoderConfig::default().with_input_size(size);
        assert!(config.validate().is_err(), "size {size}");
    }
}

#[test]
fn test_untrained_network_on_zero_image() {
    let device = Default::default();
    let model = Autoencoder::<TestBackend>::new(&AutoencoderConfig::default(), &device).unwrap();

    let x = Tensor::<TestBackend, 4>::zeros([1, 3, 128, 128], &device);
    let first = predict(&model, x.clone()).unwrap();
    let second = predict(&model, x).unwrap();

    assert_eq!(first.geometry.dims(), [1, 3, 128, 128]);
    let a: Vec<f32> = first.geometry.to_data().to_vec().unwrap();
    let b: Vec<f32> = second.geometry.to_data().to_vec().unwrap();
    assert!(a.iter().all(|v| (0.0..=1.0).contains(v)));
    assert_eq!(a, b, "predict must be deterministic");

    let images = first.to_images().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].dims(), (128, 128));
}

#[test]
fn test_predict_rejects_wrong_size() {
    let device = Default::default();
    let model = Autoencoder::<TestBackend>::new(&AutoencoderConfig::default(), &device).unwrap();
    let x = Tensor::<TestBackend, 4>::zeros([1, 3, 4, 4], &device);
    assert!(predict(&model, x).is_err());
}
