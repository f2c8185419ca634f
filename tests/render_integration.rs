//! Integration tests: WAV files through the block averager

use meanblock::{render_wav, AveragingStrategy, EngineConfig, RenderError, RenderOptions, Retune};
use std::path::PathBuf;

/// Unique path in the system temp dir so parallel tests don't collide.
fn temp_wav(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("meanblock-{}-{}.wav", std::process::id(), name))
}

fn write_wav(path: &PathBuf, channels: u16, samples: &[i16]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

fn read_f32(path: &PathBuf) -> (hound::WavSpec, Vec<f32>) {
    let mut reader = hound::WavReader::open(path).unwrap();
    let spec = reader.spec();
    let samples = reader.samples::<f32>().collect::<Result<Vec<_>, _>>().unwrap();
    (spec, samples)
}

#[test]
fn test_render_mono_blocks_of_constant_level() {
    let input = temp_wav("mono-in");
    let output = temp_wav("mono-out");
    // 4 blocks of 4 samples at 0.5 full scale
    write_wav(&input, 1, &[16_384; 16]);

    let options = RenderOptions {
        config: EngineConfig { window_size: 2, strategy: AveragingStrategy::Incremental },
        block_size: 4,
        retunes: Vec::new(),
    };
    let report = render_wav(&input, &output, &options).unwrap();
    assert_eq!(report.ticks, 4);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.frames, 16);

    let (spec, samples) = read_f32(&output);
    assert_eq!(spec.sample_format, hound::SampleFormat::Float);
    assert_eq!(spec.sample_rate, 8_000);
    // first tick averages against the zeroed history
    assert!(samples[..4].iter().all(|&x| (x - 0.25).abs() < 1e-6));
    assert!(samples[4..].iter().all(|&x| (x - 0.5).abs() < 1e-6));

    let _ = std::fs::remove_file(input);
    let _ = std::fs::remove_file(output);
}

#[test]
fn test_render_stereo_keeps_channels_interleaved() {
    let input = temp_wav("stereo-in");
    let output = temp_wav("stereo-out");
    let mut samples = Vec::new();
    for _ in 0..8 {
        samples.push(8_192); // left 0.25
        samples.push(-8_192); // right -0.25
    }
    write_wav(&input, 2, &samples);

    let options = RenderOptions {
        config: EngineConfig { window_size: 1, strategy: AveragingStrategy::Resum },
        block_size: 2,
        retunes: vec![Retune { tick: 1, window: 0.0 }],
    };
    let report = render_wav(&input, &output, &options).unwrap();
    assert_eq!(report.channels, 2);
    assert_eq!(report.rejected_retunes, 1);

    let (_, rendered) = read_f32(&output);
    for frame in rendered.chunks(2) {
        assert!((frame[0] - 0.25).abs() < 1e-6);
        assert!((frame[1] + 0.25).abs() < 1e-6);
    }

    let _ = std::fs::remove_file(input);
    let _ = std::fs::remove_file(output);
}

#[test]
fn test_render_missing_input_is_wav_error() {
    let options = RenderOptions::default();
    let err = render_wav(&temp_wav("does-not-exist"), &temp_wav("never-written"), &options).unwrap_err();
    assert!(matches!(err, RenderError::Wav(_)), "{}", err);
}

#[test]
fn test_render_zero_block_size_is_engine_error() {
    let input = temp_wav("zero-block-in");
    write_wav(&input, 1, &[0; 8]);
    let options = RenderOptions { block_size: 0, ..RenderOptions::default() };
    let err = render_wav(&input, &temp_wav("zero-block-out"), &options).unwrap_err();
    assert!(matches!(err, RenderError::Engine(_)), "{}", err);
    let _ = std::fs::remove_file(input);
}
