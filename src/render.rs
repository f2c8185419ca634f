//! Offline rendering of WAV files through one engine per channel.

use std::fmt;
use std::path::Path;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::AverageError;
use crate::processor::process_blocks;

/// A window change applied just before the given tick is processed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Retune {
    pub tick: u64,
    pub window: f64,
}

impl std::str::FromStr for Retune {
    type Err = String;

    /// Parses `TICK:WINDOW`, e.g. `200:32`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tick, window) = s
            .split_once(':')
            .ok_or_else(|| format!("expected TICK:WINDOW, got '{}'", s))?;
        let tick = tick.trim().parse().map_err(|e| format!("bad tick '{}': {}", tick, e))?;
        let window = window.trim().parse().map_err(|e| format!("bad window '{}': {}", window, e))?;
        Ok(Retune { tick, window })
    }
}

/// Settings for [`render_wav`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub config: EngineConfig,
    pub block_size: usize,
    pub retunes: Vec<Retune>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            block_size: 64,
            retunes: Vec::new(),
        }
    }
}

/// What a render did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderReport {
    pub channels: u16,
    pub sample_rate: u32,
    pub frames: usize,
    pub ticks: u64,
    /// Channel-ticks that came out silent because an engine was not ready.
    pub skipped: u64,
    /// Window changes that were rejected and left the window as it was.
    pub rejected_retunes: usize,
}

/// Errors that abort a render.
#[derive(Debug)]
pub enum RenderError {
    /// WAV reading or writing failed.
    Wav(hound::Error),
    /// The engines could not be configured for the requested block size.
    Engine(AverageError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Wav(err) => write!(f, "WAV error: {}", err),
            RenderError::Engine(err) => write!(f, "Engine error: {}", err),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Wav(err) => Some(err),
            RenderError::Engine(err) => Some(err),
        }
    }
}

impl From<hound::Error> for RenderError {
    fn from(err: hound::Error) -> Self {
        RenderError::Wav(err)
    }
}

impl From<AverageError> for RenderError {
    fn from(err: AverageError) -> Self {
        RenderError::Engine(err)
    }
}

/// Reads `input`, averages each channel across blocks, and writes 32-bit float `output`.
pub fn render_wav(input: &Path, output: &Path, options: &RenderOptions) -> Result<RenderReport, RenderError> {
    let mut reader = hound::WavReader::open(input)?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };
    let frames = interleaved.len() / channels;
    log::info!(
        "rendering {} ({} ch, {} Hz, {} frames) with blocks of {}",
        input.display(),
        channels,
        spec.sample_rate,
        frames,
        options.block_size
    );

    let mut planar: Vec<Vec<f32>> = (0..channels)
        .map(|ch| interleaved.iter().skip(ch).step_by(channels).take(frames).copied().collect())
        .collect();
    let (ticks, skipped, rejected_retunes) = average_channels(&mut planar, options)?;

    let out_spec = hound::WavSpec {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(output, out_spec)?;
    for frame in 0..frames {
        for channel in &planar {
            writer.write_sample(channel[frame])?;
        }
    }
    writer.finalize()?;

    Ok(RenderReport {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        frames,
        ticks,
        skipped,
        rejected_retunes,
    })
}

/// Averages every channel in place, one engine per channel, applying retunes tick by tick.
///
/// Returns `(ticks, skipped channel-ticks, rejected retunes)`.
pub fn average_channels(
    channels: &mut [Vec<f32>],
    options: &RenderOptions,
) -> Result<(u64, u64, usize), AverageError> {
    let block_size = options.block_size;
    let mut engines = Vec::with_capacity(channels.len());
    for _ in channels.iter() {
        let mut engine = Engine::new(options.config);
        engine.set_block_size(block_size)?;
        engines.push(engine);
    }

    let mut retunes = options.retunes.clone();
    retunes.sort_by_key(|r| r.tick);
    let mut pending = retunes.iter().peekable();
    let mut rejected = 0;
    let mut skipped = 0u64;

    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    let total_ticks = frames.div_ceil(block_size) as u64;
    let mut tick = 0u64;
    while tick < total_ticks {
        while let Some(retune) = pending.next_if(|r| r.tick <= tick) {
            let mut ok = true;
            for engine in engines.iter_mut() {
                ok &= engine.set_window(retune.window).is_ok();
            }
            if ok {
                log::info!("tick {}: window -> {}", tick, retune.window);
            } else {
                rejected += 1;
            }
        }
        // run uninterrupted up to the next retune
        let next_tick = pending.peek().map_or(total_ticks, |r| r.tick.min(total_ticks));
        let start = tick as usize * block_size;
        let end = (next_tick as usize * block_size).min(frames);
        for (engine, samples) in engines.iter_mut().zip(channels.iter_mut()) {
            let input = samples[start..end].to_vec();
            skipped += process_blocks(engine, block_size, &input, &mut samples[start..end]) as u64;
        }
        tick = next_tick;
    }

    for engine in engines.iter_mut() {
        engine.release();
    }
    Ok((tick, skipped, rejected))
}

#[cfg(test)]
mod tests {
    use super::{average_channels, RenderOptions, Retune};
    use crate::config::EngineConfig;

    #[test]
    fn test_retune_parses_tick_and_window() {
        assert_eq!("12:4".parse::<Retune>(), Ok(Retune { tick: 12, window: 4.0 }));
        assert_eq!(" 0 : 2.5".parse::<Retune>(), Ok(Retune { tick: 0, window: 2.5 }));
        assert!("12".parse::<Retune>().is_err());
        assert!("x:4".parse::<Retune>().is_err());
    }

    #[test]
    /// Test that each channel is averaged on its own.
    fn test_average_channels_keeps_channels_apart() {
        let options = RenderOptions {
            config: EngineConfig { window_size: 2, ..EngineConfig::default() },
            block_size: 2,
            retunes: Vec::new(),
        };
        let mut channels = vec![vec![2.0, 2.0, 4.0, 4.0], vec![-2.0, -2.0, 0.0, 0.0]];
        let (ticks, skipped, _) = average_channels(&mut channels, &options).unwrap();
        assert_eq!(ticks, 2);
        assert_eq!(skipped, 0);
        assert_eq!(channels[0], vec![1.0, 1.0, 3.0, 3.0]);
        assert_eq!(channels[1], vec![-1.0, -1.0, -1.0, -1.0]);
    }

    #[test]
    /// Test that a retune resets history at the requested tick.
    fn test_retune_resets_at_tick() {
        let options = RenderOptions {
            config: EngineConfig { window_size: 4, ..EngineConfig::default() },
            block_size: 1,
            retunes: vec![Retune { tick: 2, window: 1.0 }, Retune { tick: 3, window: -1.0 }],
        };
        let mut channels = vec![vec![4.0, 4.0, 5.0, 6.0]];
        let (_, _, rejected) = average_channels(&mut channels, &options).unwrap();
        assert_eq!(channels[0], vec![1.0, 2.0, 5.0, 6.0]);
        assert_eq!(rejected, 1);
    }

    #[test]
    fn test_partial_last_block_is_truncated() {
        let options = RenderOptions {
            config: EngineConfig { window_size: 1, ..EngineConfig::default() },
            block_size: 4,
            retunes: Vec::new(),
        };
        let mut channels = vec![vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]];
        let (ticks, _, _) = average_channels(&mut channels, &options).unwrap();
        assert_eq!(ticks, 2);
        assert_eq!(channels[0], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_zero_block_size_is_rejected() {
        let options = RenderOptions { block_size: 0, ..RenderOptions::default() };
        let mut channels = vec![vec![0.0; 4]];
        assert!(average_channels(&mut channels, &options).is_err());
    }
}
