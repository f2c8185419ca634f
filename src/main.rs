//! Meanblock CLI: offline WAV rendering, or a live control loop over stdin.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use meanblock::config::parse_block_size;
use meanblock::nodes::SineGenerator;
use meanblock::{
    host_channel, render_wav, AudioPort, AveragingStrategy, EngineConfig, Processor, RenderOptions, Retune,
};

const DEFAULT_SAMPLE_RATE: u32 = 48_000;
const DEFAULT_BLOCK_SIZE: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "meanblock")]
#[command(about = "Per-sample moving average across audio blocks.")]
struct Cli {
    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Average a WAV file block by block and write the result as 32-bit float WAV
    Render(RenderArgs),
    /// Run a sine through the engine on an audio thread; type commands and press Enter
    Stream(StreamArgs),
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// Number of blocks averaged together (default 10)
    #[arg(long, allow_negative_numbers = true)]
    window: Option<f64>,
    /// incremental (O(block) per tick) or resum (exact, O(window x block))
    #[arg(long, default_value = "incremental")]
    strategy: AveragingStrategy,
}

impl EngineArgs {
    fn config(&self) -> EngineConfig {
        let (config, err) = EngineConfig::from_creation_arg(self.window);
        if let Some(err) = err {
            eprintln!("{}", err);
        }
        config.with_strategy(self.strategy)
    }
}

#[derive(Args, Debug)]
struct RenderArgs {
    input: PathBuf,
    output: PathBuf,
    #[command(flatten)]
    engine: EngineArgs,
    /// Samples per block
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,
    /// Change the window at a tick, as TICK:WINDOW (repeatable)
    #[arg(long = "retune")]
    retunes: Vec<Retune>,
}

#[derive(Args, Debug)]
struct StreamArgs {
    #[command(flatten)]
    engine: EngineArgs,
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: usize,
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,
    /// Test tone frequency in Hz
    #[arg(long, default_value_t = 440.0)]
    frequency: f32,
    /// Buffer size for command/event channels
    #[arg(long, default_value = "64")]
    channel_capacity: usize,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Mode::Render(args) => render(args),
        Mode::Stream(args) => stream(args),
    };
    if let Err(err) = result {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn render(args: RenderArgs) -> Result<(), Box<dyn std::error::Error>> {
    let options = RenderOptions {
        config: args.engine.config(),
        block_size: args.block_size,
        retunes: args.retunes,
    };
    let report = render_wav(&args.input, &args.output, &options)?;
    println!(
        "Rendered {} frames x {} ch in {} ticks ({} skipped, {} retunes rejected) -> {}",
        report.frames,
        report.channels,
        report.ticks,
        report.skipped,
        report.rejected_retunes,
        args.output.display()
    );
    Ok(())
}

/// Simulated host audio loop: one tick per block period, tone in, average out.
fn run_audio(
    mut audio: AudioPort,
    mut tone: SineGenerator,
    block_size: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
) {
    let sample_rate = tone.sample_rate;
    let mut input = Vec::new();
    let mut output = Vec::new();
    let mut last_report = Instant::now();
    let mut peak = 0.0f32;
    let mut skipped_before = 0u64;
    while running.load(Ordering::Acquire) {
        let n = block_size.load(Ordering::Acquire);
        if input.len() != n {
            input.resize(n, 0.0);
            output.resize(n, 0.0);
        }
        tone.process(&[], &mut input);
        audio.process(&input, &mut output);
        peak = output.iter().fold(peak, |a, &s| a.max(s.abs()));

        if last_report.elapsed() >= Duration::from_secs(1) {
            let engine = audio.engine();
            log::info!(
                "{:?}: window {} block {} peak {:.4} skipped {}",
                engine.status(),
                engine.window_size(),
                n,
                peak,
                engine.skipped_ticks() - skipped_before
            );
            skipped_before = engine.skipped_ticks();
            peak = 0.0;
            last_report = Instant::now();
        }
        thread::sleep(Duration::from_secs_f64(n as f64 / sample_rate as f64));
    }
}

fn stream(args: StreamArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.engine.config();
    let (mut control, audio) = host_channel(config, args.channel_capacity);
    let block_size = Arc::new(AtomicUsize::new(args.block_size));
    let running = Arc::new(AtomicBool::new(true));

    let tone = SineGenerator::new(args.frequency, args.sample_rate).with_amplitude(0.5);
    let audio_handle = {
        let block_size = Arc::clone(&block_size);
        let running = Arc::clone(&running);
        thread::spawn(move || run_audio(audio, tone, block_size, running))
    };

    if let Err(err) = control.set_block_size(args.block_size) {
        eprintln!("{}", err);
    }

    println!("Meanblock. Commands: window <n> | block <n> | strategy <incremental|resum> | resync | release | quit | help");
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while let Some(Ok(line)) = lines.next() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_ascii_whitespace().collect();
        let outcome = match parts.as_slice() {
            ["quit" | "q"] => break,
            ["window" | "w", v] => match v.parse::<f64>() {
                Ok(v) => control.set_window(v).map(|_| format!("Window set to {}.", control.window_size())),
                Err(_) => Ok("Usage: window <number>".to_string()),
            },
            ["block" | "b", v] => match v.parse::<f64>().map(parse_block_size) {
                // the audio loop switches block length only once the averager accepted it
                Ok(Ok(n)) => control.set_block_size(n).map(|_| {
                    block_size.store(n, Ordering::Release);
                    format!("Block size set to {}.", n)
                }),
                Ok(Err(err)) => Err(err),
                Err(_) => Ok("Usage: block <number>".to_string()),
            },
            ["strategy" | "s", v] => match v.parse::<AveragingStrategy>() {
                Ok(s) => control.set_strategy(s).map(|_| format!("Strategy set to {}.", s)),
                Err(msg) => Ok(msg),
            },
            ["resync"] => control.resync().map(|_| "Resync queued.".to_string()),
            ["release"] => control.release().map(|_| "Released.".to_string()),
            ["help" | "h" | "?"] => Ok([
                "  window <n>   (w <n>)   Average over the last n blocks (resets history)",
                "  block <n>    (b <n>)   Change the host block size",
                "  strategy <s> (s <s>)   incremental | resum",
                "  resync                 Recompute the running average from history",
                "  release                Free history; output goes silent",
                "  quit (q)               Stop and exit",
            ]
            .join("\n")),
            _ => Ok("Unknown command. Type 'help' for commands.".to_string()),
        };
        match outcome {
            Ok(msg) => println!("{}", msg),
            Err(err) if err.requires_chain_refresh() => {
                eprintln!("{} (output is silent until the next successful resize)", err);
            }
            Err(err) => eprintln!("{}", err),
        }
        control.collect();
    }

    running.store(false, Ordering::Release);
    let _ = audio_handle.join();
    control.collect();
    Ok(())
}
