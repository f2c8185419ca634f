//! Meanblock: a per-sample moving average across the last N audio blocks.
//!
//! For every sample index `i` in a block, the output is the mean of `input[i]` over the
//! last `window_size` ticks. The [`Engine`] keeps a circular `window x block` history and
//! updates the average incrementally, so a tick costs O(block) regardless of the window.
//!
//! ```
//! use meanblock::{Engine, EngineConfig};
//!
//! let mut engine = Engine::new(EngineConfig::default());
//! engine.configure(3, 2)?;
//! let mut out = [0.0f32; 2];
//! for v in [1.0, 2.0, 3.0, 4.0] {
//!     engine.process(&[v, v], &mut out);
//! }
//! assert!((out[0] - 3.0).abs() < 1e-5);
//! # Ok::<(), meanblock::AverageError>(())
//! ```
//!
//! When configuration and processing live on different threads, use [`host_channel`]:
//! the control side allocates, the audio side swaps storage in between ticks.

pub mod audio_buffer;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod history;
pub mod host;
pub mod nodes;
pub mod processor;
pub mod render;
pub mod ring_buffer;

pub use config::{AveragingStrategy, EngineConfig, DEFAULT_WINDOW_SIZE};
pub use engine::{Engine, EngineStatus};
pub use error::{AverageError, Parameter, ProcessStatus, SkipReason};
pub use history::HistoryBuffer;
pub use host::{host_channel, AudioPort, ControlPort};
pub use processor::{process_blocks, Processor};
pub use render::{render_wav, RenderError, RenderOptions, RenderReport, Retune};
