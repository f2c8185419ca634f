//! Moving block average engine: owns the history, runs the resize protocol, and
//! averages one block per tick.
//!
//! Configuration calls and `process` must never overlap on one engine. When they come
//! from different threads, route configuration through `Command`s and let the audio
//! thread apply them between ticks (`process_audio` does this).

use crate::command::{Command, CommandReceiver};
use crate::config::{parse_window, AveragingStrategy, EngineConfig};
use crate::error::{AverageError, Parameter, ProcessStatus, SkipReason};
use crate::event::{Event, EventSender};
use crate::history::HistoryBuffer;
use crate::processor::Processor;

/// Coarse engine state, as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    /// No storage. `process` emits silence.
    Unconfigured,
    /// Storage allocated; `process` averages.
    Ready,
    /// The last configuration could not allocate. `process` emits silence.
    Failed,
}

#[derive(Debug)]
enum EngineState {
    Unconfigured,
    Ready(Box<HistoryBuffer>),
    Failed,
}

/// Per-sample moving average across the last `window_size` blocks.
#[derive(Debug)]
pub struct Engine {
    strategy: AveragingStrategy,
    /// Window requested most recently; applied as soon as a block size is known.
    window_size: usize,
    /// Block size last announced by the host, if any.
    block_size: Option<usize>,
    state: EngineState,
    skipped_ticks: u64,
}

impl Engine {
    /// Creates an unconfigured engine. Nothing is allocated until the block size is known.
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            strategy: config.strategy,
            window_size: config.initial_window(),
            block_size: None,
            state: EngineState::Unconfigured,
            skipped_ticks: 0,
        }
    }

    /// Discards any history and allocates a zeroed `window_size x block_size` one.
    ///
    /// Calling this again with the same arguments performs the same full reset.
    /// A zero dimension is rejected and leaves the engine exactly as it was. An
    /// allocation failure leaves it `Failed`, with the old storage already released.
    pub fn configure(&mut self, window_size: usize, block_size: usize) -> Result<(), AverageError> {
        if window_size == 0 {
            return Err(invalid(Parameter::WindowSize, 0.0));
        }
        if block_size == 0 {
            return Err(invalid(Parameter::BlockSize, 0.0));
        }
        self.window_size = window_size;
        self.block_size = Some(block_size);
        // old storage goes before the new one is requested
        self.state = EngineState::Unconfigured;
        match HistoryBuffer::allocate(window_size, block_size) {
            Ok(history) => {
                log::debug!(
                    "configured {} blocks x {} samples ({})",
                    window_size,
                    block_size,
                    self.strategy
                );
                self.state = EngineState::Ready(Box::new(history));
                Ok(())
            }
            Err(err) => {
                log::error!("{}", err);
                self.state = EngineState::Failed;
                Err(err)
            }
        }
    }

    /// Handles a user request to change the window length.
    ///
    /// Before the host has announced a block size, the new window is only remembered.
    pub fn set_window(&mut self, value: f64) -> Result<(), AverageError> {
        let window_size = parse_window(value).map_err(|err| {
            log::warn!("{}", err);
            err
        })?;
        match self.block_size {
            Some(block_size) => self.configure(window_size, block_size),
            None => {
                self.window_size = window_size;
                Ok(())
            }
        }
    }

    /// Handles the host announcing a (possibly new) block size, e.g. on chain recompilation.
    pub fn set_block_size(&mut self, block_size: usize) -> Result<(), AverageError> {
        if block_size == 0 {
            let err = invalid(Parameter::BlockSize, 0.0);
            log::warn!("{}", err);
            return Err(err);
        }
        self.configure(self.window_size, block_size)
    }

    /// Switches the update strategy. Stored rows keep their meaning, so nothing is reset.
    pub fn set_strategy(&mut self, strategy: AveragingStrategy) {
        self.strategy = strategy;
    }

    /// Frees the history. Safe to call any number of times.
    pub fn release(&mut self) {
        if self.detach().is_some() {
            log::debug!("released history");
        }
    }

    /// Moves to `Unconfigured` and hands the history back instead of dropping it, so the
    /// caller can free it off the audio thread.
    pub fn detach(&mut self) -> Option<Box<HistoryBuffer>> {
        match std::mem::replace(&mut self.state, EngineState::Unconfigured) {
            EngineState::Ready(history) => Some(history),
            _ => None,
        }
    }

    /// Adopts a history allocated elsewhere. Returns the one it replaces, if any.
    pub fn install(&mut self, history: Box<HistoryBuffer>) -> Option<Box<HistoryBuffer>> {
        self.window_size = history.window_size();
        self.block_size = Some(history.block_size());
        match std::mem::replace(&mut self.state, EngineState::Ready(history)) {
            EngineState::Ready(old) => Some(old),
            _ => None,
        }
    }

    /// Enters `Failed` after an allocation attempt elsewhere did not succeed.
    pub fn mark_failed(&mut self) -> Option<Box<HistoryBuffer>> {
        match std::mem::replace(&mut self.state, EngineState::Failed) {
            EngineState::Ready(old) => Some(old),
            _ => None,
        }
    }

    /// Recomputes the running average from stored rows. No-op unless ready.
    pub fn resync(&mut self) {
        if let EngineState::Ready(history) = &mut self.state {
            history.resync();
        }
    }

    /// Averages one block. Never allocates, never panics on bad input.
    ///
    /// When not ready, or when the block length does not match the configured block
    /// size, `output` is filled with silence and the reason is returned.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) -> ProcessStatus {
        let status = match &mut self.state {
            EngineState::Ready(history) => {
                if input.len() == history.block_size() && output.len() == history.block_size() {
                    history.push(input, output, self.strategy);
                    return ProcessStatus::Processed;
                }
                ProcessStatus::Skipped(SkipReason::BlockSizeMismatch)
            }
            EngineState::Unconfigured => ProcessStatus::Skipped(SkipReason::Unconfigured),
            EngineState::Failed => ProcessStatus::Skipped(SkipReason::Failed),
        };
        output.fill(0.0);
        self.skipped_ticks += 1;
        status
    }

    /// Offline convenience around [`Engine::process`]: allocates and returns the output block.
    /// When not ready the result is silence the length of the configured block (or the input).
    pub fn process_block(&mut self, input: &[f32]) -> Vec<f32> {
        let len = match &self.state {
            EngineState::Ready(history) => history.block_size(),
            _ => self.block_size.unwrap_or(input.len()),
        };
        let mut output = vec![0.0; len];
        self.process(input, &mut output);
        output
    }

    /// Drain all currently pending commands and apply them.
    /// Call this at the *top* of each tick, before processing.
    pub fn drain_commands(&mut self, cmd_rx: &CommandReceiver, evt_tx: &EventSender) {
        while let Some(cmd) = cmd_rx.try_recv() {
            if let Some(retired) = self.apply_command(cmd) {
                // a full event queue means freeing here, on the audio thread
                let _ = evt_tx.try_send(Event::Retired(retired));
            }
        }
    }

    /// Apply a single command, returning history the engine let go of.
    pub fn apply_command(&mut self, cmd: Command) -> Option<Box<HistoryBuffer>> {
        match cmd {
            Command::Install(history) => self.install(history),
            Command::MarkFailed => self.mark_failed(),
            Command::Release => self.detach(),
            Command::SetStrategy(strategy) => {
                self.set_strategy(strategy);
                None
            }
            Command::Resync => {
                self.resync();
                None
            }
        }
    }

    /// Full tick: drain commands, then average `input` into `output`.
    pub fn process_audio(
        &mut self,
        cmd_rx: &CommandReceiver,
        evt_tx: &EventSender,
        input: &[f32],
        output: &mut [f32],
    ) -> ProcessStatus {
        self.drain_commands(cmd_rx, evt_tx);
        self.process(input, output)
    }

    pub fn status(&self) -> EngineStatus {
        match self.state {
            EngineState::Unconfigured => EngineStatus::Unconfigured,
            EngineState::Ready(_) => EngineStatus::Ready,
            EngineState::Failed => EngineStatus::Failed,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status() == EngineStatus::Ready
    }

    /// The window currently in effect, or the one that will be used once configured.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn block_size(&self) -> Option<usize> {
        self.block_size
    }

    pub fn strategy(&self) -> AveragingStrategy {
        self.strategy
    }

    pub fn history(&self) -> Option<&HistoryBuffer> {
        match &self.state {
            EngineState::Ready(history) => Some(history),
            _ => None,
        }
    }

    pub fn cursor(&self) -> Option<usize> {
        self.history().map(HistoryBuffer::cursor)
    }

    /// Ticks that produced silence instead of an average since construction.
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(EngineConfig::default())
    }
}

impl Processor for Engine {
    fn process(&mut self, input: &[f32], output: &mut [f32]) -> ProcessStatus {
        Engine::process(self, input, output)
    }
}

fn invalid(parameter: Parameter, value: f64) -> AverageError {
    AverageError::InvalidParameter { parameter, value }
}
