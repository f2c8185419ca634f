//! Host glue: splits one engine into a control-thread handle and an audio-thread handle.
//!
//! `ControlPort` validates requests and allocates history on the control thread.
//! `AudioPort` owns the engine and applies those requests only between ticks, so a
//! reconfiguration can never run concurrently with `process`. History the audio thread
//! stops using is sent back and freed by `ControlPort::collect`.

use crate::command::{command_channel, Command, CommandReceiver, CommandSender};
use crate::config::{parse_window, AveragingStrategy, EngineConfig};
use crate::engine::Engine;
use crate::error::{AverageError, Parameter, ProcessStatus};
use crate::event::{event_channel, Event, EventReceiver, EventSender};
use crate::history::HistoryBuffer;
use crate::processor::Processor;

/// Creates a linked control/audio pair for one engine. `capacity` bounds both queues.
pub fn host_channel(config: EngineConfig, capacity: usize) -> (ControlPort, AudioPort) {
    let config = EngineConfig { window_size: config.initial_window(), ..config };
    let (cmd_tx, cmd_rx) = command_channel(capacity);
    let (evt_tx, evt_rx) = event_channel(capacity);
    let control = ControlPort {
        cmd_tx,
        evt_rx,
        window_size: config.window_size,
        block_size: None,
        strategy: config.strategy,
        failure_pending: false,
    };
    let audio = AudioPort {
        engine: Engine::new(config),
        cmd_rx,
        evt_tx,
    };
    (control, audio)
}

/// Control-thread side. Tracks the geometry it has asked for.
pub struct ControlPort {
    cmd_tx: CommandSender,
    evt_rx: EventReceiver,
    window_size: usize,
    block_size: Option<usize>,
    strategy: AveragingStrategy,
    /// A failed allocation whose `MarkFailed` did not fit in the queue yet.
    failure_pending: bool,
}

impl ControlPort {
    /// User "set window length" message. Deferred until a block size is known.
    pub fn set_window(&mut self, value: f64) -> Result<(), AverageError> {
        let window_size = parse_window(value).map_err(|err| {
            log::warn!("{}", err);
            err
        })?;
        match self.block_size {
            Some(block_size) => self.configure(window_size, block_size),
            None => {
                log::debug!("window {} stored until the block size is known", window_size);
                self.window_size = window_size;
                Ok(())
            }
        }
    }

    /// Host notification that the signal chain was (re)compiled with `block_size`.
    pub fn set_block_size(&mut self, block_size: usize) -> Result<(), AverageError> {
        self.configure(self.window_size, block_size)
    }

    /// Allocates a fresh zeroed history here and hands it to the audio thread.
    pub fn configure(&mut self, window_size: usize, block_size: usize) -> Result<(), AverageError> {
        if window_size == 0 || block_size == 0 {
            let parameter = if window_size == 0 { Parameter::WindowSize } else { Parameter::BlockSize };
            let err = AverageError::InvalidParameter { parameter, value: 0.0 };
            log::warn!("{}", err);
            return Err(err);
        }
        self.collect();
        match HistoryBuffer::allocate(window_size, block_size) {
            Ok(history) => {
                self.send(Command::Install(Box::new(history)))?;
                self.failure_pending = false;
                log::info!("window {} x block {} queued", window_size, block_size);
                self.window_size = window_size;
                self.block_size = Some(block_size);
                Ok(())
            }
            Err(err) => {
                log::error!("{}; asking host to refresh the signal chain", err);
                if self.cmd_tx.try_send(Command::MarkFailed).is_err() {
                    log::error!("command queue full; audio side goes silent on the next collect");
                    self.failure_pending = true;
                }
                self.window_size = window_size;
                self.block_size = Some(block_size);
                Err(err)
            }
        }
    }

    pub fn set_strategy(&mut self, strategy: AveragingStrategy) -> Result<(), AverageError> {
        self.send(Command::SetStrategy(strategy))?;
        self.strategy = strategy;
        Ok(())
    }

    pub fn resync(&mut self) -> Result<(), AverageError> {
        self.send(Command::Resync)
    }

    /// Asks the audio thread to drop its history. The storage comes back through `collect`.
    pub fn release(&mut self) -> Result<(), AverageError> {
        self.send(Command::Release)
    }

    /// Frees history the audio thread has retired and re-sends a failure notice that did
    /// not fit in the queue earlier. Returns how many buffers were freed.
    pub fn collect(&mut self) -> usize {
        if self.failure_pending && self.cmd_tx.try_send(Command::MarkFailed).is_ok() {
            self.failure_pending = false;
        }
        let mut freed = 0;
        while let Some(event) = self.evt_rx.try_recv() {
            match event {
                Event::Retired(history) => {
                    log::debug!(
                        "freed retired history ({} x {})",
                        history.window_size(),
                        history.block_size()
                    );
                    drop(history);
                    freed += 1;
                }
            }
        }
        freed
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn block_size(&self) -> Option<usize> {
        self.block_size
    }

    pub fn strategy(&self) -> AveragingStrategy {
        self.strategy
    }

    fn send(&self, cmd: Command) -> Result<(), AverageError> {
        self.cmd_tx.try_send(cmd).map_err(|_| {
            log::warn!("{}", AverageError::QueueFull);
            AverageError::QueueFull
        })
    }
}

/// Audio-thread side. Call [`AudioPort::process`] once per tick.
pub struct AudioPort {
    engine: Engine,
    cmd_rx: CommandReceiver,
    evt_tx: EventSender,
}

impl AudioPort {
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) -> ProcessStatus {
        self.engine.process_audio(&self.cmd_rx, &self.evt_tx, input, output)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

impl Processor for AudioPort {
    fn process(&mut self, input: &[f32], output: &mut [f32]) -> ProcessStatus {
        AudioPort::process(self, input, output)
    }
}
