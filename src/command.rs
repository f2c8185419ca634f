//! Command: instructions from the control thread to the audio thread. Variants are
//! pointer-sized at most; history storage travels boxed, already allocated.

use std::sync::Arc;

use crate::config::AveragingStrategy;
use crate::history::HistoryBuffer;
use crate::ring_buffer::RingBuffer;

/// Instruction from the control thread to the audio thread.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace the engine's history with this freshly allocated, zeroed one.
    Install(Box<HistoryBuffer>),
    /// The control thread could not allocate; stop averaging and emit silence.
    MarkFailed,
    /// Drop the history and go back to the unconfigured state.
    Release,
    /// Switch the averaging strategy; history is kept.
    SetStrategy(AveragingStrategy),
    /// Recompute the running average from the stored rows.
    Resync,
}

/// Producer side of the command channel. Only the control thread should hold this.
pub struct CommandSender {
    inner: Arc<RingBuffer<Command>>,
}

impl CommandSender {
    /// Tries to send a command. Returns `Ok(())` if enqueued, `Err(cmd)` if the buffer is full.
    pub fn try_send(&self, cmd: Command) -> Result<(), Command> {
        self.inner.try_send(cmd)
    }
}

/// Consumer side of the command channel. Only the audio thread should hold this.
/// Call `try_recv()` at the top of each tick to drain pending commands.
pub struct CommandReceiver {
    inner: Arc<RingBuffer<Command>>,
}

impl CommandReceiver {
    /// Tries to receive the next command. Returns `None` if the buffer is empty.
    pub fn try_recv(&self) -> Option<Command> {
        self.inner.try_recv()
    }
}

/// Creates a command channel: returns a sender (for the control thread) and a receiver (for the audio thread).
pub fn command_channel(capacity: usize) -> (CommandSender, CommandReceiver) {
    let arc = Arc::new(RingBuffer::<Command>::new(capacity));
    (
        CommandSender { inner: arc.clone() },
        CommandReceiver { inner: arc },
    )
}
