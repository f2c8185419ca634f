//! Circular history of past blocks plus the per-column running average.
//!
//! The history is a `window_size x block_size` matrix stored row-major in one flat
//! buffer. Row `cursor` is the oldest block and is overwritten on the next tick. Every
//! row holds `input / window_size`, so the running average is simply the column sum.

use crate::audio_buffer::AudioBuffer;
use crate::config::AveragingStrategy;
use crate::error::{AverageError, Parameter};

/// Fixed-geometry block history. Allocation happens only in [`HistoryBuffer::allocate`];
/// pushing a block never allocates.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryBuffer {
    /// rows.as_slice()[row * block_size + col]
    rows: AudioBuffer,
    /// running[col] == sum of column `col` over all rows
    running: AudioBuffer,
    window_size: usize,
    block_size: usize,
    cursor: usize,
}

impl HistoryBuffer {
    /// Allocates a zero-filled history for `window_size` blocks of `block_size` samples.
    ///
    /// Returns `InvalidParameter` for a zero dimension and `AllocationFailure` when the
    /// storage (or its size computation) does not fit in memory.
    pub fn allocate(window_size: usize, block_size: usize) -> Result<Self, AverageError> {
        if window_size == 0 {
            return Err(AverageError::InvalidParameter {
                parameter: Parameter::WindowSize,
                value: 0.0,
            });
        }
        if block_size == 0 {
            return Err(AverageError::InvalidParameter {
                parameter: Parameter::BlockSize,
                value: 0.0,
            });
        }
        let failure = AverageError::AllocationFailure { window_size, block_size };
        let len = window_size.checked_mul(block_size).ok_or(failure)?;
        let rows = AudioBuffer::try_zeroed(len).map_err(|_| failure)?;
        let running = AudioBuffer::try_zeroed(block_size).map_err(|_| failure)?;
        Ok(HistoryBuffer {
            rows,
            running,
            window_size,
            block_size,
            cursor: 0,
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Row that the next pushed block will overwrite.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Current per-column average, as emitted on the last tick.
    pub fn running_average(&self) -> &[f32] {
        self.running.as_slice()
    }

    /// Flat index of `(row, col)`. Panics if either coordinate is out of range.
    pub fn index(&self, row: usize, col: usize) -> usize {
        assert!(row < self.window_size, "row {} out of range ({} rows)", row, self.window_size);
        assert!(col < self.block_size, "column {} out of range ({} columns)", col, self.block_size);
        row * self.block_size + col
    }

    /// Stored contribution at `(row, col)`, i.e. the input sample divided by the window size.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.rows.as_slice()[self.index(row, col)]
    }

    /// One stored row.
    pub fn row(&self, row: usize) -> &[f32] {
        let start = self.index(row, 0);
        &self.rows.as_slice()[start..start + self.block_size]
    }

    /// Zeroes all history and the running average and rewinds the cursor.
    pub fn reset(&mut self) {
        self.rows.clear();
        self.running.clear();
        self.cursor = 0;
    }

    /// Recomputes the running average from the stored rows, discarding accumulated
    /// rounding error.
    pub fn resync(&mut self) {
        let block_size = self.block_size;
        let running = self.running.as_mut_slice();
        running.fill(0.0);
        for row in self.rows.as_slice().chunks_exact(block_size) {
            for (sum, &value) in running.iter_mut().zip(row) {
                *sum += value;
            }
        }
    }

    /// Records one block and writes the average of the last `window_size` blocks to `output`.
    ///
    /// Both slices must be exactly `block_size` long.
    pub fn push(&mut self, input: &[f32], output: &mut [f32], strategy: AveragingStrategy) {
        debug_assert_eq!(input.len(), self.block_size);
        debug_assert_eq!(output.len(), self.block_size);
        match strategy {
            AveragingStrategy::Incremental => self.push_incremental(input, output),
            AveragingStrategy::Resum => self.push_resummed(input, output),
        }
        self.cursor += 1;
        if self.cursor == self.window_size {
            self.cursor = 0;
        }
    }

    fn push_incremental(&mut self, input: &[f32], output: &mut [f32]) {
        let divisor = self.window_size as f32;
        let start = self.cursor * self.block_size;
        let row = &mut self.rows.as_mut_slice()[start..start + self.block_size];
        let running = self.running.as_mut_slice();
        for (((stored, avg), &x), out) in row.iter_mut().zip(running).zip(input).zip(output) {
            let contribution = x / divisor;
            *avg -= *stored;
            *avg += contribution;
            *stored = contribution;
            *out = *avg;
        }
    }

    fn push_resummed(&mut self, input: &[f32], output: &mut [f32]) {
        let divisor = self.window_size as f32;
        let start = self.cursor * self.block_size;
        let row = &mut self.rows.as_mut_slice()[start..start + self.block_size];
        for (stored, &x) in row.iter_mut().zip(input) {
            *stored = x / divisor;
        }
        self.resync();
        output.copy_from_slice(self.running.as_slice());
    }
}
