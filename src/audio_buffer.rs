//! Fixed-size sample storage for real-time use. Allocated once on the control side,
//! reused on the audio thread; never grows or shrinks after construction.

use std::collections::TryReserveError;

/// Fixed-capacity buffer of f32 samples. Safe to use on the audio thread (no allocation, no locks).
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    storage: Box<[f32]>,
}

impl AudioBuffer {
    /// Creates a zeroed buffer of `len` samples, reporting allocation failure instead of aborting.
    pub fn try_zeroed(len: usize) -> Result<Self, TryReserveError> {
        let mut samples: Vec<f32> = Vec::new();
        samples.try_reserve_exact(len)?;
        samples.resize(len, 0.0);
        Ok(AudioBuffer {
            storage: samples.into_boxed_slice(),
        })
    }

    /// Returns the number of samples in the buffer.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Sets every sample back to 0.0.
    pub fn clear(&mut self) {
        self.storage.fill(0.0);
    }

    /// Mutable view for writing samples. Used on the audio thread.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.storage
    }

    /// Immutable view for reading samples.
    pub fn as_slice(&self) -> &[f32] {
        &self.storage
    }
}
