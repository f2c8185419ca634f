//! Per-block unit interface. Anything the host calls once per tick implements this trait.

use crate::error::ProcessStatus;

/// Interface for all per-block units. Implementations must be real-time safe: no allocation, no locks.
pub trait Processor {
    /// Read one block from `input` and fill `output`. Called on the audio thread each tick.
    ///
    /// A unit that cannot produce a meaningful block must still fill `output` (with
    /// silence) and say so in the returned status.
    fn process(&mut self, input: &[f32], output: &mut [f32]) -> ProcessStatus;
}

/// Runs `processor` over `input` in consecutive blocks of `block_size`, writing into `output`.
///
/// A trailing partial block is zero-padded for processing and truncated on output.
/// Returns the number of ticks that were skipped.
pub fn process_blocks<P: Processor + ?Sized>(
    processor: &mut P,
    block_size: usize,
    input: &[f32],
    output: &mut [f32],
) -> usize {
    assert!(block_size > 0, "block_size must be > 0");
    assert_eq!(input.len(), output.len(), "input and output must be the same length");
    let mut scratch_in = vec![0.0f32; block_size];
    let mut scratch_out = vec![0.0f32; block_size];
    let mut skipped = 0;
    for (inp, out) in input.chunks(block_size).zip(output.chunks_mut(block_size)) {
        let status = if inp.len() == block_size {
            processor.process(inp, out)
        } else {
            scratch_in.fill(0.0);
            scratch_in[..inp.len()].copy_from_slice(inp);
            let status = processor.process(&scratch_in, &mut scratch_out);
            out.copy_from_slice(&scratch_out[..inp.len()]);
            status
        };
        if !status.is_processed() {
            skipped += 1;
        }
    }
    skipped
}

#[cfg(test)]
mod tests {
    use super::{process_blocks, Processor};
    use crate::error::{ProcessStatus, SkipReason};

    /// Doubles every sample and counts calls.
    struct Doubler {
        calls: usize,
    }

    impl Processor for Doubler {
        fn process(&mut self, input: &[f32], output: &mut [f32]) -> ProcessStatus {
            self.calls += 1;
            for (o, &i) in output.iter_mut().zip(input) {
                *o = i * 2.0;
            }
            ProcessStatus::Processed
        }
    }

    struct Mute;

    impl Processor for Mute {
        fn process(&mut self, _input: &[f32], output: &mut [f32]) -> ProcessStatus {
            output.fill(0.0);
            ProcessStatus::Skipped(SkipReason::Unconfigured)
        }
    }

    #[test]
    /// Test that whole blocks are handed to the processor one tick at a time.
    fn test_process_blocks_splits_into_ticks() {
        let mut doubler = Doubler { calls: 0 };
        let input: Vec<f32> = (0..8).map(|i| i as f32).collect();
        let mut output = vec![0.0; 8];
        let skipped = process_blocks(&mut doubler, 4, &input, &mut output);
        assert_eq!(skipped, 0);
        assert_eq!(doubler.calls, 2);
        assert_eq!(output, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0]);
    }

    #[test]
    /// Test that a short tail is padded for the processor and truncated on output.
    fn test_process_blocks_pads_partial_tail() {
        let mut doubler = Doubler { calls: 0 };
        let input = [1.0, 1.0, 1.0, 1.0, 1.0];
        let mut output = [0.0; 5];
        process_blocks(&mut doubler, 4, &input, &mut output);
        assert_eq!(doubler.calls, 2);
        assert_eq!(output, [2.0; 5]);
    }

    #[test]
    fn test_process_blocks_counts_skipped_ticks() {
        let input = [1.0; 12];
        let mut output = [1.0; 12];
        let skipped = process_blocks(&mut Mute, 4, &input, &mut output);
        assert_eq!(skipped, 3);
        assert!(output.iter().all(|&x| x == 0.0));
    }
}
