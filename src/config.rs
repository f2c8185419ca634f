//! Construction-time configuration for the block averager.

use std::fmt;
use std::str::FromStr;

use crate::error::{AverageError, Parameter};

/// Window length used when none (or an unusable one) is given at construction.
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// How the per-column average is kept up to date each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AveragingStrategy {
    /// Subtract the outgoing row, add the incoming one. O(block) per tick; rounding
    /// error accumulates slowly.
    #[default]
    Incremental,
    /// Re-sum every stored row each tick. O(window x block) per tick; no drift.
    Resum,
}

impl fmt::Display for AveragingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AveragingStrategy::Incremental => write!(f, "incremental"),
            AveragingStrategy::Resum => write!(f, "resum"),
        }
    }
}

impl FromStr for AveragingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "incremental" | "inc" => Ok(AveragingStrategy::Incremental),
            "resum" | "exact" => Ok(AveragingStrategy::Resum),
            other => Err(format!("unknown strategy '{}' (expected incremental or resum)", other)),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of past blocks averaged together (default: 10)
    pub window_size: usize,

    /// Update strategy for the running average (default: Incremental)
    pub strategy: AveragingStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            strategy: AveragingStrategy::default(),
        }
    }
}

impl EngineConfig {
    /// Builds a configuration from the optional creation argument a host passes in.
    ///
    /// A missing argument yields the default window. An unusable one also yields the
    /// default, together with the diagnostic the host should show the user.
    pub fn from_creation_arg(arg: Option<f64>) -> (Self, Option<AverageError>) {
        let mut config = Self::default();
        match arg.map(parse_window) {
            None => (config, None),
            Some(Ok(window_size)) => {
                config.window_size = window_size;
                (config, None)
            }
            Some(Err(err)) => {
                log::warn!("{}; keeping default window of {}", err, DEFAULT_WINDOW_SIZE);
                (config, Some(err))
            }
        }
    }

    pub fn with_strategy(mut self, strategy: AveragingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// The window an engine starts with. A zero window falls back to the default,
    /// and the rejection is logged.
    pub fn initial_window(&self) -> usize {
        if self.window_size == 0 {
            let err = AverageError::InvalidParameter { parameter: Parameter::WindowSize, value: 0.0 };
            log::warn!("{}; keeping default window of {}", err, DEFAULT_WINDOW_SIZE);
            return DEFAULT_WINDOW_SIZE;
        }
        self.window_size
    }
}

/// Converts a numeric control value to a window length.
///
/// Control messages carry floats; the fractional part is truncated. Anything that does
/// not truncate to at least one block is rejected.
pub fn parse_window(value: f64) -> Result<usize, AverageError> {
    parse_positive(Parameter::WindowSize, value)
}

/// Same rule as [`parse_window`], for block sizes coming from text.
pub fn parse_block_size(value: f64) -> Result<usize, AverageError> {
    parse_positive(Parameter::BlockSize, value)
}

fn parse_positive(parameter: Parameter, value: f64) -> Result<usize, AverageError> {
    if !value.is_finite() || value < 1.0 || value > usize::MAX as f64 {
        return Err(AverageError::InvalidParameter { parameter, value });
    }
    Ok(value.trunc() as usize)
}
