//! Error types for the eager suspension engine.
//!
//! Suspension itself is not an error and lives in [`crate::interrupt`]; the
//! types here describe genuine failures.

use thiserror::Error;

/// Result type for settling a promise through its [`Resolver`](crate::Resolver).
pub type SettleResult = Result<(), SettleError>;

/// Failure to deliver an outcome through a [`Resolver`](crate::Resolver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SettleError {
	/// Every handle of the promise was dropped before it was settled.
	#[error("promise was dropped before it could be settled")]
	Abandoned,
}

/// Failed outcome of an engine run.
///
/// Both rejected dependencies and failures raised by the computation body end
/// up in [`RunError::Failed`]; the engine only adds its own variant when the
/// configured replay guard trips.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError<E> {
	/// The computation body failed, or a dependency it read was rejected.
	#[error("computation failed: {0}")]
	Failed(E),

	/// The body kept suspending past the configured replay limit.
	#[error("computation suspended after {limit} replays without completing")]
	ReplayLimitExceeded {
		/// Replay limit that was in effect for the run.
		limit: usize,
	},
}

impl<E> RunError<E> {
	/// Returns the body failure, if this is one.
	pub fn failure(&self) -> Option<&E> {
		match self {
			Self::Failed(error) => Some(error),
			Self::ReplayLimitExceeded { .. } => None,
		}
	}

	/// Consumes the error, returning the body failure if this is one.
	pub fn into_failure(self) -> Option<E> {
		match self {
			Self::Failed(error) => Some(error),
			Self::ReplayLimitExceeded { .. } => None,
		}
	}
}

/// Invalid engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
	/// A configuration value could not be parsed.
	#[error("invalid value for {key}: '{value}' ({reason})")]
	InvalidValue {
		/// Configuration key (environment variable name).
		key: String,
		/// Raw value that was rejected.
		value: String,
		/// Why the value was rejected.
		reason: String,
	},
}
