//! Cancellation signals for engine runs.

use core::cell::Cell;
use std::rc::Rc;

/// A caller-owned signal the engine checks before replaying a run.
pub trait CancelSignal {
	/// Whether the run should be abandoned.
	fn is_cancelled(&self) -> bool;
}

impl<S: CancelSignal + ?Sized> CancelSignal for Rc<S> {
	fn is_cancelled(&self) -> bool {
		(**self).is_cancelled()
	}
}

/// A signal that is never raised.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancelSignal for NeverCancel {
	fn is_cancelled(&self) -> bool {
		false
	}
}

/// A shareable cancellation flag.
///
/// Clones observe the same flag.
///
/// # Example
///
/// ```
/// use eagerly_core::{CancelSignal, CancelToken};
///
/// let token = CancelToken::new();
/// let observer = token.clone();
///
/// token.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
	cancelled: Rc<Cell<bool>>,
}

impl CancelToken {
	/// A token that is not cancelled.
	pub fn new() -> Self {
		Self::default()
	}

	/// Raise the signal. Idempotent.
	pub fn cancel(&self) {
		self.cancelled.set(true);
	}
}

impl CancelSignal for CancelToken {
	fn is_cancelled(&self) -> bool {
		self.cancelled.get()
	}
}
