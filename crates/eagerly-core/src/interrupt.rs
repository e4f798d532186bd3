//! Suspension signal and the body's error channel.
//!
//! A computation body returns `Result<T, Interrupt<E>>`. The
//! [`Interrupt::Suspended`] variant is raised by an [`Accessor`](crate::Accessor)
//! when the body touches a dependency that has not settled yet; it is control
//! flow owned by the engine and never reaches the caller of a run. Every other
//! failure travels as [`Interrupt::Failed`].
//!
//! Bodies that handle failures broadly should forward suspensions unchanged:
//!
//! ```
//! use eagerly_core::{Interrupt, is_suspension};
//!
//! fn recover(interrupt: Interrupt<String>) -> Result<i32, Interrupt<String>> {
//!     if is_suspension(&interrupt) {
//!         return Err(interrupt);
//!     }
//!     Ok(0)
//! }
//!
//! assert_eq!(recover(Interrupt::Failed("boom".into())).ok(), Some(0));
//! ```

use core::fmt;
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};

use crate::promise::{Promise, PromiseId};
use crate::soon::record_outcome;

/// An unsettled dependency a suspension waits on.
pub(crate) trait PendingDependency {
	fn id(&self) -> PromiseId;

	/// Wait for settlement and record the outcome in the cache.
	///
	/// Resolves to `Err(())` when the dependency was rejected.
	fn settle_into_cache(&self) -> LocalBoxFuture<'static, Result<(), ()>>;
}

impl<T, E> PendingDependency for Promise<T, E>
where
	T: Clone + 'static,
	E: Clone + 'static,
{
	fn id(&self) -> PromiseId {
		Promise::id(self)
	}

	fn settle_into_cache(&self) -> LocalBoxFuture<'static, Result<(), ()>> {
		let promise = self.clone();
		async move {
			let outcome = promise.wait().await;
			record_outcome(&promise, &outcome);
			outcome.map(|_| ()).map_err(|_| ())
		}
		.boxed_local()
	}
}

/// The unresolved dependencies that interrupted a body.
///
/// A single read names one dependency; a batch read names every pending member
/// of the batch.
#[derive(Clone)]
pub struct Suspension {
	pending: Vec<Rc<dyn PendingDependency>>,
}

impl Suspension {
	pub(crate) fn on<T, E>(promise: &Promise<T, E>) -> Self
	where
		T: Clone + 'static,
		E: Clone + 'static,
	{
		Self {
			pending: vec![Rc::new(promise.clone())],
		}
	}

	pub(crate) fn on_all<'a, T, E, I>(promises: I) -> Self
	where
		T: Clone + 'static,
		E: Clone + 'static,
		I: IntoIterator<Item = &'a Promise<T, E>>,
	{
		Self {
			pending: promises
				.into_iter()
				.map(|promise| Rc::new(promise.clone()) as Rc<dyn PendingDependency>)
				.collect(),
		}
	}

	/// Identities of the dependencies this suspension waits on, in read order.
	pub fn dependencies(&self) -> Vec<PromiseId> {
		self.pending.iter().map(|dependency| dependency.id()).collect()
	}

	/// Number of dependencies named.
	pub fn len(&self) -> usize {
		self.pending.len()
	}

	/// Whether the suspension names no dependency.
	pub fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}

	/// Wait until every named dependency is fulfilled or any one is rejected,
	/// recording each settlement in the cache as it arrives.
	pub(crate) fn wait(self) -> LocalBoxFuture<'static, ()> {
		let pending: Vec<_> = self
			.pending
			.iter()
			.map(|dependency| dependency.settle_into_cache())
			.collect();
		future::try_join_all(pending).map(|_| ()).boxed_local()
	}
}

impl fmt::Debug for Suspension {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Suspension")
			.field("dependencies", &self.dependencies())
			.finish()
	}
}

/// Why a computation body did not return a value.
pub enum Interrupt<E> {
	/// The body touched an unsettled dependency and must be replayed.
	Suspended(Suspension),
	/// The body failed, or a dependency it read was rejected.
	Failed(E),
}

impl<E> Interrupt<E> {
	/// Whether this is the suspension signal.
	pub fn is_suspension(&self) -> bool {
		matches!(self, Self::Suspended(_))
	}

	/// The failure, if this is not a suspension.
	pub fn error(&self) -> Option<&E> {
		match self {
			Self::Suspended(_) => None,
			Self::Failed(error) => Some(error),
		}
	}

	/// Consumes the interrupt, returning the failure if this is not a suspension.
	pub fn into_error(self) -> Option<E> {
		match self {
			Self::Suspended(_) => None,
			Self::Failed(error) => Some(error),
		}
	}

	/// Map the failure, forwarding a suspension unchanged.
	pub fn map_err<F, E2>(self, f: F) -> Interrupt<E2>
	where
		F: FnOnce(E) -> E2,
	{
		match self {
			Self::Suspended(suspension) => Interrupt::Suspended(suspension),
			Self::Failed(error) => Interrupt::Failed(f(error)),
		}
	}
}

impl<E> From<E> for Interrupt<E> {
	fn from(error: E) -> Self {
		Self::Failed(error)
	}
}

impl<E: fmt::Debug> fmt::Debug for Interrupt<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Suspended(suspension) => f.debug_tuple("Suspended").field(suspension).finish(),
			Self::Failed(error) => f.debug_tuple("Failed").field(error).finish(),
		}
	}
}

impl<E: fmt::Display> fmt::Display for Interrupt<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Suspended(suspension) => write!(
				f,
				"suspended on {} unsettled dependencies",
				suspension.len()
			),
			Self::Failed(error) => error.fmt(f),
		}
	}
}

/// Whether `interrupt` is the suspension signal.
pub fn is_suspension<E>(interrupt: &Interrupt<E>) -> bool {
	interrupt.is_suspension()
}
