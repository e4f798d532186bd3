//! Promise - Single-threaded Produces-Later Handle
//!
//! `Promise<T, E>` is the asynchronous primitive the engine orchestrates. It is a
//! cheap, clonable handle to a value that will eventually be fulfilled with `T`
//! or rejected with `E`, settled exactly once through its paired [`Resolver`].
//!
//! ## Key Features
//!
//! - **Identity**: every promise carries a [`PromiseId`]; clones share it, so the
//!   settlement cache can key on identity rather than on the eventual payload.
//! - **Follow-ups**: [`Promise::wait`] registers a follow-up that is woken once
//!   when the promise settles.
//! - **Finalization**: when the last handle is dropped the promise's cache entry
//!   is evicted, so the cache never keeps a promise alive.
//!
//! ## Example
//!
//! ```
//! use eagerly_core::Promise;
//!
//! let (promise, resolver) = Promise::<i32, String>::pending();
//! resolver.resolve(7).unwrap();
//!
//! let value = futures::executor::block_on(promise.wait());
//! assert_eq!(value, Ok(7));
//! ```

use core::cell::{Cell, RefCell};
use core::fmt;
use core::future::{Future, IntoFuture};
use core::pin::Pin;
use core::sync::atomic::{AtomicUsize, Ordering};
use core::task::{Context, Poll, Waker};
use std::rc::{Rc, Weak};

use crate::cache::try_with_cache;
use crate::error::{SettleError, SettleResult};

/// Unique identifier for a promise
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PromiseId(usize);

impl PromiseId {
	pub(crate) fn new() -> Self {
		static COUNTER: AtomicUsize = AtomicUsize::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}

	/// Raw numeric value of this identifier.
	pub fn as_usize(&self) -> usize {
		self.0
	}
}

impl fmt::Display for PromiseId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "promise#{}", self.0)
	}
}

enum State<T, E> {
	/// Slots freed by dropped follow-ups are `None` and get reused
	Pending { followups: Vec<Option<Waker>> },
	Settled(Result<T, E>),
}

struct Shared<T, E> {
	id: PromiseId,
	state: RefCell<State<T, E>>,
	/// Distinct follow-ups registered over the promise's lifetime
	followups: Cell<usize>,
}

impl<T, E> Shared<T, E> {
	fn new(state: State<T, E>) -> Self {
		Self {
			id: PromiseId::new(),
			state: RefCell::new(state),
			followups: Cell::new(0),
		}
	}
}

impl<T, E> Drop for Shared<T, E> {
	fn drop(&mut self) {
		// Ignore if TLS is already destroyed
		let _ = try_with_cache(|cache| cache.evict(self.id));
	}
}

/// A handle to a value that is produced later.
///
/// Cloning a `Promise` is cheap and yields a handle to the same underlying
/// promise (same [`PromiseId`]).
pub struct Promise<T, E> {
	shared: Rc<Shared<T, E>>,
}

impl<T, E> Promise<T, E> {
	/// Create an unsettled promise together with the resolver that settles it.
	///
	/// # Example
	///
	/// ```
	/// use eagerly_core::Promise;
	///
	/// let (promise, resolver) = Promise::<&str, ()>::pending();
	/// assert_eq!(promise.followup_count(), 0);
	/// resolver.resolve("done").unwrap();
	/// ```
	pub fn pending() -> (Self, Resolver<T, E>) {
		let shared = Rc::new(Shared::new(State::Pending {
			followups: Vec::new(),
		}));
		let resolver = Resolver {
			id: shared.id,
			shared: Rc::downgrade(&shared),
		};
		(Self { shared }, resolver)
	}

	/// Create a promise that is already fulfilled with `value`.
	pub fn resolved(value: T) -> Self {
		Self::from_result(Ok(value))
	}

	/// Create a promise that is already rejected with `reason`.
	pub fn rejected(reason: E) -> Self {
		Self::from_result(Err(reason))
	}

	/// Create a promise that is already settled with `outcome`.
	pub fn from_result(outcome: Result<T, E>) -> Self {
		Self {
			shared: Rc::new(Shared::new(State::Settled(outcome))),
		}
	}

	/// Identity of this promise.
	pub fn id(&self) -> PromiseId {
		self.shared.id
	}

	/// Whether both handles refer to the same promise.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.shared, &other.shared)
	}

	/// Number of follow-ups registered on this promise so far.
	///
	/// Each [`Wait`] future counts once, no matter how often it is polled.
	pub fn followup_count(&self) -> usize {
		self.shared.followups.get()
	}

	/// Register a follow-up: a future resolving to the promise's outcome.
	pub fn wait(&self) -> Wait<T, E> {
		Wait {
			promise: self.clone(),
			slot: None,
		}
	}

	/// Direct inspection of the promise's own state.
	pub(crate) fn peek(&self) -> Option<Result<T, E>>
	where
		T: Clone,
		E: Clone,
	{
		match &*self.shared.state.borrow() {
			State::Pending { .. } => None,
			State::Settled(outcome) => Some(outcome.clone()),
		}
	}
}

impl<T, E> Clone for Promise<T, E> {
	fn clone(&self) -> Self {
		Self {
			shared: Rc::clone(&self.shared),
		}
	}
}

impl<T, E> fmt::Debug for Promise<T, E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Promise")
			.field("id", &self.shared.id)
			.field("followups", &self.shared.followups.get())
			.finish()
	}
}

impl<T: Clone, E: Clone> IntoFuture for Promise<T, E> {
	type Output = Result<T, E>;
	type IntoFuture = Wait<T, E>;

	fn into_future(self) -> Self::IntoFuture {
		Wait {
			promise: self,
			slot: None,
		}
	}
}

/// The settling half of a [`Promise`].
///
/// Settling consumes the resolver, so a promise settles at most once. A resolver
/// dropped without settling leaves its promise pending forever.
pub struct Resolver<T, E> {
	id: PromiseId,
	shared: Weak<Shared<T, E>>,
}

impl<T, E> Resolver<T, E> {
	/// Identity of the promise this resolver settles.
	pub fn id(&self) -> PromiseId {
		self.id
	}

	/// Whether every handle of the promise has been dropped.
	pub fn is_abandoned(&self) -> bool {
		self.shared.strong_count() == 0
	}

	/// Fulfill the promise with `value`.
	pub fn resolve(self, value: T) -> SettleResult {
		self.settle(Ok(value))
	}

	/// Reject the promise with `reason`.
	pub fn reject(self, reason: E) -> SettleResult {
		self.settle(Err(reason))
	}

	/// Settle the promise with `outcome`, waking every registered follow-up.
	pub fn settle(self, outcome: Result<T, E>) -> SettleResult {
		let shared = self.shared.upgrade().ok_or(SettleError::Abandoned)?;

		let followups = {
			let mut state = shared.state.borrow_mut();
			match &mut *state {
				State::Pending { followups } => {
					let followups: Vec<Waker> =
						core::mem::take(followups).into_iter().flatten().collect();
					*state = State::Settled(outcome);
					followups
				}
				// A resolver only exists for promises created pending
				State::Settled(_) => Vec::new(),
			}
		};

		tracing::trace!(
			promise = %shared.id,
			followups = followups.len(),
			"promise settled"
		);

		for waker in followups {
			waker.wake();
		}
		Ok(())
	}
}

impl<T, E> fmt::Debug for Resolver<T, E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Resolver")
			.field("id", &self.id)
			.field("abandoned", &self.is_abandoned())
			.finish()
	}
}

/// Future returned by [`Promise::wait`].
#[must_use = "futures do nothing unless polled"]
pub struct Wait<T, E> {
	promise: Promise<T, E>,
	/// Index of this follow-up's waker once registered
	slot: Option<usize>,
}

impl<T: Clone, E: Clone> Future for Wait<T, E> {
	type Output = Result<T, E>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let this = &mut *self;
		let shared = &this.promise.shared;
		let mut state = shared.state.borrow_mut();

		match &mut *state {
			State::Settled(outcome) => Poll::Ready(outcome.clone()),
			State::Pending { followups } => {
				match this.slot {
					Some(index) => {
						if let Some(Some(waker)) = followups.get_mut(index) {
							if !waker.will_wake(cx.waker()) {
								*waker = cx.waker().clone();
							}
						}
					}
					None => {
						let waker = Some(cx.waker().clone());
						let index = match followups.iter().position(Option::is_none) {
							Some(free) => {
								followups[free] = waker;
								free
							}
							None => {
								followups.push(waker);
								followups.len() - 1
							}
						};
						this.slot = Some(index);
						shared.followups.set(shared.followups.get() + 1);
						tracing::trace!(promise = %shared.id, "follow-up registered");
					}
				}
				Poll::Pending
			}
		}
	}
}

impl<T, E> Drop for Wait<T, E> {
	fn drop(&mut self) {
		let Some(index) = self.slot else {
			return;
		};

		// The waker is dropped after the state borrow is released
		let released = match self.promise.shared.state.try_borrow_mut() {
			Ok(mut state) => match &mut *state {
				State::Pending { followups } => followups.get_mut(index).and_then(Option::take),
				State::Settled(_) => None,
			},
			Err(_) => None,
		};
		drop(released);
	}
}

impl<T, E> fmt::Debug for Wait<T, E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Wait")
			.field("promise", &self.promise.id())
			.field("registered", &self.slot.is_some())
			.finish()
	}
}
