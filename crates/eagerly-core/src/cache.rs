//! Settlement Cache
//!
//! The settlement cache remembers how each inspected [`Promise`] settled, keyed
//! by the promise's identity. Repeated inspection of a settled promise is a plain
//! lookup: no follow-up is registered and nothing suspends.
//!
//! ## Lifecycle
//!
//! 1. An entry is created lazily the first time a promise is inspected, seeded
//!    from the promise's state at that moment.
//! 2. The entry is written once more, when the promise settles.
//! 3. The entry is evicted when the last handle of the promise is dropped.
//!
//! A terminal record never changes: later writes are ignored, so concurrent
//! observers racing to record the same settlement are harmless.
//!
//! ## Example
//!
//! ```
//! use eagerly_core::{Promise, SettlementRecord, with_cache};
//!
//! let (promise, resolver) = Promise::<i32, String>::pending();
//! with_cache(|cache| {
//!     assert_eq!(cache.inspect(&promise), SettlementRecord::Pending);
//!     assert!(cache.set(&promise, SettlementRecord::Fulfilled(1)));
//!     assert_eq!(cache.inspect(&promise), SettlementRecord::Fulfilled(1));
//! });
//! # drop(resolver);
//! ```

use core::any::Any;
use core::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::promise::{Promise, PromiseId};
use crate::value::Value;

/// Resolution state of a single asynchronous value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettlementRecord<T, E> {
	/// The value has not settled yet.
	Pending,
	/// The value settled successfully.
	Fulfilled(T),
	/// The value settled with a failure.
	Rejected(E),
}

impl<T, E> SettlementRecord<T, E> {
	/// Whether the record is still pending.
	pub fn is_pending(&self) -> bool {
		matches!(self, Self::Pending)
	}

	/// Whether the record is terminal.
	pub fn is_settled(&self) -> bool {
		!self.is_pending()
	}

	/// Whether the record is fulfilled.
	pub fn is_fulfilled(&self) -> bool {
		matches!(self, Self::Fulfilled(_))
	}

	/// Whether the record is rejected.
	pub fn is_rejected(&self) -> bool {
		matches!(self, Self::Rejected(_))
	}

	/// The settled outcome, or `None` while pending.
	pub fn into_result(self) -> Option<Result<T, E>> {
		match self {
			Self::Pending => None,
			Self::Fulfilled(value) => Some(Ok(value)),
			Self::Rejected(reason) => Some(Err(reason)),
		}
	}
}

impl<T, E> From<Result<T, E>> for SettlementRecord<T, E> {
	fn from(outcome: Result<T, E>) -> Self {
		match outcome {
			Ok(value) => Self::Fulfilled(value),
			Err(reason) => Self::Rejected(reason),
		}
	}
}

/// Snapshot of cache activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatistics {
	/// Inspections answered by a terminal record
	pub hits: u64,
	/// Inspections that found the promise still pending
	pub misses: u64,
	/// Terminal records written
	pub settlements: u64,
	/// Current number of entries
	pub entry_count: u64,
}

impl CacheStatistics {
	/// Total number of inspections.
	pub fn inspections(&self) -> u64 {
		self.hits + self.misses
	}

	/// Calculate hit rate (0.0 to 1.0)
	///
	/// # Examples
	///
	/// ```
	/// use eagerly_core::CacheStatistics;
	///
	/// let stats = CacheStatistics {
	///     hits: 3,
	///     misses: 1,
	///     ..Default::default()
	/// };
	/// assert_eq!(stats.hit_rate(), 0.75);
	/// ```
	pub fn hit_rate(&self) -> f64 {
		let total = self.inspections();
		if total == 0 {
			0.0
		} else {
			self.hits as f64 / total as f64
		}
	}
}

/// Type-erased record, downcast back to `SettlementRecord<T, E>` on lookup
type ErasedRecord = Box<dyn Any>;

/// Identity-keyed store of settlement records.
///
/// One cache exists per thread and is reached through [`with_cache`]. Borrows
/// of the table are never held while records are dropped, so finalization hooks
/// of promises nested inside payloads can safely re-enter the cache.
pub struct SettlementCache {
	entries: RefCell<HashMap<PromiseId, ErasedRecord>>,
	hits: Cell<u64>,
	misses: Cell<u64>,
	settlements: Cell<u64>,
}

impl SettlementCache {
	/// Create an empty cache.
	pub fn new() -> Self {
		Self {
			entries: RefCell::new(HashMap::new()),
			hits: Cell::new(0),
			misses: Cell::new(0),
			settlements: Cell::new(0),
		}
	}

	/// Look up the record of `value` without creating an entry.
	///
	/// Returns `None` when the value is concrete ([`Value::Ready`]) or when the
	/// promise has never been inspected.
	pub fn get<T, E>(&self, value: &Value<T, E>) -> Option<SettlementRecord<T, E>>
	where
		T: Clone + 'static,
		E: Clone + 'static,
	{
		match value {
			Value::Ready(_) => None,
			Value::Later(promise) => self.lookup(promise.id()),
		}
	}

	/// Inspect `promise`, creating its entry on first inspection.
	///
	/// A new entry is seeded from the promise's own state, so a promise created
	/// already settled is known right away.
	pub fn inspect<T, E>(&self, promise: &Promise<T, E>) -> SettlementRecord<T, E>
	where
		T: Clone + 'static,
		E: Clone + 'static,
	{
		let record = match self.lookup(promise.id()) {
			Some(record) => record,
			None => {
				let record = promise
					.peek()
					.map_or(SettlementRecord::Pending, SettlementRecord::from);
				self.install(promise.id(), record.clone());
				record
			}
		};

		let counter = if record.is_settled() {
			&self.hits
		} else {
			&self.misses
		};
		counter.set(counter.get() + 1);
		record
	}

	/// Install a terminal record for `promise`.
	///
	/// Returns `true` when the record was written. Writing over a terminal
	/// record is a no-op, as is passing [`SettlementRecord::Pending`].
	pub fn set<T, E>(&self, promise: &Promise<T, E>, record: SettlementRecord<T, E>) -> bool
	where
		T: Clone + 'static,
		E: Clone + 'static,
	{
		if record.is_pending() {
			return false;
		}

		let id = promise.id();
		if self
			.lookup::<T, E>(id)
			.is_some_and(|existing| existing.is_settled())
		{
			return false;
		}

		self.install(id, record);
		self.settlements.set(self.settlements.get() + 1);
		tracing::trace!(promise = %id, "settlement recorded");
		true
	}

	/// Whether an entry exists for `id`.
	pub fn contains(&self, id: PromiseId) -> bool {
		self.entries.borrow().contains_key(&id)
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.entries.borrow().len()
	}

	/// Whether the cache has no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.borrow().is_empty()
	}

	/// Snapshot of the cache counters.
	pub fn statistics(&self) -> CacheStatistics {
		CacheStatistics {
			hits: self.hits.get(),
			misses: self.misses.get(),
			settlements: self.settlements.get(),
			entry_count: self.len() as u64,
		}
	}

	/// Drop the entry of a finalized promise.
	pub(crate) fn evict(&self, id: PromiseId) {
		let removed = match self.entries.try_borrow_mut() {
			Ok(mut entries) => entries.remove(&id),
			Err(_) => None,
		};
		drop(removed);
	}

	fn lookup<T, E>(&self, id: PromiseId) -> Option<SettlementRecord<T, E>>
	where
		T: Clone + 'static,
		E: Clone + 'static,
	{
		self.entries
			.borrow()
			.get(&id)
			.and_then(|entry| entry.downcast_ref::<SettlementRecord<T, E>>())
			.cloned()
	}

	fn install<T, E>(&self, id: PromiseId, record: SettlementRecord<T, E>)
	where
		T: 'static,
		E: 'static,
	{
		let replaced = {
			let mut entries = self.entries.borrow_mut();
			entries.insert(id, Box::new(record))
		};
		drop(replaced);
	}
}

impl Default for SettlementCache {
	fn default() -> Self {
		Self::new()
	}
}

impl core::fmt::Debug for SettlementCache {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("SettlementCache")
			.field("statistics", &self.statistics())
			.finish()
	}
}

// Thread-local settlement cache
//
// Execution is single-threaded, so this is the process-wide cache for every
// run and combinator on the thread.
thread_local! {
	static CACHE: SettlementCache = SettlementCache::new();
}

/// Run `f` against the thread's settlement cache.
///
/// # Example
///
/// ```
/// use eagerly_core::{Promise, Value, with_cache};
///
/// let promise = Promise::<i32, ()>::resolved(1);
/// let value = Value::from(promise.clone());
///
/// with_cache(|cache| {
///     assert_eq!(cache.get(&value), None);
///     assert!(cache.inspect(&promise).is_fulfilled());
///     assert!(cache.get(&value).is_some());
/// });
/// ```
pub fn with_cache<F, R>(f: F) -> R
where
	F: FnOnce(&SettlementCache) -> R,
{
	CACHE.with(f)
}

/// Access the cache from Drop implementations.
///
/// Returns None if the thread-local storage has been destroyed.
pub(crate) fn try_with_cache<F, R>(f: F) -> Option<R>
where
	F: FnOnce(&SettlementCache) -> R,
{
	CACHE.try_with(f).ok()
}
