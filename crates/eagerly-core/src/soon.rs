//! Now-or-Later Combinators
//!
//! [`soon`] applies a continuation to a [`Value`] synchronously when the value is
//! already known and asynchronously otherwise. [`soon_all`] does the same for an
//! ordered collection. Both return a [`Soon`]:
//!
//! - [`Soon::Now`] when the result is available synchronously (no future is
//!   allocated);
//! - [`Soon::Later`] when it is not, including every failure.
//!
//! Failures are always reported through [`Soon::Later`], even when they are
//! known synchronously. A known fulfilled value returns synchronously while a
//! known rejected value still rejects asynchronously; callers write a single
//! failure path regardless of timing.
//!
//! ## Example
//!
//! ```
//! use eagerly_core::{soon, soon_all, Promise, Soon, Value};
//!
//! let doubled = soon(Value::<i32, String>::ready(21), |n| Ok(n * 2));
//! assert_eq!(doubled.now(), Some(42));
//!
//! let all = soon_all(vec![
//!     Value::<i32, String>::Later(Promise::resolved(1)),
//!     Value::Ready(2),
//! ]);
//! assert_eq!(all.now(), Some(vec![1, 2]));
//! ```

use core::fmt;
use core::future::{Future, IntoFuture};

use futures::future::{self, Either, FutureExt, LocalBoxFuture, Ready};

use crate::cache::{SettlementRecord, with_cache};
use crate::promise::Promise;
use crate::value::Value;

/// A result that is available now or later.
pub enum Soon<T, E> {
	/// Synchronous success.
	Now(T),
	/// Asynchronous outcome, success or failure.
	Later(LocalBoxFuture<'static, Result<T, E>>),
}

impl<T, E> Soon<T, E> {
	/// Whether the result is available synchronously.
	pub fn is_now(&self) -> bool {
		matches!(self, Self::Now(_))
	}

	/// Whether the result is asynchronous.
	pub fn is_later(&self) -> bool {
		matches!(self, Self::Later(_))
	}

	/// The synchronous result, or `None` if the result is asynchronous.
	pub fn now(self) -> Option<T> {
		match self {
			Self::Now(value) => Some(value),
			Self::Later(_) => None,
		}
	}
}

impl<T: 'static, E: 'static> Soon<T, E> {
	/// An asynchronous rejection carrying `reason`.
	pub fn rejected(reason: E) -> Self {
		Self::Later(future::ready(Err(reason)).boxed_local())
	}

	/// An asynchronous outcome driven by `future`.
	pub fn later<F>(future: F) -> Self
	where
		F: Future<Output = Result<T, E>> + 'static,
	{
		Self::Later(future.boxed_local())
	}

	/// Chain a continuation with the same now-or-later contract as [`soon`].
	pub fn and_then<U, F>(self, continuation: F) -> Soon<U, E>
	where
		U: 'static,
		F: FnOnce(T) -> Result<U, E> + 'static,
	{
		match self {
			Self::Now(value) => apply_now(value, continuation),
			Self::Later(pending) => Soon::later(async move { continuation(pending.await?) }),
		}
	}

	/// Map the failure type.
	pub fn map_err<E2, F>(self, f: F) -> Soon<T, E2>
	where
		E2: 'static,
		F: FnOnce(E) -> E2 + 'static,
	{
		match self {
			Self::Now(value) => Soon::Now(value),
			Self::Later(pending) => Soon::later(async move { pending.await.map_err(f) }),
		}
	}
}

impl<T: fmt::Debug, E> fmt::Debug for Soon<T, E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Now(value) => f.debug_tuple("Now").field(value).finish(),
			Self::Later(_) => f.debug_tuple("Later").field(&"..").finish(),
		}
	}
}

impl<T, E> IntoFuture for Soon<T, E> {
	type Output = Result<T, E>;
	type IntoFuture = Either<Ready<Result<T, E>>, LocalBoxFuture<'static, Result<T, E>>>;

	fn into_future(self) -> Self::IntoFuture {
		match self {
			Self::Now(value) => Either::Left(future::ready(Ok(value))),
			Self::Later(pending) => Either::Right(pending),
		}
	}
}

fn apply_now<T, U, E, F>(value: T, continuation: F) -> Soon<U, E>
where
	U: 'static,
	E: 'static,
	F: FnOnce(T) -> Result<U, E>,
{
	match continuation(value) {
		Ok(result) => Soon::Now(result),
		Err(reason) => Soon::rejected(reason),
	}
}

/// Record a settled outcome of `promise` in the thread's cache.
pub(crate) fn record_outcome<T, E>(promise: &Promise<T, E>, outcome: &Result<T, E>)
where
	T: Clone + 'static,
	E: Clone + 'static,
{
	with_cache(|cache| cache.set(promise, SettlementRecord::from(outcome.clone())));
}

/// Apply `continuation` to `value` now if it is known, later otherwise.
///
/// - Concrete or cached-fulfilled: the continuation runs synchronously. `Ok`
///   yields [`Soon::Now`]; `Err` yields an asynchronous rejection.
/// - Cached-rejected: the continuation is skipped and the cached reason is
///   reported as an asynchronous rejection.
/// - Pending: the returned future waits for the promise, records its outcome in
///   the cache, then runs the continuation on fulfillment or propagates the
///   rejection.
///
/// # Example
///
/// ```
/// use eagerly_core::{soon, Promise, Value};
///
/// let (promise, resolver) = Promise::<i32, String>::pending();
/// let later = soon(Value::Later(promise), |n| Ok(n + 1));
/// assert!(later.is_later());
///
/// resolver.resolve(1).unwrap();
/// assert_eq!(futures::executor::block_on(later.into_future()), Ok(2));
/// ```
pub fn soon<T, E, U, F>(value: Value<T, E>, continuation: F) -> Soon<U, E>
where
	T: Clone + 'static,
	E: Clone + 'static,
	U: 'static,
	F: FnOnce(T) -> Result<U, E> + 'static,
{
	let promise = match value {
		Value::Ready(value) => return apply_now(value, continuation),
		Value::Later(promise) => promise,
	};

	match with_cache(|cache| cache.inspect(&promise)) {
		SettlementRecord::Fulfilled(value) => apply_now(value, continuation),
		SettlementRecord::Rejected(reason) => Soon::rejected(reason),
		SettlementRecord::Pending => Soon::later(async move {
			let outcome = promise.wait().await;
			record_outcome(&promise, &outcome);
			continuation(outcome?)
		}),
	}
}

/// Curried form of [`soon`]: a reusable function of the value.
///
/// # Example
///
/// ```
/// use eagerly_core::{soon_with, Value};
///
/// let describe = soon_with(|n: i32| Ok::<_, String>(format!("#{n}")));
/// assert_eq!(describe(Value::ready(1)).now().as_deref(), Some("#1"));
/// assert_eq!(describe(Value::ready(2)).now().as_deref(), Some("#2"));
/// ```
pub fn soon_with<T, E, U, F>(continuation: F) -> impl Fn(Value<T, E>) -> Soon<U, E>
where
	T: Clone + 'static,
	E: Clone + 'static,
	U: 'static,
	F: Fn(T) -> Result<U, E> + Clone + 'static,
{
	move |value| soon(value, continuation.clone())
}

/// Collect an ordered sequence of values now if all are known, later otherwise.
///
/// When every element is concrete or cached-fulfilled the payloads are returned
/// as [`Soon::Now`]. Otherwise the returned future waits for the whole
/// collection, rejecting as soon as any element rejects; on success every
/// promise element is recorded as fulfilled in the cache before the payloads
/// are returned. An empty input yields `Soon::Now(vec![])`.
pub fn soon_all<T, E, I>(values: I) -> Soon<Vec<T>, E>
where
	T: Clone + 'static,
	E: Clone + 'static,
	I: IntoIterator<Item = Value<T, E>>,
{
	let values: Vec<Value<T, E>> = values.into_iter().collect();

	let known: Option<Vec<T>> = values
		.iter()
		.map(|value| match value {
			Value::Ready(value) => Some(value.clone()),
			Value::Later(promise) => match with_cache(|cache| cache.inspect(promise)) {
				SettlementRecord::Fulfilled(value) => Some(value),
				SettlementRecord::Pending | SettlementRecord::Rejected(_) => None,
			},
		})
		.collect();

	if let Some(payloads) = known {
		return Soon::Now(payloads);
	}

	Soon::later(async move {
		let payloads = future::try_join_all(values.iter().map(|value| match value {
			Value::Ready(value) => Either::Left(future::ready(Ok(value.clone()))),
			Value::Later(promise) => Either::Right(promise.wait()),
		}))
		.await?;

		for (value, payload) in values.iter().zip(&payloads) {
			if let Value::Later(promise) = value {
				record_outcome(promise, &Ok(payload.clone()));
			}
		}
		Ok(payloads)
	})
}
