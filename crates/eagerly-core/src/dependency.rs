//! Dependencies a computation body reads.
//!
//! The surrounding store decides what a dependency is; the engine only needs
//! [`Dependency::load`], which yields the dependency's current [`Value`] and
//! starts its production if that has not happened yet.

use core::cell::OnceCell;
use core::fmt;
use std::rc::Rc;

use crate::promise::Promise;
use crate::value::Value;

/// Something a computation body can read through an [`Accessor`](crate::Accessor).
pub trait Dependency {
	/// Payload of a fulfilled read.
	type Output: Clone + 'static;
	/// Reason of a rejected read.
	type Error: Clone + 'static;

	/// Current value, starting production on first call.
	fn load(&self) -> Value<Self::Output, Self::Error>;
}

impl<T, E> Dependency for Promise<T, E>
where
	T: Clone + 'static,
	E: Clone + 'static,
{
	type Output = T;
	type Error = E;

	fn load(&self) -> Value<T, E> {
		Value::Later(self.clone())
	}
}

impl<T, E> Dependency for Value<T, E>
where
	T: Clone + 'static,
	E: Clone + 'static,
{
	type Output = T;
	type Error = E;

	fn load(&self) -> Value<T, E> {
		self.clone()
	}
}

impl<D: Dependency + ?Sized> Dependency for &D {
	type Output = D::Output;
	type Error = D::Error;

	fn load(&self) -> Value<D::Output, D::Error> {
		(**self).load()
	}
}

struct LazyInner<T, E> {
	producer: Box<dyn Fn() -> Value<T, E>>,
	value: OnceCell<Value<T, E>>,
}

/// A dependency produced on first load and memoized afterwards.
///
/// Clones share the same producer and memoized value, so a body replayed any
/// number of times starts production exactly once.
///
/// # Example
///
/// ```
/// use eagerly_core::{Dependency, Lazy, Value};
///
/// let user = Lazy::new(|| Value::<_, String>::ready("alice"));
/// assert!(!user.is_started());
///
/// assert!(user.load().is_ready());
/// assert!(user.is_started());
/// ```
pub struct Lazy<T, E> {
	inner: Rc<LazyInner<T, E>>,
}

impl<T, E> Lazy<T, E> {
	/// Wrap `producer`, which runs on the first load.
	pub fn new<F>(producer: F) -> Self
	where
		F: Fn() -> Value<T, E> + 'static,
	{
		Self {
			inner: Rc::new(LazyInner {
				producer: Box::new(producer),
				value: OnceCell::new(),
			}),
		}
	}

	/// Whether production has started.
	pub fn is_started(&self) -> bool {
		self.inner.value.get().is_some()
	}
}

impl<T, E> Clone for Lazy<T, E> {
	fn clone(&self) -> Self {
		Self {
			inner: Rc::clone(&self.inner),
		}
	}
}

impl<T, E> fmt::Debug for Lazy<T, E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Lazy")
			.field("started", &self.is_started())
			.finish()
	}
}

impl<T, E> Dependency for Lazy<T, E>
where
	T: Clone + 'static,
	E: Clone + 'static,
{
	type Output = T;
	type Error = E;

	fn load(&self) -> Value<T, E> {
		self.inner
			.value
			.get_or_init(|| {
				let value = (self.inner.producer)();
				tracing::trace!(
					promise = ?value.as_promise().map(Promise::id),
					"lazy dependency started"
				);
				value
			})
			.clone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::Cell;

	#[test]
	fn test_lazy_produces_once() {
		let runs = Rc::new(Cell::new(0));
		let runs_clone = runs.clone();
		let lazy = Lazy::<i32, ()>::new(move || {
			runs_clone.set(runs_clone.get() + 1);
			Value::Later(Promise::resolved(5))
		});
		let shared = lazy.clone();

		assert_eq!(runs.get(), 0);
		let first = lazy.load();
		let second = shared.load();

		assert_eq!(runs.get(), 1);
		assert!(shared.is_started());
		assert_eq!(
			first.as_promise().map(Promise::id),
			second.as_promise().map(Promise::id)
		);
	}

	#[test]
	fn test_promise_and_value_load_themselves() {
		let promise = Promise::<i32, ()>::resolved(1);
		let loaded = promise.load();
		assert!(loaded.as_promise().is_some_and(|p| p.ptr_eq(&promise)));

		let value = Value::<i32, ()>::ready(2);
		assert!(matches!((&value).load(), Value::Ready(2)));
	}
}
