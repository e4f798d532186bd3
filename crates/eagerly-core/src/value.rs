//! Values that are either concrete now or produced later.

use crate::promise::Promise;

/// A value that is either already concrete or a [`Promise`] of one.
#[derive(Debug)]
pub enum Value<T, E> {
	/// An already concrete value.
	Ready(T),
	/// A value produced later.
	Later(Promise<T, E>),
}

impl<T, E> Value<T, E> {
	/// Wrap an already concrete value.
	pub fn ready(value: T) -> Self {
		Self::Ready(value)
	}

	/// Whether the value is concrete.
	pub fn is_ready(&self) -> bool {
		matches!(self, Self::Ready(_))
	}

	/// The underlying promise, if the value is produced later.
	pub fn as_promise(&self) -> Option<&Promise<T, E>> {
		match self {
			Self::Ready(_) => None,
			Self::Later(promise) => Some(promise),
		}
	}
}

impl<T: Clone, E> Clone for Value<T, E> {
	fn clone(&self) -> Self {
		match self {
			Self::Ready(value) => Self::Ready(value.clone()),
			Self::Later(promise) => Self::Later(promise.clone()),
		}
	}
}

impl<T, E> From<Promise<T, E>> for Value<T, E> {
	fn from(promise: Promise<T, E>) -> Self {
		Self::Later(promise)
	}
}
