//! Eager Suspension Engine
//!
//! The engine runs a synchronous-looking computation body that reads
//! asynchronous dependencies through an [`Accessor`]. When every dependency is
//! already settled the body completes on its first attempt and the run returns
//! [`Soon::Now`]. When the body touches an unsettled dependency the accessor
//! raises [`Interrupt::Suspended`]; the engine waits for the named dependencies,
//! records their settlements in the cache, and replays the body from the start.
//!
//! ## Replay contract
//!
//! Resumption is restart-from-start. A body may run any number of times for one
//! run, so it must be safe to re-enter: side effects before the last
//! dependency read repeat on every replay.
//!
//! ## Example
//!
//! ```
//! use eagerly_core::{eager, Accessor, Promise};
//!
//! let (price, resolver) = Promise::<u32, String>::pending();
//! let total = eager(move |get: &Accessor<String>| {
//!     let price = get.get(&price)?;
//!     Ok(price * 2)
//! });
//! assert!(total.is_later());
//!
//! resolver.resolve(21).unwrap();
//! assert_eq!(futures::executor::block_on(total.into_future()), Ok(42));
//! ```

use core::fmt;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::cache::{SettlementRecord, with_cache};
use crate::cancel::{CancelSignal, NeverCancel};
use crate::config::EngineConfig;
use crate::dependency::Dependency;
use crate::error::RunError;
use crate::interrupt::{Interrupt, Suspension};
use crate::promise::Promise;
use crate::soon::Soon;
use crate::value::Value;

/// Unique identifier for an engine run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(usize);

impl RunId {
	fn new() -> Self {
		static COUNTER: AtomicUsize = AtomicUsize::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}

	/// Raw numeric value of this identifier.
	pub fn as_usize(&self) -> usize {
		self.0
	}
}

impl fmt::Display for RunId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "run#{}", self.0)
	}
}

/// Read access to dependencies for one attempt of a run.
///
/// Every read either yields the dependency's payload, fails with the
/// dependency's rejection converted into `E`, or suspends the body.
pub struct Accessor<E> {
	run: RunId,
	attempt: usize,
	_error: PhantomData<fn() -> E>,
}

impl<E> Accessor<E> {
	fn new(run: RunId, attempt: usize) -> Self {
		Self {
			run,
			attempt,
			_error: PhantomData,
		}
	}

	/// The run this accessor belongs to.
	pub fn run_id(&self) -> RunId {
		self.run
	}

	/// Attempt number, `0` for the first invocation of the body.
	pub fn attempt(&self) -> usize {
		self.attempt
	}

	/// Read `dependency`, starting its production if needed.
	pub fn get<D>(&self, dependency: &D) -> Result<D::Output, Interrupt<E>>
	where
		D: Dependency + ?Sized,
		E: From<D::Error>,
	{
		self.value(dependency.load())
	}

	/// Unwrap an already loaded value.
	pub fn value<T, F>(&self, value: Value<T, F>) -> Result<T, Interrupt<E>>
	where
		T: Clone + 'static,
		F: Clone + 'static,
		E: From<F>,
	{
		let promise = match value {
			Value::Ready(value) => return Ok(value),
			Value::Later(promise) => promise,
		};

		match with_cache(|cache| cache.inspect(&promise)) {
			SettlementRecord::Fulfilled(value) => Ok(value),
			SettlementRecord::Rejected(reason) => Err(Interrupt::Failed(E::from(reason))),
			SettlementRecord::Pending => {
				tracing::debug!(
					run = %self.run,
					attempt = self.attempt,
					promise = %promise.id(),
					"dependency unsettled"
				);
				Err(Interrupt::Suspended(Suspension::on(&promise)))
			}
		}
	}

	/// Read a batch of dependencies.
	///
	/// Every member is loaded before any is unwrapped, so all of them start
	/// production in this attempt. The first member in order that is not
	/// fulfilled decides the outcome: a rejection fails the body, while a
	/// pending member suspends it on every pending member of the batch.
	pub fn all<D>(&self, dependencies: &[D]) -> Result<Vec<D::Output>, Interrupt<E>>
	where
		D: Dependency,
		E: From<D::Error>,
	{
		let values = dependencies.iter().map(Dependency::load).collect();
		self.values(values)
	}

	/// Unwrap a batch of already loaded values, as [`Accessor::all`] does.
	pub fn values<T, F>(&self, values: Vec<Value<T, F>>) -> Result<Vec<T>, Interrupt<E>>
	where
		T: Clone + 'static,
		F: Clone + 'static,
		E: From<F>,
	{
		let records: Vec<SettlementRecord<T, F>> = values
			.iter()
			.map(|value| match value {
				Value::Ready(value) => SettlementRecord::Fulfilled(value.clone()),
				Value::Later(promise) => with_cache(|cache| cache.inspect(promise)),
			})
			.collect();

		let pending: Vec<&Promise<T, F>> = values
			.iter()
			.zip(&records)
			.filter(|(_, record)| record.is_pending())
			.filter_map(|(value, _)| value.as_promise())
			.collect();

		let mut payloads = Vec::with_capacity(records.len());
		for record in records {
			match record {
				SettlementRecord::Fulfilled(value) => payloads.push(value),
				SettlementRecord::Rejected(reason) => {
					return Err(Interrupt::Failed(E::from(reason)));
				}
				SettlementRecord::Pending => {
					tracing::debug!(
						run = %self.run,
						attempt = self.attempt,
						pending = pending.len(),
						"batch unsettled"
					);
					return Err(Interrupt::Suspended(Suspension::on_all(pending)));
				}
			}
		}
		Ok(payloads)
	}
}

impl<E> fmt::Debug for Accessor<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Accessor")
			.field("run", &self.run)
			.field("attempt", &self.attempt)
			.finish()
	}
}

/// Runs computation bodies with suspend-and-replay.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine {
	config: EngineConfig,
}

impl Engine {
	/// Create an engine with `config`.
	pub fn new(config: EngineConfig) -> Self {
		Self { config }
	}

	/// Configuration of this engine.
	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	/// Run `body` until it completes or fails.
	///
	/// Returns [`Soon::Now`] when the first attempt succeeds. Any failure, and
	/// any value produced after a replay, arrives through [`Soon::Later`].
	pub fn run<T, E, B>(&self, body: B) -> Soon<T, RunError<E>>
	where
		T: 'static,
		E: 'static,
		B: FnMut(&Accessor<E>) -> Result<T, Interrupt<E>> + 'static,
	{
		self.run_cancellable(NeverCancel, body)
	}

	/// Run `body`, abandoning it if `cancel` is raised while it is suspended.
	///
	/// The signal is checked each time the awaited dependencies settle. A
	/// cancelled run never replays and its future never completes.
	pub fn run_cancellable<T, E, B, C>(&self, cancel: C, mut body: B) -> Soon<T, RunError<E>>
	where
		T: 'static,
		E: 'static,
		B: FnMut(&Accessor<E>) -> Result<T, Interrupt<E>> + 'static,
		C: CancelSignal + 'static,
	{
		let run = RunId::new();

		match body(&Accessor::new(run, 0)) {
			Ok(value) => {
				tracing::trace!(run = %run, "run completed synchronously");
				Soon::Now(value)
			}
			Err(Interrupt::Failed(error)) => Soon::rejected(RunError::Failed(error)),
			Err(Interrupt::Suspended(suspension)) => Soon::later(resume(
				run,
				self.config.replay_limit(),
				cancel,
				body,
				suspension,
			)),
		}
	}
}

async fn resume<T, E, B, C>(
	run: RunId,
	replay_limit: Option<usize>,
	cancel: C,
	mut body: B,
	mut suspension: Suspension,
) -> Result<T, RunError<E>>
where
	B: FnMut(&Accessor<E>) -> Result<T, Interrupt<E>>,
	C: CancelSignal,
{
	let mut replays = 0;

	loop {
		tracing::debug!(
			run = %run,
			attempt = replays,
			dependencies = ?suspension.dependencies(),
			"run suspended"
		);

		if let Some(limit) = replay_limit.filter(|&limit| replays >= limit) {
			tracing::debug!(run = %run, limit, "replay limit exceeded");
			return Err(RunError::ReplayLimitExceeded { limit });
		}

		suspension.wait().await;

		if cancel.is_cancelled() {
			tracing::debug!(run = %run, attempt = replays, "run cancelled, discarding");
			return core::future::pending().await;
		}

		replays += 1;
		tracing::debug!(run = %run, attempt = replays, "replaying");

		match body(&Accessor::new(run, replays)) {
			Ok(value) => return Ok(value),
			Err(Interrupt::Failed(error)) => return Err(RunError::Failed(error)),
			Err(Interrupt::Suspended(next)) => suspension = next,
		}
	}
}

/// Run `body` on a default [`Engine`].
pub fn eager<T, E, B>(body: B) -> Soon<T, RunError<E>>
where
	T: 'static,
	E: 'static,
	B: FnMut(&Accessor<E>) -> Result<T, Interrupt<E>> + 'static,
{
	Engine::default().run(body)
}
