//! Integration tests for the eager suspension engine
//!
//! These tests verify:
//! 1. Bodies over settled dependencies complete synchronously
//! 2. Unsettled dependencies suspend the body, which replays once they settle
//! 3. Batch reads suspend at most once
//! 4. Cancellation and the replay limit stop a suspended run

use eagerly_core::{
	Accessor, CancelToken, Engine, EngineConfig, Interrupt, Lazy, Promise, Resolver, RunError,
	SettlementRecord, Value, eager, is_suspension, with_cache,
};
use serial_test::serial;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio_test::task;
use tokio_test::{assert_pending, assert_ready};

fn counter() -> (Rc<Cell<usize>>, Rc<Cell<usize>>) {
	let count = Rc::new(Cell::new(0));
	(count.clone(), count)
}

#[test]
#[serial]
fn test_settled_dependencies_complete_synchronously() {
	let price = Promise::<u32, String>::resolved(10);
	let quantity = Value::<u32, String>::ready(3);

	let total = eager(move |get: &Accessor<String>| {
		let price = get.get(&price)?;
		let quantity = get.get(&quantity)?;
		Ok(price * quantity)
	});

	assert_eq!(total.now(), Some(30));
}

/// Reads A (pending) then B: on A's rejection B is never loaded
#[test]
#[serial]
fn test_rejected_dependency_stops_before_later_reads() {
	let (a, resolver_a) = Promise::<i32, String>::pending();
	let b = Lazy::new(|| Value::<i32, String>::ready(10));
	let b_handle = b.clone();

	let result = eager(move |get: &Accessor<String>| {
		let a = get.get(&a)?;
		let b = get.get(&b)?;
		Ok(a + b)
	});
	let mut running = task::spawn(result.into_future());
	assert_pending!(running.poll());
	assert!(!b_handle.is_started());

	resolver_a.reject("a failed".to_string()).unwrap();

	assert_eq!(
		assert_ready!(running.poll()),
		Err(RunError::Failed("a failed".to_string()))
	);
	assert!(!b_handle.is_started());
}

/// Reads A (pending) then B: on A's fulfillment B is loaded during the replay
#[test]
#[serial]
fn test_fulfilled_dependency_loads_later_reads_on_replay() {
	let (a, resolver_a) = Promise::<i32, String>::pending();
	let b = Lazy::new(|| Value::<i32, String>::ready(10));
	let b_handle = b.clone();
	let (attempts, attempts_in_body) = counter();

	let result = eager(move |get: &Accessor<String>| {
		attempts_in_body.set(attempts_in_body.get() + 1);
		let a = get.get(&a)?;
		let b = get.get(&b)?;
		Ok(a + b)
	});
	let mut running = task::spawn(result.into_future());
	assert_pending!(running.poll());
	assert!(!b_handle.is_started());

	resolver_a.resolve(1).unwrap();

	assert_eq!(assert_ready!(running.poll()), Ok(11));
	assert!(b_handle.is_started());
	assert_eq!(attempts.get(), 2);
}

#[test]
#[serial]
fn test_batch_read_suspends_once() {
	let (a, resolver_a) = Promise::<i32, ()>::pending();
	let (b, resolver_b) = Promise::<i32, ()>::pending();
	let (attempts, attempts_in_body) = counter();

	let result = eager(move |get: &Accessor<()>| {
		attempts_in_body.set(attempts_in_body.get() + 1);
		let values = get.all(&[a.clone(), b.clone()])?;
		Ok(values.iter().sum::<i32>())
	});
	let mut running = task::spawn(result.into_future());
	assert_pending!(running.poll());

	resolver_a.resolve(1).unwrap();
	assert_pending!(running.poll());
	assert_eq!(attempts.get(), 1);

	resolver_b.resolve(2).unwrap();
	assert_eq!(assert_ready!(running.poll()), Ok(3));
	assert_eq!(attempts.get(), 2);
}

/// A rejected member fails the run while another member is still pending
#[test]
#[serial]
fn test_batch_rejection_does_not_wait_for_pending_members() {
	let (a, resolver_a) = Promise::<i32, String>::pending();
	let (b, _resolver_b) = Promise::<i32, String>::pending();
	let (attempts, attempts_in_body) = counter();

	let result = eager(move |get: &Accessor<String>| {
		attempts_in_body.set(attempts_in_body.get() + 1);
		let values = get.all(&[a.clone(), b.clone()])?;
		Ok(values.iter().sum::<i32>())
	});
	let mut running = task::spawn(result.into_future());
	assert_pending!(running.poll());

	resolver_a.reject("a failed".to_string()).unwrap();

	// b never settles
	assert!(running.is_woken());
	assert_eq!(
		assert_ready!(running.poll()),
		Err(RunError::Failed("a failed".to_string()))
	);
	assert_eq!(attempts.get(), 2);
}

#[test]
#[serial]
fn test_sequential_reads_suspend_per_dependency() {
	let (a, resolver_a) = Promise::<i32, ()>::pending();
	let (b, resolver_b) = Promise::<i32, ()>::pending();
	let (attempts, attempts_in_body) = counter();

	let result = eager(move |get: &Accessor<()>| {
		attempts_in_body.set(attempts_in_body.get() + 1);
		let a = get.get(&a)?;
		let b = get.get(&b)?;
		Ok(a + b)
	});
	let mut running = task::spawn(result.into_future());
	assert_pending!(running.poll());

	resolver_a.resolve(1).unwrap();
	assert_pending!(running.poll());
	assert_eq!(attempts.get(), 2);

	resolver_b.resolve(2).unwrap();
	assert_eq!(assert_ready!(running.poll()), Ok(3));
	assert_eq!(attempts.get(), 3);
}

#[test]
#[serial]
fn test_batch_starts_every_member() {
	let resolvers: Rc<RefCell<Vec<Resolver<i32, ()>>>> = Rc::new(RefCell::new(Vec::new()));
	let members: Vec<Lazy<i32, ()>> = (0..3)
		.map(|_| {
			let resolvers = resolvers.clone();
			Lazy::new(move || {
				let (promise, resolver) = Promise::pending();
				resolvers.borrow_mut().push(resolver);
				Value::Later(promise)
			})
		})
		.collect();
	let handles = members.clone();

	let result = eager(move |get: &Accessor<()>| get.all(&members));
	let mut running = task::spawn(result.into_future());
	assert_pending!(running.poll());
	assert!(handles.iter().all(Lazy::is_started));

	for (n, resolver) in resolvers.borrow_mut().drain(..).enumerate() {
		resolver.resolve(n as i32).unwrap();
	}
	assert_eq!(assert_ready!(running.poll()), Ok(vec![0, 1, 2]));
}

/// Side effects before the last read repeat on every replay
#[test]
#[serial]
fn test_side_effects_repeat_on_replay() {
	let (a, resolver_a) = Promise::<&'static str, ()>::pending();
	let log = Rc::new(RefCell::new(Vec::new()));
	let log_clone = log.clone();

	let result = eager(move |get: &Accessor<()>| {
		log_clone.borrow_mut().push(format!("enter {}", get.attempt()));
		let a = get.get(&a)?;
		log_clone.borrow_mut().push(format!("read {a}"));
		Ok(a)
	});
	let mut running = task::spawn(result.into_future());
	assert_pending!(running.poll());
	assert_eq!(*log.borrow(), vec!["enter 0"]);

	resolver_a.resolve("a").unwrap();
	assert_eq!(assert_ready!(running.poll()), Ok("a"));
	assert_eq!(*log.borrow(), vec!["enter 0", "enter 1", "read a"]);
}

#[test]
#[serial]
fn test_broad_handlers_forward_suspension() {
	let (a, resolver_a) = Promise::<i32, String>::pending();

	let result = eager(move |get: &Accessor<String>| {
		let value = match get.get(&a) {
			Ok(value) => value,
			Err(interrupt) if is_suspension(&interrupt) => return Err(interrupt),
			Err(_) => -1,
		};
		Ok(value)
	});
	let mut running = task::spawn(result.into_future());
	assert_pending!(running.poll());

	resolver_a.reject("unavailable".to_string()).unwrap();

	assert_eq!(assert_ready!(running.poll()), Ok(-1));
}

#[test]
#[serial]
fn test_cancelled_run_neither_replays_nor_fails() {
	let (a, resolver_a) = Promise::<i32, String>::pending();
	let a_handle = a.clone();
	let token = CancelToken::new();
	let (attempts, attempts_in_body) = counter();

	let result = Engine::default().run_cancellable(token.clone(), move |get: &Accessor<String>| {
		attempts_in_body.set(attempts_in_body.get() + 1);
		get.get(&a)
	});
	let mut running = task::spawn(result.into_future());
	assert_pending!(running.poll());

	token.cancel();
	resolver_a.resolve(1).unwrap();

	assert_pending!(running.poll());
	assert_eq!(attempts.get(), 1);

	// The settlement is still recorded for other observers
	assert_eq!(
		with_cache(|cache| cache.inspect(&a_handle)),
		SettlementRecord::Fulfilled(1)
	);
}

#[test]
#[serial]
fn test_cancelling_after_completion_has_no_effect() {
	let token = CancelToken::new();
	let result = Engine::default().run_cancellable(token.clone(), |get: &Accessor<()>| {
		get.get(&Promise::<i32, ()>::resolved(1))
	});
	token.cancel();

	assert_eq!(result.now(), Some(1));
}

#[test]
#[serial]
fn test_replay_limit_stops_runaway_body() {
	let resolvers: Rc<RefCell<Vec<Resolver<i32, ()>>>> = Rc::new(RefCell::new(Vec::new()));
	let resolvers_in_body = resolvers.clone();
	let (attempts, attempts_in_body) = counter();
	let engine = Engine::new(EngineConfig::new().with_replay_limit(Some(2)));

	// Mints a fresh pending promise on every attempt
	let result = engine.run(move |get: &Accessor<()>| {
		attempts_in_body.set(attempts_in_body.get() + 1);
		let (promise, resolver) = Promise::pending();
		resolvers_in_body.borrow_mut().push(resolver);
		get.get(&promise)
	});
	let mut running = task::spawn(result.into_future());

	assert_pending!(running.poll());
	resolvers.borrow_mut().remove(0).resolve(0).unwrap();
	assert_pending!(running.poll());
	resolvers.borrow_mut().remove(0).resolve(0).unwrap();

	assert_eq!(
		assert_ready!(running.poll()),
		Err(RunError::ReplayLimitExceeded { limit: 2 })
	);
	assert_eq!(attempts.get(), 3);
}

#[test]
#[serial]
fn test_replay_limit_from_lookup() {
	let config = EngineConfig::from_lookup(|key| {
		(key == eagerly_core::REPLAY_LIMIT_ENV).then(|| "1".to_string())
	})
	.unwrap();
	let engine = Engine::new(config);
	assert_eq!(engine.config().replay_limit(), Some(1));

	let (a, resolver_a) = Promise::<i32, ()>::pending();
	let result = engine.run(move |get: &Accessor<()>| get.get(&a));
	let mut running = task::spawn(result.into_future());
	assert_pending!(running.poll());

	// One replay is within the limit
	resolver_a.resolve(4).unwrap();
	assert_eq!(assert_ready!(running.poll()), Ok(4));
}

#[test]
#[serial]
fn test_body_failure_after_replay_is_reported() {
	let (a, resolver_a) = Promise::<i32, String>::pending();

	let result = eager(move |get: &Accessor<String>| {
		let a = get.get(&a)?;
		if a < 0 {
			return Err(Interrupt::Failed(format!("negative: {a}")));
		}
		Ok(a)
	});
	let mut running = task::spawn(result.into_future());
	assert_pending!(running.poll());

	resolver_a.resolve(-3).unwrap();

	let err = assert_ready!(running.poll()).unwrap_err();
	assert_eq!(err.failure().map(String::as_str), Some("negative: -3"));
	assert_eq!(err.to_string(), "computation failed: negative: -3");
}

#[derive(Debug, Clone, PartialEq)]
enum LoadError {
	NotFound(String),
}

#[derive(Debug, PartialEq)]
enum ViewError {
	Load(LoadError),
}

impl From<LoadError> for ViewError {
	fn from(error: LoadError) -> Self {
		Self::Load(error)
	}
}

#[test]
#[serial]
fn test_dependency_rejection_converts_into_body_error() {
	let profile = Promise::<String, LoadError>::rejected(LoadError::NotFound("profile".into()));

	let result = eager(move |get: &Accessor<ViewError>| get.get(&profile));

	let mut running = task::spawn(result.into_future());
	assert_eq!(
		assert_ready!(running.poll()),
		Err(RunError::Failed(ViewError::Load(LoadError::NotFound(
			"profile".into()
		))))
	);
}

#[tokio::test]
#[serial]
async fn test_run_alongside_producer() {
	let (a, resolver_a) = Promise::<i32, ()>::pending();
	let run = eager(move |get: &Accessor<()>| Ok(get.get(&a)? * 2));

	let (outcome, ()) = tokio::join!(run.into_future(), async move {
		tokio::task::yield_now().await;
		resolver_a.resolve(21).unwrap();
	});

	assert_eq!(outcome, Ok(42));
}
