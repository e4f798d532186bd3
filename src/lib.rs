//! # eagerly
//!
//! Write a computation as if it were synchronous while some of its inputs are
//! asynchronous values that may not have settled yet.
//!
//! If every input the computation reads is already settled, it runs to
//! completion immediately and synchronously. Only a genuinely unsettled input
//! makes it yield; it resumes automatically once that input settles.
//!
//! ## Quick Example
//!
//! ```
//! use eagerly::prelude::*;
//!
//! let (user, resolve_user) = Promise::<String, String>::pending();
//! let theme = Promise::<String, String>::resolved("dark".into());
//!
//! let banner = eager(move |get: &Accessor<String>| {
//!     let theme = get.get(&theme)?;
//!     let user = get.get(&user)?;
//!     Ok(format!("{user} ({theme})"))
//! });
//! assert!(banner.is_later());
//!
//! resolve_user.resolve("ada".into()).unwrap();
//! let banner = futures::executor::block_on(banner.into_future());
//! assert_eq!(banner.unwrap(), "ada (dark)");
//! ```
//!
//! ## Modules
//!
//! The building blocks live in [`eagerly_core`] and are re-exported here:
//!
//! - [`cache`]: settlement cache keyed by promise identity
//! - [`mod@soon`]: now-or-later combinators
//! - [`engine`]: suspend-and-replay engine
//!
//! ## Configuration
//!
//! [`EngineConfig::from_env`] reads `EAGERLY_REPLAY_LIMIT` to bound how often a
//! single run may replay.

// `soon` brings in both the module and the combinator
pub use eagerly_core::{
	cache, cancel, config, dependency, engine, error, interrupt, promise, soon, value,
};

pub use eagerly_core::{
	Accessor, CacheStatistics, CancelSignal, CancelToken, ConfigError, Dependency, Engine,
	EngineConfig, Interrupt, Lazy, NeverCancel, Promise, PromiseId, REPLAY_LIMIT_ENV, Resolver,
	RunError, RunId, SettleError, SettleResult, SettlementCache, SettlementRecord, Soon,
	Suspension, Value, Wait, eager, is_suspension, soon_all, soon_with, with_cache,
};

/// Re-export commonly used types
pub mod prelude {
	pub use crate::{
		Accessor,
		CancelSignal,
		CancelToken,
		Dependency,
		Engine,
		EngineConfig,
		Interrupt,
		Lazy,
		Promise,
		RunError,
		Soon,
		Value,
		eager,
		is_suspension,
		soon,
		soon_all,
		soon_with,
	};
}
