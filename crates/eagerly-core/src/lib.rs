//! # eagerly-core
//!
//! Eager suspension for synchronous-looking computations over asynchronous
//! values.
//!
//! A computation reads its inputs through an [`Accessor`]. When every input is
//! already settled the computation finishes immediately and synchronously;
//! only a genuinely unsettled input makes it yield, and it resumes
//! automatically once that input settles.
//!
//! ## Building blocks
//!
//! - [`Promise`] / [`Resolver`]: single-threaded produces-later values with
//!   identity.
//! - [`SettlementCache`]: remembers how inspected promises settled, so
//!   repeated reads never re-subscribe or re-suspend.
//! - [`soon()`], [`soon_with`], [`soon_all`]: apply a continuation now if the
//!   input is known, later otherwise.
//! - [`Engine`] / [`eager`]: run a body with suspend-and-replay.
//!
//! ## Example
//!
//! ```
//! use eagerly_core::{eager, Accessor, Promise, Soon};
//!
//! let greeting = Promise::<String, String>::resolved("hello".into());
//! let result = eager(move |get: &Accessor<String>| {
//!     let greeting = get.get(&greeting)?;
//!     Ok(greeting.len())
//! });
//!
//! assert!(matches!(result, Soon::Now(5)));
//! ```
//!
//! Execution is single-threaded and cooperative: futures returned by this
//! crate are `!Send` and are driven by whatever executor the host uses.

pub mod cache;
pub mod cancel;
pub mod config;
pub mod dependency;
pub mod engine;
pub mod error;
pub mod interrupt;
pub mod promise;
pub mod soon;
pub mod value;

pub use cache::{CacheStatistics, SettlementCache, SettlementRecord, with_cache};
pub use cancel::{CancelSignal, CancelToken, NeverCancel};
pub use config::{EngineConfig, REPLAY_LIMIT_ENV};
pub use dependency::{Dependency, Lazy};
pub use engine::{Accessor, Engine, RunId, eager};
pub use error::{ConfigError, RunError, SettleError, SettleResult};
pub use interrupt::{Interrupt, Suspension, is_suspension};
pub use promise::{Promise, PromiseId, Resolver, Wait};
pub use soon::{Soon, soon, soon_all, soon_with};
pub use value::Value;
