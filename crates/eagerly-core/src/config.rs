//! Engine configuration.

use crate::error::ConfigError;

/// Environment variable read by [`EngineConfig::from_env`].
pub const REPLAY_LIMIT_ENV: &str = "EAGERLY_REPLAY_LIMIT";

/// Engine configuration
///
/// # Examples
///
/// ```
/// use eagerly_core::EngineConfig;
///
/// let config = EngineConfig::new().with_replay_limit(Some(16));
/// assert_eq!(config.replay_limit(), Some(16));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
	/// Maximum replays of one run; `None` replays until the body completes
	replay_limit: Option<usize>,
}

impl EngineConfig {
	/// Create a configuration with defaults (unbounded replays).
	pub fn new() -> Self {
		Self::default()
	}

	/// Set the replay limit.
	pub fn with_replay_limit(mut self, limit: Option<usize>) -> Self {
		self.replay_limit = limit;
		self
	}

	/// Replay limit in effect.
	pub fn replay_limit(&self) -> Option<usize> {
		self.replay_limit
	}

	/// Read configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Read configuration through `lookup`, which maps a variable name to its
	/// value.
	///
	/// `EAGERLY_REPLAY_LIMIT` accepts a non-negative integer, or `none` or an
	/// empty string for unbounded replays.
	///
	/// # Examples
	///
	/// ```
	/// use eagerly_core::EngineConfig;
	///
	/// let config = EngineConfig::from_lookup(|_| Some("3".to_string())).unwrap();
	/// assert_eq!(config.replay_limit(), Some(3));
	/// ```
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut config = Self::new();

		if let Some(raw) = lookup(REPLAY_LIMIT_ENV) {
			config.replay_limit = parse_limit(&raw)?;
		}
		Ok(config)
	}
}

fn parse_limit(raw: &str) -> Result<Option<usize>, ConfigError> {
	let trimmed = raw.trim();
	if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
		return Ok(None);
	}

	trimmed
		.parse::<usize>()
		.map(Some)
		.map_err(|e| ConfigError::InvalidValue {
			key: REPLAY_LIMIT_ENV.to_string(),
			value: raw.to_string(),
			reason: e.to_string(),
		})
}
