//! Declarative policy configuration (feature-gated).
//!
//! Lets retry behavior live in configuration files instead of code. Durations are
//! whole milliseconds; strategies are internally tagged by `kind`.
//!
//! # Example
//!
//! ```rust
//! use relentless::retry::config::PolicyConfig;
//!
//! let json = r#"{
//!     "delay": {
//!         "kind": "limit",
//!         "cap_ms": 5000,
//!         "inner": { "kind": "exponential", "coefficient_ms": 100 }
//!     },
//!     "stop": {
//!         "kind": "any",
//!         "stoppers": [
//!             { "kind": "max_attempts", "attempts": 5 },
//!             { "kind": "timeout", "timeout_ms": 30000 }
//!         ]
//!     }
//! }"#;
//!
//! let config: PolicyConfig = serde_json::from_str(json).unwrap();
//! let policy = config.build::<std::io::Error>();
//! assert!(policy.is_bounded());
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::delay::{self, SharedDelayer};
use super::policy::RetryPolicy;
use super::stop::{self, SharedStopper};

/// A delay strategy described as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DelayConfig {
    /// See [`delay::Fixed`].
    Fixed {
        /// Delay in milliseconds.
        delay_ms: u64,
    },
    /// See [`delay::Linear`].
    Linear {
        /// Step in milliseconds.
        step_ms: u64,
    },
    /// See [`delay::Exponential`]. A zero coefficient builds no delayer.
    Exponential {
        /// Coefficient in milliseconds.
        coefficient_ms: u64,
    },
    /// See [`delay::Random`].
    #[cfg(feature = "jitter")]
    Random {
        /// Minimum delay in milliseconds.
        #[serde(default)]
        min_ms: u64,
        /// Exclusive upper bound of the jitter in milliseconds.
        jitter_ms: u64,
    },
    /// See [`delay::Limit`].
    Limit {
        /// The delayer being capped.
        inner: Box<DelayConfig>,
        /// Cap in milliseconds.
        cap_ms: u64,
    },
    /// Shortest delay of the members.
    Min {
        /// Members.
        delayers: Vec<DelayConfig>,
    },
    /// Longest delay of the members.
    Max {
        /// Members.
        delayers: Vec<DelayConfig>,
    },
    /// Sum of the members' delays.
    Sum {
        /// Members.
        delayers: Vec<DelayConfig>,
    },
}

/// A stop strategy described as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopConfig {
    /// See [`stop::MaxAttempts`].
    MaxAttempts {
        /// Number of failed attempts after which to stop.
        attempts: u32,
    },
    /// See [`stop::Timeout`].
    Timeout {
        /// Timeout in milliseconds, measured from the first attempt.
        timeout_ms: u64,
    },
    /// Stops when any member does.
    Any {
        /// Members.
        stoppers: Vec<StopConfig>,
    },
    /// Stops when every member does.
    All {
        /// Members.
        stoppers: Vec<StopConfig>,
    },
}

/// A complete policy described as data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// The delay strategy; absent means retry immediately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<DelayConfig>,
    /// The stop strategy; absent means never give up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopConfig>,
    /// Errors retained per execution; absent means
    /// [`DEFAULT_HISTORY_LIMIT`](super::DEFAULT_HISTORY_LIMIT).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,
}

impl DelayConfig {
    /// Build the delayer, or `None` when the configuration describes no usable one.
    pub fn build<E: ?Sized + 'static>(&self) -> Option<SharedDelayer<E>> {
        match self {
            DelayConfig::Fixed { delay_ms } => {
                Some(delay::shared_delayer(delay::fixed(Duration::from_millis(*delay_ms))))
            }
            DelayConfig::Linear { step_ms } => {
                Some(delay::shared_delayer(delay::linear(Duration::from_millis(*step_ms))))
            }
            DelayConfig::Exponential { coefficient_ms } => {
                delay::exponential(Duration::from_millis(*coefficient_ms))
                    .map(delay::shared_delayer)
            }
            #[cfg(feature = "jitter")]
            DelayConfig::Random { min_ms, jitter_ms } => Some(delay::shared_delayer(
                delay::random(Duration::from_millis(*min_ms), Duration::from_millis(*jitter_ms)),
            )),
            DelayConfig::Limit { inner, cap_ms } => {
                delay::limit(inner.build::<E>(), Duration::from_millis(*cap_ms))
                    .map(delay::shared_delayer)
            }
            DelayConfig::Min { delayers } => {
                delay::min_of(delayers.iter().map(DelayConfig::build::<E>)).map(delay::shared_delayer)
            }
            DelayConfig::Max { delayers } => {
                delay::max_of(delayers.iter().map(DelayConfig::build::<E>)).map(delay::shared_delayer)
            }
            DelayConfig::Sum { delayers } => {
                delay::sum_of(delayers.iter().map(DelayConfig::build::<E>)).map(delay::shared_delayer)
            }
        }
    }
}

impl StopConfig {
    /// Build the stopper.
    pub fn build<E: ?Sized + 'static>(&self) -> SharedStopper<E> {
        match self {
            StopConfig::MaxAttempts { attempts } => {
                stop::shared_stopper(stop::max_attempts(*attempts))
            }
            StopConfig::Timeout { timeout_ms } => {
                stop::shared_stopper(stop::timeout(Duration::from_millis(*timeout_ms)))
            }
            StopConfig::Any { stoppers } => {
                stop::shared_stopper(stop::any_of(stoppers.iter().map(StopConfig::build::<E>)))
            }
            StopConfig::All { stoppers } => {
                stop::shared_stopper(stop::all_of(stoppers.iter().map(StopConfig::build::<E>)))
            }
        }
    }
}

impl PolicyConfig {
    /// Build a [`RetryPolicy`] for errors of type `E`.
    pub fn build<E: ?Sized + 'static>(&self) -> RetryPolicy<E> {
        let mut policy = RetryPolicy::new();
        if let Some(delayer) = self.delay.as_ref().and_then(DelayConfig::build) {
            policy = policy.with_shared_delayer(delayer);
        }
        if let Some(stop) = &self.stop {
            policy = policy.with_shared_stopper(stop.build());
        }
        if let Some(limit) = self.history_limit {
            policy = policy.with_history_limit(limit);
        }
        policy
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;
    use crate::retry::delay::Delayer;
    use crate::retry::stop::Stopper;
    use std::time::Instant;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_deserialize_full_policy() {
        let json = r#"{
            "delay": {
                "kind": "limit",
                "cap_ms": 50,
                "inner": { "kind": "exponential", "coefficient_ms": 10 }
            },
            "stop": {
                "kind": "any",
                "stoppers": [
                    { "kind": "max_attempts", "attempts": 5 },
                    { "kind": "timeout", "timeout_ms": 30000 }
                ]
            }
        }"#;

        let config: PolicyConfig = serde_json::from_str(json).unwrap();
        let policy = config.build::<()>();
        let start = Instant::now();

        assert_eq!(policy.next_delay(start, 1, &()), Some(ms(20)));
        assert_eq!(policy.next_delay(start, 3, &()), Some(ms(50)));
        assert_eq!(policy.next_delay(start, 5, &()), None);
    }

    #[test]
    fn test_empty_config_is_unbounded() {
        let config: PolicyConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PolicyConfig::default());
        let policy = config.build::<()>();
        assert!(!policy.is_bounded());
        assert!(policy.delayer().is_none());
    }

    #[test]
    fn test_zero_exponential_builds_nothing() {
        let config = DelayConfig::Exponential { coefficient_ms: 0 };
        assert!(config.build::<()>().is_none());

        let limited = DelayConfig::Limit {
            inner: Box::new(config),
            cap_ms: 10,
        };
        assert!(limited.build::<()>().is_none());
    }

    #[test]
    fn test_combinators_build() {
        let config = DelayConfig::Sum {
            delayers: vec![
                DelayConfig::Fixed { delay_ms: 5 },
                DelayConfig::Linear { step_ms: 10 },
                DelayConfig::Exponential { coefficient_ms: 0 },
            ],
        };
        let delayer = config.build::<()>().unwrap();
        assert_eq!(delayer.delay(Instant::now(), 2, &()), ms(25));

        assert!(DelayConfig::Min { delayers: vec![] }.build::<()>().is_none());
    }

    #[test]
    fn test_all_stopper_builds() {
        let config = StopConfig::All {
            stoppers: vec![
                StopConfig::MaxAttempts { attempts: 2 },
                StopConfig::Timeout { timeout_ms: 60_000 },
            ],
        };
        assert!(!config.build::<()>().stop(Instant::now(), 5, &()));
    }

    #[test]
    fn test_serialize_uses_kind_tag() {
        let config = PolicyConfig {
            delay: Some(DelayConfig::Fixed { delay_ms: 100 }),
            stop: None,
            history_limit: None,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(json, r#"{"delay":{"kind":"fixed","delay_ms":100}}"#);
    }

    #[test]
    fn test_history_limit_is_configurable() {
        let config: PolicyConfig = serde_json::from_str(r#"{ "history_limit": 4 }"#).unwrap();
        assert_eq!(config.build::<()>().history_limit(), 4);

        let config: PolicyConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(
            config.build::<()>().history_limit(),
            crate::retry::DEFAULT_HISTORY_LIMIT
        );
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_random_defaults_min() {
        let config: DelayConfig =
            serde_json::from_str(r#"{ "kind": "random", "jitter_ms": 10 }"#).unwrap();
        let delayer = config.build::<()>().unwrap();
        assert!(delayer.delay(Instant::now(), 1, &()) < ms(10));
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result: Result<DelayConfig, _> = serde_json::from_str(r#"{ "kind": "fibonacci" }"#);
        assert!(result.is_err());
    }
}
