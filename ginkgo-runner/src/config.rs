//! Run Configuration
//!
//! Configuration is layered (lowest to highest precedence):
//! 1. Compiled defaults (seed = current Unix time, single partition)
//! 2. `ginkgo.toml`, discovered by walking up from the current directory
//! 3. `--ginkgo.*` command-line flags
//!
//! Partition parameters are only validated here; coordinating the parallel
//! processes is left to whoever launches them.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Name of the configuration file looked up by [`RunConfig::discover`]
pub const CONFIG_FILE_NAME: &str = "ginkgo.toml";

/// Invalid run configuration; detected before any example runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Fewer than one parallel partition
    #[error("ginkgo.parallel.total must be >= 1")]
    ParallelTotal {
        /// Configured total
        total: i64,
    },

    /// Partition index outside `1..=total`
    #[error("ginkgo.parallel.node is one-indexed and must be <= ginkgo.parallel.total")]
    ParallelNode {
        /// Configured node
        node: i64,
        /// Configured total
        total: i64,
    },

    /// Focus or skip pattern does not compile
    #[error("invalid {flag} pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// Flag the pattern came from
        flag: &'static str,
        /// The offending pattern
        pattern: String,
        /// Regex compiler message
        reason: String,
    },
}

/// Settings consumed by a suite run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Seed for tree shuffling
    pub random_seed: i64,
    /// Also shuffle the flattened example list
    pub randomize_all_specs: bool,
    /// Only run examples whose full text matches this regex
    pub focus: Option<String>,
    /// Skip examples whose full text matches this regex
    pub skip: Option<String>,
    /// Skip all benchmarks
    pub skip_measurements: bool,
    /// Treat pending examples as a suite failure
    pub fail_on_pending: bool,
    /// Skip remaining examples after the first failure
    pub fail_fast: bool,
    /// One-indexed partition this process runs
    pub parallel_node: i64,
    /// Total number of partitions
    pub parallel_total: i64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            random_seed: chrono::Utc::now().timestamp(),
            randomize_all_specs: false,
            focus: None,
            skip: None,
            skip_measurements: false,
            fail_on_pending: false,
            fail_fast: false,
            parallel_node: 1,
            parallel_total: 1,
        }
    }
}

impl RunConfig {
    /// Check the partition parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel_total < 1 {
            return Err(ConfigError::ParallelTotal {
                total: self.parallel_total,
            });
        }

        if self.parallel_node > self.parallel_total || self.parallel_node < 1 {
            return Err(ConfigError::ParallelNode {
                node: self.parallel_node,
                total: self.parallel_total,
            });
        }

        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load `ginkgo.toml` by walking up from the current directory
    pub fn discover() -> Option<Self> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => Some(config),
                    Err(e) => {
                        tracing::warn!("ignoring {}: {e}", config_path.display());
                        None
                    }
                };
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Defaults, then `ginkgo.toml`, then `--ginkgo.*` flags from the process arguments
    pub fn resolve() -> anyhow::Result<Self> {
        let config = Self::discover().unwrap_or_default();
        let args = RunArgs::from_env()?;
        Ok(args.apply(config))
    }

    /// Generate a documented default configuration as a TOML string
    pub fn default_toml() -> String {
        r#"# Ginkgo Configuration

# Seed for shuffling containers and specs (defaults to the current Unix time)
# random_seed = 1700000000
# Also shuffle the flattened list of examples
randomize_all_specs = false
# Only run examples whose full text matches this regex (uncomment to enable)
# focus = "Book"
# Skip examples whose full text matches this regex (uncomment to enable)
# skip = "slow"
# Skip all benchmarks
skip_measurements = false
# Fail the suite when any example is pending
fail_on_pending = false
# Stop running examples after the first failure
fail_fast = false
# One-indexed partition run by this process
parallel_node = 1
# Total number of partitions
parallel_total = 1
"#
        .to_string()
    }
}

/// `--ginkgo.*` command-line flags.
///
/// Flags that take a value must use the `--ginkgo.flag=value` form; every
/// argument not starting with `--ginkgo.` is ignored so the flags can share a
/// command line with the test harness.
#[derive(Parser, Debug, Default, Clone, PartialEq, Eq)]
#[command(name = "ginkgo", about = "Ginkgo run configuration")]
pub struct RunArgs {
    /// Seed for shuffling
    #[arg(long = "ginkgo.seed", allow_negative_numbers = true)]
    pub seed: Option<i64>,

    /// Also shuffle the flattened example list
    #[arg(long = "ginkgo.randomizeAllSpecs")]
    pub randomize_all_specs: bool,

    /// Only run examples matching this regex
    #[arg(long = "ginkgo.focus")]
    pub focus: Option<String>,

    /// Skip examples matching this regex
    #[arg(long = "ginkgo.skip")]
    pub skip: Option<String>,

    /// Skip all benchmarks
    #[arg(long = "ginkgo.skipMeasurements")]
    pub skip_measurements: bool,

    /// Fail the suite when any example is pending
    #[arg(long = "ginkgo.failOnPending")]
    pub fail_on_pending: bool,

    /// Stop after the first failure
    #[arg(long = "ginkgo.failFast")]
    pub fail_fast: bool,

    /// One-indexed partition run by this process
    #[arg(long = "ginkgo.parallel.node", allow_negative_numbers = true)]
    pub parallel_node: Option<i64>,

    /// Total number of partitions
    #[arg(long = "ginkgo.parallel.total", allow_negative_numbers = true)]
    pub parallel_total: Option<i64>,
}

impl RunArgs {
    /// Parse the `--ginkgo.*` flags among the process arguments
    pub fn from_env() -> Result<Self, clap::Error> {
        Self::parse_from_args(std::env::args().skip(1))
    }

    /// Parse the `--ginkgo.*` flags among `args` (program name excluded)
    pub fn parse_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let flags = args
            .into_iter()
            .map(Into::into)
            .filter(|arg| arg.starts_with("--ginkgo."));
        Self::try_parse_from(std::iter::once("ginkgo".to_string()).chain(flags))
    }

    /// Overlay the flags that were given onto `config`
    pub fn apply(&self, config: RunConfig) -> RunConfig {
        RunConfig {
            random_seed: self.seed.unwrap_or(config.random_seed),
            randomize_all_specs: self.randomize_all_specs || config.randomize_all_specs,
            focus: self.focus.clone().or(config.focus),
            skip: self.skip.clone().or(config.skip),
            skip_measurements: self.skip_measurements || config.skip_measurements,
            fail_on_pending: self.fail_on_pending || config.fail_on_pending,
            fail_fast: self.fail_fast || config.fail_fast,
            parallel_node: self.parallel_node.unwrap_or(config.parallel_node),
            parallel_total: self.parallel_total.unwrap_or(config.parallel_total),
        }
    }
}
