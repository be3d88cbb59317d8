// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// What to do when a chain is submitted under a name that already has an
/// active chain.
///
/// - `Keep`: leave the active chain alone and discard the new one.
/// - `Replace`: cancel every unfinished task of the active chain, then start
///   the new chain.
/// - `Append`: run the new chain once the active chain reaches a terminal
///   state, whether it succeeded or failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingChainPolicy {
    #[default]
    Keep,
    Replace,
    Append,
}

impl fmt::Display for ExistingChainPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExistingChainPolicy::Keep => "keep",
            ExistingChainPolicy::Replace => "replace",
            ExistingChainPolicy::Append => "append",
        };
        f.write_str(s)
    }
}

impl FromStr for ExistingChainPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep" => Ok(ExistingChainPolicy::Keep),
            "replace" => Ok(ExistingChainPolicy::Replace),
            "append" => Ok(ExistingChainPolicy::Append),
            other => Err(format!(
                "invalid chain policy: {other} (expected \"keep\", \"replace\" or \"append\")"
            )),
        }
    }
}

/// How the delay between retries grows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffPolicy {
    /// `base * 2^(n-1)` for the n-th retry.
    #[default]
    Exponential,
    /// `base * n` for the n-th retry.
    Linear,
}

impl FromStr for BackoffPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exponential" => Ok(BackoffPolicy::Exponential),
            "linear" => Ok(BackoffPolicy::Linear),
            other => Err(format!(
                "invalid backoff policy: {other} (expected \"exponential\" or \"linear\")"
            )),
        }
    }
}
