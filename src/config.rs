//! Limits taken from the environment.
use std::str::FromStr;

use thiserror::Error;

use crate::jump_table::DEFAULT_MAX_LOOP_DEPTH;
use crate::vm::{VMOptions, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_STACK_SIZE};

pub const MAX_STACK_SIZE_VAR: &str = "CHICKENSTACK_MAX_STACK_SIZE";
pub const MAX_ITERATIONS_VAR: &str = "CHICKENSTACK_MAX_ITERATIONS";
pub const MAX_LOOP_DEPTH_VAR: &str = "CHICKENSTACK_MAX_LOOP_DEPTH";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to parse env var {key} with value `{value}`: {message}")]
    InvalidValue { key: String, value: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub max_stack_size: usize,
    pub max_iterations: u64,
    pub max_loop_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_stack_size: DEFAULT_MAX_STACK_SIZE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_loop_depth: DEFAULT_MAX_LOOP_DEPTH,
        }
    }
}

impl Config {
    /// Reads the limits from the process environment, falling back to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the limits through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            max_stack_size: parse_env(&lookup, MAX_STACK_SIZE_VAR, defaults.max_stack_size)?,
            max_iterations: parse_env_nonzero(&lookup, MAX_ITERATIONS_VAR, defaults.max_iterations)?,
            max_loop_depth: parse_env(&lookup, MAX_LOOP_DEPTH_VAR, defaults.max_loop_depth)?,
        })
    }

    pub fn vm_options(&self) -> VMOptions {
        VMOptions::new(self.max_stack_size, self.max_iterations)
    }
}

fn parse_env_opt<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value.trim().parse::<T>().map(Some).map_err(|err| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
            message: err.to_string(),
        }),
    }
}

fn parse_env<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    Ok(parse_env_opt(lookup, key)?.unwrap_or(default))
}

/// Like [`parse_env`], but a limit of zero would stop every program on its first instruction.
fn parse_env_nonzero(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = parse_env(lookup, key, default)?;
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            message: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}
