//! Binding configuration.
//!
//! A [`LinkConfig`] is supplied once when a serial link is bound and stays
//! fixed for the lifetime of that binding. It can be built in code or parsed
//! from a JSON property document that uses the device-property names:
//!
//! ```
//! use uartlink_core::LinkConfig;
//!
//! let config = LinkConfig::from_json(r#"{ "current-speed": 9600, "echo": true }"#).unwrap();
//! assert_eq!(config.speed, 9600);
//! assert!(config.echo);
//! assert_eq!(config.period_ms, 1000);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ECHO, DEFAULT_ENDPOINT_NAME, DEFAULT_FIFO_CAPACITY, DEFAULT_POLL_PERIOD_MS,
    DEFAULT_SPEED,
};
use crate::error::{ConfigError, Result};

/// Properties of one serial link binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    /// Transport bitrate.
    #[serde(rename = "current-speed")]
    pub speed: u32,

    /// Pass every received chunk straight back to the transport.
    pub echo: bool,

    /// Inspector period in milliseconds.
    #[serde(rename = "poll-period-ms")]
    pub period_ms: u32,

    /// Receive FIFO capacity in bytes.
    #[serde(rename = "fifo-size")]
    pub capacity: usize,

    /// Name the stream endpoint is published under.
    #[serde(rename = "endpoint-name")]
    pub endpoint_name: String,

    /// Line written once to the transport right after it opens.
    pub greeting: Option<String>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            echo: DEFAULT_ECHO,
            period_ms: DEFAULT_POLL_PERIOD_MS,
            capacity: DEFAULT_FIFO_CAPACITY,
            endpoint_name: DEFAULT_ENDPOINT_NAME.to_string(),
            greeting: None,
        }
    }
}

impl LinkConfig {
    /// Parse a JSON property document. Missing properties take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Malformed`] if the document is not valid JSON or
    /// names an unknown property.
    pub fn from_json(document: &str) -> Result<Self> {
        Ok(serde_json::from_str(document)?)
    }

    /// Read and parse a JSON property file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let document = std::fs::read_to_string(path)?;
        Self::from_json(&document)
    }

    /// Set the line speed.
    pub fn with_speed(mut self, speed: u32) -> Self {
        self.speed = speed;
        self
    }

    /// Enable or disable echo-back.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Set the inspector period in milliseconds.
    pub fn with_period_ms(mut self, period_ms: u32) -> Self {
        self.period_ms = period_ms;
        self
    }

    /// Set the receive FIFO capacity in bytes.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the stream endpoint name.
    pub fn with_endpoint_name(mut self, name: impl Into<String>) -> Self {
        self.endpoint_name = name.into();
        self
    }

    /// Send `greeting` once after the transport opens.
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = Some(greeting.into());
        self
    }

    /// Check the properties that would make a binding unusable.
    ///
    /// The endpoint name is checked by the endpoint itself when it is
    /// published.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidProperty`] for a zero speed, period or
    /// capacity.
    pub fn validate(&self) -> Result<()> {
        if self.speed == 0 {
            return Err(ConfigError::invalid("current-speed", "must be non-zero"));
        }
        if self.period_ms == 0 {
            return Err(ConfigError::invalid("poll-period-ms", "must be non-zero"));
        }
        if self.capacity == 0 {
            return Err(ConfigError::invalid("fifo-size", "must be non-zero"));
        }
        Ok(())
    }
}
