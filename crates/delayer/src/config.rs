use delaysqs_core::MAX_QUEUE_DELAY_SECONDS;
use delaysqs_queue::ReceiveOptions;
use serde::{Deserialize, Serialize};

use crate::error::DelayerError;

/// Largest batch a single receive may request.
const MAX_BATCH: u32 = 10;

/// Longest long-poll wait the queue accepts.
const MAX_WAIT_SECONDS: u32 = 20;

/// Longest visibility timeout the queue accepts (12 hours).
const MAX_VISIBILITY_SECONDS: u32 = 43_200;

/// Poll loop and scheduling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayerConfig {
    /// Long-poll wait per receive.
    pub receive_wait_seconds: u32,
    /// How long received messages stay hidden while being processed.
    pub visibility_timeout_seconds: u32,
    /// Messages requested per receive; also the batch size.
    pub max_messages: u32,
    /// Ceiling on any single native delay.
    pub max_delay_seconds: u32,
    /// Message attributes requested on receive.
    pub attribute_names: Vec<String>,
}

impl Default for DelayerConfig {
    fn default() -> Self {
        Self {
            receive_wait_seconds: 20,
            visibility_timeout_seconds: 10,
            max_messages: 5,
            max_delay_seconds: MAX_QUEUE_DELAY_SECONDS,
            attribute_names: vec!["All".to_owned()],
        }
    }
}

impl DelayerConfig {
    pub fn validate(&self) -> Result<(), DelayerError> {
        if self.max_delay_seconds == 0 || self.max_delay_seconds > MAX_QUEUE_DELAY_SECONDS {
            return Err(DelayerError::Configuration(format!(
                "max_delay_seconds must be between 1 and {MAX_QUEUE_DELAY_SECONDS}, got {}",
                self.max_delay_seconds
            )));
        }
        if !(1..=MAX_BATCH).contains(&self.max_messages) {
            return Err(DelayerError::Configuration(format!(
                "max_messages must be between 1 and {MAX_BATCH}, got {}",
                self.max_messages
            )));
        }
        if self.receive_wait_seconds > MAX_WAIT_SECONDS {
            return Err(DelayerError::Configuration(format!(
                "receive_wait_seconds must be at most {MAX_WAIT_SECONDS}, got {}",
                self.receive_wait_seconds
            )));
        }
        if !(1..=MAX_VISIBILITY_SECONDS).contains(&self.visibility_timeout_seconds) {
            return Err(DelayerError::Configuration(format!(
                "visibility_timeout_seconds must be between 1 and {MAX_VISIBILITY_SECONDS}, got {}",
                self.visibility_timeout_seconds
            )));
        }
        Ok(())
    }

    /// Receive parameters for one poll cycle.
    pub fn receive_options(&self) -> ReceiveOptions {
        ReceiveOptions {
            wait_seconds: self.receive_wait_seconds,
            visibility_timeout_seconds: self.visibility_timeout_seconds,
            max_messages: self.max_messages,
            attribute_names: self.attribute_names.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid_and_matches_receive_defaults() {
        let config = DelayerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.receive_options(), ReceiveOptions::default());
    }

    #[test]
    fn rejects_out_of_range_delay() {
        for max_delay_seconds in [0, 901] {
            let config = DelayerConfig {
                max_delay_seconds,
                ..DelayerConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(DelayerError::Configuration(_))
            ));
        }
    }

    #[test]
    fn rejects_bad_batch_and_wait() {
        let config = DelayerConfig {
            max_messages: 11,
            ..DelayerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = DelayerConfig {
            max_messages: 0,
            ..DelayerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = DelayerConfig {
            receive_wait_seconds: 21,
            ..DelayerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_visibility_timeout() {
        for visibility_timeout_seconds in [0, 43_201] {
            let config = DelayerConfig {
                visibility_timeout_seconds,
                ..DelayerConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(DelayerError::Configuration(_))
            ));
        }

        let config = DelayerConfig {
            visibility_timeout_seconds: 43_200,
            ..DelayerConfig::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn partial_toml_style_input_uses_defaults() {
        let config: DelayerConfig =
            serde_json::from_value(serde_json::json!({ "max_messages": 10 })).unwrap();
        assert_eq!(config.max_messages, 10);
        assert_eq!(config.receive_wait_seconds, 20);
        assert_eq!(config.max_delay_seconds, 900);
    }
}
