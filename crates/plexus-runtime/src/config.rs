//! Run configuration
//!
//! Configuration is an explicit value passed into the coordinator
//! constructor; there is no process-wide default to mutate.

use serde::Deserialize;

/// Configuration for one coordinator run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Hard cap on executed units per run. Enforced before each execution:
    /// once `call_count` reaches this value no further unit starts, whatever
    /// the router returns.
    pub max_iterations: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { max_iterations: 10 }
    }
}

impl RunConfig {
    /// Config with a specific iteration cap.
    pub fn with_max_iterations(max_iterations: usize) -> Self {
        Self { max_iterations }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cap_is_ten() {
        assert_eq!(RunConfig::default().max_iterations, 10);
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: RunConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_iterations, 10);

        let config: RunConfig = serde_json::from_str(r#"{"max_iterations": 3}"#).unwrap();
        assert_eq!(config.max_iterations, 3);
    }
}
