//! Configuration for the girder store.

/// Tunables for an edge store instance.
///
/// The defaults match the behavior of the original milestone planner and
/// are suitable for interactive project sizes (hundreds of milestones).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Prefix for generated edge IDs (e.g. "dep" yields "dep-a3f8").
    pub id_prefix: String,

    /// Chain depth above which `validate_set` emits a
    /// `LongDependencyChain` warning.
    pub chain_warning_threshold: usize,

    /// Hard bound on traversal depth for chain analysis.
    ///
    /// The store itself stays acyclic, but chain analysis must terminate
    /// even on adversarial graphs assembled directly by tests.
    pub max_traversal_depth: usize,

    /// Buffered capacity of the change-event broadcast channel. Slow
    /// subscribers that fall more than this many events behind observe a
    /// `Lagged` receive error rather than blocking mutations.
    pub event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            id_prefix: "dep".to_string(),
            chain_warning_threshold: 5,
            max_traversal_depth: 50,
            event_capacity: 256,
        }
    }
}

impl StoreConfig {
    /// Create a config with the given edge ID prefix and default limits.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            id_prefix: prefix.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.id_prefix, "dep");
        assert_eq!(config.chain_warning_threshold, 5);
        assert_eq!(config.max_traversal_depth, 50);
    }

    #[test]
    fn with_prefix_keeps_defaults() {
        let config = StoreConfig::with_prefix("plan");
        assert_eq!(config.id_prefix, "plan");
        assert_eq!(config.event_capacity, 256);
    }
}
