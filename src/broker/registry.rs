//! Topic registry
//!
//! The set of topics is fixed when the broker starts. Publish and subscribe
//! requests are validated against it; nothing creates topics on demand.

use std::collections::HashSet;

use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct TopicRegistry {
    ordered: Vec<String>,
    names: HashSet<String>,
}

impl TopicRegistry {
    /// Builds a registry from configured names, keeping the first occurrence
    /// of duplicates and skipping blank names.
    ///
    /// Topic names travel as the SSE `event:` field, so names containing a
    /// line break are skipped as well.
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::default();
        for topic in topics {
            let topic = topic.into();
            let topic = topic.trim();
            if topic.is_empty() || registry.names.contains(topic) {
                continue;
            }
            if topic.contains(['\r', '\n']) {
                warn!(topic = ?topic, "skipping topic name with line breaks");
                continue;
            }
            registry.names.insert(topic.to_string());
            registry.ordered.push(topic.to_string());
        }
        registry
    }

    /// Topic names in configuration order.
    pub fn list_topics(&self) -> &[String] {
        &self.ordered
    }

    pub fn exists(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
