use common::domain::EventRecord;

/// Decides which notification records become work items
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    event_prefixes: Vec<String>,
    container_name: Option<String>,
    key_prefix: Option<String>,
    key_suffix: Option<String>,
}

impl EventFilter {
    /// Accept records whose event type starts with any of `event_types`.
    ///
    /// Patterns such as `s3:ObjectCreated:*` are reduced to `ObjectCreated:`.
    pub fn new<S: AsRef<str>>(event_types: &[S]) -> Self {
        Self {
            event_prefixes: event_types
                .iter()
                .map(|t| normalize_event_type(t.as_ref()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn with_container(mut self, container_name: Option<String>) -> Self {
        self.container_name = container_name.filter(|c| !c.is_empty());
        self
    }

    pub fn with_key_prefix(mut self, prefix: Option<String>) -> Self {
        self.key_prefix = prefix.filter(|p| !p.is_empty());
        self
    }

    pub fn with_key_suffix(mut self, suffix: Option<String>) -> Self {
        self.key_suffix = suffix.filter(|s| !s.is_empty());
        self
    }

    pub fn accepts(&self, record: &EventRecord) -> bool {
        let event_type = record
            .event_type
            .strip_prefix("s3:")
            .unwrap_or(&record.event_type);

        if !self
            .event_prefixes
            .iter()
            .any(|prefix| event_type.starts_with(prefix.as_str()))
        {
            return false;
        }

        if let Some(container) = &self.container_name {
            if record.locator.container_name != *container {
                return false;
            }
        }

        let key = &record.locator.object_key;
        if let Some(prefix) = &self.key_prefix {
            if !key.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(suffix) = &self.key_suffix {
            if !key.ends_with(suffix.as_str()) {
                return false;
            }
        }

        true
    }
}

fn normalize_event_type(pattern: &str) -> String {
    let pattern = pattern.trim();
    let pattern = pattern.strip_prefix("s3:").unwrap_or(pattern);
    pattern.strip_suffix('*').unwrap_or(pattern).to_string()
}
