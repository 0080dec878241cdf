/// Parameters for a single receive (long poll) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveOptions {
    /// How long to wait for messages when none are visible.
    pub wait_seconds: u32,
    /// How long received messages stay hidden from other receivers.
    pub visibility_timeout_seconds: u32,
    /// Upper bound on the number of messages returned.
    pub max_messages: u32,
    /// Message attribute names to fetch; `"All"` requests every attribute.
    pub attribute_names: Vec<String>,
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self {
            wait_seconds: 20,
            visibility_timeout_seconds: 10,
            max_messages: 5,
            attribute_names: vec!["All".to_owned()],
        }
    }
}

impl ReceiveOptions {
    /// Returns `true` if `name` was requested, either explicitly or via `"All"`.
    pub fn wants_attribute(&self, name: &str) -> bool {
        self.attribute_names
            .iter()
            .any(|requested| requested == "All" || requested == ".*" || requested == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_poll_cycle() {
        let opts = ReceiveOptions::default();
        assert_eq!(opts.wait_seconds, 20);
        assert_eq!(opts.visibility_timeout_seconds, 10);
        assert_eq!(opts.max_messages, 5);
        assert!(opts.wants_attribute("deliveryTimestamp"));
    }

    #[test]
    fn explicit_attribute_filter() {
        let opts = ReceiveOptions {
            attribute_names: vec!["deliveryTimestamp".into()],
            ..ReceiveOptions::default()
        };
        assert!(opts.wants_attribute("deliveryTimestamp"));
        assert!(!opts.wants_attribute("tenant"));
    }
}
