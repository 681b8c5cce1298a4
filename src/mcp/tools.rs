//! Tool descriptors cached for one session.

use super::protocol::ToolDescriptor;
use serde_json::{json, Value};
use tracing::warn;

/// Tools captured from a `tools/list` response.
///
/// Filled at most once per session; [`ToolCache::clear`] is only called on reset.
#[derive(Debug, Default, Clone)]
pub struct ToolCache {
    tools: Vec<ToolDescriptor>,
    captured: bool,
}

impl ToolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the `tools` array of a `tools/list` result.
    ///
    /// Returns the number of tools captured. A result without a `tools` array
    /// leaves the cache empty.
    pub fn capture(&mut self, result: &Value) -> usize {
        if self.captured {
            warn!("Tool list already captured for this session; ignoring");
            return self.tools.len();
        }

        let Some(entries) = result.get("tools").and_then(Value::as_array) else {
            return 0;
        };
        self.captured = true;

        for entry in entries {
            match serde_json::from_value::<ToolDescriptor>(entry.clone()) {
                Ok(tool) if self.get(&tool.name).is_some() => {
                    warn!(tool = %tool.name, "Duplicate tool name in tools/list; keeping first");
                }
                Ok(tool) => self.tools.push(tool),
                Err(e) => warn!(error = %e, "Skipping malformed tool descriptor"),
            }
        }

        self.tools.len()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// The tool to invoke: `preferred` if the server has it, else the first one.
    pub fn select(&self, preferred: Option<&str>) -> Option<&ToolDescriptor> {
        if let Some(name) = preferred {
            match self.get(name) {
                Some(tool) => return Some(tool),
                None => warn!(tool = %name, "Preferred tool not advertised; using first tool"),
            }
        }
        self.tools.first()
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn clear(&mut self) {
        self.tools.clear();
        self.captured = false;
    }
}

/// Tools advertised by the built-in echo server.
pub fn echo_tools() -> Vec<Value> {
    vec![json!({
        "name": "ping",
        "description": "Reply with pong. Use this to check that tool calls round-trip.",
        "inputSchema": {
            "type": "object",
            "properties": {},
            "required": []
        }
    })]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_result() -> Value {
        json!({
            "tools": [
                {"name": "read_file", "description": "Read a file"},
                {"name": "write_file"},
                {"name": "read_file", "description": "Shadowed"},
                {"description": "no name"}
            ]
        })
    }

    #[test]
    fn test_capture_skips_duplicates_and_malformed() {
        let mut cache = ToolCache::new();
        assert_eq!(cache.capture(&list_result()), 2);
        assert_eq!(
            cache.get("read_file").unwrap().description.as_deref(),
            Some("Read a file")
        );
        assert!(cache.get("write_file").is_some());
    }

    #[test]
    fn test_missing_tools_array_leaves_cache_empty() {
        let mut cache = ToolCache::new();
        assert_eq!(cache.capture(&json!({})), 0);
        assert!(cache.is_empty());
        assert!(cache.select(None).is_none());
    }

    #[test]
    fn test_capture_is_once_per_session() {
        let mut cache = ToolCache::new();
        cache.capture(&list_result());
        cache.capture(&json!({"tools": [{"name": "other"}]}));
        assert!(cache.get("other").is_none());

        cache.clear();
        assert!(cache.is_empty());
        cache.capture(&json!({"tools": [{"name": "other"}]}));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_select_prefers_named_tool() {
        let mut cache = ToolCache::new();
        cache.capture(&list_result());
        assert_eq!(cache.select(None).unwrap().name, "read_file");
        assert_eq!(cache.select(Some("write_file")).unwrap().name, "write_file");
        assert_eq!(cache.select(Some("missing")).unwrap().name, "read_file");
    }

    #[test]
    fn test_echo_tools_parse_as_descriptors() {
        let mut cache = ToolCache::new();
        cache.capture(&json!({ "tools": echo_tools() }));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.tools()[0].name, "ping");
    }
}
