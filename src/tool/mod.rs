pub mod request;
pub mod types;

use crate::errors::{DeskError, DeskResult};
use crate::tool::types::ToolDef;

/// Loads the `desktop` tool definition from tools/desktop.json.
/// The JSON is embedded at compile time via include_str!.
pub fn tool_definition() -> DeskResult<ToolDef> {
    let json = include_str!("../../tools/desktop.json");
    serde_json::from_str(json).map_err(|e| DeskError::Config(format!("Failed to parse tool definition: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_definition_lists_every_action() {
        let def = tool_definition().unwrap();
        assert_eq!(def.def_type, "function");
        assert_eq!(def.function.name, "desktop");
        let actions = def.function.parameters["properties"]["action"]["enum"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect::<Vec<_>>();
        for a in ["screenshot", "parse", "click", "type", "key", "scroll", "find", "health"] {
            assert!(actions.contains(&a), "{a}");
            assert!(def.function.description.contains(a), "{a}");
        }
        let props = &def.function.parameters["properties"];
        for p in ["image_path", "image_base64", "search_text", "base_url", "session"] {
            assert!(props.get(p).is_some(), "{p}");
        }
    }
}
