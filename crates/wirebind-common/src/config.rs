//! Processor options.
//!
//! Hosts pass options as a flat string map; [`Options::from_map`] lifts them
//! into a typed model that also round-trips through serde.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{OPTION_DUMP_GRAPH, OPTION_ENABLE_JAVAX_ANNOTATIONS};
use crate::error::{Result, WirebindError};

/// Options controlling one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    /// Also honor `javax.inject` `Inject`, `Scope` and `Qualifier`.
    pub enable_javax_annotations: bool,
    /// Report a rendering of every optimized plan forest as a warning.
    pub dump_graph: bool,
}

impl Options {
    /// Builds options from a host option map. Unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a known key holds something other than `true` or
    /// `false`.
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self> {
        Ok(Self {
            enable_javax_annotations: parse_flag(map, OPTION_ENABLE_JAVAX_ANNOTATIONS)?,
            dump_graph: parse_flag(map, OPTION_DUMP_GRAPH)?,
        })
    }

    /// Converts the options back into the host option map form.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        let _ = map.insert(
            OPTION_ENABLE_JAVAX_ANNOTATIONS.to_string(),
            self.enable_javax_annotations.to_string(),
        );
        let _ = map.insert(OPTION_DUMP_GRAPH.to_string(), self.dump_graph.to_string());
        map
    }
}

fn parse_flag(map: &BTreeMap<String, String>, key: &str) -> Result<bool> {
    let Some(value) = map.get(key) else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" | "" => Ok(false),
        other => Err(WirebindError::Config {
            key: key.to_string(),
            message: format!("expected true or false, got {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn defaults_are_off() {
        let options = Options::from_map(&BTreeMap::new()).expect("should parse");
        assert_eq!(options, Options::default());
        assert!(!options.dump_graph);
    }

    #[test]
    fn parses_known_flags() {
        let options = Options::from_map(&map(&[
            (OPTION_DUMP_GRAPH, "TRUE"),
            (OPTION_ENABLE_JAVAX_ANNOTATIONS, "false"),
            ("some.other.option", "whatever"),
        ]))
        .expect("should parse");
        assert!(options.dump_graph);
        assert!(!options.enable_javax_annotations);
    }

    #[test]
    fn rejects_non_boolean() {
        let result = Options::from_map(&map(&[(OPTION_DUMP_GRAPH, "yes")]));
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains(OPTION_DUMP_GRAPH), "got: {msg}");
    }

    #[test]
    fn map_form_round_trips() {
        let options = Options {
            enable_javax_annotations: true,
            dump_graph: false,
        };
        let parsed = Options::from_map(&options.to_map()).expect("should parse");
        assert_eq!(parsed, options);
    }

    #[test]
    fn json_uses_camel_case_and_defaults() {
        let options: Options =
            serde_json::from_str(r#"{"dumpGraph": true}"#).expect("should deserialize");
        assert!(options.dump_graph);
        assert!(!options.enable_javax_annotations);
    }
}
