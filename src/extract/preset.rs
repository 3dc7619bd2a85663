// Spawn detail presets: named shorthands merged into a record's
// condition/anticondition blocks without overriding explicit fields.

use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::Deserialize;
use serde_json::{Map, Value};

pub const BUILTIN_PRESETS_JSON: &str = include_str!("data/presets.json");

/// Record key listing the presets a spawn uses.
pub const PRESETS_KEY: &str = "presets";
pub const CONDITION_KEY: &str = "condition";
pub const ANTICONDITION_KEY: &str = "anticondition";

lazy_static! {
    /// Built-in preset table. Parsed once from the embedded JSON.
    pub static ref BUILTIN_PRESETS: PresetTable =
        PresetTable::from_json(BUILTIN_PRESETS_JSON).expect("embedded preset table is valid JSON");
}

/// Partial condition/anticondition blocks contributed by one preset.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Preset {
    #[serde(default)]
    pub condition: Map<String, Value>,
    #[serde(default)]
    pub anticondition: Map<String, Value>,
}

/// Immutable preset name -> preset mapping.
#[derive(Debug, Clone, Default)]
pub struct PresetTable {
    presets: HashMap<String, Preset>,
}

impl PresetTable {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let presets: HashMap<String, Preset> = serde_json::from_str(text)?;
        Ok(Self { presets })
    }

    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Merge every listed preset into `record` and drop the preset list.
    ///
    /// Fields the record already defines always win; between presets, the
    /// first one listed wins. Merged fields are not re-scanned for presets.
    pub fn expand(&self, mut record: Map<String, Value>) -> Map<String, Value> {
        let Some(listed) = record.remove(PRESETS_KEY) else {
            return record;
        };
        let names: Vec<&str> = match &listed {
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
            Value::String(single) => vec![single.as_str()],
            _ => Vec::new(),
        };

        for name in names {
            let Some(preset) = self.get(name) else {
                tracing::debug!(preset = name, "Unknown spawn preset ignored");
                continue;
            };
            merge_missing(&mut record, CONDITION_KEY, &preset.condition);
            merge_missing(&mut record, ANTICONDITION_KEY, &preset.anticondition);
        }
        record
    }
}

fn merge_missing(record: &mut Map<String, Value>, block: &str, defaults: &Map<String, Value>) {
    if defaults.is_empty() {
        return;
    }
    let target = record
        .entry(block.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(target) = target else {
        tracing::warn!(block, "Spawn {block} block is not an object; preset not applied");
        return;
    };
    for (field, value) in defaults {
        if !target.contains_key(field) {
            target.insert(field.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("record must be an object"),
        }
    }

    #[test]
    fn test_builtin_table_loads() {
        assert!(BUILTIN_PRESETS.len() >= 20);
        let underground = BUILTIN_PRESETS.get("underground").unwrap();
        assert_eq!(underground.condition["canSeeSky"], json!(false));
        assert!(BUILTIN_PRESETS.get("natural").unwrap().condition.is_empty());
    }

    #[test]
    fn test_explicit_field_wins() {
        let expanded = BUILTIN_PRESETS.expand(record(json!({
            "pokemon": "geodude",
            "presets": ["underground"],
            "condition": { "maxY": 10 }
        })));
        assert_eq!(expanded["condition"]["maxY"], json!(10));
        assert_eq!(expanded["condition"]["canSeeSky"], json!(false));
        assert!(!expanded.contains_key(PRESETS_KEY));
    }

    #[test]
    fn test_first_listed_preset_wins() {
        let table = PresetTable::from_json(
            r#"{
                "low": { "condition": { "minY": 0, "isRaining": true } },
                "high": { "condition": { "minY": 62, "canSeeSky": true } }
            }"#,
        )
        .unwrap();
        let expanded = table.expand(record(json!({ "presets": ["low", "high"] })));
        let condition = &expanded["condition"];
        assert_eq!(condition["minY"], json!(0));
        assert_eq!(condition["isRaining"], json!(true));
        assert_eq!(condition["canSeeSky"], json!(true));
    }

    #[test]
    fn test_anticondition_merged_independently() {
        let expanded = BUILTIN_PRESETS.expand(record(json!({
            "presets": ["natural"],
            "condition": { "structures": ["minecraft:igloo"] }
        })));
        assert_eq!(expanded["condition"]["structures"], json!(["minecraft:igloo"]));
        assert_eq!(
            expanded["anticondition"]["structures"],
            json!(["#minecraft:village"])
        );
    }

    #[test]
    fn test_unknown_presets_are_ignored() {
        let expanded = BUILTIN_PRESETS.expand(record(json!({
            "presets": ["not_a_preset"],
            "condition": { "minY": 5 }
        })));
        assert_eq!(expanded["condition"], json!({ "minY": 5 }));
        assert!(!expanded.contains_key(ANTICONDITION_KEY));
    }

    #[test]
    fn test_preset_fields_not_rescanned() {
        let table = PresetTable::from_json(
            r#"{ "outer": { "condition": { "presets": ["inner"] } },
                 "inner": { "condition": { "minY": 1 } } }"#,
        )
        .unwrap();
        let expanded = table.expand(record(json!({ "presets": ["outer"] })));
        assert_eq!(expanded["condition"], json!({ "presets": ["inner"] }));
    }

    #[test]
    fn test_record_without_presets_untouched() {
        let original = record(json!({ "condition": { "minY": 3 } }));
        assert_eq!(BUILTIN_PRESETS.expand(original.clone()), original);
    }
}
