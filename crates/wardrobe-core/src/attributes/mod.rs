//! Garment attribute schema: the JSON records the extraction stage emits
//! and the integer encoding the training stage consumes.

pub mod tables;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::DatasetError;

/// Structured attributes for a single garment, as extracted by the LLM.
///
/// Values are stored as the model's strings; [`GarmentAttributes::encode`]
/// maps them onto the closed vocabularies in [`tables`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarmentAttributes {
    /// Garment identifier (the source image's file stem)
    #[serde(default)]
    pub id: String,

    /// "top" or "bottom"
    #[serde(rename = "type")]
    pub kind: String,

    /// Primary color
    pub color1: String,

    /// Secondary color ("none" if single-colored)
    pub color2: String,

    /// Surface pattern
    pub pattern: String,

    /// "formal" or "casual"
    pub dress_code: String,

    /// Fabric material
    pub material: String,

    /// Season the garment suits
    pub seasonality: String,

    /// Cut/fit
    pub fit: String,
}

impl GarmentAttributes {
    /// Encode every categorical value to its integer code.
    ///
    /// Returns `None` (with a warning naming the offending column) if any
    /// value falls outside its vocabulary; such garments are excluded from
    /// training rather than carrying poison values into the feature matrix.
    pub fn encode(&self) -> Option<EncodedGarment> {
        let lookup = |table: &tables::CategoricalTable, value: &str| {
            let code = table.code(value);
            if code.is_none() {
                tracing::warn!(
                    "Unknown {} value {:?} for garment {:?} — excluding from dataset",
                    table.column,
                    value,
                    self.id
                );
            }
            code
        };

        Some(EncodedGarment {
            id: self.id.clone(),
            kind: lookup(&tables::KIND, &self.kind)?,
            color1: lookup(&tables::COLOR1, &self.color1)?,
            color2: lookup(&tables::COLOR2, &self.color2)?,
            pattern: lookup(&tables::PATTERN, &self.pattern)?,
            dress_code: lookup(&tables::DRESS_CODE, &self.dress_code)?,
            material: lookup(&tables::MATERIAL, &self.material)?,
            seasonality: lookup(&tables::SEASONALITY, &self.seasonality)?,
            fit: lookup(&tables::FIT, &self.fit)?,
        })
    }
}

/// A garment with every attribute mapped to its vocabulary code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedGarment {
    pub id: String,
    pub kind: usize,
    pub color1: usize,
    pub color2: usize,
    pub pattern: usize,
    pub dress_code: usize,
    pub material: usize,
    pub seasonality: usize,
    pub fit: usize,
}

/// Load a garment attribute file (a JSON array) from disk.
pub fn load_attributes(path: &Path) -> Result<Vec<GarmentAttributes>, DatasetError> {
    let content = std::fs::read_to_string(path).map_err(|e| DatasetError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| DatasetError::ParseAttributes {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, kind: &str, color1: &str) -> GarmentAttributes {
        GarmentAttributes {
            id: id.to_string(),
            kind: kind.to_string(),
            color1: color1.to_string(),
            color2: "none".to_string(),
            pattern: "solid".to_string(),
            dress_code: "casual".to_string(),
            material: "cotton".to_string(),
            seasonality: "all".to_string(),
            fit: "fitted".to_string(),
        }
    }

    #[test]
    fn test_encode_known_values() {
        let encoded = sample("t01", "top", "navy").encode().unwrap();
        assert_eq!(encoded.kind, 0);
        assert_eq!(encoded.color1, 8);
        assert_eq!(encoded.color2, 10);
        assert_eq!(encoded.pattern, 0);
        assert_eq!(encoded.fit, 2);
    }

    #[test]
    fn test_encode_rejects_unknown_value() {
        let mut attrs = sample("t02", "top", "red");
        attrs.material = "leather".to_string();
        assert!(attrs.encode().is_none());
    }

    #[test]
    fn test_encode_tolerates_llm_casing() {
        let attrs = sample("t03", "Top", "Red");
        let encoded = attrs.encode().unwrap();
        assert_eq!(encoded.kind, 0);
        assert_eq!(encoded.color1, 0);
    }

    #[test]
    fn test_serde_roundtrip_uses_type_key() {
        let attrs = sample("b01", "bottom", "blue");
        let json = serde_json::to_string(&attrs).unwrap();
        assert!(json.contains("\"type\":\"bottom\""));
        assert!(!json.contains("\"kind\""));

        let parsed: GarmentAttributes = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.kind, "bottom");
        assert_eq!(parsed.id, "b01");
    }

    #[test]
    fn test_deserialize_without_id_defaults_empty() {
        let json = r#"{"type":"top","color1":"red","color2":"none","pattern":"solid",
                       "dress_code":"casual","material":"cotton","seasonality":"all","fit":"slim"}"#;
        let parsed: GarmentAttributes = serde_json::from_str(json).unwrap();
        assert!(parsed.id.is_empty());
    }

    #[test]
    fn test_load_attributes_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attributes.json");
        let items = vec![sample("t01", "top", "red"), sample("b01", "bottom", "blue")];
        std::fs::write(&path, serde_json::to_string_pretty(&items).unwrap()).unwrap();

        let loaded = load_attributes(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "t01");
        assert_eq!(loaded[1].kind, "bottom");
    }

    #[test]
    fn test_load_attributes_missing_file() {
        let err = load_attributes(Path::new("/nonexistent/attributes.json")).unwrap_err();
        assert!(matches!(err, DatasetError::Read { .. }));
    }
}
