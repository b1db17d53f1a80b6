//! The classifier bundle: model, id maps, taxonomy and feature schema,
//! persisted and loaded as one JSON document.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::features::{IdMap, Vocabulary, FEATURE_COUNT, FEATURE_NAMES, SCHEMA_VERSION};
use crate::model::Label;

use super::model::ModelState;
use super::Classifier;

/// Current on-disk bundle layout.
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// A trained classifier with everything needed to featurize for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub format_version: u32,
    pub schema: String,
    pub feature_names: Vec<String>,
    pub label_mapping: BTreeMap<String, u8>,
    pub font_map: IdMap,
    pub language_map: IdMap,
    pub model: ModelState,
}

impl Bundle {
    /// Bundle a model with the current schema and taxonomy.
    pub fn new(vocab: Vocabulary, model: ModelState) -> Self {
        Self {
            format_version: BUNDLE_FORMAT_VERSION,
            schema: SCHEMA_VERSION.to_string(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            label_mapping: Label::mapping(),
            font_map: vocab.font_map,
            language_map: vocab.language_map,
            model,
        }
    }

    /// The id maps the model was trained with.
    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary::new(self.font_map.clone(), self.language_map.clone())
    }

    /// Load and verify a bundle file. Any inconsistency is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let bundle: Bundle = serde_json::from_slice(&data)
            .map_err(|e| Error::Bundle(format!("{}: {}", path.display(), e)))?;
        bundle.validate()?;
        log::info!(
            "Loaded {} bundle from {} ({} fonts, {} languages)",
            bundle.model.kind(),
            path.display(),
            bundle.font_map.len(),
            bundle.language_map.len()
        );
        Ok(bundle)
    }

    /// Parse and verify a bundle from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let bundle: Bundle =
            serde_json::from_str(json).map_err(|e| Error::Bundle(e.to_string()))?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Write the bundle as pretty JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Check version, feature schema, taxonomy and model dimensions.
    pub fn validate(&self) -> Result<()> {
        if self.format_version != BUNDLE_FORMAT_VERSION {
            return Err(Error::Bundle(format!(
                "unsupported format version {} (expected {})",
                self.format_version, BUNDLE_FORMAT_VERSION
            )));
        }

        if let Some(detail) = schema_difference(&self.schema, &self.feature_names) {
            return Err(Error::SchemaMismatch {
                expected: FEATURE_COUNT,
                found: self.feature_names.len(),
                detail,
            });
        }

        if self.label_mapping != Label::mapping() {
            return Err(Error::Bundle(format!(
                "label mapping {:?} differs from the fixed taxonomy",
                self.label_mapping
            )));
        }

        if !self.font_map.is_dense() || !self.language_map.is_dense() {
            return Err(Error::Bundle("id maps must be dense".to_string()));
        }

        self.model.validate()
    }
}

/// Describe how a bundle's schema differs from the compiled one.
fn schema_difference(schema: &str, names: &[String]) -> Option<String> {
    if schema != SCHEMA_VERSION {
        return Some(format!(
            "schema '{}' is not '{}'",
            schema, SCHEMA_VERSION
        ));
    }
    if names.len() != FEATURE_COUNT {
        return Some("feature count differs".to_string());
    }
    names
        .iter()
        .zip(FEATURE_NAMES)
        .position(|(a, b)| a != b)
        .map(|i| {
            format!(
                "feature {} is '{}', expected '{}'",
                i, names[i], FEATURE_NAMES[i]
            )
        })
}

impl Classifier for Bundle {
    fn predict(&self, features: &[f32]) -> Result<u8> {
        if features.len() != FEATURE_COUNT {
            return Err(Error::FeatureLength {
                expected: FEATURE_COUNT,
                found: features.len(),
            });
        }
        Ok(self.model.predict(features))
    }
}
