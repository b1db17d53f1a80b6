//! Dense id maps for categorical block attributes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::TextBlock;

/// Feature value for a category never seen when the map was built.
pub const UNSEEN_ID: f32 = -1.0;

/// Sorted-distinct-value → dense id map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdMap(BTreeMap<String, u32>);

impl IdMap {
    /// Assign ids 0.. to the distinct values in sorted order.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let distinct: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        Self(
            distinct
                .into_iter()
                .enumerate()
                .map(|(i, v)| (v, i as u32))
                .collect(),
        )
    }

    pub fn get(&self, value: &str) -> Option<u32> {
        self.0.get(value).copied()
    }

    /// Id as a feature value, [`UNSEEN_ID`] for unknown values.
    pub fn feature(&self, value: &str) -> f32 {
        self.get(value).map(|id| id as f32).unwrap_or(UNSEEN_ID)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ids are exactly 0..len with no gaps.
    pub fn is_dense(&self) -> bool {
        let ids: BTreeSet<u32> = self.0.values().copied().collect();
        ids.len() == self.0.len() && ids.iter().copied().eq(0..self.0.len() as u32)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Font-name and language maps built over one block collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub font_map: IdMap,
    pub language_map: IdMap,
}

impl Vocabulary {
    pub fn new(font_map: IdMap, language_map: IdMap) -> Self {
        Self {
            font_map,
            language_map,
        }
    }

    /// Build both maps from every block of a collection.
    pub fn from_blocks<'a>(blocks: impl IntoIterator<Item = &'a TextBlock> + Clone) -> Self {
        Self {
            font_map: IdMap::from_values(blocks.clone().into_iter().map(|b| b.font_name.as_str())),
            language_map: IdMap::from_values(blocks.into_iter().map(|b| b.language_code())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox;

    #[test]
    fn test_ids_follow_sorted_order() {
        let map = IdMap::from_values(["Times", "Arial", "Helvetica", "Arial"]);
        assert_eq!(map.len(), 3);
        assert_eq!(map.get("Arial"), Some(0));
        assert_eq!(map.get("Helvetica"), Some(1));
        assert_eq!(map.get("Times"), Some(2));
        assert!(map.is_dense());
    }

    #[test]
    fn test_unseen_value_maps_to_sentinel() {
        let map = IdMap::from_values(["a"]);
        assert_eq!(map.feature("a"), 0.0);
        assert_eq!(map.feature("zzz"), UNSEEN_ID);
    }

    #[test]
    fn test_serde_is_plain_object() {
        let map = IdMap::from_values(["b", "a"]);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"a":0,"b":1}"#);
        let back: IdMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_vocabulary_from_blocks() {
        let mut a = TextBlock::new("one", BBox::default(), 1);
        a.font_name = "Serif".into();
        a.language = Some("en".into());
        let b = TextBlock::new("two", BBox::default(), 1);

        let vocab = Vocabulary::from_blocks(&[a, b]);
        // byte order: uppercase sorts before lowercase
        assert_eq!(vocab.font_map.get("Serif"), Some(0));
        assert_eq!(vocab.font_map.get("default"), Some(1));
        assert_eq!(vocab.language_map.get("en"), Some(0));
        assert_eq!(vocab.language_map.get("unknown"), Some(1));
    }
}
