//! Training: labeled block files to a feature dataset and a fitted bundle.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::features::{
    document_median_font_size, FeatureEngine, IdMap, Vocabulary, FEATURE_COUNT, FEATURE_NAMES,
    SCHEMA_VERSION,
};
use crate::model::{Label, TextBlock};

use super::bundle::Bundle;
use super::model::{ModelState, NearestCentroid};

/// Scales below this are treated as constant features.
const MIN_SCALE: f32 = 1e-6;

/// One labeled document: the unit of heading-context reset.
#[derive(Debug, Clone)]
pub struct LabeledDocument {
    /// Where the blocks came from, for error messages
    pub name: String,
    pub blocks: Vec<TextBlock>,
}

impl LabeledDocument {
    pub fn new(name: impl Into<String>, blocks: Vec<TextBlock>) -> Self {
        Self {
            name: name.into(),
            blocks,
        }
    }

    /// Resolve every block's label against the taxonomy.
    pub fn labels(&self) -> Result<Vec<Label>> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(index, block)| {
                block
                    .label_token()
                    .parse::<Label>()
                    .map_err(|_| Error::InvalidLabel {
                        label: block.label_token().to_string(),
                        source_name: self.name.clone(),
                        index,
                    })
            })
            .collect()
    }
}

/// Feature matrix and label ids pooled over a training corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub schema: String,
    pub feature_names: Vec<String>,
    pub median_font_size: f32,
    pub font_map: IdMap,
    pub language_map: IdMap,
    pub features: Vec<Vec<f32>>,
    pub labels: Vec<u8>,
}

impl Dataset {
    /// Featurize a corpus.
    ///
    /// Id maps and the median font size are built over all documents;
    /// heading context restarts at each document.
    pub fn build(documents: &[LabeledDocument]) -> Result<Self> {
        let mut labels = Vec::new();
        for doc in documents {
            labels.extend(doc.labels()?.into_iter().map(Label::id));
        }
        if labels.is_empty() {
            return Err(Error::EmptyTrainingSet(format!(
                "{} documents without blocks",
                documents.len()
            )));
        }

        let all_blocks = documents.iter().flat_map(|d| d.blocks.iter());
        let vocab = Vocabulary::from_blocks(all_blocks.clone());
        let median = document_median_font_size(all_blocks);

        let engine = FeatureEngine::new();
        let features: Vec<Vec<f32>> = documents
            .iter()
            .flat_map(|d| engine.featurize_labeled(&d.blocks, median, &vocab))
            .collect();

        log::info!(
            "Built dataset: {} blocks from {} documents, median font size {:.1}",
            features.len(),
            documents.len(),
            median
        );

        Ok(Self {
            schema: SCHEMA_VERSION.to_string(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            median_font_size: median,
            font_map: vocab.font_map,
            language_map: vocab.language_map,
            features,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary::new(self.font_map.clone(), self.language_map.clone())
    }

    /// Number of examples per label.
    pub fn class_counts(&self) -> BTreeMap<Label, usize> {
        let mut counts = BTreeMap::new();
        for id in &self.labels {
            if let Some(label) = Label::from_id(*id) {
                *counts.entry(label).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Write the dataset as JSON, e.g. for an external booster.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Fit a nearest-centroid model on standardized features.
pub fn fit_nearest_centroid(dataset: &Dataset) -> Result<NearestCentroid> {
    if dataset.is_empty() {
        return Err(Error::EmptyTrainingSet("dataset has no rows".to_string()));
    }
    let n = dataset.len() as f32;

    let mut means = vec![0.0f32; FEATURE_COUNT];
    for row in &dataset.features {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v / n;
        }
    }

    let mut scales = vec![0.0f32; FEATURE_COUNT];
    for row in &dataset.features {
        for ((s, v), m) in scales.iter_mut().zip(row).zip(&means) {
            *s += (v - m) * (v - m) / n;
        }
    }
    for s in scales.iter_mut() {
        *s = s.sqrt();
        if !(s.is_finite() && *s > MIN_SCALE) {
            *s = 1.0;
        }
    }

    let mut sums: BTreeMap<u8, (Vec<f32>, usize)> = BTreeMap::new();
    for (row, label) in dataset.features.iter().zip(&dataset.labels) {
        let entry = sums
            .entry(*label)
            .or_insert_with(|| (vec![0.0; FEATURE_COUNT], 0));
        for ((acc, v), (m, s)) in entry.0.iter_mut().zip(row).zip(means.iter().zip(&scales)) {
            *acc += (v - m) / s;
        }
        entry.1 += 1;
    }

    let (classes, centroids) = sums
        .into_iter()
        .map(|(class, (sum, count))| {
            (
                class,
                sum.into_iter().map(|v| v / count as f32).collect::<Vec<f32>>(),
            )
        })
        .unzip();

    Ok(NearestCentroid {
        means,
        scales,
        classes,
        centroids,
    })
}

/// Build the dataset and fit the built-in model into a bundle.
pub fn train(documents: &[LabeledDocument]) -> Result<(Dataset, Bundle)> {
    let dataset = Dataset::build(documents)?;
    let model = fit_nearest_centroid(&dataset)?;
    for (label, count) in dataset.class_counts() {
        log::debug!("class {}: {} examples", label, count);
    }
    let bundle = Bundle::new(dataset.vocabulary(), ModelState::NearestCentroid(model));
    bundle.validate()?;
    Ok((dataset, bundle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classifier;
    use crate::model::BBox;

    fn block(text: &str, size: f32, bold: bool, label: Option<&str>) -> TextBlock {
        let mut b = TextBlock::new(text, BBox::new(72.0, 100.0, 300.0, 100.0 + size), 1);
        b.font_size = size;
        b.is_bold = bold;
        b.label = label.map(str::to_string);
        b
    }

    fn corpus() -> Vec<LabeledDocument> {
        let doc = |name: &str| {
            LabeledDocument::new(
                name,
                vec![
                    block("A Study of Things", 24.0, true, Some("TITLE")),
                    block("1. Introduction", 16.0, true, Some("H1")),
                    block("Body text of the section goes here.", 10.0, false, None),
                    block("More body text follows in this paragraph.", 10.0, false, Some("NONE")),
                    block("2. Methods", 16.0, true, Some("H1")),
                    block("Yet more body text for the second section.", 10.0, false, None),
                ],
            )
        };
        vec![doc("a.json"), doc("b.json")]
    }

    #[test]
    fn test_dataset_shape_and_labels() {
        let dataset = Dataset::build(&corpus()).unwrap();
        assert_eq!(dataset.len(), 12);
        assert!(dataset.features.iter().all(|r| r.len() == FEATURE_COUNT));
        assert_eq!(dataset.labels[..3], [1u8, 2, 0]);
        // pooled: six 10s, four 16s, two 24s
        assert_eq!(dataset.median_font_size, 13.0);
        assert_eq!(dataset.class_counts()[&Label::H1], 4);
    }

    #[test]
    fn test_context_resets_per_document() {
        let dataset = Dataset::build(&corpus()).unwrap();
        let level = FEATURE_NAMES
            .iter()
            .position(|n| *n == "last_heading_level")
            .unwrap();
        // Last block of doc a sees H1; first block of doc b sees nothing.
        assert_eq!(dataset.features[5][level], 1.0);
        assert_eq!(dataset.features[6][level], 0.0);
    }

    #[test]
    fn test_unknown_label_is_fatal() {
        let docs = vec![LabeledDocument::new(
            "bad.json",
            vec![block("x", 10.0, false, None), block("y", 10.0, false, Some("H7"))],
        )];
        match Dataset::build(&docs) {
            Err(Error::InvalidLabel {
                label,
                source_name,
                index,
            }) => {
                assert_eq!(label, "H7");
                assert_eq!(source_name, "bad.json");
                assert_eq!(index, 1);
            }
            other => panic!("unexpected result: {:?}", other.map(|d| d.len())),
        }
    }

    #[test]
    fn test_empty_corpus() {
        assert!(matches!(
            Dataset::build(&[LabeledDocument::new("e.json", vec![])]),
            Err(Error::EmptyTrainingSet(_))
        ));
    }

    #[test]
    fn test_trained_bundle_separates_training_data() {
        let (dataset, bundle) = train(&corpus()).unwrap();
        assert!(bundle.validate().is_ok());
        for (row, label) in dataset.features.iter().zip(&dataset.labels) {
            assert_eq!(bundle.predict(row).unwrap(), *label);
        }
    }

    #[test]
    fn test_dataset_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        let dataset = Dataset::build(&corpus()).unwrap();
        dataset.save(&path).unwrap();
        let back: Dataset = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(back.labels, dataset.labels);
    }
}
