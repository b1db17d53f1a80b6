//! Serializable model states.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::features::FEATURE_COUNT;
use crate::model::Label;

/// A trained model, tagged by kind in its JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelState {
    TreeEnsemble(TreeEnsemble),
    NearestCentroid(NearestCentroid),
}

impl ModelState {
    /// Class id for one feature vector of length [`FEATURE_COUNT`].
    pub fn predict(&self, features: &[f32]) -> u8 {
        match self {
            ModelState::TreeEnsemble(m) => m.predict(features),
            ModelState::NearestCentroid(m) => m.predict(features),
        }
    }

    /// Check internal dimensions against the feature schema.
    pub fn validate(&self) -> Result<()> {
        match self {
            ModelState::TreeEnsemble(m) => m.validate(),
            ModelState::NearestCentroid(m) => m.validate(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ModelState::TreeEnsemble(_) => "tree_ensemble",
            ModelState::NearestCentroid(_) => "nearest_centroid",
        }
    }
}

/// One node of a regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Go to `yes` when `x[feature] < threshold`, else `no`.
    /// A NaN input follows `missing`.
    Split {
        feature: usize,
        threshold: f32,
        yes: usize,
        no: usize,
        #[serde(default)]
        missing: Option<usize>,
    },
    Leaf {
        value: f32,
    },
}

/// A regression tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    pub fn eval(&self, x: &[f32]) -> f32 {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return *value,
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    yes,
                    no,
                    missing,
                }) => {
                    let v = x.get(*feature).copied().unwrap_or(f32::NAN);
                    idx = if v.is_nan() {
                        missing.unwrap_or(*yes)
                    } else if v < *threshold {
                        *yes
                    } else {
                        *no
                    };
                }
                None => return 0.0,
            }
        }
    }

    /// Children must point forward, which also rules out cycles.
    fn validate(&self, tree_index: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::Bundle(format!("tree {} has no nodes", tree_index)));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                yes,
                no,
                missing,
                ..
            } = node
            {
                if *feature >= FEATURE_COUNT {
                    return Err(Error::Bundle(format!(
                        "tree {} node {} splits on feature {} (only {} features)",
                        tree_index, i, feature, FEATURE_COUNT
                    )));
                }
                let children = [Some(*yes), Some(*no), *missing];
                if children
                    .iter()
                    .flatten()
                    .any(|&c| c <= i || c >= self.nodes.len())
                {
                    return Err(Error::Bundle(format!(
                        "tree {} node {} has an invalid child index",
                        tree_index, i
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Gradient-boosted trees in the multi-class softmax layout: tree `t` adds
/// to the margin of class `t % num_class`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub num_class: usize,
    #[serde(default = "default_base_score")]
    pub base_score: f32,
    pub trees: Vec<Tree>,
}

fn default_base_score() -> f32 {
    0.5
}

impl TreeEnsemble {
    /// Per-class margins.
    pub fn margins(&self, x: &[f32]) -> Vec<f32> {
        let mut margins = vec![self.base_score; self.num_class];
        if self.num_class == 0 {
            return margins;
        }
        for (t, tree) in self.trees.iter().enumerate() {
            margins[t % self.num_class] += tree.eval(x);
        }
        margins
    }

    pub fn predict(&self, x: &[f32]) -> u8 {
        argmax(&self.margins(x)) as u8
    }

    fn validate(&self) -> Result<()> {
        if self.num_class != Label::ALL.len() {
            return Err(Error::Bundle(format!(
                "tree ensemble has {} classes, expected {}",
                self.num_class,
                Label::ALL.len()
            )));
        }
        if self.trees.is_empty() {
            return Err(Error::Bundle("tree ensemble has no trees".to_string()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i)?;
        }
        Ok(())
    }
}

/// Nearest class centroid in standardized feature space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestCentroid {
    /// Per-feature mean used for standardization
    pub means: Vec<f32>,
    /// Per-feature scale used for standardization
    pub scales: Vec<f32>,
    /// Class id of each centroid
    pub classes: Vec<u8>,
    /// Standardized centroids, one per entry of `classes`
    pub centroids: Vec<Vec<f32>>,
}

impl NearestCentroid {
    pub fn standardize(&self, x: &[f32]) -> Vec<f32> {
        x.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    pub fn predict(&self, x: &[f32]) -> u8 {
        let z = self.standardize(x);
        let distances: Vec<f32> = self
            .centroids
            .iter()
            .map(|c| {
                c.iter()
                    .zip(&z)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f32>()
            })
            .map(|d| -d)
            .collect();
        self.classes
            .get(argmax(&distances))
            .copied()
            .unwrap_or(Label::None.id())
    }

    fn validate(&self) -> Result<()> {
        let dims_ok = self.means.len() == FEATURE_COUNT
            && self.scales.len() == FEATURE_COUNT
            && self.centroids.iter().all(|c| c.len() == FEATURE_COUNT);
        if !dims_ok {
            return Err(Error::Bundle(format!(
                "nearest-centroid dimensions do not match {} features",
                FEATURE_COUNT
            )));
        }
        if self.classes.is_empty() || self.classes.len() != self.centroids.len() {
            return Err(Error::Bundle(
                "nearest-centroid needs one centroid per class".to_string(),
            ));
        }
        if self.scales.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(Error::Bundle(
                "nearest-centroid scales must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Index of the first maximum (NaN never wins).
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] || values[best].is_nan() {
            best = i;
        }
    }
    best
}
