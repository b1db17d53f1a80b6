//! Block classification: the classifier seam, model states, bundles and
//! the built-in trainer.

mod bundle;
mod model;
mod train;

use crate::error::Result;
use crate::model::Label;

pub use bundle::{Bundle, BUNDLE_FORMAT_VERSION};
pub use model::{ModelState, NearestCentroid, Tree, TreeEnsemble, TreeNode};
pub use train::{fit_nearest_centroid, train, Dataset, LabeledDocument};

/// A stateless feature-vector → label-id function.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &[f32]) -> Result<u8>;
}

impl<F> Classifier for F
where
    F: Fn(&[f32]) -> u8 + Send + Sync,
{
    fn predict(&self, features: &[f32]) -> Result<u8> {
        Ok(self(features))
    }
}

/// Map a predicted id onto the taxonomy; ids outside it count as NONE.
pub fn label_from_prediction(id: u8) -> Label {
    Label::from_id(id).unwrap_or_else(|| {
        log::warn!("Classifier returned unknown label id {}, using NONE", id);
        Label::None
    })
}
