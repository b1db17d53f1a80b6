//! Post-classification correction rules.
//!
//! Rules can only demote a label to NONE and always override the model.

use unicode_normalization::UnicodeNormalization;

use crate::model::{Label, TextBlock};

/// A correction that forces NONE when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Block sits inside the page's inferred table region.
    TableMembership,
    /// Trimmed text is nothing but digits, e.g. a page number.
    NumericOnly,
}

impl Rule {
    pub fn fires(&self, block: &TextBlock) -> bool {
        match self {
            Rule::TableMembership => block.is_in_table,
            Rule::NumericOnly => is_numeric_only(&block.text),
        }
    }
}

/// Non-empty after trimming and every character a digit.
pub fn is_numeric_only(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && trimmed.chars().all(is_digit)
}

/// A numeric character that stands for a single digit.
///
/// Fractions (`½`) and letter-like numerals (`Ⅻ`) decompose into several
/// characters under NFKC and are rejected; superscript and full-width
/// digits fold to one digit and are kept.
fn is_digit(c: char) -> bool {
    if c.is_ascii_digit() {
        return true;
    }
    if !c.is_numeric() {
        return false;
    }
    let mut folded = std::iter::once(c).nfkc();
    matches!((folded.next(), folded.next()), (Some(d), None) if d.is_numeric())
}

/// The ordered set of rules applied after classification.
#[derive(Debug, Clone)]
pub struct RuleOverlay {
    rules: Vec<Rule>,
}

impl Default for RuleOverlay {
    fn default() -> Self {
        Self {
            rules: vec![Rule::TableMembership, Rule::NumericOnly],
        }
    }
}

impl RuleOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// An overlay that never intervenes.
    pub fn disabled() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The first rule that fires for the block, if any.
    pub fn triggered(&self, block: &TextBlock) -> Option<Rule> {
        self.rules.iter().copied().find(|r| r.fires(block))
    }

    /// Final label of one block.
    pub fn correct(&self, block: &TextBlock, predicted: Label) -> Label {
        match self.triggered(block) {
            Some(rule) if predicted != Label::None => {
                log::debug!(
                    "{:?} demoted {} to NONE for {:?}",
                    rule,
                    predicted,
                    block.text
                );
                Label::None
            }
            Some(_) => Label::None,
            None => predicted,
        }
    }

    /// Correct a whole label sequence in place.
    pub fn apply(&self, blocks: &[TextBlock], labels: &mut [Label]) {
        for (block, label) in blocks.iter().zip(labels.iter_mut()) {
            *label = self.correct(block, *label);
        }
    }
}
