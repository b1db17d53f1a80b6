//! The closed label taxonomy.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Category assigned to each block.
///
/// The integer ids are fixed here and never derived from training data, so a
/// retrained model can never renumber categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    None = 0,
    Title = 1,
    H1 = 2,
    H2 = 3,
    H3 = 4,
    H4 = 5,
}

impl Label {
    /// Every label in id order.
    pub const ALL: [Label; 6] = [
        Label::None,
        Label::Title,
        Label::H1,
        Label::H2,
        Label::H3,
        Label::H4,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Label> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::None => "NONE",
            Label::Title => "TITLE",
            Label::H1 => "H1",
            Label::H2 => "H2",
            Label::H3 => "H3",
            Label::H4 => "H4",
        }
    }

    /// Heading depth 1-4, or `None` for NONE and TITLE.
    pub fn heading_level(self) -> Option<u8> {
        match self {
            Label::H1 => Some(1),
            Label::H2 => Some(2),
            Label::H3 => Some(3),
            Label::H4 => Some(4),
            Label::None | Label::Title => None,
        }
    }

    pub fn is_heading(self) -> bool {
        self.heading_level().is_some()
    }

    /// The label-name to id table stored in classifier bundles.
    pub fn mapping() -> BTreeMap<String, u8> {
        Self::ALL
            .iter()
            .map(|l| (l.as_str().to_string(), l.id()))
            .collect()
    }
}

/// Heading level encoded in a raw label token such as `"H2"`.
///
/// Returns `None` for non-heading tokens and for malformed ones (`"H"`,
/// `"Habc"`), which callers treat as "no context transition".
pub fn heading_level_of(token: &str) -> Option<u8> {
    token.strip_prefix('H')?.parse::<u8>().ok()
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| format!("unknown label '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_fixed() {
        assert_eq!(Label::None.id(), 0);
        assert_eq!(Label::Title.id(), 1);
        assert_eq!(Label::H1.id(), 2);
        assert_eq!(Label::H4.id(), 5);
        assert_eq!(Label::from_id(3), Some(Label::H2));
        assert_eq!(Label::from_id(6), None);
    }

    #[test]
    fn test_mapping_matches_ids() {
        let mapping = Label::mapping();
        assert_eq!(mapping.len(), 6);
        assert_eq!(mapping["NONE"], 0);
        assert_eq!(mapping["H3"], 4);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("TITLE".parse::<Label>().unwrap(), Label::Title);
        assert!("H5".parse::<Label>().is_err());
        assert_eq!(Label::H2.to_string(), "H2");
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Label::H1).unwrap();
        assert_eq!(json, "\"H1\"");
        let label: Label = serde_json::from_str("\"NONE\"").unwrap();
        assert_eq!(label, Label::None);
    }

    #[test]
    fn test_heading_level_of_tokens() {
        assert_eq!(heading_level_of("H1"), Some(1));
        assert_eq!(heading_level_of("H4"), Some(4));
        assert_eq!(heading_level_of("H"), None);
        assert_eq!(heading_level_of("Habc"), None);
        assert_eq!(heading_level_of("TITLE"), None);
        assert_eq!(heading_level_of("NONE"), None);
    }
}
