//! Data model shared by extraction, featurization and outline assembly.
//!
//! Decoder output ([`PageContent`]) is turned into [`TextBlock`]s, which are
//! labeled with the fixed [`Label`] taxonomy and finally reduced into an
//! [`OutlineResult`].

mod block;
mod geometry;
pub mod label;
mod outline;
mod page;

pub use block::{TextBlock, DEFAULT_FONT_NAME, UNKNOWN_LANGUAGE};
pub use geometry::BBox;
pub use label::{heading_level_of, Label};
pub use outline::{OutlineEntry, OutlineResult, DEFAULT_TITLE};
pub use page::{PageContent, RawBlock, RawLine, RawSpan, SpanFlags};
