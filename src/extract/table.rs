//! Coarse table-region inference from ruling lines.
//!
//! Thin horizontal and vertical drawings are treated as table rulings. When a
//! page has both kinds, one rectangle spanning all of them becomes the page's
//! table region. Several disjoint tables on a page collapse into one region.

use crate::error::{Error, Result};
use crate::model::BBox;

/// Horizontal ruling: wider than this...
pub const H_RULING_MIN_WIDTH: f32 = 30.0;
/// ...and thinner than this.
pub const H_RULING_MAX_HEIGHT: f32 = 3.0;
/// Vertical ruling: taller than this...
pub const V_RULING_MIN_HEIGHT: f32 = 20.0;
/// ...and narrower than this.
pub const V_RULING_MAX_WIDTH: f32 = 3.0;

/// Orientation of a ruling line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ruling {
    Horizontal,
    Vertical,
}

/// Classify one drawing as a ruling, if it is one.
pub fn classify_ruling(rect: &BBox) -> Option<Ruling> {
    let (w, h) = (rect.width(), rect.height());
    if w > H_RULING_MIN_WIDTH && h < H_RULING_MAX_HEIGHT {
        Some(Ruling::Horizontal)
    } else if h > V_RULING_MIN_HEIGHT && w < V_RULING_MAX_WIDTH {
        Some(Ruling::Vertical)
    } else {
        None
    }
}

/// Infer the single table rectangle of a page.
///
/// The rectangle spans horizontally from the leftmost to the rightmost
/// vertical ruling and vertically from the topmost to the bottommost
/// horizontal ruling. Returns `Ok(None)` unless both kinds are present.
///
/// Drawings with non-finite or inverted coordinates make the whole page's
/// geometry untrustworthy and are rejected with [`Error::MalformedDrawing`].
pub fn infer_table_region(page: u32, drawings: &[BBox]) -> Result<Option<BBox>> {
    let mut horizontal: Option<(f32, f32)> = None;
    let mut vertical: Option<(f32, f32)> = None;

    for (i, rect) in drawings.iter().enumerate() {
        if !rect.is_finite() {
            return Err(Error::MalformedDrawing {
                page,
                reason: format!("drawing {} has non-finite coordinates", i),
            });
        }
        if rect.x1 < rect.x0 || rect.y1 < rect.y0 {
            return Err(Error::MalformedDrawing {
                page,
                reason: format!("drawing {} has inverted edges", i),
            });
        }

        match classify_ruling(rect) {
            Some(Ruling::Horizontal) => {
                horizontal = Some(match horizontal {
                    Some((top, bottom)) => (top.min(rect.y0), bottom.max(rect.y1)),
                    None => (rect.y0, rect.y1),
                });
            }
            Some(Ruling::Vertical) => {
                vertical = Some(match vertical {
                    Some((left, right)) => (left.min(rect.x0), right.max(rect.x1)),
                    None => (rect.x0, rect.x1),
                });
            }
            None => {}
        }
    }

    Ok(match (horizontal, vertical) {
        (Some((top, bottom)), Some((left, right))) => {
            let region = BBox::new(left, top, right, bottom);
            log::debug!("page {}: table region {:?}", page, region);
            Some(region)
        }
        _ => None,
    })
}

/// Whether a block's center lies inside the table region.
pub fn is_in_table(region: Option<&BBox>, block: &BBox) -> bool {
    region.is_some_and(|r| {
        let (cx, cy) = block.center();
        r.contains_point(cx, cy)
    })
}
