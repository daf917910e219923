//! Geometry Derivation - Boundary Ring and Envelope
//!
//! Both transforms are one-way. `reorder_ring` drops the pair separator,
//! so its output cannot be split back into pairs reliably.

use serde::{Deserialize, Serialize};

use crate::mapper::ConvertError;

/// Envelope corners in the target dialect's naming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub lower_corner: String,
    pub upper_corner: String,
}

/// Reverse the pair order of a `x,y x,y ...` ring and emit `x y x y ...`.
///
/// The source lists the outer ring in the opposite winding order to the
/// one XPlanGML expects. `path` is only used for error reporting.
pub fn reorder_ring(coordinates: &str, path: &str) -> Result<String, ConvertError> {
    let mut pairs = Vec::new();

    for token in coordinates.split_whitespace() {
        let mut parts = token.split(',');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(x), Some(y), None) if !x.is_empty() && !y.is_empty() => pairs.push((x, y)),
            _ => {
                return Err(ConvertError::MalformedInput {
                    path: format!("{} (bad coordinate pair '{}')", path, token),
                })
            }
        }
    }

    if pairs.is_empty() {
        return Err(ConvertError::MalformedInput {
            path: format!("{} (empty ring)", path),
        });
    }

    Ok(pairs
        .iter()
        .rev()
        .map(|(x, y)| format!("{} {}", x, y))
        .collect::<Vec<_>>()
        .join(" "))
}

/// Map the source box corners onto `lowerCorner` / `upperCorner`.
///
/// The first source corner (east, south) becomes the lower corner and the
/// second (west, north) the upper corner, exactly as given.
pub fn remap_bbox(east: &str, south: &str, west: &str, north: &str) -> Envelope {
    Envelope {
        lower_corner: format!("{} {}", east, south),
        upper_corner: format!("{} {}", west, north),
    }
}
