use serde::Deserialize;

use crate::error::ValidationError;
use crate::jobs::model::BBox;

/// About 1 km at the equator.
pub const MAX_SPAN_DEGREES: f64 = 0.009;

/// Candidate rectangle as it arrives from a client. Every edge is optional
/// so a missing edge can be reported by name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BBoxInput {
    pub north: Option<f64>,
    pub south: Option<f64>,
    pub east: Option<f64>,
    pub west: Option<f64>,
}

impl From<BBox> for BBoxInput {
    fn from(b: BBox) -> Self {
        Self {
            north: Some(b.north),
            south: Some(b.south),
            east: Some(b.east),
            west: Some(b.west),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BBoxRules {
    pub max_span: f64,
    /// Off by default: stored jobs may carry `north <= south` or `east <= west`.
    pub reject_inverted: bool,
}

impl Default for BBoxRules {
    fn default() -> Self {
        Self {
            max_span: MAX_SPAN_DEGREES,
            reject_inverted: false,
        }
    }
}

pub fn validate_bbox(input: &BBoxInput, rules: &BBoxRules) -> Result<BBox, ValidationError> {
    let north = edge(input.north, "north")?;
    let south = edge(input.south, "south")?;
    let east = edge(input.east, "east")?;
    let west = edge(input.west, "west")?;

    let bbox = BBox {
        north,
        south,
        east,
        west,
    };

    if rules.reject_inverted && (bbox.lat_span() <= 0.0 || bbox.lng_span() <= 0.0) {
        return Err(ValidationError::Inverted);
    }

    // compared on the computed difference, the same way the map page does
    if bbox.lat_span() > rules.max_span || bbox.lng_span() > rules.max_span {
        return Err(ValidationError::TooLarge {
            lat_span: bbox.lat_span(),
            lng_span: bbox.lng_span(),
        });
    }

    Ok(bbox)
}

fn edge(value: Option<f64>, name: &'static str) -> Result<f64, ValidationError> {
    let v = value.ok_or(ValidationError::MissingField(name))?;
    if !v.is_finite() {
        return Err(ValidationError::NonFinite(name));
    }
    Ok(v)
}
