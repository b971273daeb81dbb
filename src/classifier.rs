//! Exterior vs. interior photo classification
//!
//! Classification is biased toward [`PhotoMode::Exterior`]: a studio floor and
//! wall is the common case, and interior treatment is reserved for shots with
//! no clean subject silhouette at all.

use crate::types::{Classification, PhotoMode, SubjectAnalysis};
use tracing::debug;

/// Thresholds above which a cutout is considered to fill the whole frame
const FULL_FRAME_OPAQUE: f64 = 0.995;
const FULL_FRAME_EXTENT: f64 = 0.96;
const FULL_FRAME_COVERAGE: f64 = 0.99;

/// Thresholds for the advisory interior hint
const HINT_OPAQUE: f64 = 0.85;
const HINT_COVERAGE: f64 = 0.85;

/// Decide the photo treatment for an analyzed cutout
///
/// Rules are evaluated in order and the first match wins. The result depends
/// only on `has_alpha`, the two validity flags, `opaque_ratio`,
/// `soft_width_pct`, `soft_height_pct` and `soft_coverage`.
#[must_use]
pub fn classify(analysis: &SubjectAnalysis) -> Classification {
    let interior = Classification {
        mode: PhotoMode::Interior,
        interior_hint: false,
    };

    if !analysis.has_alpha {
        debug!("No alpha channel in cutout; interior treatment");
        return interior;
    }

    if !analysis.soft.valid || !analysis.solid.valid {
        debug!(
            soft_valid = analysis.soft.valid,
            solid_valid = analysis.solid.valid,
            "No distinguishable subject; interior treatment"
        );
        return interior;
    }

    if analysis.opaque_ratio > FULL_FRAME_OPAQUE
        && analysis.soft_width_pct > FULL_FRAME_EXTENT
        && analysis.soft_height_pct > FULL_FRAME_EXTENT
        && analysis.soft_coverage > FULL_FRAME_COVERAGE
    {
        debug!(
            opaque_ratio = analysis.opaque_ratio,
            soft_coverage = analysis.soft_coverage,
            "Subject fills the frame; interior treatment"
        );
        return interior;
    }

    let interior_hint =
        analysis.opaque_ratio > HINT_OPAQUE && analysis.soft_coverage > HINT_COVERAGE;

    Classification {
        mode: PhotoMode::Exterior,
        interior_hint,
    }
}
