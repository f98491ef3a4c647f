//! # seglime viz
//!
//! Turns [`seglime_core::Explanation`]s into pictures: selects the segments
//! worth showing, paints them into RGBA overlays whose opacity follows the
//! segment weights, and composites the result onto the explained image.

pub mod color;
pub mod error;
pub mod overlay;
pub mod render;
pub mod select;

pub use color::Color;
pub use error::{RenderError, Result};
pub use overlay::{
    Overlay, ReferenceWeight, composite, generate_overlay, mark_boundaries, scale_opacity,
    scale_overlay, smooth_weights,
};
pub use render::{RenderOptions, render_explanation};
pub use select::{Selection, SelectionLimits, select_segments};
