//! Geometric image operations used by the scanning pipeline.
//!
//! - Crop: extract a detector region, reframe onto a square canvas
//! - Resize: scale a crop up for far-away codes
//! - Rotation: deskew about the image center
//!
//! # Coordinate System
//!
//! - Rotation angles are in degrees, positive = counter-clockwise on screen
//! - Pixel coordinates have their origin at the top-left corner

mod crop;
mod resize;
mod rotation;

pub use crop::{crop_pixels, crop_preview_rect, pad_to_square};
pub use resize::{resize, scale_by};
pub use rotation::{rotate_about_center, InterpolationFilter};
