//! 2D math
//!
//! The affine transform used for node placement, world transforms and draw
//! context composition.

mod affine;

pub use affine::{Affine, Decomposed};
