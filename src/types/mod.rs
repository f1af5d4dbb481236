//! Core types used throughout the ogshot library.

mod capture;
mod options;

pub use capture::{CaptureOptions, CaptureResult, ColorScheme};
pub use options::{EffectiveOptions, ImageFragment, Provider, RenderedPage};
