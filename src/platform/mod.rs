//! Platform abstraction layer
//!
//! Browser adapters for the core's host interfaces:
//! - `CanvasSurface`: a 2D canvas context as a [`crate::renderer::Surface`]
//! - `WebAudioSink`: procedurally generated sound effects via Web Audio

pub mod web;

pub use web::{CanvasSurface, WebAudioSink};
