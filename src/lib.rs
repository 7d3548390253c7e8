//! slide-raster — a PowerPoint (PPTX) rendering engine.
//!
//! Opens an OOXML presentation package, resolves each slide's full
//! relationship ancestry (layout, master, theme), and paints its shapes,
//! text, tables, and pictures onto a caller-supplied [`raster::Canvas`].
//! This crate does not allocate or encode pixels itself — it owns the
//! parsing, layout, and color/geometry resolution, and streams drawing
//! commands to whatever concrete 2-D backend the caller wires up.
//!
//! # Example
//!
//! ```no_run
//! use slide_raster::presentation::{Presentation, RenderOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pres = Presentation::open("deck.pptx")?;
//! let options = RenderOptions::default();
//! let (width, height) = pres.target_dimensions(&options);
//! println!("{} slides at {width}x{height}", pres.slide_count());
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod xml;
pub mod opc;
pub mod error;
pub mod units;
pub mod color;
pub mod theme;
pub mod geometry;
pub mod raster;
pub mod fill;
pub mod text;
pub mod font_resolver;
pub mod picture;
pub mod table;
pub mod chart;
pub mod shape;
pub mod slide;
pub mod presentation;

pub use error::{RenderError, Result};
pub use presentation::{Presentation, PresentationMetadata, PresentationResult, RenderOptions, SlideResult};
pub use raster::Canvas;
