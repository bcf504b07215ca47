//! texprep is the 2D texture preparation core of a real-time renderer.
//!
//! It covers four independent jobs:
//!
//! - **Resample**: scale an ARGB [`Bitmap`] into a destination bitmap with a tint, picking
//!   area-averaging, block replication or bilinear filtering (12-bit fixed point throughout).
//! - **Clip**: constrain lines and axis-aligned quads (with texture coordinates) to a viewport.
//! - **Expand**: turn a zero-width line description plus a width into the two edges of a quad.
//! - **Ingest**: sniff PNG / JPEG / Microsoft DIB streams and load them into a [`Bitmap`],
//!   including applying a PNG as an alpha mask over an already-loaded bitmap.
//!
//! All operations are synchronous and keep no global state. Loaders only use `Read + Seek` on
//! the stream they are given, and every loader failure leaves the target bitmap in a defined
//! state (reset for replacing loads, untouched for alpha overlays).
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod foundation;
mod render;

pub use assets::detect::{ImageFormat, detect_format};
pub use assets::loader::{ImageLoader, LoadOpts, Transparency};
pub use assets::png::PngLoadMode;
pub use foundation::core::{Argb32, Bitmap, Line, Point, Rect, RenderColor};
pub use foundation::error::{TexprepError, TexprepResult};
pub use render::clip::{ClipOutcome, QuadTexUv, clip_line, clip_quad};
pub use render::line::line_to_quad;
pub use render::resample::{ResampleStrategy, resample, select_strategy};
