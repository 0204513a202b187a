//! Format-independent redaction logic: logo detection, watermarking and
//! text masking over any [`PageSurface`].

pub mod error;
pub mod geometry;
pub mod logo;
pub mod mask;
pub mod page;
pub mod record;
pub mod region;
pub mod surface;
pub mod watermark;

#[cfg(test)]
mod testing;

pub use error::{HeuristicError, SurfaceError, WordSearchError};
pub use geometry::{overlap_exceeds, Point, Rect};
pub use logo::{detect_logo_regions, HeuristicKind, LogoDetection, LogoOptions};
pub use mask::{mask_words, normalize_words, MaskOptions, MaskWidthPolicy, SmallTextOptions};
pub use page::{process_page, PageOptions, PageReport};
pub use record::{LogKind, LogRecord, ProcessingLog};
pub use region::{Color, Priority, RedactionBatch, RedactionRequest, Region, RegionSource};
pub use surface::{ImagePlacement, ImageProfile, PageSurface, RectStyle, StandardFont, TextAnchor, TextSpan, TextStyle};
pub use watermark::{annotate_watermarks, plan_watermarks, Placement, WatermarkOptions, WatermarkStyle};
