//! Derived-artifact generation for uploaded receipt photos.
//!
//! This crate provides:
//! - EXIF orientation normalization (in place, like the upload pipeline expects)
//! - Web-optimized thumbnails for fast admin viewing
//! - The report rendering seam (`ReportRenderer`) plus a built-in HTML renderer

pub mod error;
pub mod photo;
pub mod report;

pub use error::{MediaError, MediaResult};
pub use photo::{normalize_orientation, write_thumbnail};
pub use report::{HtmlReportRenderer, ReportContext, ReportRenderer};
