//! Slide deck to PDF conversion.
//!
//! Uses the desktop presentation app's automation interface where the host
//! offers one, and a headless LibreOffice otherwise or when that fails. Every
//! external process is bounded by the job's timeout and killed on expiry.

pub mod dispatcher;
pub mod headless;
pub mod job;
pub mod native;
mod process;

pub use dispatcher::{Converter, ConverterOptions, Strategy};
pub use headless::HeadlessConverter;
pub use job::{ConversionJob, DEFAULT_TIMEOUT};
pub use native::NativeAutomation;
