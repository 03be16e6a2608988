//! Strategy selection and the native → headless fallback.

use crate::headless::HeadlessConverter;
use crate::job::ConversionJob;
use crate::native::NativeAutomation;
use std::path::PathBuf;
use storybook_core::Result;

/// How a [`Converter`] is configured.
#[derive(Debug, Clone)]
pub struct ConverterOptions {
    /// Headless tool path or program name. Searched for when unset.
    pub converter: Option<PathBuf>,

    /// Try native automation first where the host offers it.
    pub native: bool,

    /// Give each headless run its own tool profile.
    pub isolate_profile: bool,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            converter: None,
            native: true,
            isolate_profile: true,
        }
    }
}

/// Strategy chosen from host capabilities.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Native automation, falling back to the headless tool on any error.
    NativeThenHeadless(NativeAutomation),
    HeadlessOnly,
}

/// Converts decks to PDF. Holds no per-job state, so one converter can run
/// many jobs concurrently.
#[derive(Debug, Clone)]
pub struct Converter {
    strategy: Strategy,
    headless: HeadlessConverter,
}

impl Converter {
    /// Select a strategy for this host.
    pub fn detect(options: &ConverterOptions) -> Self {
        let native = if options.native {
            NativeAutomation::detect()
        } else {
            None
        };
        let headless = HeadlessConverter::locate(options.converter.as_deref())
            .with_isolated_profile(options.isolate_profile);
        Self::new(native, headless)
    }

    pub fn new(native: Option<NativeAutomation>, headless: HeadlessConverter) -> Self {
        let strategy = match native {
            Some(native) => Strategy::NativeThenHeadless(native),
            None => Strategy::HeadlessOnly,
        };
        log::debug!("Conversion strategy: {:?}", strategy);
        Self { strategy, headless }
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn headless(&self) -> &HeadlessConverter {
        &self.headless
    }

    /// Run one job and return the destination path.
    pub async fn convert(&self, job: &ConversionJob) -> Result<PathBuf> {
        let job = job.prepare()?;

        if let Strategy::NativeThenHeadless(native) = &self.strategy {
            match native.export(&job).await {
                Ok(path) => return Ok(path),
                Err(e) => log::warn!("Native export failed ({}), trying LibreOffice", e),
            }
        }

        self.headless.export(&job).await
    }
}
