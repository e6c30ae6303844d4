use std::time::Duration;

use crate::assets::decode::{DecodeOpts, DecodedImage, decode_any};
use crate::assets::source::ImageSource;
use crate::foundation::error::GridsheetResult;
use crate::session::pacing::Pacer;

/// Bounded retry for image acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub retries: u32,
    /// Fixed delay between attempts. Always waited, whatever pacer the run uses.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Single attempt, no delay.
    pub const NONE: Self = Self {
        retries: 0,
        delay: Duration::ZERO,
    };

    /// Total attempts including the first.
    pub fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            delay: Duration::from_millis(200),
        }
    }
}

/// Outcome of acquiring one image. Failures never escape as errors.
#[derive(Debug)]
pub enum Acquired {
    /// Decoded pixels with non-zero natural size.
    Decoded(DecodedImage),
    /// Every attempt failed; the cell shows a placeholder.
    Broken {
        /// Attempts made.
        attempts: u32,
        /// Last failure.
        reason: String,
    },
}

impl Acquired {
    /// Return `true` for [`Acquired::Broken`].
    pub fn is_broken(&self) -> bool {
        matches!(self, Self::Broken { .. })
    }

    /// Decoded pixels, if any.
    pub fn image(&self) -> Option<&DecodedImage> {
        match self {
            Self::Decoded(img) => Some(img),
            Self::Broken { .. } => None,
        }
    }
}

/// Fetches, decodes and validates images with bounded retry.
pub struct ImageAcquirer<'a> {
    source: &'a dyn ImageSource,
    pacer: &'a dyn Pacer,
    policy: RetryPolicy,
    opts: DecodeOpts,
}

impl<'a> ImageAcquirer<'a> {
    /// Create an acquirer over `source`; `pacer` is given a yield before each retry.
    pub fn new(source: &'a dyn ImageSource, pacer: &'a dyn Pacer, policy: RetryPolicy) -> Self {
        Self {
            source,
            pacer,
            policy,
            opts: DecodeOpts::default(),
        }
    }

    /// Override decode hints (SVG raster size).
    pub fn with_decode_opts(mut self, opts: DecodeOpts) -> Self {
        self.opts = opts;
        self
    }

    /// Retry policy in effect.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Acquire `locator`, degrading to [`Acquired::Broken`] once all attempts fail.
    pub fn acquire(&self, locator: &str) -> Acquired {
        self.acquire_with(locator, self.opts)
    }

    pub(crate) fn acquire_with(&self, locator: &str, opts: DecodeOpts) -> Acquired {
        let attempts = self.policy.attempts();
        let mut last_err = String::new();
        for attempt in 1..=attempts {
            match self.try_once(locator, opts) {
                Ok(img) => return Acquired::Decoded(img),
                Err(e) => {
                    tracing::debug!(locator, attempt, error = %e, "image acquisition attempt failed");
                    last_err = e.to_string();
                }
            }
            if attempt < attempts {
                self.pacer.yield_now();
                if !self.policy.delay.is_zero() {
                    std::thread::sleep(self.policy.delay);
                }
            }
        }
        tracing::warn!(locator, attempts, error = %last_err, "image unavailable, using placeholder");
        Acquired::Broken {
            attempts,
            reason: last_err,
        }
    }

    fn try_once(&self, locator: &str, opts: DecodeOpts) -> GridsheetResult<DecodedImage> {
        let bytes = self.source.fetch(locator)?;
        let img = decode_any(locator, &bytes, opts)?;
        img.ensure_complete()?;
        Ok(img)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/acquire.rs"]
mod tests;
