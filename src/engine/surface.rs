//! Raster surfaces and device scale selection.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::document::PageNumber;
use crate::error::PageRenderError;

/// Safari's canvas backing stores are capped lower than other engines.
pub const SAFARI_MAX_SCALE: f32 = 2.0;

/// Default pixel budget for one surface (4096 x 4096).
pub const DEFAULT_MAX_SURFACE_PIXELS: u64 = 16_777_216;

/// Rendering engine of the host the surfaces end up in.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostEngine {
    Safari,
    #[default]
    Other,
}

/// Display characteristics used to pick the render scale.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayProfile {
    pub engine: HostEngine,
    /// `None` when the host does not report a pixel ratio.
    pub device_pixel_ratio: Option<f32>,
}

impl DisplayProfile {
    pub const fn new(engine: HostEngine, device_pixel_ratio: Option<f32>) -> Self {
        Self {
            engine,
            device_pixel_ratio,
        }
    }

    /// Render scale for page surfaces.
    ///
    /// Safari is capped at [`SAFARI_MAX_SCALE`]; a missing or nonsensical
    /// ratio falls back to 1.
    pub fn device_scale(&self) -> f32 {
        let ratio = self
            .device_pixel_ratio
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(1.0);
        match self.engine {
            HostEngine::Safari => ratio.min(SAFARI_MAX_SCALE),
            HostEngine::Other => ratio,
        }
    }
}

/// Creates drawing surfaces for rendered pages.
pub trait SurfaceFactory: Send + Sync + std::fmt::Debug {
    fn create(
        &self,
        page: PageNumber,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, PageRenderError>;
}

/// In-memory RGBA surfaces with a per-surface pixel budget.
#[derive(Debug, Clone, Copy)]
pub struct RasterSurfaces {
    max_pixels: u64,
}

impl RasterSurfaces {
    pub const fn new(max_pixels: u64) -> Self {
        Self { max_pixels }
    }

    pub const fn max_pixels(&self) -> u64 {
        self.max_pixels
    }
}

impl Default for RasterSurfaces {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SURFACE_PIXELS)
    }
}

impl SurfaceFactory for RasterSurfaces {
    fn create(
        &self,
        page: PageNumber,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, PageRenderError> {
        let pixels = u64::from(width) * u64::from(height);
        if width == 0 || height == 0 || pixels > self.max_pixels {
            return Err(PageRenderError::SurfaceUnavailable {
                page,
                width,
                height,
            });
        }
        Ok(RgbaImage::new(width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safari_scale_is_capped() {
        let profile = DisplayProfile::new(HostEngine::Safari, Some(3.0));
        assert!((profile.device_scale() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_safari_scale_below_cap_is_kept() {
        let profile = DisplayProfile::new(HostEngine::Safari, Some(1.5));
        assert!((profile.device_scale() - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_other_engine_uses_full_ratio() {
        let profile = DisplayProfile::new(HostEngine::Other, Some(3.0));
        assert!((profile.device_scale() - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unknown_ratio_defaults_to_one() {
        for engine in [HostEngine::Safari, HostEngine::Other] {
            let profile = DisplayProfile::new(engine, None);
            assert!((profile.device_scale() - 1.0).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_nonsense_ratio_defaults_to_one() {
        for ratio in [0.0, -2.0, f32::NAN, f32::INFINITY] {
            let profile = DisplayProfile::new(HostEngine::Other, Some(ratio));
            assert!((profile.device_scale() - 1.0).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_surface_within_budget() {
        let surfaces = RasterSurfaces::new(100);
        let surface = surfaces.create(1, 10, 10).unwrap();
        assert_eq!(surface.dimensions(), (10, 10));
    }

    #[test]
    fn test_surface_over_budget_is_unavailable() {
        let surfaces = RasterSurfaces::new(99);
        assert_eq!(
            surfaces.create(7, 10, 10).unwrap_err(),
            PageRenderError::SurfaceUnavailable {
                page: 7,
                width: 10,
                height: 10
            }
        );
    }
}
