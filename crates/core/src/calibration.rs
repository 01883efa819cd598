//! Scale calibration
//!
//! A calibration maps a measured pixel distance onto a known real-world length,
//! giving the meters-per-pixel factor every quantity is scaled by.

use crate::coords::{CanvasSize, NormalizedPoint};
use serde::{Deserialize, Serialize};

/// Why a calibration input was rejected
///
/// The `Display` text is shown to the user as-is.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum CalibrationError {
    #[error("reference length must be a positive number of meters (got {0})")]
    InvalidReferenceLength(f64),

    #[error("pixel distance must be a positive number of pixels (got {0})")]
    InvalidPixelDistance(f64),
}

/// Check calibration inputs without side effects
///
/// Both values must be finite and strictly positive. The caller decides
/// whether a failure blocks the calibration action.
pub fn validate_calibration(
    reference_length: f64,
    pixel_distance: f64,
) -> Result<(), CalibrationError> {
    if !reference_length.is_finite() || reference_length <= 0.0 {
        return Err(CalibrationError::InvalidReferenceLength(reference_length));
    }
    if !pixel_distance.is_finite() || pixel_distance <= 0.0 {
        return Err(CalibrationError::InvalidPixelDistance(pixel_distance));
    }
    Ok(())
}

/// Snapshot of the current page scale
///
/// Created uncalibrated, replaced wholesale when the user calibrates or resets.
/// Stored documents are revalidated on load and the scale is recomputed from
/// the reference inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "CalibrationRecord")]
pub struct CalibrationData {
    /// Known real-world length in meters
    reference_length: f64,
    /// Measured length of the reference in pixels
    pixel_distance: f64,
    meters_per_pixel: f64,
    is_calibrated: bool,
}

impl CalibrationData {
    /// All zeros, not calibrated
    pub fn uncalibrated() -> Self {
        Self {
            reference_length: 0.0,
            pixel_distance: 0.0,
            meters_per_pixel: 0.0,
            is_calibrated: false,
        }
    }

    /// Calibrate from a known length and its measured pixel distance
    pub fn calibrate(reference_length: f64, pixel_distance: f64) -> Result<Self, CalibrationError> {
        validate_calibration(reference_length, pixel_distance)?;
        Ok(Self {
            reference_length,
            pixel_distance,
            meters_per_pixel: reference_length / pixel_distance,
            is_calibrated: true,
        })
    }

    /// Two-point calibration
    ///
    /// The pixel distance is measured between two normalized points on the
    /// given canvas.
    pub fn from_points(
        start: NormalizedPoint,
        end: NormalizedPoint,
        canvas: CanvasSize,
        reference_length: f64,
    ) -> Result<Self, CalibrationError> {
        let pixel_distance =
            canvas.denormalize_point(start).distance_to(&canvas.denormalize_point(end));
        Self::calibrate(reference_length, pixel_distance)
    }

    pub fn reference_length(&self) -> f64 {
        self.reference_length
    }

    pub fn pixel_distance(&self) -> f64 {
        self.pixel_distance
    }

    /// Scale factor; 0 while uncalibrated
    pub fn meters_per_pixel(&self) -> f64 {
        self.meters_per_pixel
    }

    pub fn is_calibrated(&self) -> bool {
        self.is_calibrated
    }

    /// Convert a pixel length to meters
    pub fn to_meters(&self, pixels: f64) -> f64 {
        pixels * self.meters_per_pixel
    }

    /// Convert a pixel area to square meters
    pub fn to_square_meters(&self, square_pixels: f64) -> f64 {
        square_pixels * self.meters_per_pixel * self.meters_per_pixel
    }
}

impl Default for CalibrationData {
    fn default() -> Self {
        Self::uncalibrated()
    }
}

/// Calibration as written in a project document
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalibrationRecord {
    #[serde(default)]
    reference_length: f64,
    #[serde(default)]
    pixel_distance: f64,
    #[serde(default)]
    is_calibrated: bool,
}

impl TryFrom<CalibrationRecord> for CalibrationData {
    type Error = CalibrationError;

    fn try_from(record: CalibrationRecord) -> Result<Self, Self::Error> {
        if !record.is_calibrated {
            return Ok(Self::uncalibrated());
        }
        Self::calibrate(record.reference_length, record.pixel_distance)
    }
}
