//! Radar Configuration
//!
//! Every option recognized by the radar, its range rings and its sweeps, with
//! the defaults the overlay has always used. All structs deserialize from
//! camelCase JSON with missing fields filled from [`Default`], and each one
//! has a `validate()` that is run before anything is created.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::RadarError;
use crate::geo::GeoPoint;

/// Default tick interval for both sweep kinds
pub const DEFAULT_INTERVAL_MS: u64 = 100;

/// Default angle step per tick in degrees
pub const DEFAULT_ANGLE_INCREASE: f64 = 5.0;

/// Default detection sector width in degrees
pub const DEFAULT_ANGLE_MAX_OVERTURE: f64 = 10.0;

/// Drawing attributes passed through to the renderer untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeStyle {
    pub stroke_color: String,
    pub stroke_opacity: f64,
    pub stroke_weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
    pub z_index: i32,
}

impl ShapeStyle {
    pub fn axis() -> Self {
        ShapeStyle {
            stroke_color: "#00FF00".to_string(),
            stroke_opacity: 0.5,
            stroke_weight: 4.0,
            fill_color: Some("#00FF00".to_string()),
            fill_opacity: Some(0.1),
            z_index: 4,
        }
    }

    pub fn line() -> Self {
        ShapeStyle {
            stroke_color: "#0000FF".to_string(),
            stroke_opacity: 0.5,
            stroke_weight: 2.0,
            fill_color: None,
            fill_opacity: None,
            z_index: 2,
        }
    }

    pub fn polygon() -> Self {
        ShapeStyle {
            stroke_color: "#FF0000".to_string(),
            stroke_opacity: 0.8,
            stroke_weight: 2.0,
            fill_color: Some("#FF0000".to_string()),
            fill_opacity: Some(0.5),
            z_index: 6,
        }
    }
}

/// Style as written in a config file: any attribute left out keeps the
/// default of the shape it applies to
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StyleOverrides {
    stroke_color: Option<String>,
    stroke_opacity: Option<f64>,
    stroke_weight: Option<f64>,
    fill_color: Option<String>,
    fill_opacity: Option<f64>,
    z_index: Option<i32>,
}

impl StyleOverrides {
    fn apply(self, base: ShapeStyle) -> ShapeStyle {
        ShapeStyle {
            stroke_color: self.stroke_color.unwrap_or(base.stroke_color),
            stroke_opacity: self.stroke_opacity.unwrap_or(base.stroke_opacity),
            stroke_weight: self.stroke_weight.unwrap_or(base.stroke_weight),
            fill_color: self.fill_color.or(base.fill_color),
            fill_opacity: self.fill_opacity.or(base.fill_opacity),
            z_index: self.z_index.unwrap_or(base.z_index),
        }
    }
}

fn axis_style<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ShapeStyle, D::Error> {
    Ok(StyleOverrides::deserialize(deserializer)?.apply(ShapeStyle::axis()))
}

fn line_style<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ShapeStyle, D::Error> {
    Ok(StyleOverrides::deserialize(deserializer)?.apply(ShapeStyle::line()))
}

fn polygon_style<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ShapeStyle, D::Error> {
    Ok(StyleOverrides::deserialize(deserializer)?.apply(ShapeStyle::polygon()))
}

/// Radar instance configuration.
///
/// Latitude and longitude are optional here only so that a missing value can
/// be reported as [`RadarError::InvalidArgument`] instead of a parse error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RadarConfig {
    /// Identifier used to prefix log messages
    pub id: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl Default for RadarConfig {
    fn default() -> Self {
        RadarConfig {
            id: "radar".to_string(),
            lat: None,
            lng: None,
        }
    }
}

impl RadarConfig {
    pub fn at(lat: f64, lng: f64) -> Self {
        RadarConfig {
            lat: Some(lat),
            lng: Some(lng),
            ..Default::default()
        }
    }

    /// Validate and return the radar center
    pub fn center(&self) -> Result<GeoPoint, RadarError> {
        let lat = self
            .lat
            .ok_or_else(|| RadarError::invalid("missing center latitude"))?;
        let lng = self
            .lng
            .ok_or_else(|| RadarError::invalid("missing center longitude"))?;
        GeoPoint::checked(lat, lng)
    }
}

/// Range rings configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AxisConfig {
    /// Distance between rings in meters
    pub radius: f64,
    /// Number of rings
    pub count: u32,
    #[serde(deserialize_with = "axis_style")]
    pub style: ShapeStyle,
}

impl Default for AxisConfig {
    fn default() -> Self {
        AxisConfig {
            radius: 1000.0,
            count: 10,
            style: ShapeStyle::axis(),
        }
    }
}

impl AxisConfig {
    pub fn validate(&self) -> Result<(), RadarError> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(RadarError::invalid(format!(
                "ring radius {} m must be positive",
                self.radius
            )));
        }
        if self.count == 0 {
            return Err(RadarError::invalid("ring count must be at least 1"));
        }
        Ok(())
    }
}

/// Line sweep configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineSweepConfig {
    /// Line length in kilometers
    pub radius: f64,
    /// Delay between ticks in milliseconds
    pub interval_ms: u64,
    /// Starting angle in degrees
    pub angle: f64,
    /// Angle at which a lap is counted
    pub angle_origin: f64,
    /// Degrees added on every tick
    pub angle_increase: f64,
    /// Width of the detection sector in degrees
    pub angle_max_overture: f64,
    /// Number of laps before stopping, 0 = run forever
    pub lap_max: u32,
    pub autostart: bool,
    #[serde(deserialize_with = "line_style")]
    pub style: ShapeStyle,
}

impl Default for LineSweepConfig {
    fn default() -> Self {
        LineSweepConfig {
            radius: 0.5,
            interval_ms: DEFAULT_INTERVAL_MS,
            angle: 0.0,
            angle_origin: 0.0,
            angle_increase: DEFAULT_ANGLE_INCREASE,
            angle_max_overture: DEFAULT_ANGLE_MAX_OVERTURE,
            lap_max: 0,
            autostart: true,
            style: ShapeStyle::line(),
        }
    }
}

impl LineSweepConfig {
    pub fn validate(&self) -> Result<(), RadarError> {
        validate_radius(self.radius)?;
        validate_motion(
            self.interval_ms,
            self.angle,
            self.angle_origin,
            self.angle_increase,
            self.angle_max_overture,
        )
    }
}

/// Polygon (sector) sweep configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolygonSweepConfig {
    /// Radius of the default sector shape in kilometers
    pub radius: f64,
    pub interval_ms: u64,
    pub angle: f64,
    pub angle_origin: f64,
    pub angle_increase: f64,
    /// Width of the default sector shape in degrees
    pub angle_max_overture: f64,
    pub lap_max: u32,
    pub autostart: bool,
    /// Authored shape; when absent a sector of `radius` and
    /// `angle_max_overture` centered on north is used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<GeoPoint>>,
    #[serde(deserialize_with = "polygon_style")]
    pub style: ShapeStyle,
}

impl Default for PolygonSweepConfig {
    fn default() -> Self {
        PolygonSweepConfig {
            radius: 1.0,
            interval_ms: DEFAULT_INTERVAL_MS,
            angle: 0.0,
            angle_origin: 0.0,
            angle_increase: DEFAULT_ANGLE_INCREASE,
            angle_max_overture: DEFAULT_ANGLE_MAX_OVERTURE,
            lap_max: 0,
            autostart: true,
            shape: None,
            style: ShapeStyle::polygon(),
        }
    }
}

impl PolygonSweepConfig {
    pub fn validate(&self) -> Result<(), RadarError> {
        validate_radius(self.radius)?;
        validate_motion(
            self.interval_ms,
            self.angle,
            self.angle_origin,
            self.angle_increase,
            self.angle_max_overture,
        )?;
        if let Some(shape) = &self.shape {
            if shape.len() < 3 {
                return Err(RadarError::invalid(format!(
                    "polygon shape needs at least 3 vertices, got {}",
                    shape.len()
                )));
            }
            for v in shape {
                GeoPoint::checked(v.lat, v.lng)?;
            }
        }
        Ok(())
    }
}

fn validate_radius(radius: f64) -> Result<(), RadarError> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(RadarError::invalid(format!(
            "sweep radius {} km must be a positive number",
            radius
        )));
    }
    Ok(())
}

fn validate_motion(
    interval_ms: u64,
    angle: f64,
    angle_origin: f64,
    angle_increase: f64,
    angle_max_overture: f64,
) -> Result<(), RadarError> {
    if interval_ms == 0 {
        return Err(RadarError::invalid("tick interval must be at least 1 ms"));
    }
    if !angle.is_finite() || !angle_origin.is_finite() {
        return Err(RadarError::invalid("sweep angles must be finite"));
    }
    // Negative steps turn counter-clockwise
    if !angle_increase.is_finite() || angle_increase == 0.0 || angle_increase.abs() > 360.0 {
        return Err(RadarError::invalid(format!(
            "angle increase {} must be non-zero and within [-360, 360]",
            angle_increase
        )));
    }
    if !angle_max_overture.is_finite() || !(0.0..=360.0).contains(&angle_max_overture) {
        return Err(RadarError::invalid(format!(
            "angle overture {} must be in [0, 360]",
            angle_max_overture
        )));
    }
    Ok(())
}
