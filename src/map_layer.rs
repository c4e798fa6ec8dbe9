//! Hexagon aggregation of incident coordinates for the locations map.
//!
//! Points are projected onto a local plane in meters around the view center
//! and binned into pointy-top hexagons of `radius_m`. Bin elevation scales
//! linearly with its count between the configured range, times the scale.

use std::collections::HashMap;

use polars::prelude::*;

use crate::config::LocationsPageConfig;
use crate::error::DashboardError;

/// Meters per degree of latitude.
const METERS_PER_DEG_LAT: f64 = 110_540.0;
/// Meters per degree of longitude at the equator.
const METERS_PER_DEG_LON: f64 = 111_320.0;

/// Camera of the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
    pub pitch: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexagonSettings {
    pub radius_m: f64,
    pub elevation_scale: f64,
    pub elevation_range: [f64; 2],
    pub extruded: bool,
    pub pickable: bool,
}

impl ViewState {
    pub fn from_config(config: &LocationsPageConfig) -> Self {
        Self {
            latitude: config.latitude,
            longitude: config.longitude,
            zoom: config.zoom,
            pitch: config.pitch,
        }
    }

    /// Half extents (degrees of longitude, latitude) visible at this zoom on
    /// a canvas of the given aspect ratio (width / height).
    pub fn half_extent(&self, aspect: f64) -> (f64, f64) {
        // Each zoom level halves the visible longitude span
        let lon_span = 720.0 / 2f64.powf(self.zoom);
        let lat_span = lon_span * self.latitude.to_radians().cos() / aspect.max(0.1);
        (lon_span / 2.0, lat_span / 2.0)
    }
}

impl HexagonSettings {
    pub fn from_config(config: &LocationsPageConfig) -> Self {
        Self {
            radius_m: config.radius_m,
            elevation_scale: config.elevation_scale,
            elevation_range: [config.elevation_min, config.elevation_max],
            extruded: config.extruded,
            pickable: config.pickable,
        }
    }
}

/// One hexagon with at least one point.
#[derive(Debug, Clone, PartialEq)]
pub struct HexBin {
    /// Axial coordinates on the hex grid
    pub q: i64,
    pub r: i64,
    pub longitude: f64,
    pub latitude: f64,
    pub count: usize,
    pub elevation: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapLayer {
    pub view: ViewState,
    pub settings: HexagonSettings,
    /// Bins sorted by descending count, then grid position
    pub bins: Vec<HexBin>,
    /// Input points with both coordinates present
    pub points: usize,
}

impl MapLayer {
    pub fn max_count(&self) -> usize {
        self.bins.iter().map(|b| b.count).max().unwrap_or(0)
    }

    /// Bin under a map coordinate, when the layer is pickable.
    pub fn pick(&self, longitude: f64, latitude: f64) -> Option<&HexBin> {
        if !self.settings.pickable {
            return None;
        }
        let projection = LocalProjection::new(&self.view);
        let (x, y) = projection.to_plane(longitude, latitude);
        let (q, r) = hex_round(x, y, self.settings.radius_m);
        self.bins.iter().find(|b| b.q == q && b.r == r)
    }
}

/// Equirectangular projection to meters around the view center.
struct LocalProjection {
    lat0: f64,
    lon0: f64,
    meters_per_deg_lon: f64,
}

impl LocalProjection {
    fn new(view: &ViewState) -> Self {
        Self {
            lat0: view.latitude,
            lon0: view.longitude,
            meters_per_deg_lon: METERS_PER_DEG_LON * view.latitude.to_radians().cos(),
        }
    }

    fn to_plane(&self, lon: f64, lat: f64) -> (f64, f64) {
        (
            (lon - self.lon0) * self.meters_per_deg_lon,
            (lat - self.lat0) * METERS_PER_DEG_LAT,
        )
    }

    fn to_geo(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.lon0 + x / self.meters_per_deg_lon,
            self.lat0 + y / METERS_PER_DEG_LAT,
        )
    }
}

/// Axial (q, r) of the pointy-top hexagon containing plane point (x, y).
fn hex_round(x: f64, y: f64, radius: f64) -> (i64, i64) {
    let sqrt3 = 3f64.sqrt();
    let q = (sqrt3 / 3.0 * x - y / 3.0) / radius;
    let r = (2.0 / 3.0 * y) / radius;

    // Cube rounding
    let s = -q - r;
    let (mut rq, mut rr, rs) = (q.round(), r.round(), s.round());
    let (dq, dr, ds) = ((rq - q).abs(), (rr - r).abs(), (rs - s).abs());
    if dq > dr && dq > ds {
        rq = -rr - rs;
    } else if dr > ds {
        rr = -rq - rs;
    }
    (rq as i64, rr as i64)
}

fn hex_center(q: i64, r: i64, radius: f64) -> (f64, f64) {
    let (q, r) = (q as f64, r as f64);
    (radius * 3f64.sqrt() * (q + r / 2.0), radius * 1.5 * r)
}

/// Bin (longitude, latitude) pairs into hexagons.
pub fn hexbin(
    coordinates: impl IntoIterator<Item = (f64, f64)>,
    view: ViewState,
    settings: HexagonSettings,
) -> MapLayer {
    let projection = LocalProjection::new(&view);
    let mut counts: HashMap<(i64, i64), usize> = HashMap::new();
    let mut points = 0;
    for (lon, lat) in coordinates {
        if !lon.is_finite() || !lat.is_finite() {
            continue;
        }
        let (x, y) = projection.to_plane(lon, lat);
        *counts.entry(hex_round(x, y, settings.radius_m)).or_insert(0) += 1;
        points += 1;
    }

    let min = counts.values().copied().min().unwrap_or(0);
    let max = counts.values().copied().max().unwrap_or(0);
    let [low, high] = settings.elevation_range;

    let mut bins: Vec<HexBin> = counts
        .into_iter()
        .map(|((q, r), count)| {
            let t = if max > min {
                (count - min) as f64 / (max - min) as f64
            } else {
                1.0
            };
            let (x, y) = hex_center(q, r, settings.radius_m);
            let (longitude, latitude) = projection.to_geo(x, y);
            HexBin {
                q,
                r,
                longitude,
                latitude,
                count,
                elevation: settings.elevation_scale * (low + (high - low) * t),
            }
        })
        .collect();
    bins.sort_by(|a, b| b.count.cmp(&a.count).then(a.q.cmp(&b.q)).then(a.r.cmp(&b.r)));

    MapLayer {
        view,
        settings,
        bins,
        points,
    }
}

/// Read `lon_column` / `lat_column` from `frame` and bin them.
pub fn build_map_layer(
    frame: &DataFrame,
    lon_column: &str,
    lat_column: &str,
    view: ViewState,
    settings: HexagonSettings,
) -> Result<MapLayer, DashboardError> {
    let lon = frame.column(lon_column)?.cast(&DataType::Float64)?;
    let lat = frame.column(lat_column)?.cast(&DataType::Float64)?;
    let coordinates = lon
        .f64()?
        .into_iter()
        .zip(lat.f64()?.into_iter())
        .filter_map(|(lon, lat)| Some((lon?, lat?)));
    let layer = hexbin(coordinates, view, settings);
    tracing::debug!(points = layer.points, bins = layer.bins.len(), "built hexagon layer");
    Ok(layer)
}
