//! Geographic coordinates, bounding boxes and grid axes
//!
//! Every dataset the pipeline reads is gridded in latitude/longitude:
//!
//! - the HWSD soil raster (30 arc-second cells),
//! - the ORCHIDEE litter dataset,
//! - each weather resource's historic and future grids.
//!
//! [`GridAxis`] turns a coordinate into the index of the nearest grid cell along one axis
//! and [`BoundingBox`] expresses both areas of interest and a dataset's declared extent.
//!
//! # Examples
//!
//! ```rust
//! use ecosse_core::spatial::{BoundingBox, Coordinate, AOI_HALF_WIDTH};
//!
//! let site = Coordinate::new(52.5, -1.25, "site-1");
//! let aoi = site.area_of_interest();
//! let extent = BoundingBox::new(-10.0, 35.0, 30.0, 70.0);
//! assert!(extent.contains(&aoi));
//! assert_eq!(aoi.lat_max, site.lat + AOI_HALF_WIDTH);
//! assert_eq!(aoi.lon_min, site.lon - AOI_HALF_WIDTH);
//! ```

use crate::errors::{EcosseError, EcosseResult};
use serde::{Deserialize, Serialize};

/// Half width, in degrees, of the area of interest built around a coordinate.
pub const AOI_HALF_WIDTH: f64 = 0.01;

/// A requested simulation site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees, -90 to +90.
    pub lat: f64,
    /// Longitude in degrees, -180 to +180.
    pub lon: f64,
    /// Opaque identifier taken from the coordinate table.
    pub id: String,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64, id: impl Into<String>) -> Self {
        Self {
            lat,
            lon,
            id: id.into(),
        }
    }

    /// True when either latitude or longitude is missing.
    pub fn is_nan(&self) -> bool {
        self.lat.is_nan() || self.lon.is_nan()
    }

    /// The small box (±[`AOI_HALF_WIDTH`]) used to test weather resource coverage.
    pub fn area_of_interest(&self) -> BoundingBox {
        BoundingBox::around(self.lat, self.lon, AOI_HALF_WIDTH)
    }
}

/// Axis-aligned box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lon_min: f64,
    pub lat_min: f64,
    pub lon_max: f64,
    pub lat_max: f64,
}

impl BoundingBox {
    /// Create a box from its lower-left and upper-right corners, in `[lon, lat, lon, lat]` order.
    pub fn new(lon_min: f64, lat_min: f64, lon_max: f64, lat_max: f64) -> Self {
        Self {
            lon_min,
            lat_min,
            lon_max,
            lat_max,
        }
    }

    pub fn around(lat: f64, lon: f64, half_width: f64) -> Self {
        Self::new(
            lon - half_width,
            lat - half_width,
            lon + half_width,
            lat + half_width,
        )
    }

    /// A degenerate box covering a single point.
    pub fn point(lat: f64, lon: f64) -> Self {
        Self::new(lon, lat, lon, lat)
    }

    /// Smallest box holding every coordinate that has both lat and lon.
    pub fn enclosing(coordinates: &[Coordinate]) -> Option<Self> {
        coordinates
            .iter()
            .filter(|c| !c.is_nan())
            .fold(None, |bbox: Option<BoundingBox>, c| {
                Some(match bbox {
                    None => BoundingBox::point(c.lat, c.lon),
                    Some(b) => BoundingBox::new(
                        b.lon_min.min(c.lon),
                        b.lat_min.min(c.lat),
                        b.lon_max.max(c.lon),
                        b.lat_max.max(c.lat),
                    ),
                })
            })
    }

    /// True when `other` lies entirely within this box, edges included.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.lon_min >= self.lon_min
            && other.lon_max <= self.lon_max
            && other.lat_min >= self.lat_min
            && other.lat_max <= self.lat_max
    }

    pub fn contains_point(&self, lat: f64, lon: f64) -> bool {
        self.contains(&BoundingBox::point(lat, lon))
    }

    /// Overlap of two boxes, if they overlap at all.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let bbox = BoundingBox::new(
            self.lon_min.max(other.lon_min),
            self.lat_min.max(other.lat_min),
            self.lon_max.min(other.lon_max),
            self.lat_max.min(other.lat_max),
        );
        (bbox.lon_min <= bbox.lon_max && bbox.lat_min <= bbox.lat_max).then_some(bbox)
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.lon_min, self.lat_min, self.lon_max, self.lat_max]
    }
}

/// Row/column position of a cell in a latitude/longitude grid.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
}

impl GridCell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Cell centres along one axis of a grid.
///
/// Values must be strictly monotonic; both ascending (south to north) and descending
/// (north to south) latitude axes occur in practice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAxis {
    values: Vec<f64>,
}

impl GridAxis {
    pub fn new(values: Vec<f64>) -> EcosseResult<Self> {
        if values.is_empty() {
            return Err(EcosseError::InvalidSeries("grid axis is empty".to_string()));
        }
        let ascending = values.windows(2).all(|w| w[1] > w[0]);
        let descending = values.windows(2).all(|w| w[1] < w[0]);
        if !(ascending || descending) {
            return Err(EcosseError::InvalidSeries(
                "grid axis values must be strictly monotonic".to_string(),
            ));
        }
        Ok(Self { values })
    }

    /// Regularly spaced axis of `len` cell centres starting at `first`.
    pub fn regular(first: f64, step: f64, len: usize) -> EcosseResult<Self> {
        Self::new((0..len).map(|i| first + step * i as f64).collect())
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn min(&self) -> f64 {
        self.values[0].min(self.values[self.values.len() - 1])
    }

    pub fn max(&self) -> f64 {
        self.values[0].max(self.values[self.values.len() - 1])
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Index of the cell centre closest to `value`. The lower index wins ties.
    pub fn nearest_index(&self, value: f64) -> usize {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (index, centre) in self.values.iter().enumerate() {
            let distance = (centre - value).abs();
            if distance < best_distance {
                best = index;
                best_distance = distance;
            }
        }
        best
    }

    /// Inclusive index range of the cells nearest to `low` and `high`, in ascending index order.
    pub fn enclosing(&self, low: f64, high: f64) -> (usize, usize) {
        let a = self.nearest_index(low);
        let b = self.nearest_index(high);
        (a.min(b), a.max(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_of_interest_is_centred() {
        let site = Coordinate::new(10.0, 20.0, "a");
        let aoi = site.area_of_interest();
        assert_eq!(aoi.to_array(), [19.99, 9.99, 20.01, 10.01]);
    }

    #[test]
    fn nan_coordinates() {
        assert!(Coordinate::new(f64::NAN, 1.0, "a").is_nan());
        assert!(Coordinate::new(1.0, f64::NAN, "a").is_nan());
        assert!(!Coordinate::new(1.0, 1.0, "a").is_nan());
    }

    #[test]
    fn containment_includes_edges() {
        let extent = BoundingBox::new(-10.0, 35.0, 30.0, 70.0);
        assert!(extent.contains(&BoundingBox::new(-10.0, 35.0, 30.0, 70.0)));
        assert!(!extent.contains(&BoundingBox::around(70.0, 0.0, 0.01)));
        assert!(extent.contains_point(50.0, 0.0));
        assert!(!extent.contains_point(50.0, 31.0));
    }

    #[test]
    fn intersection_of_disjoint_boxes_is_none() {
        let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let b = BoundingBox::new(2.0, 2.0, 3.0, 3.0);
        assert_eq!(a.intersection(&b), None);
        assert_eq!(
            a.intersection(&BoundingBox::new(0.5, 0.5, 3.0, 3.0)),
            Some(BoundingBox::new(0.5, 0.5, 1.0, 1.0))
        );
    }

    #[test]
    fn enclosing_skips_missing_coordinates() {
        let coords = vec![
            Coordinate::new(1.0, 2.0, "a"),
            Coordinate::new(f64::NAN, 50.0, "b"),
            Coordinate::new(-3.0, 4.0, "c"),
        ];
        let bbox = BoundingBox::enclosing(&coords).unwrap();
        assert_eq!(bbox.to_array(), [2.0, -3.0, 4.0, 1.0]);
        assert_eq!(BoundingBox::enclosing(&[]), None);
    }

    #[test]
    fn nearest_index_ascending_and_descending() {
        let ascending = GridAxis::regular(-89.75, 0.5, 360).unwrap();
        assert_eq!(ascending.nearest_index(-89.9), 0);
        assert_eq!(ascending.nearest_index(0.1), 180);
        assert_eq!(ascending.nearest_index(95.0), 359);

        let descending = GridAxis::regular(89.75, -0.5, 360).unwrap();
        assert_eq!(descending.nearest_index(89.8), 0);
        assert_eq!(descending.nearest_index(-0.1), 180);
        assert_eq!(descending.min(), -89.75);
        assert_eq!(descending.max(), 89.75);
    }

    #[test]
    fn nearest_index_ties_take_lower_index() {
        let axis = GridAxis::new(vec![0.0, 1.0]).unwrap();
        assert_eq!(axis.nearest_index(0.5), 0);
    }

    #[test]
    fn enclosing_orders_indices() {
        let descending = GridAxis::regular(10.0, -1.0, 11).unwrap();
        assert_eq!(descending.enclosing(2.0, 5.0), (5, 8));
    }

    #[test]
    fn rejects_non_monotonic_axis() {
        assert!(GridAxis::new(vec![0.0, 2.0, 1.0]).is_err());
        assert!(GridAxis::new(vec![]).is_err());
    }
}
