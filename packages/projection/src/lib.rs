#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate reprojection between longitude/latitude and UTM.
//!
//! Distance filtering around a school has to happen in metres, so every
//! point that takes part in a distance computation is first projected
//! into a single UTM zone. Geographic and projected coordinates are
//! distinct types ([`GeoPoint`] and [`MetricPoint`]); the only way from
//! one to the other is through a [`Projector`].

pub mod frame;
mod tm;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use frame::{Datum, Frame, Hemisphere, UtmZone};
use tm::TransverseMercator;

/// Errors from projecting coordinates.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProjectionError {
    /// The EPSG code is not one of the supported frames.
    #[error("Unsupported reference frame EPSG:{epsg}")]
    UnsupportedFrame {
        /// The rejected code.
        epsg: u32,
    },

    /// A UTM zone that has no EPSG code, such as a southern NAD83 zone.
    #[error("No UTM zone {number} {hemisphere:?} on {datum:?}")]
    UnsupportedZone {
        /// Zone number.
        number: u8,
        /// Requested hemisphere.
        hemisphere: Hemisphere,
        /// Requested datum.
        datum: Datum,
    },

    /// A geographic frame was given where a projected one was expected,
    /// or the other way around.
    #[error("EPSG:{epsg} is not a {expected} frame")]
    WrongFrameKind {
        /// The frame that was given.
        epsg: u32,
        /// What the caller needed ("geographic" or "projected").
        expected: &'static str,
    },

    /// The input or output of a transform is not finite, or the point
    /// lies outside the projection's domain.
    #[error("Transform produced a non-finite coordinate from ({x}, {y})")]
    NonFinite {
        /// Input x / longitude.
        x: f64,
        /// Input y / latitude.
        y: f64,
    },

    /// Two projected points from different frames were combined.
    #[error("Cannot combine points from EPSG:{left} and EPSG:{right}")]
    FrameMismatch {
        /// Frame of the first point.
        left: u32,
        /// Frame of the second point.
        right: u32,
    },
}

/// A longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude (x).
    pub lon: f64,
    /// Latitude (y).
    pub lat: f64,
}

impl GeoPoint {
    /// Creates a point from longitude and latitude, in that order.
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Whether both coordinates are finite and inside the valid
    /// longitude/latitude ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }
}

impl From<GeoPoint> for geo::Point<f64> {
    fn from(point: GeoPoint) -> Self {
        Self::new(point.lon, point.lat)
    }
}

impl From<geo::Point<f64>> for GeoPoint {
    fn from(point: geo::Point<f64>) -> Self {
        Self::new(point.x(), point.y())
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lon)
    }
}

/// An easting/northing pair in metres, tagged with the frame it was
/// projected into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricPoint {
    /// Easting.
    pub x: f64,
    /// Northing.
    pub y: f64,
    frame: Frame,
}

impl MetricPoint {
    /// The projected frame this point lives in.
    #[must_use]
    pub const fn frame(&self) -> Frame {
        self.frame
    }

    /// Euclidean distance in metres.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::FrameMismatch`] if the two points were
    /// projected into different frames.
    pub fn distance(&self, other: &Self) -> Result<f64, ProjectionError> {
        if self.frame != other.frame {
            return Err(ProjectionError::FrameMismatch {
                left: self.frame.epsg(),
                right: other.frame.epsg(),
            });
        }
        Ok((self.x - other.x).hypot(self.y - other.y))
    }
}

/// A validated geographic/projected frame pair.
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    geographic: Frame,
    metric: Frame,
    tm: TransverseMercator,
}

impl Projector {
    /// Builds a projector between a geographic and a projected frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::WrongFrameKind`] if `geographic` is not
    /// a longitude/latitude frame or `metric` is not a projected one.
    pub fn new(geographic: Frame, metric: Frame) -> Result<Self, ProjectionError> {
        if !geographic.is_geographic() {
            return Err(ProjectionError::WrongFrameKind {
                epsg: geographic.epsg(),
                expected: "geographic",
            });
        }
        let Frame::Utm(zone) = metric else {
            return Err(ProjectionError::WrongFrameKind {
                epsg: metric.epsg(),
                expected: "projected",
            });
        };

        Ok(Self {
            geographic,
            metric,
            tm: TransverseMercator::utm(zone),
        })
    }

    /// Builds a projector from two EPSG codes.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError`] if either code is unsupported or of the
    /// wrong kind.
    pub fn from_epsg(geographic: u32, metric: u32) -> Result<Self, ProjectionError> {
        Self::new(Frame::from_epsg(geographic)?, Frame::from_epsg(metric)?)
    }

    /// The geographic side of the pair.
    #[must_use]
    pub const fn geographic(&self) -> Frame {
        self.geographic
    }

    /// The projected side of the pair.
    #[must_use]
    pub const fn metric(&self) -> Frame {
        self.metric
    }

    /// Projects a longitude/latitude point into metres.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::NonFinite`] if the point is invalid or
    /// outside the projection's domain.
    pub fn forward(&self, point: GeoPoint) -> Result<MetricPoint, ProjectionError> {
        let non_finite = || ProjectionError::NonFinite {
            x: point.lon,
            y: point.lat,
        };
        if !point.is_valid() {
            return Err(non_finite());
        }

        let (x, y) = self.tm.forward(point.lon, point.lat).ok_or_else(non_finite)?;
        Ok(MetricPoint {
            x,
            y,
            frame: self.metric,
        })
    }

    /// Projects a metric point back to longitude/latitude.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::FrameMismatch`] if the point belongs to a
    /// different frame, or [`ProjectionError::NonFinite`] if the inverse
    /// series does not produce a finite coordinate.
    pub fn inverse(&self, point: MetricPoint) -> Result<GeoPoint, ProjectionError> {
        if point.frame != self.metric {
            return Err(ProjectionError::FrameMismatch {
                left: point.frame.epsg(),
                right: self.metric.epsg(),
            });
        }

        let non_finite = || ProjectionError::NonFinite {
            x: point.x,
            y: point.y,
        };
        if !point.x.is_finite() || !point.y.is_finite() {
            return Err(non_finite());
        }

        let (lon, lat) = self.tm.inverse(point.x, point.y).ok_or_else(non_finite)?;
        let result = GeoPoint::new(lon, lat);
        if result.is_valid() {
            Ok(result)
        } else {
            Err(non_finite())
        }
    }

    /// Projects a sequence of points, one result per input, in input order.
    #[must_use]
    pub fn forward_all(&self, points: &[GeoPoint]) -> Vec<Result<MetricPoint, ProjectionError>> {
        points.iter().map(|p| self.forward(*p)).collect()
    }

    /// Unprojects a sequence of points, one result per input, in input order.
    #[must_use]
    pub fn inverse_all(&self, points: &[MetricPoint]) -> Vec<Result<GeoPoint, ProjectionError>> {
        points.iter().map(|p| self.inverse(*p)).collect()
    }

    /// Creates a metric point in this projector's frame from raw metres.
    #[must_use]
    pub const fn metric_point(&self, x: f64, y: f64) -> MetricPoint {
        MetricPoint {
            x,
            y,
            frame: self.metric,
        }
    }
}

/// Projects `point` from `geographic_frame` into `metric_frame`.
///
/// # Errors
///
/// Returns [`ProjectionError`] if either frame is invalid for its role or
/// the transform does not produce a finite coordinate.
pub fn to_metric(
    point: GeoPoint,
    geographic_frame: Frame,
    metric_frame: Frame,
) -> Result<MetricPoint, ProjectionError> {
    Projector::new(geographic_frame, metric_frame)?.forward(point)
}

/// Projects `point` from `metric_frame` back into `geographic_frame`.
///
/// # Errors
///
/// Returns [`ProjectionError`] if either frame is invalid for its role,
/// the point belongs to another frame, or the transform does not produce a
/// finite coordinate.
pub fn to_geographic(
    point: MetricPoint,
    metric_frame: Frame,
    geographic_frame: Frame,
) -> Result<GeoPoint, ProjectionError> {
    Projector::new(geographic_frame, metric_frame)?.inverse(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE_DEG: f64 = 1e-6;

    fn michigan() -> Projector {
        Projector::from_epsg(4326, 26917).unwrap()
    }

    #[test]
    fn round_trips_within_tolerance() {
        let projector = michigan();
        for (lon, lat) in [
            (-83.4833, 42.4311),
            (-81.0, 42.0),
            (-84.5555, 42.7325),
            (-86.9, 45.8),
            (-78.2, 41.1),
            (-82.0, 0.5),
        ] {
            let original = GeoPoint::new(lon, lat);
            let back = projector
                .inverse(projector.forward(original).unwrap())
                .unwrap();
            assert!(
                (back.lon - lon).abs() < TOLERANCE_DEG && (back.lat - lat).abs() < TOLERANCE_DEG,
                "{original} came back as {back}"
            );
        }
    }

    #[test]
    fn round_trips_in_the_southern_hemisphere() {
        let projector = Projector::from_epsg(4326, 32756).unwrap();
        let original = GeoPoint::new(151.2093, -33.8688);
        let back = projector
            .inverse(projector.forward(original).unwrap())
            .unwrap();
        assert!((back.lon - original.lon).abs() < TOLERANCE_DEG);
        assert!((back.lat - original.lat).abs() < TOLERANCE_DEG);
    }

    #[test]
    fn round_trips_across_the_antimeridian() {
        let projector = Projector::from_epsg(4326, 32660).unwrap();
        let original = GeoPoint::new(-179.5, 10.0);
        let back = projector
            .inverse(projector.forward(original).unwrap())
            .unwrap();
        assert!((back.lon - original.lon).abs() < TOLERANCE_DEG);
        assert!((back.lat - original.lat).abs() < TOLERANCE_DEG);
    }

    #[test]
    fn preserves_order_for_sequences() {
        let projector = michigan();
        let points = [
            GeoPoint::new(-83.0, 42.0),
            GeoPoint::new(-83.1, 42.1),
            GeoPoint::new(f64::NAN, 42.2),
            GeoPoint::new(-83.3, 42.3),
        ];
        let projected = projector.forward_all(&points);
        assert_eq!(projected.len(), points.len());
        assert!(projected[2].is_err());

        let eastings: Vec<f64> = projected
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(|p| p.x)
            .collect();
        assert!(eastings.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn rejects_non_finite_input() {
        let projector = michigan();
        assert!(matches!(
            projector.forward(GeoPoint::new(f64::INFINITY, 42.0)),
            Err(ProjectionError::NonFinite { .. })
        ));
        assert!(matches!(
            projector.inverse(projector.metric_point(f64::NAN, 1.0)),
            Err(ProjectionError::NonFinite { .. })
        ));
    }

    #[test]
    fn rejects_frames_in_the_wrong_role() {
        assert!(matches!(
            Projector::from_epsg(26917, 4326),
            Err(ProjectionError::WrongFrameKind { epsg: 26917, .. })
        ));
        assert!(matches!(
            to_metric(GeoPoint::new(-83.0, 42.0), Frame::WGS84, Frame::WGS84),
            Err(ProjectionError::WrongFrameKind { epsg: 4326, .. })
        ));
    }

    #[test]
    fn free_functions_match_projector() {
        let metric = Frame::from_epsg(26917).unwrap();
        let point = GeoPoint::new(-83.4833, 42.4311);
        let projected = to_metric(point, Frame::WGS84, metric).unwrap();
        assert_eq!(projected, michigan().forward(point).unwrap());
        let back = to_geographic(projected, metric, Frame::WGS84).unwrap();
        assert!((back.lat - point.lat).abs() < TOLERANCE_DEG);
    }

    #[test]
    fn distance_requires_a_shared_frame() {
        let a = michigan().metric_point(0.0, 0.0);
        let b = michigan().metric_point(300.0, 400.0);
        assert!((a.distance(&b).unwrap() - 500.0).abs() < f64::EPSILON);

        let other = Projector::from_epsg(4326, 32617).unwrap().metric_point(0.0, 0.0);
        assert!(matches!(
            a.distance(&other),
            Err(ProjectionError::FrameMismatch {
                left: 26917,
                right: 32617
            })
        ));
    }

    #[test]
    fn inverse_rejects_points_from_other_frames() {
        let other = Projector::from_epsg(4326, 32616)
            .unwrap()
            .metric_point(500_000.0, 4_000_000.0);
        assert!(matches!(
            michigan().inverse(other),
            Err(ProjectionError::FrameMismatch { .. })
        ));
    }
}
