//! Reference frames identified by EPSG code.
//!
//! Only the frames the pipeline actually needs are supported: the two
//! North American geographic datums and the UTM zone families built on
//! them. Anything else is rejected up front so a typo in configuration
//! fails loudly instead of silently projecting into the wrong zone.

use serde::{Deserialize, Serialize};

use crate::{GeoPoint, ProjectionError};

/// Geodetic datum a frame is defined on.
///
/// NAD83 and WGS 84 differ by roughly a metre in North America, well
/// below the resolution of stop placement, so no datum shift is applied
/// between them. Only the ellipsoid used by the projection differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Datum {
    /// World Geodetic System 1984.
    Wgs84,
    /// North American Datum 1983 (GRS 80 ellipsoid).
    Nad83,
}

/// Hemisphere of a UTM zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hemisphere {
    /// False northing 0 m.
    North,
    /// False northing 10 000 000 m.
    South,
}

/// A single Universal Transverse Mercator zone.
///
/// NAD83 zones exist only in the northern hemisphere, numbers 1 through 23.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtmZone {
    number: u8,
    hemisphere: Hemisphere,
    datum: Datum,
}

impl UtmZone {
    /// Builds a zone, rejecting combinations with no EPSG code.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::UnsupportedZone`] for a number outside
    /// 1 through 60, or a NAD83 zone that is southern or above 23.
    pub fn new(
        number: u8,
        hemisphere: Hemisphere,
        datum: Datum,
    ) -> Result<Self, ProjectionError> {
        let supported = match datum {
            Datum::Wgs84 => (1..=60).contains(&number),
            Datum::Nad83 => (1..=23).contains(&number) && hemisphere == Hemisphere::North,
        };
        if supported {
            Ok(Self {
                number,
                hemisphere,
                datum,
            })
        } else {
            Err(ProjectionError::UnsupportedZone {
                number,
                hemisphere,
                datum,
            })
        }
    }

    /// Zone number, 1 through 60.
    #[must_use]
    pub const fn number(&self) -> u8 {
        self.number
    }

    /// Which hemisphere's false northing applies.
    #[must_use]
    pub const fn hemisphere(&self) -> Hemisphere {
        self.hemisphere
    }

    /// Datum the zone is defined on.
    #[must_use]
    pub const fn datum(&self) -> Datum {
        self.datum
    }

    /// Picks the WGS 84 UTM zone containing `point`.
    ///
    /// Ignores the Norway/Svalbard zone exceptions; none of them matter
    /// for school districts.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::NonFinite`] if the point is not a valid
    /// longitude/latitude pair.
    pub fn for_point(point: GeoPoint) -> Result<Self, ProjectionError> {
        if !point.is_valid() {
            return Err(ProjectionError::NonFinite {
                x: point.lon,
                y: point.lat,
            });
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let number = (((point.lon + 180.0) / 6.0).floor() as u8 + 1).clamp(1, 60);
        let hemisphere = if point.lat >= 0.0 {
            Hemisphere::North
        } else {
            Hemisphere::South
        };

        Ok(Self {
            number,
            hemisphere,
            datum: Datum::Wgs84,
        })
    }

    /// Longitude of the zone's central meridian, in degrees.
    #[must_use]
    pub fn central_meridian(&self) -> f64 {
        f64::from(self.number) * 6.0 - 183.0
    }

    /// False northing for the zone's hemisphere, in metres.
    #[must_use]
    pub const fn false_northing(&self) -> f64 {
        match self.hemisphere {
            Hemisphere::North => 0.0,
            Hemisphere::South => 10_000_000.0,
        }
    }
}

/// A coordinate reference frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Frame {
    /// Longitude/latitude in degrees.
    Geographic(Datum),
    /// Easting/northing in metres.
    Utm(UtmZone),
}

impl Frame {
    /// WGS 84 longitude/latitude (EPSG:4326).
    pub const WGS84: Self = Self::Geographic(Datum::Wgs84);

    /// Resolves an EPSG code.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::UnsupportedFrame`] for any code outside
    /// the supported families.
    pub fn from_epsg(code: u32) -> Result<Self, ProjectionError> {
        let utm = |number: u32, hemisphere, datum| {
            #[allow(clippy::cast_possible_truncation)]
            UtmZone::new(number as u8, hemisphere, datum).map(Self::Utm)
        };

        match code {
            4326 => Ok(Self::Geographic(Datum::Wgs84)),
            4269 => Ok(Self::Geographic(Datum::Nad83)),
            32601..=32660 => utm(code - 32600, Hemisphere::North, Datum::Wgs84),
            32701..=32760 => utm(code - 32700, Hemisphere::South, Datum::Wgs84),
            26901..=26923 => utm(code - 26900, Hemisphere::North, Datum::Nad83),
            _ => Err(ProjectionError::UnsupportedFrame { epsg: code }),
        }
    }

    /// The EPSG code identifying this frame.
    #[must_use]
    pub fn epsg(&self) -> u32 {
        match self {
            Self::Geographic(Datum::Wgs84) => 4326,
            Self::Geographic(Datum::Nad83) => 4269,
            Self::Utm(zone) => {
                let base = match (zone.datum, zone.hemisphere) {
                    (Datum::Wgs84, Hemisphere::North) => 32600,
                    (Datum::Wgs84, Hemisphere::South) => 32700,
                    // `UtmZone::new` only admits northern NAD83 zones.
                    (Datum::Nad83, _) => 26900,
                };
                base + u32::from(zone.number)
            }
        }
    }

    /// Whether this frame uses angular (degree) coordinates.
    #[must_use]
    pub const fn is_geographic(&self) -> bool {
        matches!(self, Self::Geographic(_))
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl TryFrom<u32> for Frame {
    type Error = ProjectionError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Self::from_epsg(code)
    }
}

impl From<Frame> for u32 {
    fn from(frame: Frame) -> Self {
        frame.epsg()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_michigan_utm() {
        let frame = Frame::from_epsg(26917).unwrap();
        let Frame::Utm(zone) = frame else {
            panic!("expected a UTM frame");
        };
        assert_eq!(zone.number(), 17);
        assert_eq!(zone.hemisphere(), Hemisphere::North);
        assert_eq!(zone.datum(), Datum::Nad83);
        assert!((zone.central_meridian() - -81.0).abs() < f64::EPSILON);
        assert_eq!(frame.epsg(), 26917);
    }

    #[test]
    fn epsg_codes_round_trip() {
        for code in [4326, 4269, 32601, 32617, 32660, 32701, 32755, 26901, 26923] {
            assert_eq!(Frame::from_epsg(code).unwrap().epsg(), code);
        }
    }

    #[test]
    fn rejects_unknown_codes() {
        for code in [0, 3857, 26924, 32661, 32700, 99999] {
            assert!(matches!(
                Frame::from_epsg(code),
                Err(ProjectionError::UnsupportedFrame { epsg }) if epsg == code
            ));
        }
    }

    #[test]
    fn picks_zone_for_point() {
        let zone = UtmZone::for_point(GeoPoint::new(-83.48, 42.43)).unwrap();
        assert_eq!(zone.number(), 17);
        assert_eq!(zone.hemisphere(), Hemisphere::North);

        let zone = UtmZone::for_point(GeoPoint::new(151.2, -33.9)).unwrap();
        assert_eq!(zone.number(), 56);
        assert_eq!(zone.hemisphere(), Hemisphere::South);

        let zone = UtmZone::for_point(GeoPoint::new(180.0, 0.0)).unwrap();
        assert_eq!(zone.number(), 60);
    }

    #[test]
    fn zones_without_an_epsg_code_are_rejected() {
        for (number, hemisphere, datum) in [
            (17, Hemisphere::South, Datum::Nad83),
            (24, Hemisphere::North, Datum::Nad83),
            (0, Hemisphere::North, Datum::Wgs84),
            (61, Hemisphere::South, Datum::Wgs84),
        ] {
            assert!(matches!(
                UtmZone::new(number, hemisphere, datum),
                Err(ProjectionError::UnsupportedZone { .. })
            ));
        }
    }

    #[test]
    fn every_constructible_zone_round_trips_through_epsg() {
        for datum in [Datum::Wgs84, Datum::Nad83] {
            for hemisphere in [Hemisphere::North, Hemisphere::South] {
                for number in 0..=61 {
                    if let Ok(zone) = UtmZone::new(number, hemisphere, datum) {
                        let frame = Frame::Utm(zone);
                        assert_eq!(Frame::from_epsg(frame.epsg()).unwrap(), frame);
                    }
                }
            }
        }
    }

    #[test]
    fn deserializes_from_epsg_number() {
        let frame: Frame = serde_json::from_str("26917").unwrap();
        assert_eq!(frame.epsg(), 26917);
        assert!(serde_json::from_str::<Frame>("3857").is_err());
        assert_eq!(serde_json::to_string(&Frame::WGS84).unwrap(), "4326");
    }
}
