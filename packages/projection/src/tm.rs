//! Transverse Mercator via the Krüger series.
//!
//! Coefficients are carried to fourth order in the third flattening
//! `n`, which keeps the forward/inverse pair consistent to well under a
//! millimetre anywhere a UTM zone is normally used.

use crate::frame::{Datum, UtmZone};

const UTM_SCALE: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

const fn inverse_flattening(datum: Datum) -> f64 {
    match datum {
        Datum::Wgs84 => 298.257_223_563,
        Datum::Nad83 => 298.257_222_101,
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct TransverseMercator {
    central_meridian: f64,
    false_northing: f64,
    /// `k0 * A`, the scaled rectifying radius.
    scaled_radius: f64,
    eccentricity: f64,
    alpha: [f64; 4],
    beta: [f64; 4],
    delta: [f64; 3],
}

impl TransverseMercator {
    pub(crate) fn utm(zone: UtmZone) -> Self {
        let f = 1.0 / inverse_flattening(zone.datum());
        let n = f / (2.0 - f);
        let (n2, n3, n4) = (n * n, n * n * n, n * n * n * n);

        let rectifying_radius = SEMI_MAJOR_AXIS / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0);

        Self {
            central_meridian: zone.central_meridian(),
            false_northing: zone.false_northing(),
            scaled_radius: UTM_SCALE * rectifying_radius,
            eccentricity: (f * (2.0 - f)).sqrt(),
            alpha: [
                n / 2.0 - 2.0 / 3.0 * n2 + 5.0 / 16.0 * n3 + 41.0 / 180.0 * n4,
                13.0 / 48.0 * n2 - 3.0 / 5.0 * n3 + 557.0 / 1440.0 * n4,
                61.0 / 240.0 * n3 - 103.0 / 140.0 * n4,
                49561.0 / 161_280.0 * n4,
            ],
            beta: [
                n / 2.0 - 2.0 / 3.0 * n2 + 37.0 / 96.0 * n3 - 1.0 / 360.0 * n4,
                1.0 / 48.0 * n2 + 1.0 / 15.0 * n3 - 437.0 / 1440.0 * n4,
                17.0 / 480.0 * n3 - 37.0 / 840.0 * n4,
                4397.0 / 161_280.0 * n4,
            ],
            delta: [
                2.0 * n - 2.0 / 3.0 * n2 - 2.0 * n3,
                7.0 / 3.0 * n2 - 8.0 / 5.0 * n3,
                56.0 / 15.0 * n3,
            ],
        }
    }

    /// Longitude offset from the central meridian, wrapped to [-180, 180).
    fn meridian_offset(&self, lon: f64) -> f64 {
        (lon - self.central_meridian + 180.0).rem_euclid(360.0) - 180.0
    }

    /// Degrees -> metres. Returns `None` outside the projection's domain.
    pub(crate) fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let offset = self.meridian_offset(lon);
        if offset.abs() >= 90.0 || lat.abs() > 90.0 {
            return None;
        }

        let dl = offset.to_radians();
        let sin_phi = lat.to_radians().sin();
        let e = self.eccentricity;

        let t = (sin_phi.atanh() - e * (e * sin_phi).atanh()).sinh();
        let xi_p = t.atan2(dl.cos());
        let eta_p = (dl.sin() / t.mul_add(t, 1.0).sqrt()).atanh();

        let mut xi = xi_p;
        let mut eta = eta_p;
        let mut k = 0.0;
        for a in &self.alpha {
            k += 2.0;
            xi += a * (k * xi_p).sin() * (k * eta_p).cosh();
            eta += a * (k * xi_p).cos() * (k * eta_p).sinh();
        }

        let x = self.scaled_radius.mul_add(eta, UTM_FALSE_EASTING);
        let y = self.scaled_radius.mul_add(xi, self.false_northing);
        (x.is_finite() && y.is_finite()).then_some((x, y))
    }

    /// Metres -> degrees. Returns `None` if the series produces non-finite output.
    pub(crate) fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let xi = (y - self.false_northing) / self.scaled_radius;
        let eta = (x - UTM_FALSE_EASTING) / self.scaled_radius;

        let mut xi_p = xi;
        let mut eta_p = eta;
        let mut k = 0.0;
        for b in &self.beta {
            k += 2.0;
            xi_p -= b * (k * xi).sin() * (k * eta).cosh();
            eta_p -= b * (k * xi).cos() * (k * eta).sinh();
        }

        let chi = (xi_p.sin() / eta_p.cosh()).asin();
        let mut phi = chi;
        let mut k = 0.0;
        for d in &self.delta {
            k += 2.0;
            phi += d * (k * chi).sin();
        }

        let lon = self.central_meridian + eta_p.sinh().atan2(xi_p.cos()).to_degrees();
        let lon = (lon + 180.0).rem_euclid(360.0) - 180.0;
        let lat = phi.to_degrees();
        (lon.is_finite() && lat.is_finite()).then_some((lon, lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Hemisphere;

    fn zone(number: u8, hemisphere: Hemisphere) -> TransverseMercator {
        TransverseMercator::utm(UtmZone::new(number, hemisphere, Datum::Wgs84).unwrap())
    }

    #[test]
    fn equator_on_central_meridian_is_false_origin() {
        let (x, y) = zone(17, Hemisphere::North).forward(-81.0, 0.0).unwrap();
        assert!((x - 500_000.0).abs() < 1e-6);
        assert!(y.abs() < 1e-6);
    }

    #[test]
    fn forty_five_degrees_matches_meridian_arc() {
        // k0 times the WGS 84 meridian distance to 45N.
        let (x, y) = zone(17, Hemisphere::North).forward(-81.0, 45.0).unwrap();
        assert!((x - 500_000.0).abs() < 1e-6);
        assert!((y - 4_982_950.4).abs() < 0.5, "northing was {y}");
    }

    #[test]
    fn eastings_are_symmetric_about_central_meridian() {
        let tm = zone(17, Hemisphere::North);
        let (east, north_e) = tm.forward(-79.0, 42.0).unwrap();
        let (west, north_w) = tm.forward(-83.0, 42.0).unwrap();
        assert!(((east - 500_000.0) + (west - 500_000.0)).abs() < 1e-6);
        assert!((north_e - north_w).abs() < 1e-6);
    }

    #[test]
    fn southern_hemisphere_uses_false_northing() {
        let (_, y) = zone(56, Hemisphere::South).forward(153.0, -33.9).unwrap();
        assert!(y > 6_000_000.0 && y < 10_000_000.0);
    }

    #[test]
    fn inverse_wraps_across_the_antimeridian() {
        let tm = zone(60, Hemisphere::North);
        let (x, y) = tm.forward(-179.5, 10.0).unwrap();
        assert!(x > 500_000.0);
        let (lon, lat) = tm.inverse(x, y).unwrap();
        assert!((lon + 179.5).abs() < 1e-9, "longitude was {lon}");
        assert!((lat - 10.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_points_a_quarter_turn_from_the_meridian() {
        assert!(zone(17, Hemisphere::North).forward(9.0, 10.0).is_none());
        assert!(zone(17, Hemisphere::North).forward(-81.0, 91.0).is_none());
    }
}
