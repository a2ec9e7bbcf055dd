//! Reduction of arbitrary boundary geometry to a district polygon.

use geo::{BooleanOps, Geometry, MultiPolygon, Polygon};

/// Collects every polygonal part of `geometry`, descending into
/// geometry collections. Points and lines are dropped.
#[must_use]
pub fn polygonal_parts(geometry: &Geometry<f64>) -> Vec<Polygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => vec![polygon.clone()],
        Geometry::MultiPolygon(multi) => multi.0.clone(),
        Geometry::Rect(rect) => vec![rect.to_polygon()],
        Geometry::Triangle(triangle) => vec![triangle.to_polygon()],
        Geometry::GeometryCollection(collection) => {
            collection.0.iter().flat_map(polygonal_parts).collect()
        }
        Geometry::Point(_)
        | Geometry::MultiPoint(_)
        | Geometry::Line(_)
        | Geometry::LineString(_)
        | Geometry::MultiLineString(_) => Vec::new(),
    }
}

/// The district polygon for `geometry`, or `None` if it has no polygonal
/// part.
///
/// Plain polygons and multipolygons are taken as-is. Heterogeneous
/// collections are reduced to the union of their polygonal parts so that
/// overlapping pieces do not double-count area.
#[must_use]
pub fn district_polygon(geometry: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => Some(MultiPolygon(vec![polygon.clone()])),
        Geometry::MultiPolygon(multi) if !multi.0.is_empty() => Some(multi.clone()),
        other => {
            let parts = polygonal_parts(other);
            if parts.is_empty() {
                return None;
            }
            let union = parts
                .iter()
                .fold(MultiPolygon::new(Vec::new()), |acc, part| acc.union(part));
            (!union.0.is_empty()).then_some(union)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, GeometryCollection, Point, polygon};

    fn unit_square(offset: f64) -> Polygon<f64> {
        polygon![
            (x: offset, y: 0.0),
            (x: offset + 1.0, y: 0.0),
            (x: offset + 1.0, y: 1.0),
            (x: offset, y: 1.0),
        ]
    }

    #[test]
    fn polygon_is_taken_as_is() {
        let geometry = Geometry::Polygon(unit_square(0.0));
        let district = district_polygon(&geometry).unwrap();
        assert_eq!(district.0, vec![unit_square(0.0)]);
    }

    #[test]
    fn overlapping_collection_parts_are_unioned() {
        let geometry = Geometry::GeometryCollection(GeometryCollection(vec![
            Geometry::Polygon(unit_square(0.0)),
            Geometry::Polygon(unit_square(0.5)),
            Geometry::Point(Point::new(5.0, 5.0)),
        ]));
        let district = district_polygon(&geometry).unwrap();
        assert_eq!(district.0.len(), 1);
        assert!((district.unsigned_area() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn disjoint_collection_parts_stay_separate() {
        let geometry = Geometry::GeometryCollection(GeometryCollection(vec![
            Geometry::Polygon(unit_square(0.0)),
            Geometry::Polygon(unit_square(3.0)),
        ]));
        assert_eq!(district_polygon(&geometry).unwrap().0.len(), 2);
    }

    #[test]
    fn non_polygonal_geometry_has_no_district() {
        assert!(district_polygon(&Geometry::Point(Point::new(1.0, 1.0))).is_none());
        assert!(
            district_polygon(&Geometry::MultiPolygon(MultiPolygon::new(Vec::new()))).is_none()
        );
    }
}
