//! TopoJSON decoding.
//!
//! A topology stores every boundary segment ("arc") once; polygons and lines
//! reference arcs by index, with `!i` (two's complement) meaning arc `i`
//! traversed backwards. This module expands those references back into
//! standalone `geo` geometries and extracts deduplicated meshes.

use crate::types::RegionId;
use geo::{Coord, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("topology has no object named '{0}'")]
    MissingObject(String),

    #[error("arc reference {reference} is out of range ({count} arcs)")]
    ArcOutOfRange { reference: i64, count: usize },

    #[error("arc {0} contains a position with fewer than two coordinates")]
    ShortArcPosition(usize),

    #[error("point position has fewer than two coordinates")]
    ShortPointPosition,

    #[error("invalid topology JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

impl Transform {
    fn apply(&self, x: f64, y: f64) -> Coord<f64> {
        Coord {
            x: x * self.scale[0] + self.translate[0],
            y: y * self.scale[1] + self.translate[1],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub bbox: Option<Vec<f64>>,
    #[serde(default)]
    pub transform: Option<Transform>,
    #[serde(default)]
    pub arcs: Vec<Vec<Vec<f64>>>,
    pub objects: BTreeMap<String, Geometry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawGeometry")]
pub struct Geometry {
    pub id: Option<Value>,
    pub properties: Option<Map<String, Value>>,
    pub shape: Shape,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Shape {
    /// `"type": null`, or no type at all.
    #[serde(skip)]
    Null,
    GeometryCollection { geometries: Vec<Geometry> },
    Point { coordinates: Vec<f64> },
    MultiPoint { coordinates: Vec<Vec<f64>> },
    LineString { arcs: Vec<i64> },
    MultiLineString { arcs: Vec<Vec<i64>> },
    Polygon { arcs: Vec<Vec<i64>> },
    MultiPolygon { arcs: Vec<Vec<Vec<i64>>> },
}

#[derive(Deserialize)]
struct RawGeometry {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl TryFrom<RawGeometry> for Geometry {
    type Error = serde_json::Error;

    fn try_from(raw: RawGeometry) -> Result<Self, Self::Error> {
        let shape = match raw.kind {
            None => Shape::Null,
            Some(kind) => {
                let mut fields = raw.rest;
                fields.insert("type".to_string(), Value::String(kind));
                serde_json::from_value(Value::Object(fields))?
            }
        };
        Ok(Geometry {
            id: raw.id,
            properties: raw.properties,
            shape,
        })
    }
}

impl Geometry {
    pub fn region_id(&self) -> Option<RegionId> {
        self.id.as_ref().and_then(RegionId::from_json)
    }

    fn for_each_arc(&self, f: &mut impl FnMut(i64)) {
        let rings: Vec<&Vec<i64>> = match &self.shape {
            Shape::LineString { arcs } => vec![arcs],
            Shape::MultiLineString { arcs } | Shape::Polygon { arcs } => arcs.iter().collect(),
            Shape::MultiPolygon { arcs } => arcs.iter().flatten().collect(),
            Shape::Null
            | Shape::GeometryCollection { .. }
            | Shape::Point { .. }
            | Shape::MultiPoint { .. } => Vec::new(),
        };
        for arc in rings.into_iter().flatten() {
            f(*arc);
        }
    }
}

/// A decoded feature from a topology object.
#[derive(Debug, Clone)]
pub struct TopoFeature {
    pub id: Option<RegionId>,
    pub properties: Option<Map<String, Value>>,
    pub geometry: geo::Geometry<f64>,
}

/// Which geometries sit on either side of an arc during mesh extraction.
#[derive(Debug, Clone, Copy)]
pub enum ArcSides<'a> {
    /// Only one geometry references the arc.
    Exterior(&'a Geometry),
    /// The first and last geometries referencing the arc.
    Interior(&'a Geometry, &'a Geometry),
}

impl Topology {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TopologyError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn object(&self, name: &str) -> Result<&Geometry, TopologyError> {
        self.objects
            .get(name)
            .ok_or_else(|| TopologyError::MissingObject(name.to_string()))
    }

    pub fn has_object(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    /// Expand a named object into features. A collection yields one feature
    /// per member in native order; any other geometry yields one feature.
    pub fn features(&self, name: &str) -> Result<Vec<TopoFeature>, TopologyError> {
        let object = self.object(name)?;
        let arcs = ArcSet::decode(self)?;
        let members: Vec<&Geometry> = match &object.shape {
            Shape::GeometryCollection { geometries } => geometries.iter().collect(),
            _ => vec![object],
        };
        members
            .into_iter()
            .map(|g| -> Result<TopoFeature, TopologyError> {
                Ok(TopoFeature {
                    id: g.region_id(),
                    properties: g.properties.clone(),
                    geometry: arcs.geometry(g)?,
                })
            })
            .collect()
    }

    /// Arc references selected for a mesh of `name`, in ascending arc order,
    /// before stitching. Each arc keeps the direction of its first reference.
    pub fn mesh_arcs<F>(&self, name: &str, filter: F) -> Result<Vec<i64>, TopologyError>
    where
        F: Fn(ArcSides<'_>) -> bool,
    {
        let object = self.object(name)?;
        let mut leaves = Vec::new();
        collect_leaves(object, &mut leaves);

        let mut by_arc: BTreeMap<usize, Vec<(i64, usize)>> = BTreeMap::new();
        for (leaf, geometry) in leaves.iter().enumerate() {
            let mut failed = None;
            geometry.for_each_arc(&mut |reference| {
                let index = arc_index(reference);
                if index >= self.arcs.len() {
                    failed.get_or_insert(reference);
                    return;
                }
                by_arc.entry(index).or_default().push((reference, leaf));
            });
            if let Some(reference) = failed {
                return Err(TopologyError::ArcOutOfRange {
                    reference,
                    count: self.arcs.len(),
                });
            }
        }

        let mut selected = Vec::new();
        for refs in by_arc.values() {
            let (Some(first), Some(last)) = (refs.first(), refs.last()) else {
                continue;
            };
            let sides = if refs.len() == 1 {
                ArcSides::Exterior(leaves[first.1])
            } else {
                ArcSides::Interior(leaves[first.1], leaves[last.1])
            };
            if filter(sides) {
                selected.push(first.0);
            }
        }
        Ok(selected)
    }

    /// Boundary lines of `name` for which `filter` holds, each shared arc
    /// emitted once and connected arcs stitched into longer lines.
    pub fn mesh<F>(&self, name: &str, filter: F) -> Result<MultiLineString<f64>, TopologyError>
    where
        F: Fn(ArcSides<'_>) -> bool,
    {
        let selected = self.mesh_arcs(name, filter)?;
        let arcs = ArcSet::decode(self)?;
        let lines = stitch(&arcs, &selected)?
            .iter()
            .map(|fragment| arcs.line(fragment).map(LineString::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MultiLineString::new(lines))
    }
}

fn collect_leaves<'a>(geometry: &'a Geometry, out: &mut Vec<&'a Geometry>) {
    match &geometry.shape {
        Shape::GeometryCollection { geometries } => {
            for g in geometries {
                collect_leaves(g, out);
            }
        }
        _ => out.push(geometry),
    }
}

fn arc_index(reference: i64) -> usize {
    if reference < 0 {
        !reference as usize
    } else {
        reference as usize
    }
}

/// Arcs with positions resolved to absolute coordinates.
struct ArcSet<'t> {
    arcs: Vec<Vec<Coord<f64>>>,
    transform: Option<&'t Transform>,
}

impl<'t> ArcSet<'t> {
    fn decode(topology: &'t Topology) -> Result<Self, TopologyError> {
        let transform = topology.transform.as_ref();
        let mut arcs = Vec::with_capacity(topology.arcs.len());
        for (i, arc) in topology.arcs.iter().enumerate() {
            let mut coords = Vec::with_capacity(arc.len());
            let (mut x, mut y) = (0.0, 0.0);
            for position in arc {
                let [px, py, ..] = position.as_slice() else {
                    return Err(TopologyError::ShortArcPosition(i));
                };
                match transform {
                    // Quantized arcs are delta-encoded.
                    Some(t) => {
                        x += px;
                        y += py;
                        coords.push(t.apply(x, y));
                    }
                    None => coords.push(Coord { x: *px, y: *py }),
                }
            }
            arcs.push(coords);
        }
        Ok(ArcSet { arcs, transform })
    }

    fn get(&self, reference: i64) -> Result<&[Coord<f64>], TopologyError> {
        self.arcs
            .get(arc_index(reference))
            .map(Vec::as_slice)
            .ok_or(TopologyError::ArcOutOfRange {
                reference,
                count: self.arcs.len(),
            })
    }

    fn endpoints(&self, reference: i64) -> Result<Option<(Coord<f64>, Coord<f64>)>, TopologyError> {
        let arc = self.get(reference)?;
        let (Some(&first), Some(&last)) = (arc.first(), arc.last()) else {
            return Ok(None);
        };
        Ok(Some(if reference < 0 { (last, first) } else { (first, last) }))
    }

    fn point(&self, position: &[f64]) -> Result<Coord<f64>, TopologyError> {
        let [x, y, ..] = position else {
            return Err(TopologyError::ShortPointPosition);
        };
        Ok(match self.transform {
            Some(t) => t.apply(*x, *y),
            None => Coord { x: *x, y: *y },
        })
    }

    fn line(&self, refs: &[i64]) -> Result<Vec<Coord<f64>>, TopologyError> {
        let mut points: Vec<Coord<f64>> = Vec::new();
        for &reference in refs {
            // The joint point is shared with the previous arc.
            points.pop();
            let arc = self.get(reference)?;
            if reference < 0 {
                points.extend(arc.iter().rev());
            } else {
                points.extend_from_slice(arc);
            }
        }
        if points.len() == 1 {
            points.push(points[0]);
        }
        Ok(points)
    }

    fn ring(&self, refs: &[i64]) -> Result<LineString<f64>, TopologyError> {
        let mut points = self.line(refs)?;
        if let Some(&first) = points.first() {
            while points.len() < 4 {
                points.push(first);
            }
        }
        Ok(LineString::new(points))
    }

    fn polygon(&self, rings: &[Vec<i64>]) -> Result<Polygon<f64>, TopologyError> {
        let mut rings = rings.iter().map(|r| self.ring(r));
        let exterior = match rings.next() {
            Some(ring) => ring?,
            None => LineString::new(Vec::new()),
        };
        let interiors = rings.collect::<Result<Vec<_>, _>>()?;
        Ok(Polygon::new(exterior, interiors))
    }

    fn geometry(&self, geometry: &Geometry) -> Result<geo::Geometry<f64>, TopologyError> {
        Ok(match &geometry.shape {
            Shape::Null => {
                geo::Geometry::GeometryCollection(Vec::<geo::Geometry<f64>>::new().into())
            }
            Shape::GeometryCollection { geometries } => geo::Geometry::GeometryCollection(
                geometries
                    .iter()
                    .map(|g| self.geometry(g))
                    .collect::<Result<Vec<_>, _>>()?
                    .into(),
            ),
            Shape::Point { coordinates } => geo::Geometry::Point(Point(self.point(coordinates)?)),
            Shape::MultiPoint { coordinates } => geo::Geometry::MultiPoint(MultiPoint::new(
                coordinates
                    .iter()
                    .map(|c| self.point(c).map(Point))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            Shape::LineString { arcs } => geo::Geometry::LineString(LineString::new(self.line(arcs)?)),
            Shape::MultiLineString { arcs } => geo::Geometry::MultiLineString(MultiLineString::new(
                arcs.iter()
                    .map(|a| self.line(a).map(LineString::new))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            Shape::Polygon { arcs } => geo::Geometry::Polygon(self.polygon(arcs)?),
            Shape::MultiPolygon { arcs } => geo::Geometry::MultiPolygon(MultiPolygon::new(
                arcs.iter()
                    .map(|p| self.polygon(p))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
        })
    }
}

type PointKey = (u64, u64);

fn point_key(c: Coord<f64>) -> PointKey {
    // + 0.0 folds -0.0 into 0.0
    ((c.x + 0.0).to_bits(), (c.y + 0.0).to_bits())
}

struct Fragment {
    arcs: Vec<i64>,
    start: PointKey,
    end: PointKey,
    alive: bool,
}

/// Join arcs end-to-start into fragments. Arcs are never reversed; a fragment
/// whose end meets its own start is a closed ring.
fn stitch(arcs: &ArcSet<'_>, selected: &[i64]) -> Result<Vec<Vec<i64>>, TopologyError> {
    let mut fragments: Vec<Fragment> = Vec::new();
    let mut by_start: HashMap<PointKey, usize> = HashMap::new();
    let mut by_end: HashMap<PointKey, usize> = HashMap::new();

    for &reference in selected {
        let Some((start, end)) = arcs.endpoints(reference)? else {
            continue;
        };
        let (start, end) = (point_key(start), point_key(end));

        if let Some(fi) = by_end.remove(&start).filter(|&i| fragments[i].alive) {
            fragments[fi].arcs.push(reference);
            fragments[fi].end = end;
            match by_start.get(&end).copied() {
                Some(gi) if gi != fi && fragments[gi].alive => {
                    by_start.remove(&end);
                    let tail = std::mem::take(&mut fragments[gi].arcs);
                    let tail_end = fragments[gi].end;
                    fragments[gi].alive = false;
                    fragments[fi].arcs.extend(tail);
                    fragments[fi].end = tail_end;
                    by_end.insert(tail_end, fi);
                }
                _ => {
                    by_end.insert(end, fi);
                }
            }
        } else if let Some(fi) = by_start.remove(&end).filter(|&i| fragments[i].alive) {
            fragments[fi].arcs.insert(0, reference);
            fragments[fi].start = start;
            by_start.insert(start, fi);
        } else {
            let index = fragments.len();
            fragments.push(Fragment {
                arcs: vec![reference],
                start,
                end,
                alive: true,
            });
            by_start.insert(start, index);
            by_end.insert(end, index);
        }
    }

    Ok(fragments
        .into_iter()
        .filter(|f| f.alive)
        .map(|f| f.arcs)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quantized() -> Topology {
        serde_json::from_value(json!({
            "type": "Topology",
            "transform": { "scale": [0.5, 0.5], "translate": [10.0, 20.0] },
            "arcs": [[[0, 0], [2, 0], [0, 2], [-2, 0], [0, -2]]],
            "objects": {
                "square": { "type": "Polygon", "id": "7", "arcs": [[0]] },
                "marker": { "type": "Point", "coordinates": [4, 4] }
            }
        }))
        .unwrap()
    }

    #[test]
    fn decodes_delta_quantized_arcs() {
        let topo = quantized();
        let features = topo.features("square").unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, Some(RegionId::Code(7)));
        let geo::Geometry::Polygon(polygon) = &features[0].geometry else {
            panic!("expected polygon");
        };
        let coords: Vec<(f64, f64)> = polygon.exterior().coords().map(|c| (c.x, c.y)).collect();
        assert_eq!(
            coords,
            vec![(10.0, 20.0), (11.0, 20.0), (11.0, 21.0), (10.0, 21.0), (10.0, 20.0)]
        );
    }

    #[test]
    fn points_are_quantized_without_delta() {
        let topo = quantized();
        let features = topo.features("marker").unwrap();
        assert_eq!(features[0].geometry, geo::Geometry::Point(Point::new(12.0, 22.0)));
    }

    #[test]
    fn reversed_references_walk_arcs_backwards() {
        let topo: Topology = serde_json::from_value(json!({
            "type": "Topology",
            "arcs": [[[0.0, 0.0], [1.0, 0.0]], [[1.0, 0.0], [1.0, 1.0]]],
            "objects": { "path": { "type": "LineString", "arcs": [-2, -1] } }
        }))
        .unwrap();
        let features = topo.features("path").unwrap();
        let geo::Geometry::LineString(line) = &features[0].geometry else {
            panic!("expected line");
        };
        let coords: Vec<(f64, f64)> = line.coords().map(|c| (c.x, c.y)).collect();
        assert_eq!(coords, vec![(1.0, 1.0), (1.0, 0.0), (0.0, 0.0)]);
    }

    #[test]
    fn short_rings_are_padded() {
        let topo: Topology = serde_json::from_value(json!({
            "type": "Topology",
            "arcs": [[[0.0, 0.0], [1.0, 0.0]]],
            "objects": { "sliver": { "type": "Polygon", "arcs": [[0]] } }
        }))
        .unwrap();
        let features = topo.features("sliver").unwrap();
        let geo::Geometry::Polygon(polygon) = &features[0].geometry else {
            panic!("expected polygon");
        };
        assert_eq!(polygon.exterior().0.len(), 4);
    }

    #[test]
    fn unknown_object_and_bad_arc_are_errors() {
        let topo: Topology = serde_json::from_value(json!({
            "type": "Topology",
            "arcs": [],
            "objects": { "broken": { "type": "Polygon", "arcs": [[3]] } }
        }))
        .unwrap();
        assert!(matches!(topo.features("missing"), Err(TopologyError::MissingObject(_))));
        assert!(matches!(
            topo.features("broken"),
            Err(TopologyError::ArcOutOfRange { reference: 3, count: 0 })
        ));
        assert!(topo.mesh_arcs("broken", |_| true).is_err());
    }

    #[test]
    fn null_geometries_decode_as_empty() {
        let topo = Topology::from_slice(
            br#"{"type":"Topology","arcs":[[[0,0],[1,0],[1,1],[0,0]]],
                 "objects":{"counties":{"type":"GeometryCollection","geometries":[
                   {"type":"Polygon","id":1001,"arcs":[[0]]},
                   {"type":null,"id":1003},
                   {"id":1005}]}}}"#,
        )
        .unwrap();
        let features = topo.features("counties").unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[1].id, Some(RegionId::Code(1003)));
        assert_eq!(
            features[1].geometry,
            geo::Geometry::GeometryCollection(Vec::<geo::Geometry<f64>>::new().into())
        );
        assert_eq!(topo.mesh_arcs("counties", |_| true).unwrap(), vec![0]);
    }

    #[test]
    fn unknown_geometry_type_is_an_error() {
        let err = Topology::from_slice(
            br#"{"type":"Topology","arcs":[],"objects":{"x":{"type":"Circle"}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, TopologyError::Json(_)));
    }

    #[test]
    fn stitch_joins_connected_arcs() {
        let topo: Topology = serde_json::from_value(json!({
            "type": "Topology",
            "arcs": [
                [[0.0, 0.0], [1.0, 0.0]],
                [[2.0, 0.0], [3.0, 0.0]],
                [[1.0, 0.0], [2.0, 0.0]]
            ],
            "objects": { "road": { "type": "MultiLineString", "arcs": [[0], [1], [2]] } }
        }))
        .unwrap();
        let mesh = topo.mesh("road", |_| true).unwrap();
        assert_eq!(mesh.0.len(), 1);
        let xs: Vec<f64> = mesh.0[0].coords().map(|c| c.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0]);
    }
}
