#![allow(dead_code)]

use choropleth::data::Datasets;
use choropleth::topology::Topology;
use choropleth::types::StatRecord;

// Four unit-square counties in a row, x = 0..4. The first two belong to
// state 1, the last two to state 2. County 2013 has no statistics.
//
//   arc 0: A|B   arc 2: B|C (state line)   arc 6: C|D
pub const TOPOLOGY: &str = r#"{
  "type": "Topology",
  "arcs": [
    [[1, 0], [1, 1]],
    [[1, 1], [0, 1], [0, 0], [1, 0]],
    [[2, 0], [2, 1]],
    [[1, 1], [2, 1]],
    [[2, 0], [1, 0]],
    [[2, 1], [3, 1]],
    [[3, 1], [3, 0]],
    [[3, 0], [2, 0]],
    [[3, 1], [4, 1], [4, 0], [3, 0]]
  ],
  "objects": {
    "counties": {
      "type": "GeometryCollection",
      "geometries": [
        { "type": "Polygon", "id": "01001", "arcs": [[1, 0]] },
        { "type": "Polygon", "id": 1003, "arcs": [[3, -3, 4, 0]] },
        { "type": "Polygon", "id": 2001, "arcs": [[5, 6, 7, 2]] },
        { "type": "Polygon", "id": 2013, "arcs": [[8, -7]] }
      ]
    },
    "states": {
      "type": "GeometryCollection",
      "geometries": [
        { "type": "Polygon", "id": "01", "arcs": [[1, -5, 2, -4]] },
        { "type": "Polygon", "id": "02", "arcs": [[5, 8, 7, 2]] }
      ]
    }
  }
}"#;

pub const STATISTICS: &str = r#"[
  { "fips": 1001, "state": "AL", "area_name": "Autauga County", "bachelorsOrHigher": 10 },
  { "fips": "1003", "state": "AL", "area_name": "Baldwin County", "bachelorsOrHigher": 90 },
  { "fips": 2001, "state": "AK", "area_name": "Aleutians East Borough", "bachelorsOrHigher": 50 },
  { "fips": 99999, "state": "ZZ", "area_name": "Nowhere County", "bachelorsOrHigher": 30 }
]"#;

pub fn topology() -> Topology {
    Topology::from_slice(TOPOLOGY.as_bytes()).unwrap()
}

pub fn statistics() -> Vec<StatRecord> {
    serde_json::from_str(STATISTICS).unwrap()
}

pub fn datasets() -> Datasets {
    Datasets {
        topology: topology(),
        statistics: statistics(),
    }
}

/// Topology without the `states` object.
pub fn counties_only() -> Topology {
    let mut topo = topology();
    topo.objects.remove("states");
    topo
}

/// Whether any line in `mesh` has `a` and `b` as consecutive points.
pub fn has_segment(mesh: &geo::MultiLineString<f64>, a: (f64, f64), b: (f64, f64)) -> bool {
    mesh.0.iter().any(|line| {
        line.0.windows(2).any(|w| {
            let p = (w[0].x, w[0].y);
            let q = (w[1].x, w[1].y);
            (p == a && q == b) || (p == b && q == a)
        })
    })
}
