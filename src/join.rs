use crate::topology::{TopoFeature, Topology, TopologyError};
use crate::types::{RegionFeature, RegionId, StatRecord};
use geo::{MultiPolygon, Polygon};
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinSummary {
    pub matched: usize,
    pub unmatched: usize,
}

/// Identifier → record lookup. On duplicate identifiers the first record wins.
pub fn index_records(records: &[StatRecord]) -> HashMap<RegionId, &StatRecord> {
    let mut index = HashMap::with_capacity(records.len());
    for record in records {
        if index.contains_key(&record.id) {
            warn!(id = %record.id, name = %record.name, "Duplicate statistics record ignored");
            continue;
        }
        index.insert(record.id.clone(), record);
    }
    index
}

/// Decode the region object of `topology` and attach statistics to every
/// region. All regions are returned in topology order, matched or not.
pub fn join_regions(
    topology: &Topology,
    object: &str,
    records: &[StatRecord],
) -> Result<(Vec<RegionFeature>, JoinSummary), TopologyError> {
    let features = topology.features(object)?;
    debug!(object, features = features.len(), "Decoded topology object");
    let joined = attach_records(features, records);
    info!(
        matched = joined.1.matched,
        unmatched = joined.1.unmatched,
        "Joined statistics to regions"
    );
    Ok(joined)
}

pub fn attach_records(
    features: Vec<TopoFeature>,
    records: &[StatRecord],
) -> (Vec<RegionFeature>, JoinSummary) {
    let index = index_records(records);
    let mut summary = JoinSummary::default();

    let regions = features
        .into_iter()
        .map(|feature| {
            let stat = feature
                .id
                .as_ref()
                .and_then(|id| index.get(id))
                .map(|record| (*record).clone());
            match &stat {
                Some(_) => summary.matched += 1,
                None => {
                    summary.unmatched += 1;
                    debug!(id = ?feature.id, "No statistics for region");
                }
            }
            RegionFeature {
                geometry: polygons_of(&feature),
                id: feature.id,
                stat,
            }
        })
        .collect();

    (regions, summary)
}

fn polygons_of(feature: &TopoFeature) -> MultiPolygon<f64> {
    let mut polygons = Vec::new();
    collect_polygons(&feature.geometry, &mut polygons);
    if polygons.is_empty() {
        warn!(id = ?feature.id, "Region has no polygonal geometry; keeping it empty");
    }
    MultiPolygon::new(polygons)
}

fn collect_polygons(geometry: &geo::Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
    match geometry {
        geo::Geometry::Polygon(p) => out.push(p.clone()),
        geo::Geometry::MultiPolygon(mp) => out.extend(mp.0.iter().cloned()),
        geo::Geometry::GeometryCollection(gc) => {
            for g in gc.0.iter() {
                collect_polygons(g, out);
            }
        }
        _ => {}
    }
}
