use crate::topology::{ArcSides, Geometry, Topology, TopologyError};
use crate::types::RegionId;
use geo::MultiLineString;
use tracing::{info, warn};

/// Five-digit county codes carry their state code in the leading two digits.
pub fn state_of_county(id: &RegionId) -> RegionId {
    match id {
        RegionId::Code(code) => RegionId::Code(code / 1000),
        RegionId::Label(label) => RegionId::Label(label.clone()),
    }
}

/// Whether an arc separates two different groups. Exterior arcs always do.
/// Geometries without a group key only share a group with themselves.
pub fn crosses_groups<K>(sides: ArcSides<'_>, group_of: K) -> bool
where
    K: Fn(&Geometry) -> Option<RegionId>,
{
    match sides {
        ArcSides::Exterior(_) => true,
        ArcSides::Interior(a, b) => match (group_of(a), group_of(b)) {
            (Some(ga), Some(gb)) => ga != gb,
            _ => !std::ptr::eq(a, b),
        },
    }
}

/// State boundary lines. Uses the group object when the topology has one,
/// otherwise derives state membership from the county codes.
pub fn state_boundaries(
    topology: &Topology,
    regions_object: &str,
    groups_object: &str,
) -> Result<MultiLineString<f64>, TopologyError> {
    let mesh = if topology.has_object(groups_object) {
        topology.mesh(groups_object, |sides| crosses_groups(sides, Geometry::region_id))?
    } else {
        warn!(
            groups_object,
            "Topology has no group object; deriving states from county codes"
        );
        topology.mesh(regions_object, |sides| {
            crosses_groups(sides, |g| g.region_id().as_ref().map(state_of_county))
        })?
    };
    info!(lines = mesh.0.len(), "Built state boundary mesh");
    Ok(mesh)
}
