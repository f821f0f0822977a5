use crate::boundary::state_boundaries;
use crate::config::AppConfig;
use crate::data::Datasets;
use crate::join::{join_regions, JoinSummary};
use crate::scale::ColorScale;
use crate::types::RegionFeature;
use anyhow::{Context, Result};
use geo::MultiLineString;

/// Everything needed to draw the map, derived once from the loaded datasets.
#[derive(Debug, Clone)]
pub struct Scene {
    pub regions: Vec<RegionFeature>,
    pub scale: ColorScale,
    pub boundaries: MultiLineString<f64>,
    pub summary: JoinSummary,
}

pub fn build_scene(datasets: &Datasets, config: &AppConfig) -> Result<Scene> {
    let input = &config.input;

    let (regions, summary) = join_regions(&datasets.topology, &input.regions_object, &datasets.statistics)
        .with_context(|| format!("Failed to decode regions from '{}'", input.regions_object))?;

    let scale = ColorScale::from_records(&datasets.statistics, config.scale.palette.clone())
        .context("Failed to build color scale")?;

    let boundaries = state_boundaries(&datasets.topology, &input.regions_object, &input.groups_object)
        .context("Failed to build state boundaries")?;

    Ok(Scene {
        regions,
        scale,
        boundaries,
        summary,
    })
}
