use crate::color::Color;
use crate::config::AppConfig;
use crate::legend::render_legend;
use crate::scale::ColorScale;
use crate::scene::Scene;
use crate::tooltip::escape_html;
use crate::types::{RegionFeature, RegionId};
use anyhow::{Context, Result};
use geo::{Coord, LineString, MultiLineString, MultiPolygon};
use geojson::{feature::Id, Feature, FeatureCollection, JsonObject};
use rayon::prelude::*;
use std::fmt::Write;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Round to three decimals for compact path data.
pub fn fmt_num(v: f64) -> String {
    // + 0.0 turns -0 into 0
    let rounded = (v * 1000.0).round() / 1000.0 + 0.0;
    format!("{}", rounded)
}

fn push_coord(d: &mut String, cmd: char, c: &Coord<f64>) {
    let _ = write!(d, "{}{},{}", cmd, fmt_num(c.x), fmt_num(c.y));
}

fn push_line(d: &mut String, line: &LineString<f64>, closed: bool) {
    let mut coords = line.0.as_slice();
    if closed && coords.len() > 1 && coords.first() == coords.last() {
        coords = &coords[..coords.len() - 1];
    }
    let Some((first, rest)) = coords.split_first() else {
        return;
    };
    push_coord(d, 'M', first);
    for c in rest {
        push_coord(d, 'L', c);
    }
    if closed {
        d.push('Z');
    }
}

/// SVG path data for polygons, one closed subpath per ring.
pub fn polygon_path(polygons: &MultiPolygon<f64>) -> String {
    let mut d = String::new();
    for polygon in polygons {
        push_line(&mut d, polygon.exterior(), true);
        for ring in polygon.interiors() {
            push_line(&mut d, ring, true);
        }
    }
    d
}

pub fn line_path(lines: &MultiLineString<f64>) -> String {
    let mut d = String::new();
    for line in lines {
        push_line(&mut d, line, false);
    }
    d
}

pub fn region_fill(region: &RegionFeature, scale: &ColorScale, no_data: Color) -> Color {
    match region.attainment() {
        Some(value) => scale.color_of(value),
        None => no_data,
    }
}

pub fn render_region(region: &RegionFeature, scale: &ColorScale, no_data: Color) -> String {
    let mut out = String::from("<path");
    let class = if region.attainment().is_some() {
        "county"
    } else {
        "county no-data"
    };
    let _ = write!(out, r#" class="{}""#, class);
    if let Some(id) = &region.id {
        let _ = write!(out, r#" data-fips="{}""#, escape_html(&id.to_string()));
    }
    if let Some(stat) = &region.stat {
        if let Some(value) = stat.attainment {
            let _ = write!(out, r#" data-education="{}""#, value);
        }
        let _ = write!(
            out,
            r#" data-name="{}" data-state="{}""#,
            escape_html(&stat.name),
            escape_html(&stat.parent)
        );
    }
    let _ = write!(
        out,
        r#" fill="{}" d="{}"/>"#,
        region_fill(region, scale, no_data),
        polygon_path(&region.geometry)
    );
    out
}

pub fn render_svg(scene: &Scene, config: &AppConfig) -> String {
    let no_data = config.scale.no_data_color;
    let regions: Vec<String> = scene
        .regions
        .par_iter()
        .map(|region| render_region(region, &scene.scale, no_data))
        .collect();

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg id="chart-svg" xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = fmt_num(config.output.width),
        h = fmt_num(config.output.height)
    );
    svg.push_str(&render_legend(&scene.scale, &config.legend));
    svg.push_str(r#"<g class="counties">"#);
    for region in &regions {
        svg.push_str(region);
    }
    svg.push_str("</g>");
    let _ = write!(
        svg,
        r##"<path id="state-lines" fill="none" stroke="#ffffff" stroke-linejoin="round" d="{}"/>"##,
        line_path(&scene.boundaries)
    );
    svg.push_str("</svg>");
    svg
}

const PAGE_STYLE: &str = r#"
body { font-family: sans-serif; text-align: center; }
#chart-div { position: relative; display: inline-block; }
.county:hover { stroke: #000000; stroke-width: 0.5; }
.legend-text { font-size: 12px; fill: #333333; }
.tooltip-div {
  position: absolute; pointer-events: none; padding: 6px 8px;
  background: #ffffe0; border: 1px solid #999999; border-radius: 4px;
  font-size: 12px; text-align: left;
}
"#;

// Mirrors Tooltip::enter / Tooltip::leave and tooltip::placement.
const PAGE_SCRIPT: &str = r#"
(function () {
  var tooltip = document.getElementById('tooltip');
  function esc(s) {
    return String(s).replace(/[&<>"']/g, function (c) {
      return { '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;' }[c];
    });
  }
  document.querySelectorAll('#chart-svg .county').forEach(function (county) {
    county.addEventListener('mouseover', function (event) {
      var d = county.dataset;
      if (d.name === undefined) {
        tooltip.style.opacity = 0;
        return;
      }
      var value = d.education === undefined ? 'No data' : d.education + '%';
      tooltip.innerHTML = '<strong>' + esc(d.name + ', ' + d.state) + '</strong><br>' + esc(value);
      if (d.education === undefined) {
        tooltip.removeAttribute('data-education');
      } else {
        tooltip.setAttribute('data-education', d.education);
      }
      tooltip.style.left = (event.pageX + 10) + 'px';
      tooltip.style.top = (event.pageY - 28) + 'px';
      tooltip.style.opacity = 0.9;
    });
    county.addEventListener('mouseout', function () {
      tooltip.style.opacity = 0;
    });
  });
})();
"#;

pub fn render_page(scene: &Scene, config: &AppConfig) -> String {
    let title = escape_html(&config.output.title);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
<h1 id="title">{title}</h1>
<div id="description">{caption}</div>
<div id="chart-div">
{svg}
<div id="tooltip" class="tooltip-div" style="opacity: 0"></div>
</div>
<script>{script}</script>
</body>
</html>
"#,
        title = title,
        style = PAGE_STYLE,
        caption = escape_html(&config.legend.caption),
        svg = render_svg(scene, config),
        script = PAGE_SCRIPT,
    )
}

/// Joined regions as a GeoJSON feature collection.
pub fn regions_geojson(scene: &Scene) -> FeatureCollection {
    let features = scene
        .regions
        .iter()
        .map(|region| {
            let mut properties = JsonObject::new();
            if let Some(stat) = &region.stat {
                properties.insert("name".to_string(), stat.name.clone().into());
                properties.insert("state".to_string(), stat.parent.clone().into());
                properties.insert("attainment".to_string(), stat.attainment.into());
            }
            Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(&region.geometry))),
                id: region.id.as_ref().map(|id| match id {
                    RegionId::Code(code) => Id::Number((*code).into()),
                    RegionId::Label(label) => Id::String(label.clone()),
                }),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Write the page, the standalone SVG and (optionally) GeoJSON into the
/// output directory. Returns the files written.
pub fn write_outputs(scene: &Scene, config: &AppConfig) -> Result<Vec<PathBuf>> {
    let dir = &config.output.dir;
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory {:?}", dir))?;

    let mut written = Vec::new();
    let page = dir.join("index.html");
    fs::write(&page, render_page(scene, config)).with_context(|| format!("Failed to write {:?}", page))?;
    written.push(page);

    let svg = dir.join("map.svg");
    fs::write(&svg, render_svg(scene, config)).with_context(|| format!("Failed to write {:?}", svg))?;
    written.push(svg);

    if config.output.geojson {
        let path = dir.join("regions.geojson");
        let json = serde_json::to_string(&regions_geojson(scene)).context("Failed to serialize GeoJSON")?;
        fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
        written.push(path);
    }

    info!(files = written.len(), dir = ?dir, "Wrote map outputs");
    Ok(written)
}
