//! Choropleth map of US county educational attainment.
//!
//! The pipeline loads a county topology and a statistics table, joins them by
//! county code, derives a quantized color scale, and writes an SVG map with a
//! legend, state boundary lines and a hover tooltip.

pub mod boundary;
pub mod color;
pub mod config;
pub mod data;
pub mod join;
pub mod legend;
pub mod render;
pub mod scale;
pub mod scene;
pub mod server;
pub mod tooltip;
pub mod topology;
pub mod types;
