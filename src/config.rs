use crate::color::{Color, NO_DATA, PURPLE_GREEN};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub scale: ScaleConfig,
    pub legend: LegendConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub topology: String,   // Path or http(s) URL
    pub statistics: String, // JSON array, or CSV by extension
    pub regions_object: String,
    pub groups_object: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            topology: "data/counties.json".to_string(),
            statistics: "data/for_user_education.json".to_string(),
            regions_object: "counties".to_string(),
            groups_object: "states".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScaleConfig {
    pub palette: Vec<Color>,
    pub no_data_color: Color,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        ScaleConfig {
            palette: PURPLE_GREEN.to_vec(),
            no_data_color: NO_DATA,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LegendConfig {
    pub x: f64,
    pub y: f64,
    pub swatch_width: f64,
    pub swatch_height: f64,
    pub caption: String,
}

impl Default for LegendConfig {
    fn default() -> Self {
        LegendConfig {
            x: 530.0,
            y: 5.0,
            swatch_width: 30.0,
            swatch_height: 20.0,
            caption: "Bachelor degree or higher (%)".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub title: String,
    pub width: f64,
    pub height: f64,
    pub geojson: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: PathBuf::from("output"),
            title: "United States Educational Attainment".to_string(),
            width: 960.0,
            height: 600.0,
            geojson: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { port: 8080 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
