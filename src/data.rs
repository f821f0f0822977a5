use crate::config::InputConfig;
use crate::topology::Topology;
use crate::types::StatRecord;
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use std::fmt;
use std::path::PathBuf;
use tracing::{error, info};

/// Where a dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Path(PathBuf),
    Url(String),
}

impl Source {
    pub fn parse(text: &str) -> Source {
        let trimmed = text.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Source::Url(trimmed.to_string())
        } else {
            Source::Path(PathBuf::from(trimmed))
        }
    }

    fn is_csv(&self) -> bool {
        let name = match self {
            Source::Path(path) => path.to_string_lossy().to_lowercase(),
            Source::Url(url) => url.split(['?', '#']).next().unwrap_or(url).to_lowercase(),
        };
        name.ends_with(".csv")
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Path(path) => write!(f, "{}", path.display()),
            Source::Url(url) => f.write_str(url),
        }
    }
}

/// Both datasets, available only once both loaded.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub topology: Topology,
    pub statistics: Vec<StatRecord>,
}

/// Fetch topology and statistics concurrently. The first failure aborts the
/// load; there are no retries and no partial results.
pub async fn load_datasets(input: &InputConfig) -> Result<Datasets> {
    let topology_source = Source::parse(&input.topology);
    let statistics_source = Source::parse(&input.statistics);
    info!(topology = %topology_source, statistics = %statistics_source, "Loading datasets");

    let loaded = tokio::try_join!(
        load_topology(&topology_source),
        load_statistics(&statistics_source),
    );
    let (topology, statistics) = loaded.map_err(|e| {
        error!(error = %format!("{:#}", e), "Dataset load failed");
        e
    })?;

    info!(
        objects = topology.objects.len(),
        arcs = topology.arcs.len(),
        records = statistics.len(),
        "Loaded datasets"
    );
    Ok(Datasets {
        topology,
        statistics,
    })
}

pub async fn load_topology(source: &Source) -> Result<Topology> {
    let bytes = fetch(source).await?;
    Topology::from_slice(&bytes).with_context(|| format!("Failed to parse topology from {}", source))
}

pub async fn load_statistics(source: &Source) -> Result<Vec<StatRecord>> {
    let bytes = fetch(source).await?;
    parse_statistics(&bytes, source.is_csv())
        .with_context(|| format!("Failed to parse statistics from {}", source))
}

pub fn parse_statistics(bytes: &[u8], csv: bool) -> Result<Vec<StatRecord>> {
    if !csv {
        return Ok(serde_json::from_slice(bytes)?);
    }
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(bytes);
    let mut records = Vec::new();
    for (line, result) in rdr.deserialize::<StatRecord>().enumerate() {
        let record = result.with_context(|| format!("Bad statistics row {}", line + 1))?;
        records.push(record);
    }
    Ok(records)
}

async fn fetch(source: &Source) -> Result<Vec<u8>> {
    match source {
        Source::Path(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {:?}", path)),
        Source::Url(url) => {
            let response = reqwest::get(url)
                .await
                .with_context(|| format!("Failed to fetch {}", url))?;
            let status = response.status();
            if !status.is_success() {
                return Err(anyhow!("Fetching {} returned HTTP {}", url, status));
            }
            let body = response
                .bytes()
                .await
                .with_context(|| format!("Failed to read response body from {}", url))?;
            Ok(body.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RegionId;
    use std::fs;

    const TOPOLOGY: &str = r#"{
        "type": "Topology",
        "arcs": [[[0, 0], [1, 0], [1, 1], [0, 0]]],
        "objects": {
            "counties": { "type": "GeometryCollection", "geometries": [
                { "type": "Polygon", "id": 1001, "arcs": [[0]] }
            ]},
            "states": { "type": "GeometryCollection", "geometries": [
                { "type": "Polygon", "id": "01", "arcs": [[0]] }
            ]}
        }
    }"#;

    const STATS: &str = r#"[
        { "fips": 1001, "state": "AL", "area_name": "Autauga County", "bachelorsOrHigher": 21.9 }
    ]"#;

    fn input(topology: &std::path::Path, statistics: &std::path::Path) -> InputConfig {
        InputConfig {
            topology: topology.to_string_lossy().into_owned(),
            statistics: statistics.to_string_lossy().into_owned(),
            ..InputConfig::default()
        }
    }

    #[test]
    fn sources_distinguish_urls_and_paths() {
        assert_eq!(
            Source::parse("https://host/x.json"),
            Source::Url("https://host/x.json".into())
        );
        assert_eq!(Source::parse("data/x.json"), Source::Path(PathBuf::from("data/x.json")));
        assert!(Source::parse("https://host/stats.CSV?v=2").is_csv());
        assert!(!Source::parse("stats.json").is_csv());
    }

    #[test]
    fn parses_csv_statistics() {
        let csv = "fips,state,area_name,bachelorsOrHigher\n\
                   01001,AL,Autauga County,21.9\n\
                   1003,AL,\"Baldwin County, AL\",\n";
        let records = parse_statistics(csv.as_bytes(), true).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, RegionId::Code(1001));
        assert_eq!(records[0].attainment, Some(21.9));
        assert_eq!(records[1].name, "Baldwin County, AL");
        assert_eq!(records[1].attainment, None);
    }

    #[tokio::test]
    async fn loads_both_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let topo = dir.path().join("counties.json");
        let stats = dir.path().join("education.json");
        fs::write(&topo, TOPOLOGY).unwrap();
        fs::write(&stats, STATS).unwrap();

        let datasets = load_datasets(&input(&topo, &stats)).await.unwrap();
        assert!(datasets.topology.has_object("counties"));
        assert_eq!(datasets.statistics.len(), 1);
    }

    #[tokio::test]
    async fn one_failure_fails_the_whole_load() {
        let dir = tempfile::tempdir().unwrap();
        let topo = dir.path().join("counties.json");
        fs::write(&topo, TOPOLOGY).unwrap();
        let missing = dir.path().join("missing.json");

        let err = load_datasets(&input(&topo, &missing)).await.unwrap_err();
        assert!(format!("{:#}", err).contains("missing.json"));
    }

    #[tokio::test]
    async fn malformed_topology_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let topo = dir.path().join("counties.json");
        let stats = dir.path().join("education.json");
        fs::write(&topo, "{ not json").unwrap();
        fs::write(&stats, STATS).unwrap();

        let err = load_datasets(&input(&topo, &stats)).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse topology"));
    }
}
