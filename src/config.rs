//! JSON run configuration: sites, datasets and the output directory

use crate::errors::{MetPointError, Result};
use crate::netcdf_io::TimeSource;
use crate::variables::{DatasetFamily, MetVariable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// A target point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
}

/// How a dataset's files are organised under its root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Every file in `root` carries all variables
    #[default]
    MultiVariableFiles,
    /// `root/<source variable>/*.nc`, one variable per file
    PerVariableDirectories,
}

/// One source archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    pub family: DatasetFamily,
    pub root: PathBuf,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub time_source: TimeSource,
    /// Overrides of the family's default source-variable names
    #[serde(default)]
    pub variables: BTreeMap<MetVariable, String>,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub end_year: Option<i32>,
}

impl DatasetConfig {
    /// Source variable name for every wanted variable, overrides applied
    pub fn source_variables(&self) -> BTreeMap<MetVariable, String> {
        let mut sources = self.family.default_sources();
        sources.extend(self.variables.iter().map(|(v, name)| (*v, name.clone())));
        sources
    }

    /// Whether a file whose start token falls in `year` is wanted
    pub fn includes_year(&self, year: i32) -> bool {
        self.start_year.map_or(true, |start| year >= start)
            && self.end_year.map_or(true, |end| year <= end)
    }
}

/// Complete description of one batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub output_dir: PathBuf,
    pub sites: Vec<SiteConfig>,
    pub datasets: Vec<DatasetConfig>,
}

impl RunConfig {
    /// Read and validate a JSON run file.
    ///
    /// Relative dataset roots and the output directory are resolved against
    /// the directory holding the run file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config: RunConfig = serde_json::from_str(&text)?;

        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if config.output_dir.is_relative() {
                config.output_dir = base.join(&config.output_dir);
            }
            for dataset in &mut config.datasets {
                if dataset.root.is_relative() {
                    dataset.root = base.join(&dataset.root);
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            return Err(MetPointError::Config("no sites configured".to_string()));
        }
        if self.datasets.is_empty() {
            return Err(MetPointError::Config("no datasets configured".to_string()));
        }

        let mut ids = BTreeSet::new();
        for site in &self.sites {
            if site.id.trim().is_empty() {
                return Err(MetPointError::Config("site with an empty id".to_string()));
            }
            if !ids.insert(site.id.as_str()) {
                return Err(MetPointError::Config(format!("duplicate site id '{}'", site.id)));
            }
            if !(-90.0..=90.0).contains(&site.lat) || !(-180.0..=360.0).contains(&site.lon) {
                return Err(MetPointError::Config(format!(
                    "site '{}' has out-of-range coordinates ({}, {})",
                    site.id, site.lat, site.lon
                )));
            }
        }

        let mut names = BTreeSet::new();
        for dataset in &self.datasets {
            if !names.insert(dataset.name.as_str()) {
                return Err(MetPointError::Config(format!(
                    "duplicate dataset name '{}'",
                    dataset.name
                )));
            }
            if let (Some(start), Some(end)) = (dataset.start_year, dataset.end_year) {
                if start > end {
                    return Err(MetPointError::Config(format!(
                        "dataset '{}' has start_year {start} after end_year {end}",
                        dataset.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Sites restricted to `ids`, or all sites when `ids` is empty
    pub fn select_sites(&self, ids: &[String]) -> Result<Vec<SiteConfig>> {
        if ids.is_empty() {
            return Ok(self.sites.clone());
        }
        ids.iter()
            .map(|id| {
                self.sites
                    .iter()
                    .find(|site| &site.id == id)
                    .cloned()
                    .ok_or_else(|| MetPointError::Config(format!("unknown site '{id}'")))
            })
            .collect()
    }
}
