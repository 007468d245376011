//! JSON model files and analysis settings read by the command line tool.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use daestruct_algo::AnalysisConfig;
use daestruct_core::{Incidence, IncidenceMatrix};
use serde::{Deserialize, Serialize};

/// `{ "dimension": n, "incidence": [{ "equation", "variable", "derivative" }] }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub dimension: usize,
    #[serde(default)]
    pub incidence: Vec<Incidence>,
}

impl Model {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading model {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing model {}", path.display()))
    }

    pub fn to_matrix(&self) -> Result<IncidenceMatrix> {
        IncidenceMatrix::from_incidences(self.dimension, self.incidence.iter().copied())
            .context("building incidence matrix")
    }
}

pub fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}
