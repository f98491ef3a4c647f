//! Configuration for an explanation run.
//!
//! Uses `figment` for layered loading: defaults → TOML file → environment
//! variables (`SEGLIME_` prefix, `__` for nesting) → explicit overrides.

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::kernel::KernelConfig;
use crate::perturb::FillPolicy;
use crate::sampling::SamplingConfig;
use crate::segmentation::SegmentationMethod;
use crate::surrogate::SurrogateModel;

/// Every tunable of the pipeline, one section per stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplainConfig {
    /// How the image is split into segments.
    #[serde(default)]
    pub segmentation: SegmentationMethod,
    /// Sample budget and hide probability.
    #[serde(default)]
    pub sampling: SamplingConfig,
    /// Distance metric and kernel width.
    #[serde(default)]
    pub kernel: KernelConfig,
    /// Which weighted linear model to fit.
    #[serde(default)]
    pub surrogate: SurrogateModel,
    /// What hidden segments are painted with.
    #[serde(default)]
    pub fill: FillPolicy,
    /// RNG seed; drawn from OS entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ExplainConfig {
    /// Check every section, reporting the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.segmentation.validate()?;
        self.sampling.validate()?;
        self.kernel.validate()?;
        self.surrogate.validate()?;
        self.fill.validate()?;
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Load configuration with layered merging.
///
/// `path` names a TOML file; it is skipped when it does not exist.
pub fn load_config(
    path: Option<&Path>,
    overrides: Option<&ExplainConfig>,
) -> std::result::Result<ExplainConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(ExplainConfig::default()));

    if let Some(path) = path {
        if path.exists() {
            figment = figment.merge(Toml::file(path));
        }
    }

    // Environment variables (SEGLIME_SAMPLING__NUM_SAMPLES, SEGLIME_SEED, etc.)
    figment = figment.merge(Env::prefixed("SEGLIME_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}
