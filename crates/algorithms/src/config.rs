//! Pipeline configuration
//!
//! One struct carries the parameters of every stage. Each section defaults
//! to the values of the production run, so a config file only needs the
//! keys it changes.

use crate::sampling::SamplerParams;
use crate::seasonal::SeasonWindows;
use crate::statistics::{DisplayParams, TrendParams};
use crate::transect::TransectParams;
use rivertrend_core::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub sampling: SamplerParams,
    pub transects: TransectParams,
    pub seasons: SeasonWindows,
    pub trends: TrendParams,
    pub display: DisplayParams,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.sampling.validate()?;
        self.transects.validate()?;
        self.seasons.validate()?;
        self.trends.validate()?;
        self.display.validate()?;
        Ok(())
    }

    /// Season tag of the permanent band, e.g. `prm_DnW`
    pub fn permanent_season(&self) -> Result<String> {
        crate::statistics::season_tag(&self.seasons.permanent_band())
    }
}
