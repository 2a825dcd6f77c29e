//! Settings shared by every coordinate of a batch.
//!
//! [`ResolverContext`] carries what the resolvers need to know about the run.
//! [`LimitedDataContext`] is the record of settings written once alongside the
//! per-cell outputs.

use crate::climate::ResourceFamily;
use crate::litter::PlantFunctionalType;
use crate::soil::SoilPolicy;
use crate::timeseries::YearRange;
use serde::{Deserialize, Serialize};

/// Per-batch inputs to the soil, litter and climate resolvers.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverContext {
    pub soil_policy: SoilPolicy,
    pub pft: PlantFunctionalType,
    pub weather_resource: String,
    pub resource_family: ResourceFamily,
    /// Future years simulated; the litter series is aligned to this window.
    pub simulation_years: YearRange,
    pub historic_years: YearRange,
}

impl ResolverContext {
    pub fn new(
        weather_resource: impl Into<String>,
        resource_family: ResourceFamily,
        simulation_years: YearRange,
        historic_years: YearRange,
    ) -> Self {
        Self {
            soil_policy: SoilPolicy::default(),
            pft: PlantFunctionalType::default(),
            weather_resource: weather_resource.into(),
            resource_family,
            simulation_years,
            historic_years,
        }
    }

    pub fn with_soil_policy(mut self, soil_policy: SoilPolicy) -> Self {
        self.soil_policy = soil_policy;
        self
    }

    pub fn with_pft(mut self, pft: PlantFunctionalType) -> Self {
        self.pft = pft;
        self
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::new(
            "CRU",
            ResourceFamily::Cru,
            YearRange { start: 2001, end: 2010 },
            YearRange { start: 1981, end: 2000 },
        )
    }
}

/// Study-level settings that do not come from the resolvers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySettings {
    pub name: String,
    /// ECOSSE equilibrium mode
    pub equilibrium_mode: f64,
    /// Use long-term average weather instead of the year by year series.
    pub average_weather: bool,
}

impl StudySettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            equilibrium_mode: crate::config::DEFAULT_EQUILIBRIUM_MODE,
            average_weather: false,
        }
    }
}

/// Settings common to all simulations of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitedDataContext {
    pub study: String,
    pub weather_resource: String,
    pub resource_family: ResourceFamily,
    pub simulation_years: YearRange,
    pub historic_years: YearRange,
    pub equilibrium_mode: f64,
    pub average_weather: bool,
    pub pft: PlantFunctionalType,
    pub soil_policy: SoilPolicy,
    /// Description of the litter source, e.g. its record count or grid size.
    pub litter_summary: String,
}

impl LimitedDataContext {
    pub fn new(study: &StudySettings, context: &ResolverContext, litter_summary: String) -> Self {
        Self {
            study: study.name.clone(),
            weather_resource: context.weather_resource.clone(),
            resource_family: context.resource_family,
            simulation_years: context.simulation_years,
            historic_years: context.historic_years,
            equilibrium_mode: study.equilibrium_mode,
            average_weather: study.average_weather,
            pft: context.pft,
            soil_policy: context.soil_policy,
            litter_summary,
        }
    }
}
