//! Run configuration
//!
//! A study is described by a TOML file. Every table may be omitted, in which case
//! defaults apply:
//!
//! ```toml
//! [study]
//! name = "wales"
//! sims_dir = "sims"
//! coords_file = "coords.xlsx"
//!
//! [weather]
//! resource = "CRU"
//! scenario = "A1B"
//! historic = { start = 1981, end = 2010 }
//! future = { start = 2011, end = 2040 }
//!
//! [weather.datasets.CRU]
//! historic = "cru_historic.nc"
//! future = "cru_a1b.nc"
//!
//! [litter]
//! source = "netcdf"
//! netcdf_file = "orchidee_litter.nc"
//! pft = "C3GrassTemperate"
//!
//! [soil]
//! hwsd_dir = "HWSD"
//! policy = "dominant"
//!
//! [run]
//! workers = 4
//! on_soil_no_data = "skip"
//! timeout_secs = 3600
//! ```

use crate::assembler::SoilNoDataPolicy;
use crate::climate::ResourceFamily;
use crate::context::{ResolverContext, StudySettings};
use crate::errors::{EcosseError, EcosseResult};
use crate::litter::PlantFunctionalType;
use crate::soil::SoilPolicy;
use crate::timeseries::YearRange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Default ECOSSE equilibrium mode.
pub const DEFAULT_EQUILIBRIUM_MODE: f64 = 9.5;

/// GCM runs of the AMMA-2050 EWEMBI resource.
pub const EWEMBI_GCMS: [&str; 4] = ["GFDL-ESM2M", "HadGEM2-ES", "IPSL-CM5A-LR", "MIROC5"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    pub name: String,
    /// Directory receiving the simulation inputs.
    pub sims_dir: PathBuf,
    /// Workbook of coordinates to simulate.
    pub coords_file: PathBuf,
    pub equilibrium_mode: f64,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            sims_dir: PathBuf::from("sims"),
            coords_file: PathBuf::new(),
            equilibrium_mode: DEFAULT_EQUILIBRIUM_MODE,
        }
    }
}

/// Files of one weather resource.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClimateFiles {
    /// Absent for resources shipping one dataset for both periods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historic: Option<PathBuf>,
    pub future: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub resource: String,
    /// Future climate scenario, used by CRU.
    pub scenario: String,
    pub historic: YearRange,
    pub future: YearRange,
    pub average_weather: bool,
    pub ewembi_gcms: Vec<String>,
    pub datasets: BTreeMap<String, ClimateFiles>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            resource: "CRU".to_string(),
            scenario: "A1B".to_string(),
            historic: YearRange {
                start: 1981,
                end: 2010,
            },
            future: YearRange {
                start: 2011,
                end: 2040,
            },
            average_weather: false,
            ewembi_gcms: EWEMBI_GCMS.iter().map(|gcm| gcm.to_string()).collect(),
            datasets: BTreeMap::new(),
        }
    }
}

impl WeatherConfig {
    pub fn family(&self) -> ResourceFamily {
        ResourceFamily::resolve(&self.resource, &self.ewembi_gcms)
    }

    /// Files of the selected resource.
    pub fn files(&self) -> EcosseResult<&ClimateFiles> {
        self.datasets.get(&self.resource).ok_or_else(|| {
            EcosseError::InvalidConfig(format!(
                "no dataset files configured for weather resource {}",
                self.resource
            ))
        })
    }

    /// Scenario recorded in the study definition: the scenario for CRU, otherwise the
    /// resource name.
    pub fn future_climate_scenario(&self) -> &str {
        match self.family() {
            ResourceFamily::Cru => &self.scenario,
            _ => &self.resource,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LitterSourceKind {
    Excel,
    #[default]
    #[serde(rename = "netcdf")]
    NetCdf,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LitterConfig {
    pub source: LitterSourceKind,
    pub excel_file: PathBuf,
    pub netcdf_file: PathBuf,
    pub pft: PlantFunctionalType,
}

impl LitterConfig {
    /// File of the selected litter source.
    pub fn file(&self) -> &Path {
        match self.source {
            LitterSourceKind::Excel => &self.excel_file,
            LitterSourceKind::NetCdf => &self.netcdf_file,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilConfig {
    /// Directory holding the HWSD raster and attribute table.
    pub hwsd_dir: PathBuf,
    pub policy: SoilPolicy,
}

impl Default for SoilConfig {
    fn default() -> Self {
        Self {
            hwsd_dir: PathBuf::from("HWSD"),
            policy: SoilPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    pub workers: usize,
    pub on_soil_no_data: SoilNoDataPolicy,
    /// Stop starting new coordinates after this many seconds. 0 means no limit.
    pub timeout_secs: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            on_soil_no_data: SoilNoDataPolicy::default(),
            timeout_secs: 0,
        }
    }
}

/// Whether [`RunConfig::save`] created or replaced the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Overwritten,
}

impl fmt::Display for SaveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveOutcome::Created => write!(f, "Wrote new"),
            SaveOutcome::Overwritten => write!(f, "Overwrote existing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub study: StudyConfig,
    pub weather: WeatherConfig,
    pub litter: LitterConfig,
    pub soil: SoilConfig,
    pub run: RunOptions,
}

/// Study names become directory and file names so must be non-blank without spaces.
pub fn validate_study_name(name: &str) -> EcosseResult<()> {
    if name.trim().is_empty() {
        return Err(EcosseError::InvalidConfig("study name is blank".to_string()));
    }
    if name.contains(char::is_whitespace) {
        return Err(EcosseError::InvalidConfig(format!(
            "study name '{name}' must not contain spaces"
        )));
    }
    Ok(())
}

impl RunConfig {
    /// Defaults for a new study.
    pub fn default_for(study: &str) -> Self {
        let mut config = Self::default();
        config.study.name = study.to_string();
        config
    }

    pub fn from_toml(content: &str) -> EcosseResult<Self> {
        toml::from_str(content).map_err(|e| EcosseError::InvalidConfig(e.to_string()))
    }

    pub fn to_toml(&self) -> EcosseResult<String> {
        toml::to_string_pretty(self).map_err(|e| EcosseError::InvalidConfig(e.to_string()))
    }

    pub fn load(path: &Path) -> EcosseResult<Self> {
        if !path.is_file() {
            return Err(EcosseError::MissingFile(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| EcosseError::InvalidConfig(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> EcosseResult<SaveOutcome> {
        validate_study_name(&self.study.name)?;
        let outcome = if path.exists() {
            SaveOutcome::Overwritten
        } else {
            SaveOutcome::Created
        };
        fs::write(path, self.to_toml()?)?;
        Ok(outcome)
    }

    /// Check settings that do not depend on any input file.
    pub fn validate(&self) -> EcosseResult<()> {
        validate_study_name(&self.study.name)?;
        for (label, range) in [
            ("historic", self.weather.historic),
            ("future", self.weather.future),
        ] {
            if range.start > range.end {
                return Err(EcosseError::InvalidConfig(format!(
                    "{label} start year {} is after end year {}",
                    range.start, range.end
                )));
            }
        }
        if self.run.workers == 0 {
            return Err(EcosseError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.weather.resource.trim().is_empty() {
            return Err(EcosseError::InvalidConfig(
                "weather resource is blank".to_string(),
            ));
        }
        Ok(())
    }

    pub fn study_settings(&self) -> StudySettings {
        StudySettings {
            name: self.study.name.clone(),
            equilibrium_mode: self.study.equilibrium_mode,
            average_weather: self.weather.average_weather,
        }
    }

    /// Resolver settings for the given batch windows.
    pub fn resolver_context(
        &self,
        simulation_years: YearRange,
        historic_years: YearRange,
    ) -> ResolverContext {
        ResolverContext::new(
            self.weather.resource.clone(),
            self.weather.family(),
            simulation_years,
            historic_years,
        )
        .with_soil_policy(self.soil.policy)
        .with_pft(self.litter.pft)
    }

    /// Directory receiving this study's per-cell outputs.
    pub fn study_dir(&self) -> PathBuf {
        self.study.sims_dir.join(&self.study.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_tables_take_defaults() {
        let config = RunConfig::from_toml("[study]\nname = \"wales\"\n").unwrap();
        assert_eq!(config.study.name, "wales");
        assert_eq!(config.study.equilibrium_mode, 9.5);
        assert_eq!(config.litter.pft, PlantFunctionalType::SoilBareGlobal);
        assert_eq!(config.litter.excel_file, PathBuf::new());
        assert_eq!(config.litter.source, LitterSourceKind::NetCdf);
        assert_eq!(config.run.workers, 1);
        assert_eq!(config.run.on_soil_no_data, SoilNoDataPolicy::Abort);
        assert_eq!(config.run.timeout_secs, 0);
        assert_eq!(config.weather.family(), ResourceFamily::Cru);
    }

    #[test]
    fn parses_full_configuration() {
        let content = r#"
            [study]
            name = "ghana"

            [weather]
            resource = "MIROC5"
            historic = { start = 1981, end = 2000 }
            future = { start = 2006, end = 2050 }

            [weather.datasets.MIROC5]
            historic = "hist.nc"
            future = "rcp45.nc"

            [litter]
            source = "excel"
            excel_file = "litter.xlsx"
            pft = "C4GrassTemperate"

            [soil]
            policy = "highest_coverage"

            [run]
            workers = 8
            on_soil_no_data = "skip"
            timeout_secs = 600
        "#;
        let config = RunConfig::from_toml(content).unwrap();
        config.validate().unwrap();
        assert_eq!(config.weather.family(), ResourceFamily::Ewembi);
        assert_eq!(config.weather.future_climate_scenario(), "MIROC5");
        assert_eq!(
            config.weather.files().unwrap().historic,
            Some(PathBuf::from("hist.nc"))
        );
        assert_eq!(config.litter.file(), Path::new("litter.xlsx"));
        assert_eq!(config.soil.policy, SoilPolicy::HighestCoverage);
        assert_eq!(config.run.on_soil_no_data, SoilNoDataPolicy::Skip);
        assert_eq!(config.run.timeout_secs, 600);

        let context = config.resolver_context(config.weather.future, config.weather.historic);
        assert_eq!(context.pft, PlantFunctionalType::C4GrassTemperate);
        assert_eq!(context.resource_family, ResourceFamily::Ewembi);
    }

    #[test]
    fn cru_scenario_is_recorded() {
        let config = RunConfig::default_for("s");
        assert_eq!(config.weather.future_climate_scenario(), "A1B");
        assert!(config.weather.files().is_err());
    }

    #[test]
    fn study_names() {
        assert!(validate_study_name("wales_2024").is_ok());
        assert!(validate_study_name("").is_err());
        assert!(validate_study_name("   ").is_err());
        assert!(validate_study_name("my study").is_err());
    }

    #[test]
    fn reversed_range_fails_to_parse() {
        let content = "[study]\nname = \"wales\"\n\n[weather]\nfuture = { start = 2050, end = 2040 }\n";
        let err = RunConfig::from_toml(content).unwrap_err();
        assert!(err.to_string().contains("start year 2050 is after end year 2040"));
    }

    #[test]
    fn validation_catches_bad_ranges() {
        let mut config = RunConfig::default_for("s");
        config.weather.future = YearRange {
            start: 2050,
            end: 2040,
        };
        assert!(config.validate().is_err());

        let mut config = RunConfig::default_for("s");
        config.run.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn save_reports_new_then_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wales.toml");
        let config = RunConfig::default_for("wales");

        let outcome = config.save(&path).unwrap();
        assert_eq!(outcome.to_string(), "Wrote new");
        assert_eq!(config.save(&path).unwrap(), SaveOutcome::Overwritten);
        assert_eq!(RunConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn save_requires_a_study_name() {
        let dir = tempdir().unwrap();
        assert!(RunConfig::default().save(&dir.path().join("x.toml")).is_err());
    }

    #[test]
    fn load_missing_file() {
        let result = RunConfig::load(Path::new("/does/not/exist.toml"));
        assert!(matches!(result, Err(EcosseError::MissingFile(_))));
    }
}
