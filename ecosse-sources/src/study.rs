//! Study definition file
//!
//! Downstream tools locate a study's simulations through
//! `<sims_dir>/<study>_study_definition.txt`, a JSON document with sorted keys under a
//! single `studyDefn` object.

use ecosse_core::config::{validate_study_name, RunConfig};
use ecosse_core::errors::{EcosseError, EcosseResult};
use ecosse_core::spatial::BoundingBox;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::info;

const PLACEHOLDER: &str = "xxxx";

pub fn study_definition_path(config: &RunConfig) -> PathBuf {
    config
        .study
        .sims_dir
        .join(format!("{}_study_definition.txt", config.study.name))
}

/// Study definition as written to disk.
///
/// Years are kept as strings for compatibility with existing readers, which also expect
/// the `province` and `shpe_file` placeholders.
pub fn study_definition(config: &RunConfig, bbox: &BoundingBox, version: &str) -> Value {
    let weather = &config.weather;
    json!({
        "studyDefn": {
            "bbox": bbox.to_array(),
            "luPiJsonFname": null,
            "province": PLACEHOLDER,
            "shpe_file": PLACEHOLDER,
            "study": config.study.name,
            "histStrtYr": weather.historic.start.to_string(),
            "histEndYr": weather.historic.end.to_string(),
            "climScnr": weather.future_climate_scenario(),
            "futStrtYr": weather.future.start.to_string(),
            "futEndYr": weather.future.end.to_string(),
            "version": version,
        }
    })
}

/// Write the study definition next to the study's simulation directory.
pub fn write_study_definition(
    config: &RunConfig,
    bbox: &BoundingBox,
    version: &str,
) -> EcosseResult<PathBuf> {
    validate_study_name(&config.study.name)?;
    let path = study_definition_path(config);
    let content = serde_json::to_string_pretty(&study_definition(config, bbox, version))
        .map_err(|e| EcosseError::Error(e.to_string()))?;
    std::fs::create_dir_all(&config.study.sims_dir)?;
    std::fs::write(&path, content)?;
    info!(path = %path.display(), "Wrote study definition file");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(sims_dir: PathBuf) -> RunConfig {
        let mut config = RunConfig::default_for("wales");
        config.study.sims_dir = sims_dir;
        config
    }

    #[test]
    fn climate_scenario_depends_on_resource() {
        let bbox = BoundingBox::new(-4.0, 51.0, -3.0, 52.0);
        let mut config = config(PathBuf::from("sims"));
        let defn = study_definition(&config, &bbox, "1.0");
        assert_eq!(defn["studyDefn"]["climScnr"], "A1B");
        assert_eq!(defn["studyDefn"]["histStrtYr"], "1981");
        assert_eq!(defn["studyDefn"]["bbox"], json!([-4.0, 51.0, -3.0, 52.0]));

        config.weather.resource = "EObs".to_string();
        let defn = study_definition(&config, &bbox, "1.0");
        assert_eq!(defn["studyDefn"]["climScnr"], "EObs");
    }

    #[test]
    fn placeholders_are_written() {
        let config = config(PathBuf::from("sims"));
        let defn = study_definition(&config, &BoundingBox::new(0.0, 0.0, 1.0, 1.0), "1.0");
        let keys: Vec<_> = defn["studyDefn"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                "bbox",
                "climScnr",
                "futEndYr",
                "futStrtYr",
                "histEndYr",
                "histStrtYr",
                "luPiJsonFname",
                "province",
                "shpe_file",
                "study",
                "version"
            ]
        );
        assert_eq!(defn["studyDefn"]["province"], "xxxx");
        assert_eq!(defn["studyDefn"]["shpe_file"], "xxxx");
        assert!(defn["studyDefn"]["luPiJsonFname"].is_null());
    }

    #[test]
    fn writes_sorted_keys() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path().to_path_buf());
        let path =
            write_study_definition(&config, &BoundingBox::new(0.0, 0.0, 1.0, 1.0), "2.1").unwrap();
        assert_eq!(path, dir.path().join("wales_study_definition.txt"));

        let content = std::fs::read_to_string(&path).unwrap();
        let bbox = content.find("\"bbox\"").unwrap();
        let version = content.find("\"version\"").unwrap();
        assert!(bbox < version);
        let value: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["studyDefn"]["study"], "wales");
    }

    #[test]
    fn blank_study_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path().to_path_buf());
        config.study.name = " ".to_string();
        assert!(write_study_definition(&config, &BoundingBox::new(0.0, 0.0, 1.0, 1.0), "2.1").is_err());
    }
}
