use anyhow::Result;
use clap::Args;
use ecosse_core::config::RunConfig;
use std::path::PathBuf;

#[derive(Args)]
pub struct InitArgs {
    /// Study name, without spaces
    pub study: String,

    /// Configuration file to write, `<study>.toml` by default
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn execute(args: InitArgs) -> Result<()> {
    let path = args
        .config
        .unwrap_or_else(|| PathBuf::from(format!("{}.toml", args.study)));
    let outcome = RunConfig::default_for(&args.study).save(&path)?;
    println!("{outcome} configuration file {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_then_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wales.toml");
        let args = || InitArgs {
            study: "wales".to_string(),
            config: Some(path.clone()),
        };
        execute(args()).unwrap();
        execute(args()).unwrap();
        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.study.name, "wales");
    }

    #[test]
    fn study_with_spaces_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let args = InitArgs {
            study: "new wales".to_string(),
            config: Some(dir.path().join("x.toml")),
        };
        assert!(execute(args).is_err());
    }
}
