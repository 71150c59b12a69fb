mod data;
mod errors;
mod etl;
mod schema;

use std::env;
use std::fs::{create_dir_all, File};
use std::io;
use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;
use structured_logger::json::new_writer;
use structured_logger::Builder;

use crate::data::xref;
use crate::errors::Result;
use crate::etl::audit::AuditEtl;
use crate::etl::tabulate::TabulateEtl;
use crate::etl::Etl;

const DEFAULT_CONFIG_PATH: &str = "config/process.json";
const DEFAULT_MODE: &str = "tabulate";

#[derive(Deserialize)]
pub struct UserConfig {
    pub data_path: String,
    pub dest_path: String,
    pub street_xref_path: String,
    pub city_xref_path: String,
    pub validate: bool,
    #[serde(default)]
    pub street_decisions_path: Option<String>,
    #[serde(default)]
    pub city_decisions_path: Option<String>,
}

fn load_user_config(path: &str) -> Result<UserConfig> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

fn create_output_dir(config: &UserConfig) -> Result<PathBuf> {
    let output_dir = PathBuf::from(&config.dest_path);
    create_dir_all(&output_dir)?;
    Ok(output_dir)
}

fn setup_logging() {
    Builder::with_level("info")
        .with_target_writer("*", new_writer(io::stdout()))
        .init();
}

/// Apply reviewed decision files to the cross-reference tables. Runs on its
/// own, never during a shaping run; the shaping run only ever reads the
/// tables it finds on disk.
fn reconcile(config: &UserConfig) -> Result<()> {
    if let Some(decisions_path) = &config.street_decisions_path {
        let added = xref::apply_street_decisions(
            Path::new(&config.street_xref_path),
            Path::new(decisions_path),
        )?;
        info!(added = added as u64, path = config.street_xref_path.as_str(); "Applied street decisions");
    }
    if let Some(decisions_path) = &config.city_decisions_path {
        let added = xref::apply_city_decisions(
            Path::new(&config.city_xref_path),
            Path::new(decisions_path),
        )?;
        info!(added = added as u64, path = config.city_xref_path.as_str(); "Applied city decisions");
    }
    Ok(())
}

fn main() -> Result<()> {
    setup_logging();

    let mut args = env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| String::from(DEFAULT_CONFIG_PATH));
    let mode = args.next().unwrap_or_else(|| String::from(DEFAULT_MODE));

    let user_config = load_user_config(&config_path)?;
    let output_dir = create_output_dir(&user_config)?;

    match mode.as_str() {
        "tabulate" => TabulateEtl::new(&user_config).process(&output_dir),
        "audit" => AuditEtl::new(&user_config).process(&output_dir),
        "reconcile" => reconcile(&user_config),
        other => Err(format!(
            "unknown mode '{}', expected 'tabulate', 'audit', or 'reconcile'",
            other
        )
        .into()),
    }
}
