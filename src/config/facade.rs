//! Config loading entry point: assembles sources in precedence order.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::FolioConfig;
use crate::error::ReportError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    /// Precedence (lowest to highest): defaults, global file, workspace files, environment.
    pub fn load(workspace_root: &Path) -> Result<FolioConfig, ReportError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder)?;
        let config: FolioConfig = builder.build()?.try_deserialize()?;
        debug!(
            workspace_root = %workspace_root.display(),
            default_tier = %config.generation.default_tier,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load a single explicit file over the built-in defaults.
    pub fn load_from_file(path: &Path) -> Result<FolioConfig, ReportError> {
        let config = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
