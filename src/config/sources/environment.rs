//! Environment source: FOLIO__SECTION__KEY, e.g. FOLIO__GENERATION__MAX_ATTEMPTS=5

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(
        Environment::with_prefix("FOLIO")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    ))
}
