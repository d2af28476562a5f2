use crate::error::ReportError;
use crate::usage::ModelTier;
use comfy_table::Table;

pub fn format_tiers_text() -> String {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Model ID", "Input $/1M", "Output $/1M", "Default"]);
    for tier in ModelTier::ALL {
        let pricing = tier.pricing();
        let default = if tier == ModelTier::default() { "*" } else { "" };
        table.add_row(vec![
            tier.model_id().to_string(),
            format!("{:.2}", pricing.input_per_million),
            format!("{:.2}", pricing.output_per_million),
            default.to_string(),
        ]);
    }
    table.to_string()
}

pub fn format_tiers_json() -> Result<String, ReportError> {
    let tiers: Vec<serde_json::Value> = ModelTier::ALL
        .iter()
        .map(|tier| {
            let pricing = tier.pricing();
            serde_json::json!({
                "model_id": tier.model_id(),
                "input_per_million": pricing.input_per_million,
                "output_per_million": pricing.output_per_million,
                "default": *tier == ModelTier::default(),
            })
        })
        .collect();
    serde_json::to_string_pretty(&tiers)
        .map_err(|e| ReportError::Serialization(format!("Failed to render tiers: {}", e)))
}
