use crate::output::OutputWriter;
use crate::output_types::ConfigRow;
use anyhow::Result;
use sitewise_core::config::LayeredConfig;
use std::path::Path;

pub fn execute(config: &LayeredConfig, config_path: &Path, output: &OutputWriter) -> Result<()> {
    let mut rows: Vec<ConfigRow> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigRow { key, value, source: format!("{:?}", source) })
        .collect();
    rows.sort_by(|a, b| a.key.cmp(&b.key));

    if !output.is_json() {
        output.section("Configuration");
        let file_state = if config_path.exists() { "loaded" } else { "not found, using defaults" };
        output.kv("File", format!("{} ({})", config_path.display(), file_state));
    }
    output.table(rows)
}
