//! `lazycph engines`: what is registered and what is installed.

use lazycph_engine::EngineRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRow {
    pub extension: String,
    pub mode: &'static str,
    pub template: String,
    pub installed: bool,
}

pub fn engine_rows(registry: &EngineRegistry) -> Vec<EngineRow> {
    registry
        .engines()
        .map(|(extension, engine)| EngineRow {
            extension: extension.to_string(),
            mode: engine.mode().as_str(),
            template: engine.template().to_string(),
            installed: which::which(engine.template().program()).is_ok(),
        })
        .collect()
}

pub fn list_engines(registry: &EngineRegistry) {
    let rows = engine_rows(registry);
    let width = rows.iter().map(|r| r.extension.len()).max().unwrap_or(0);
    for row in rows {
        let status = if row.installed { "ok" } else { "missing" };
        println!(
            "{:<width$}  {:<11}  {:<7}  {}",
            row.extension,
            row.mode,
            status,
            row.template,
            width = width
        );
    }
}
