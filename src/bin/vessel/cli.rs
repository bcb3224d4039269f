//! Command implementations.

use crate::config::RunConfig;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info};
use vessel_ocr::analyzer::{PageAnalyzer, VesselModels};
use vessel_ocr::core::ModelPaths;

/// Loads the models, analyzes one page and writes its JSON record.
pub fn analyze_page(
    run: &RunConfig,
    image: &Path,
    page: u32,
    output: Option<&Path>,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let start = Instant::now();
    info!("Loading models from {}...", run.models.regions.parent().unwrap_or(Path::new(".")).display());
    let models = VesselModels::load(&run.models, &run.session, &run.analyzer)?;
    info!("Models loaded in {:.2}ms", start.elapsed().as_secs_f64() * 1000.0);

    let analyzer = PageAnalyzer::builder()
        .models(models)
        .config(run.analyzer.clone())
        .build()?;

    let result = analyzer.analyze_path(image, page)?;

    let json = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            info!("Result written to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

/// Reports each model artifact; returns false when any is missing.
pub fn check_models(model_dir: &Path) -> bool {
    let paths = ModelPaths::in_dir(model_dir);
    for (name, path) in paths.entries() {
        let status = if path.is_file() { "ok" } else { "MISSING" };
        println!("{:<18} {:<8} {}", name, status, path.display());
    }

    let missing = paths.missing();
    if missing.is_empty() {
        info!("All model artifacts present in {}", model_dir.display());
        true
    } else {
        error!("{} model artifact(s) missing in {}", missing.len(), model_dir.display());
        false
    }
}
