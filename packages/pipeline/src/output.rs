//! Writing map outputs to disk.

use std::path::{Path, PathBuf};

use parish_map_geometry::io::write_feature_collection;
use parish_map_style::StyleRegistry;

use crate::{MapOutput, PipelineError};

/// Name of the summary file written next to the layers.
pub const SUMMARY_FILE: &str = "summary.json";

/// Writes every layer of `output` as `<layer>.geojson` under `dir`, plus a
/// [`SUMMARY_FILE`] with periods, count range, faculty tree and styles.
/// The directory is created if needed. Returns the written paths, summary
/// last.
///
/// # Errors
///
/// Returns [`PipelineError`] if the directory or a file cannot be written.
pub fn write_map(
    output: &MapOutput,
    dir: &Path,
    styles: &StyleRegistry,
) -> Result<Vec<PathBuf>, PipelineError> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(output.layers.len() + 1);
    for (name, collection) in &output.layers {
        let path = dir.join(format!("{name}.geojson"));
        write_feature_collection(&path, collection)?;
        written.push(path);
    }

    let summary_path = dir.join(SUMMARY_FILE);
    let summary = serde_json::to_string_pretty(&output.summary(styles))?;
    std::fs::write(&summary_path, summary)?;
    written.push(summary_path);

    log::info!(
        "Wrote {} map ({} layers) to {}",
        output.kind,
        output.layers.len(),
        dir.display()
    );

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::fixture::Fixture;
    use crate::maps::layer;
    use crate::{MapKind, MapRequest, PipelineConfig, run_map};
    use parish_map_geometry::Crs;
    use parish_map_geometry::io::read_feature_collection;
    use serde_json::Value;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("parish_map_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn writes_layers_and_summary() {
        let config = PipelineConfig::embedded().unwrap();
        let output = run_map(
            &Fixture::default(),
            &config,
            &MapRequest::new(MapKind::Universities),
        )
        .unwrap();

        let dir = scratch_dir("write_map");
        let written = write_map(&output, &dir, &StyleRegistry::embedded()).unwrap();
        assert_eq!(written.len(), output.layers.len() + 1);
        assert_eq!(written.last().unwrap(), &dir.join(SUMMARY_FILE));

        let grid = read_feature_collection(
            &dir.join(format!("{}.geojson", layer::DENSITY_GRID)),
            None,
        )
        .unwrap();
        assert_eq!(grid.crs, None);
        assert_eq!(grid.len(), 2);
        assert_eq!(
            grid.features[0].attribute("count").and_then(Value::as_u64),
            Some(3)
        );

        let summary: Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join(SUMMARY_FILE)).unwrap())
                .unwrap();
        assert_eq!(summary["selected_period"], "202410");
        assert_eq!(summary["periods"], serde_json::json!(["202410", "202420"]));
        assert_eq!(summary["styles"][layer::DENSITY_GRID]["weight"], 0.6);
        assert!(summary["faculties"]["GRADO"].is_object());

        let parishes = read_feature_collection(
            &dir.join(format!("{}.geojson", layer::PARISHES)),
            Some(Crs::Wgs84),
        )
        .unwrap();
        assert_eq!(parishes.len(), 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
