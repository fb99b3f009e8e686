//! End-to-end pipeline tests over real files.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use subocean::cast::CastDirection;
use subocean::{combine, Exporter, Pipeline, Profile};

/// Write a raw profile file: one descent to 2 bar and the ascent back.
fn write_profile(dir: &TempDir, name: &str) -> PathBuf {
    let header = [
        "Date",
        "Time",
        "Hydrostatic pressure (bar)",
        "Depth (meter)",
        "[CH4] dissolved with water vapour (ppm)",
        "Error Standard",
        "Total Flow (sccm)",
        "Flow Carrier Gas (sccm)",
        "[H2O] measured (%)",
        "Cellule Temperature (Degree Celsius)",
    ]
    .join("\t");

    let pressures = [
        0.2, 0.5, 0.8, 1.1, 1.4, 1.7, 2.0, 1.8, 1.5, 1.2, 0.9, 0.6, 0.3, 0.2,
    ];
    let mut lines = vec![header];
    for (i, p) in pressures.iter().enumerate() {
        lines.push(
            [
                "2024-11-27".to_string(),
                format!("12:58:{:02}", 10 + i),
                format!("{p}"),
                format!("{}", p * 10.0),
                format!("{}", 8.5 + 0.1 * i as f64),
                "0.01".to_string(),
                "20".to_string(),
                "5".to_string(),
                "10".to_string(),
                "40.0".to_string(),
            ]
            .join("\t"),
        );
    }

    let path = dir.path().join(format!("{name}.txt"));
    fs::write(&path, lines.join("\n")).expect("write profile");
    path
}

fn write_sidecar(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(format!("{name}_log.json"));
    fs::write(
        &path,
        r#"{
            "Concentration coefficient calibration 1": "1.25",
            "Concentration coefficient calibration 2": "0.98",
            "Title of the experiment": "Fjord transect 3",
            "Start time": "2024-11-27 12:58:10",
            "End time": "2024-11-27 12:58:23",
            "Hydrostatic Pressure coefficient 1": "0.0012",
            "Hydrostatic Pressure coefficient 2": "-0.4",
            "Latitude": "68.97",
            "Type of gas": "1"
        }"#,
    )
    .expect("write sidecar");
    path
}

#[test]
fn test_end_to_end_profile_processing() {
    let dir = TempDir::new().unwrap();
    let data = write_profile(&dir, "dive01");
    let sidecar = write_sidecar(&dir, "dive01");

    let pipeline = Pipeline::default();
    let profile = Profile::new(data, Some(sidecar));
    let (loaded, levels, log) = pipeline.process(&profile).unwrap();

    assert_eq!(loaded.source.row_count, 14);
    let metadata = loaded.metadata.expect("sidecar parsed");
    assert_eq!(metadata.title, "Fjord transect 3");

    // Raw values survive into L1A with flag columns alongside.
    assert!(levels.l1a.contains("Error Standard_FLAG"));
    assert!(levels
        .l1a
        .contains("[CH4] dissolved with water vapour (ppm)_RSD"));

    // Segmentation labeled both legs and both got gridded.
    assert!(levels.l2.contains("is_downcast"));
    let casts: Vec<CastDirection> = levels.l3.iter().map(|g| g.cast).collect();
    assert!(casts.contains(&CastDirection::Downcast));
    assert!(casts.contains(&CastDirection::Upcast));

    assert!(!log.is_empty());
}

#[test]
fn test_exported_artifacts_land_on_disk() {
    let dir = TempDir::new().unwrap();
    let data = write_profile(&dir, "dive01");

    let pipeline = Pipeline::default();
    let (_, levels, _) = pipeline.process(&Profile::new(data, None)).unwrap();

    let out = dir.path().join("out");
    let exporter = Exporter::new(&out).unwrap();
    let written = exporter.export_levels(&levels).unwrap();

    // Three tabular levels plus one JSON per gridded leg.
    assert_eq!(written.len(), 3 + levels.l3.len());
    for path in &written {
        assert!(path.exists(), "missing artifact {path:?}");
    }
    assert!(out.join("dive01_L1A.tsv").exists());
    assert!(out.join("dive01_downcast_L3.json").exists());
}

#[test]
fn test_missing_sidecar_is_not_fatal() {
    let dir = TempDir::new().unwrap();
    let data = write_profile(&dir, "dive01");
    let bogus = dir.path().join("nope.json");

    let pipeline = Pipeline::default();
    let (loaded, _, log) = pipeline.process(&Profile::new(data, Some(bogus))).unwrap();

    assert!(loaded.metadata.is_none());
    assert!(log.warnings().count() > 0);
}

#[test]
fn test_batch_continues_past_failing_profile() {
    let dir = TempDir::new().unwrap();
    let good = write_profile(&dir, "dive01");
    let missing = dir.path().join("dive02.txt");

    let pipeline = Pipeline::default();
    let batch = pipeline.process_batch(&[
        Profile::new(good, None),
        Profile::new(missing, None),
    ]);

    assert_eq!(batch.completed.len(), 1);
    assert_eq!(batch.failed.len(), 1);
    assert_eq!(batch.failed[0].0, "dive02");
}

#[test]
fn test_combined_dataset_across_profiles() {
    let dir = TempDir::new().unwrap();
    let a = write_profile(&dir, "dive01");
    let b = write_profile(&dir, "dive02");

    let pipeline = Pipeline::default();
    let batch = pipeline.process_batch(&[Profile::new(a, None), Profile::new(b, None)]);
    assert_eq!(batch.failed.len(), 0);

    let downcasts = batch.grids_for(CastDirection::Downcast);
    assert_eq!(downcasts.len(), 2);

    let mut log = subocean::ProcessingLog::new();
    let combined = combine(&downcasts, &mut log).unwrap();
    assert_eq!(combined.profiles, vec!["dive01", "dive02"]);
    assert_eq!(combined.cast, CastDirection::Downcast);

    // Identical deployments share the axis, so no padding NaN rows.
    for rows in combined.channels.values() {
        assert_eq!(rows.len(), 2);
        for row in rows {
            assert_eq!(row.len(), combined.depths.len());
        }
    }
}
