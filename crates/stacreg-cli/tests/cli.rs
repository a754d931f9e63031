//! End-to-end CLI tests for the `stacreg` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn stacreg() -> Command {
    Command::cargo_bin("stacreg").expect("binary builds")
}

#[test]
fn formats_lists_registry() {
    stacreg()
        .arg("formats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Color Map Formats"))
        .stdout(predicate::str::contains("CPT"))
        .stdout(predicate::str::contains("pgstac"))
        .stdout(predicate::str::contains("GeoParquet"));
}

#[test]
fn colormap_converts_cpt_to_geocss() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("ramp.cpt");
    let output = dir.path().join("ramp.geocss");
    std::fs::write(&input, "0 0 0 0 100 255 255 255\nN 10 10 10\n").unwrap();

    stacreg()
        .args(["colormap", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--title")
        .arg("Test Ramp")
        .assert()
        .success()
        .stdout(predicate::str::contains("Converted 2 entries"));

    let css = std::fs::read_to_string(&output).unwrap();
    assert!(css.contains("* @title Test Ramp"));
    assert!(css.contains("color-map-entry(#000000, 0)"));
    assert!(css.contains("color-map-entry(#ffffff, 100)"));
}

#[test]
fn colormap_reports_unknown_format() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("ramp.cpt");
    std::fs::write(&input, "0 black 100 white\n").unwrap();

    stacreg()
        .args(["colormap", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(dir.path().join("style.mapnik"))
        .args(["--output-format", "Mapnik"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Format 'Mapnik' not found"))
        .stderr(predicate::str::contains("stacreg formats"));
}

#[test]
fn quicklook_renders_geotiff() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("scene.tif");
    let target = dir.path().join("ql.tif");

    let pixels: Vec<u8> = (0..64u32 * 32).map(|i| (i % 251) as u8).collect();
    let image = stacreg_raster::writer::GeoTiffImage {
        width: 64,
        height: 32,
        pixels: stacreg_raster::writer::Pixels::Gray(pixels),
        geotransform: Some([10.0, 0.5, 0.0, 50.0, 0.0, -0.5]),
        epsg: Some(4326),
        nodata: None,
    };
    stacreg_raster::writer::write_geotiff(&source, &image).unwrap();

    stacreg()
        .args(["quicklook", "--max-size", "16", "--input"])
        .arg(&source)
        .arg("--output")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("Quicklook 16x8 (grayscale)"));

    let summary = stacreg_raster::inspect(&target).unwrap();
    assert_eq!((summary.width, summary.height), (16, 8));
    assert_eq!(summary.epsg, Some(4326));
}

#[test]
fn inspect_reports_raster_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("scene.tif");

    let image = stacreg_raster::writer::GeoTiffImage {
        width: 8,
        height: 4,
        pixels: stacreg_raster::writer::Pixels::Gray(vec![7; 32]),
        geotransform: Some([100.0, 2.0, 0.0, 200.0, 0.0, -2.0]),
        epsg: Some(32632),
        nodata: Some(0.0),
    };
    stacreg_raster::writer::write_geotiff(&source, &image).unwrap();

    stacreg()
        .arg("inspect")
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::contains("Size: 8 x 4 (1 band)"))
        .stdout(predicate::str::contains("CRS: EPSG:32632"))
        .stdout(predicate::str::contains("NoData: 0"));
}

#[test]
fn export_writes_geoparquet_from_ndjson() {
    use chrono::TimeZone;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("items.ndjson");
    let output = dir.path().join("items.parquet");

    let item = stacreg_core::stac::ItemBuilder::new("item-1")
        .collection("c1")
        .datetime(chrono::Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap())
        .bbox([0.0, 0.0, 1.0, 1.0])
        .build()
        .unwrap();
    stacreg_core::ndjson::write_items_to_path(&input, &[item]).unwrap();

    stacreg()
        .args(["export", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 row(s)"));

    assert!(output.exists());
}

#[test]
fn register_requires_dsn() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("items.ndjson");
    std::fs::write(&input, "").unwrap();

    stacreg()
        .args(["register", "--input"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no DSN given"));
}
