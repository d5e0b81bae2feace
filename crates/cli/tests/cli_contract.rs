use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

const INPUT: &str = r##"{
  "textItems": [
    { "id": "t1", "text": "Hello", "xNorm": 0.1, "yNormTop": 0.1, "index": 0 }
  ],
  "shapeItems": [
    {
      "type": "diamond",
      "xNorm": 0.2, "yNormTop": 0.3, "widthNorm": 0.2, "heightNorm": 0.1,
      "fillColor": "#ff0000",
      "index": 1
    }
  ],
  "formFields": [
    {
      "type": "checkbox", "fieldName": "agree",
      "xNorm": 0.1, "yNormTop": 0.8, "widthNorm": 0.03, "heightNorm": 0.02,
      "index": 1
    }
  ]
}"##;

fn write_input(dir: &Path) -> PathBuf {
    let path = dir.join("input.json");
    fs::write(&path, INPUT).expect("input should be written");
    path
}

fn save(dir: &Path) -> PathBuf {
    let saved = dir.join("doc.json");
    cargo_bin_cmd!("pagesmith")
        .arg("save")
        .arg(write_input(dir))
        .arg("--output")
        .arg(&saved)
        .assert()
        .success()
        .stdout(predicate::str::is_match("^[0-9a-f]{64}\n$").expect("valid regex"));
    saved
}

#[test]
fn saved_document_verifies() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let saved = save(temp.path());

    let output = cargo_bin_cmd!("pagesmith")
        .arg("verify")
        .arg(&saved)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: Value = serde_json::from_slice(&output).expect("stdout should contain valid json");
    assert_eq!(report["ok"], true);
    assert_eq!(report["okRaw"], true);
    assert_eq!(report["okCanon"], true);
    assert_eq!(report["failure"], Value::Null);
}

#[test]
fn hand_edited_document_fails_verification() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let saved = save(temp.path());
    let text = fs::read_to_string(&saved).expect("saved file should be readable");
    fs::write(&saved, text.replace("Hello", "Hellp")).expect("edit should be written");

    cargo_bin_cmd!("pagesmith")
        .arg("verify")
        .arg(&saved)
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"ok\": false"))
        .stderr(predicate::str::contains("verification failed: raw-mismatch"));
}

#[test]
fn export_rejects_tampered_document_unless_allowed() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let saved = save(temp.path());
    let text = fs::read_to_string(&saved).expect("saved file should be readable");
    fs::write(&saved, text.replace("Hello", "Hellp")).expect("edit should be written");
    let pdf = temp.path().join("out.pdf");

    cargo_bin_cmd!("pagesmith")
        .arg("export")
        .arg(&saved)
        .arg("--output")
        .arg(&pdf)
        .assert()
        .failure()
        .stderr(predicate::str::contains("checksum verification failed"));
    assert!(!pdf.exists());

    cargo_bin_cmd!("pagesmith")
        .arg("export")
        .arg(&saved)
        .arg("--output")
        .arg(&pdf)
        .arg("--allow-mismatch")
        .assert()
        .success();
    assert!(pdf.exists());
}

#[test]
fn exported_manifest_lists_every_element() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let saved = save(temp.path());
    let pdf = temp.path().join("out.pdf");

    cargo_bin_cmd!("pagesmith")
        .arg("export")
        .arg(&saved)
        .arg("--output")
        .arg(&pdf)
        .arg("--title")
        .arg("Contract")
        .assert()
        .success()
        .stdout(predicate::str::contains("out.pdf"));

    let bytes = fs::read(&pdf).expect("pdf should be written");
    assert!(bytes.starts_with(b"%PDF-"));

    let output = cargo_bin_cmd!("pagesmith")
        .arg("manifest")
        .arg(&pdf)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let manifest: Value =
        serde_json::from_slice(&output).expect("stdout should contain valid json");
    assert_eq!(manifest["pageSize"]["width"], 595.0);
    assert_eq!(manifest["pages"].as_array().map(Vec::len), Some(2));
    assert_eq!(manifest["pages"][0]["texts"][0]["text"], "Hello");
    assert_eq!(manifest["pages"][1]["shapes"][0]["type"], "diamond");
    assert_eq!(manifest["pages"][1]["formFields"][0]["fieldName"], "agree");
}

#[test]
fn save_accepts_exported_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let saved = save(temp.path());
    let pdf = temp.path().join("out.pdf");
    cargo_bin_cmd!("pagesmith").arg("export").arg(&saved).arg("-o").arg(&pdf).assert().success();

    let resaved = temp.path().join("again.json");
    cargo_bin_cmd!("pagesmith")
        .arg("save")
        .arg(&pdf)
        .arg("--output")
        .arg(&resaved)
        .assert()
        .success();

    let value: Value = serde_json::from_str(
        &fs::read_to_string(&resaved).expect("resaved file should be readable"),
    )
    .expect("resaved file should be json");
    assert_eq!(value["textItems"][0]["id"], "t1");
    assert_eq!(value["pages"].as_array().map(Vec::len), Some(2));
}

#[test]
fn page_size_comes_from_config_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let saved = save(temp.path());
    let config = temp.path().join("config.json");
    fs::write(&config, r#"{ "page_size": { "width": 612.0, "height": 792.0 } }"#)
        .expect("config should be written");
    let pdf = temp.path().join("letter.pdf");

    cargo_bin_cmd!("pagesmith")
        .arg("--config")
        .arg(&config)
        .arg("export")
        .arg(&saved)
        .arg("-o")
        .arg(&pdf)
        .assert()
        .success();

    let output = cargo_bin_cmd!("pagesmith")
        .arg("manifest")
        .arg(&pdf)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let manifest: Value = serde_json::from_slice(&output).expect("manifest json");
    assert_eq!(manifest["pageSize"]["width"], 612.0);
}

#[test]
fn manifest_fails_for_missing_file() {
    cargo_bin_cmd!("pagesmith")
        .arg("manifest")
        .arg("does-not-exist.pdf")
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn version_prints_package_version() {
    cargo_bin_cmd!("pagesmith")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
