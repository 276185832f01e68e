use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use lopdf::{dictionary, Document, Object};
use predicates::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};

const ANNOTATIONS: &str = r##"{
    "1": [{"path": [[1, 2], [3, 4]]}],
    "2": [{"type": "rect", "color": "#e53935", "x": 50, "y": 50, "w": -20, "h": -30}]
}"##;

fn pdf_markup() -> Command {
    let mut cmd = cargo_bin_cmd!("pdf-markup");
    cmd.env_remove("RUST_LOG").env_remove("PDF_MARKUP_DATA_DIR");
    cmd
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("fixture should be written");
    path
}

fn write_pdf(dir: &Path, pages: &[(i64, i64)]) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = pages
        .iter()
        .map(|&(width, height)| {
            let media_box: Vec<Object> = vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(width),
                Object::Integer(height),
            ];
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => media_box,
            })
            .into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(pages.len() as i64),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join("doc.pdf");
    doc.save(&path).expect("fixture pdf should be written");
    path
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).expect("stdout should be utf-8")
}

#[test]
fn share_then_decode_round_trips() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let annotations = write_file(temp.path(), "ann.json", ANNOTATIONS);

    let link = stdout_of(
        pdf_markup()
            .arg("share")
            .arg("--annotations")
            .arg(&annotations)
            .arg("--base-url")
            .arg("https://example.com/viewer.html#page=2"),
    );
    let link = link.trim();
    assert!(link.starts_with("https://example.com/viewer.html#page=2&ann="), "{link}");

    let decoded = stdout_of(pdf_markup().arg("decode").arg(link));
    assert_eq!(
        decoded.trim_end(),
        concat!(
            r##"{"1":[{"type":"pen","color":"#ffcc00","path":[[1.0,2.0],[3.0,4.0]]}],"##,
            r##""2":[{"type":"rect","color":"#e53935","x":50.0,"y":50.0,"w":-20.0,"h":-30.0}]}"##,
        )
    );

    // A bare fragment works too
    let fragment = link.split_once('#').map(|(_, fragment)| fragment).unwrap_or_default();
    let from_fragment = stdout_of(pdf_markup().arg("decode").arg(fragment));
    assert_eq!(from_fragment, decoded);
}

#[test]
fn decode_fails_for_link_without_annotations() {
    for link in ["https://example.com/viewer.html#page=2", "#ann=%%%not-a-payload"] {
        pdf_markup()
            .arg("decode")
            .arg(link)
            .assert()
            .failure()
            .stderr(predicate::str::contains("link carries no annotations"));
    }
}

#[test]
fn import_then_export_uses_data_dir() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let data_dir = temp.path().join("data");
    let annotations = write_file(temp.path(), "ann.json", ANNOTATIONS);

    pdf_markup()
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("import")
        .arg(&annotations)
        .assert()
        .success()
        .stdout(predicate::str::contains("imported 2 strokes"));

    let exported = stdout_of(pdf_markup().arg("--data-dir").arg(&data_dir).arg("export"));
    insta::assert_snapshot!(exported.trim_end(), @r###"
    {
      "1": [
        {
          "type": "pen",
          "color": "#ffcc00",
          "path": [
            [
              1.0,
              2.0
            ],
            [
              3.0,
              4.0
            ]
          ]
        }
      ],
      "2": [
        {
          "type": "rect",
          "color": "#e53935",
          "x": 50.0,
          "y": 50.0,
          "w": -20.0,
          "h": -30.0
        }
      ]
    }
    "###);

    let output = temp.path().join("out").join("export.json");
    pdf_markup()
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("export")
        .arg("--output")
        .arg(&output)
        .assert()
        .success();
    let written = std::fs::read_to_string(&output).expect("export file should exist");
    assert_eq!(written.trim_end(), exported.trim_end());
}

#[test]
fn import_rejects_malformed_file_and_keeps_saved_data() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let annotations = write_file(temp.path(), "ann.json", ANNOTATIONS);
    let broken = write_file(temp.path(), "broken.json", "[1, 2, 3]");

    pdf_markup()
        .arg("--data-dir")
        .arg(temp.path())
        .arg("import")
        .arg(&annotations)
        .assert()
        .success();

    pdf_markup()
        .arg("--data-dir")
        .arg(temp.path())
        .arg("import")
        .arg(&broken)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid annotations file"));

    let exported = stdout_of(pdf_markup().arg("--data-dir").arg(temp.path()).arg("export"));
    let value: Value = serde_json::from_str(&exported).expect("export should be json");
    assert_eq!(value["2"][0]["type"], "rect");
}

#[test]
fn export_without_saved_data_is_empty_object() {
    let temp = tempfile::tempdir().expect("temp dir should be created");

    pdf_markup()
        .arg("--data-dir")
        .arg(temp.path())
        .arg("export")
        .assert()
        .success()
        .stdout(predicate::str::diff("{}\n"));
}

#[test]
fn data_dir_env_override() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let annotations = write_file(temp.path(), "ann.json", ANNOTATIONS);
    let data_dir = temp.path().join("env-data");

    pdf_markup()
        .env("PDF_MARKUP_DATA_DIR", &data_dir)
        .arg("import")
        .arg(&annotations)
        .assert()
        .success();

    assert!(data_dir.join("eplan_ann.json").exists());
}

#[test]
fn config_file_changes_storage_key() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let annotations = write_file(temp.path(), "ann.json", ANNOTATIONS);
    let config = write_file(temp.path(), "config.json", r#"{"storage_key": "team_markup"}"#);

    pdf_markup()
        .arg("--config")
        .arg(&config)
        .arg("--data-dir")
        .arg(temp.path())
        .arg("import")
        .arg(&annotations)
        .assert()
        .success();

    assert!(temp.path().join("team_markup.json").exists());
}

#[test]
fn render_overlay_writes_page_sized_svg() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), &[(612, 792), (200, 100)]);
    let annotations = write_file(temp.path(), "ann.json", ANNOTATIONS);
    let output = temp.path().join("page2.svg");

    pdf_markup()
        .arg("render-overlay")
        .arg(&pdf)
        .arg("--annotations")
        .arg(&annotations)
        .arg("--page")
        .arg("2")
        .arg("--scale")
        .arg("2")
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let svg = std::fs::read_to_string(&output).expect("svg should be written");
    assert!(svg.contains(r#"width="400" height="200""#), "{svg}");
    assert!(svg.contains(r#"<rect x="30" y="20" width="20" height="30""#), "{svg}");
    assert!(!svg.contains("<polyline"));
}

#[test]
fn render_overlay_defaults_output_next_to_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), &[(612, 792)]);
    let annotations = write_file(temp.path(), "ann.json", ANNOTATIONS);

    pdf_markup()
        .arg("render-overlay")
        .arg(&pdf)
        .arg("--annotations")
        .arg(&annotations)
        .assert()
        .success()
        .stdout(predicate::str::contains("doc-page-1-overlay.svg"));

    let svg = std::fs::read_to_string(temp.path().join("doc-page-1-overlay.svg"))
        .expect("svg should be written");
    assert!(svg.contains(r#"<polyline points="1,2 3,4""#), "{svg}");
}

#[test]
fn render_overlay_fails_for_page_out_of_range() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_pdf(temp.path(), &[(612, 792)]);
    let annotations = write_file(temp.path(), "ann.json", ANNOTATIONS);

    pdf_markup()
        .arg("render-overlay")
        .arg(&pdf)
        .arg("--annotations")
        .arg(&annotations)
        .arg("--page")
        .arg("3")
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn render_overlay_fails_for_missing_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let annotations = write_file(temp.path(), "ann.json", ANNOTATIONS);

    pdf_markup()
        .arg("render-overlay")
        .arg(temp.path().join("missing.pdf"))
        .arg("--annotations")
        .arg(&annotations)
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn render_overlay_fails_for_invalid_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let pdf = write_file(temp.path(), "invalid.pdf", "not a pdf");
    let annotations = write_file(temp.path(), "ann.json", ANNOTATIONS);

    pdf_markup()
        .arg("render-overlay")
        .arg(&pdf)
        .arg("--annotations")
        .arg(&annotations)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open PDF"));
}

#[test]
fn version_prints_package_version() {
    pdf_markup()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
