use super::metadata_extractor::{find_reference, ExtractError, MetadataExtractor, Reference};
use super::widget_source::RegistrationKeys;
use crate::config::Settings;
use crate::domain::MetadataMap;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SHARED: &str = r#"
examples:
  demoData:
    a: 1
    b: x
schemas:
  demoSchema:
    type: object
    required: [title, count]
    properties:
      title: { type: string }
      count: { type: integer }
"#;

fn workspace() -> (TempDir, Settings) {
    let dir = TempDir::new().unwrap();
    let widgets = dir.path().join("widgets");
    fs::create_dir_all(&widgets).unwrap();
    fs::write(widgets.join("shared.yaml"), SHARED).unwrap();

    let mut settings = Settings::default();
    settings.widgets.dir = widgets.clone();
    settings.widgets.shared = widgets.join("shared.yaml");
    settings.extractor.output = dir.path().join("dist").join("widget-metadata.json");
    (dir, settings)
}

fn write_widget(settings: &Settings, file: &str, content: &str) {
    fs::write(settings.widgets.dir.join(file), content).unwrap();
}

fn read_output(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_example_reference_is_copied_verbatim() {
    let (_dir, settings) = workspace();
    write_widget(
        &settings,
        "widgetName.html",
        "---\ndefine_widget:\n  schema: demoSchema\n  exampleOutput: demoData\n---\n<p>{{ a }}</p>\n",
    );

    let map = MetadataExtractor::new(&settings).run().unwrap();

    assert_eq!(map.get("widgetName").unwrap().example_output, json!({ "a": 1, "b": "x" }));
    assert!(map.get("demoData").is_none());
    assert_eq!(
        read_output(&settings.extractor.output),
        json!({ "widgetName": { "name": "widgetName", "exampleOutput": { "a": 1, "b": "x" } } })
    );
}

#[test]
fn test_source_without_marker_is_skipped() {
    let (_dir, settings) = workspace();
    write_widget(&settings, "partial.html", "<footer>{{ year }}</footer>\n");

    let map = MetadataExtractor::new(&settings).run().unwrap();

    assert!(map.is_empty());
    assert_eq!(read_output(&settings.extractor.output), json!({}));
}

#[test]
fn test_schema_reference_is_generated() {
    let (_dir, settings) = workspace();
    write_widget(
        &settings,
        "card.html",
        "---\ndefine_widget:\n  schema: demoSchema\n---\n<h1>{{ title }}</h1>\n",
    );

    let map = MetadataExtractor::new(&settings).extract().unwrap();
    let example = map.example_for("card").unwrap();

    assert!(example["title"].is_string());
    let count = example["count"].as_i64().unwrap();
    assert!((1..=100).contains(&count));
}

#[test]
fn test_unresolved_reference_is_omitted() {
    let (_dir, settings) = workspace();
    write_widget(
        &settings,
        "ghost.html",
        "---\ndefine_widget:\n  exampleOutput: missingData\n---\n",
    );
    write_widget(
        &settings,
        "good.html",
        "---\ndefine_widget:\n  exampleOutput: demoData\n---\n",
    );

    let map = MetadataExtractor::new(&settings).run().unwrap();

    assert_eq!(map.names().collect::<Vec<_>>(), vec!["good"]);
    let written = MetadataMap::load(&settings.extractor.output).unwrap();
    assert_eq!(written, map);
}

#[test]
fn test_registration_without_references_is_omitted() {
    let (_dir, settings) = workspace();
    write_widget(&settings, "bare.html", "---\ndefine_widget: {}\n---\n<p></p>\n");

    let map = MetadataExtractor::new(&settings).extract().unwrap();
    assert!(map.is_empty());
}

#[test]
fn test_commented_reference_is_ignored() {
    let keys = RegistrationKeys::default();
    let text = "---\ndefine_widget:\n  # exampleOutput: staleData\n  schema: demoSchema\n---\n";
    assert_eq!(
        find_reference(text, &keys),
        Some(Reference::Schema("demoSchema".to_string()))
    );
}

#[test]
fn test_reference_forms() {
    let keys = RegistrationKeys::default();

    let quoted = "define_widget:\n  exampleOutput: \"shared.demoData\"\n";
    assert_eq!(
        find_reference(quoted, &keys),
        Some(Reference::Example("shared.demoData".to_string()))
    );

    let snake = "define_widget:\n  example_output: demoData\n  schema: demoSchema\n";
    assert_eq!(
        find_reference(snake, &keys),
        Some(Reference::Example("demoData".to_string()))
    );

    // `schemaVersion` must not match the `schema` key.
    let partial = "define_widget:\n  schemaVersion: v2\n";
    assert_eq!(find_reference(partial, &keys), None);
}

#[test]
fn test_references_outside_registration_block_are_ignored() {
    let keys = RegistrationKeys::default();
    let text = "---\ntitle: page\nexampleOutput: notBound\ndefine_widget:\n  schema: demoSchema\n---\nexampleOutput: body\n";
    assert_eq!(
        find_reference(text, &keys),
        Some(Reference::Schema("demoSchema".to_string()))
    );
}

#[test]
fn test_output_is_replaced_not_appended() {
    let (_dir, settings) = workspace();
    write_widget(
        &settings,
        "widgetName.html",
        "---\ndefine_widget:\n  exampleOutput: demoData\n---\n",
    );
    let extractor = MetadataExtractor::new(&settings);
    extractor.run().unwrap();
    extractor.run().unwrap();

    let output = read_output(extractor.output());
    assert_eq!(output.as_object().unwrap().len(), 1);
    let leftovers: Vec<_> = fs::read_dir(settings.extractor.output.parent().unwrap())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_failed_write_leaves_target_untouched() {
    let (dir, mut settings) = workspace();
    write_widget(
        &settings,
        "widgetName.html",
        "---\ndefine_widget:\n  exampleOutput: demoData\n---\n",
    );
    // an existing directory where the output file should go makes the rename fail
    let target = dir.path().join("dist").join("widget-metadata.json");
    fs::create_dir_all(&target).unwrap();
    fs::write(target.join("keep.txt"), "previous build").unwrap();
    settings.extractor.output = target.clone();

    let err = MetadataExtractor::new(&settings).run().unwrap_err();

    match err {
        ExtractError::Io { path, .. } => assert_eq!(path, target),
        other => panic!("expected io error, got {:?}", other),
    }
    assert!(target.is_dir());
    assert_eq!(fs::read_to_string(target.join("keep.txt")).unwrap(), "previous build");
    let leftovers: Vec<_> = fs::read_dir(target.parent().unwrap())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}
