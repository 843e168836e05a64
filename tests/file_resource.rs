// tests/file_resource.rs

//! File resource tests: configured resources, filters and namespaces.

use plugin_resolver::resource::nearest_namespace;
use plugin_resolver::{Configuration, FileResource};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for file in [
        "src/main/java/org/example/App.java",
        "src/main/java/org/example/util/Strings.java",
        "src/main/java/org/example/generated/Model.java",
        "src/main/resources/app.properties",
        "target/classes/org/example/App.class",
    ] {
        let path = dir.path().join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "").unwrap();
    }
    dir
}

fn relative(root: &Path, files: Vec<PathBuf>) -> Vec<String> {
    let mut names: Vec<String> = files
        .iter()
        .map(|f| {
            f.strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    names.sort();
    names
}

#[test]
fn test_configured_resource() {
    let dir = project();
    let config = Configuration::from_toml(&format!(
        r#"
        [[resources]]
        path = "{}"
        extensions = ["java"]
        includes = ["src/main/java/org/**"]
        excludes = ["**/generated/**"]
        "#,
        dir.path().display()
    ))
    .unwrap();

    let resource = config.resources()[0].to_resource();
    assert_eq!(
        relative(dir.path(), resource.files().unwrap()),
        vec![
            "src/main/java/org/example/App.java",
            "src/main/java/org/example/util/Strings.java",
        ]
    );
}

#[test]
fn test_excluded_directory_is_not_entered() {
    let dir = project();
    let files = FileResource::new(dir.path())
        .with_excludes(vec!["target".to_string(), "src/main/java".to_string()])
        .files()
        .unwrap();

    assert_eq!(
        relative(dir.path(), files),
        vec!["src/main/resources/app.properties"]
    );
}

#[test]
fn test_include_and_exclude_combined() {
    let dir = project();
    let files = FileResource::new(dir.path())
        .with_includes(vec!["src/**".to_string()])
        .with_excludes(vec!["src/main/java/org/example/util".to_string()])
        .with_extensions(vec!["java".to_string(), "properties".to_string()])
        .files()
        .unwrap();

    assert_eq!(
        relative(dir.path(), files),
        vec![
            "src/main/java/org/example/App.java",
            "src/main/java/org/example/generated/Model.java",
            "src/main/resources/app.properties",
        ]
    );
}

#[test]
fn test_relative_root_is_resolved() {
    let dir = project();
    let nested = dir.path().join("src/main/java/org/example/../example/util");
    let files = FileResource::new(nested).files().unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("Strings.java"));
}

#[test]
fn test_missing_root_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let files = FileResource::new(dir.path().join("missing")).files().unwrap();
    assert!(files.is_empty());
}

#[test]
fn test_namespace_of_selected_file() {
    let path = Path::new("org/example/util/Strings.java");
    assert_eq!(nearest_namespace(path, ".").unwrap(), "org.example.util");
}
