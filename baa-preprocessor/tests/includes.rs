//! File-backed behaviour: include resolution, pragma-once, circular
//! includes, and encoding detection.

use std::{fs, path::Path};

use baa_preprocessor::{preprocess, Preprocessor, PreprocessorConfig, SourceInput};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn quoted_include_resolves_relative_to_current_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "ثوابت.ب", "#تعريف أقصى 100\n");
    let main = write(dir.path(), "رئيسي.ب", "#تضمين \"ثوابت.ب\"\nأقصى\n");

    let output = preprocess(SourceInput::File(main), vec![]).unwrap();
    assert!(output.contains("100"));
}

#[test]
fn angle_include_searches_the_include_paths() {
    let dir = TempDir::new().unwrap();
    let lib_dir = dir.path().join("مكتبة");
    fs::create_dir(&lib_dir).unwrap();
    write(&lib_dir, "عام.ب", "#تعريف إصدار 7\n");
    let main = write(dir.path(), "رئيسي.ب", "#تضمين <عام.ب>\nإصدار\n");

    let output = preprocess(SourceInput::File(main), vec![lib_dir]).unwrap();
    assert!(output.contains('7'));
}

#[test]
fn missing_include_is_reported() {
    let dir = TempDir::new().unwrap();
    let main = write(dir.path(), "رئيسي.ب", "#تضمين <غائب.ب>\n");

    let error = preprocess(SourceInput::File(main), vec![]).unwrap_err();
    assert!(error.contains("غائب.ب"));
}

#[test]
fn pragma_once_includes_content_exactly_once() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "مرة.ب",
        "#براغما مرة_واحدة\nمحتوى_فريد\n",
    );
    let main = write(
        dir.path(),
        "رئيسي.ب",
        "#تضمين \"مرة.ب\"\n#تضمين \"مرة.ب\"\n",
    );

    let output = preprocess(SourceInput::File(main), vec![]).unwrap();
    assert_eq!(output.matches("محتوى_فريد").count(), 1);
}

#[test]
fn circular_include_is_reported_once() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "أ.ب", "#تضمين \"ب.ب\"\n");
    write(dir.path(), "ب.ب", "#تضمين \"أ.ب\"\n");
    let main = dir.path().join("أ.ب");

    let mut preprocessor = Preprocessor::new(vec![], PreprocessorConfig::default());
    preprocessor.run(SourceInput::File(main));
    let circular: Vec<_> = preprocessor
        .diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.message.contains("تضمين دائري"))
        .collect();
    assert_eq!(circular.len(), 1);
    // The diagnostic points at the include site inside the second file.
    assert!(circular[0].message.contains("ب.ب"));
}

#[test]
fn nested_includes_report_inner_file_names() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "داخلي.ب", "#غير_معروف\n");
    let main = write(dir.path(), "رئيسي.ب", "#تضمين \"داخلي.ب\"\n");

    let mut preprocessor = Preprocessor::new(vec![], PreprocessorConfig::default());
    preprocessor.run(SourceInput::File(main));
    let diagnostic = preprocessor.diagnostics.iter().next().unwrap();
    assert!(diagnostic.message.contains("داخلي.ب"));
    assert_eq!(diagnostic.location.line, 1);
}

#[test]
fn utf16le_files_are_decoded() {
    let dir = TempDir::new().unwrap();
    let mut bytes = vec![0xFF, 0xFE];
    for unit in "#تعريف س 5\nس\n".encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let path = dir.path().join("عريض.ب");
    fs::write(&path, bytes).unwrap();

    let output = preprocess(SourceInput::File(path), vec![]).unwrap();
    assert!(output.contains('5'));
}

#[test]
fn utf8_bom_is_accepted() {
    let dir = TempDir::new().unwrap();
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice("نص عادي\n".as_bytes());
    let path = dir.path().join("بوم.ب");
    fs::write(&path, bytes).unwrap();

    let output = preprocess(SourceInput::File(path), vec![]).unwrap();
    assert_eq!(output, "نص عادي\n");
}
