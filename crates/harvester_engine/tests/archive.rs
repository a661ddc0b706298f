use std::fs;
use std::io::Read;
use std::path::Path;

use harvester_engine::{create_archive, list_archive_entries, ArchiveError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn zip_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|index| {
            let mut file = archive.by_index(index).unwrap();
            let mut content = Vec::new();
            file.read_to_end(&mut content).unwrap();
            (file.name().to_string(), content)
        })
        .collect()
}

#[test]
fn archive_holds_exactly_the_source_files() {
    let source = TempDir::new().unwrap();
    write(source.path(), "b/2.pdf", b"two");
    write(source.path(), "a/1.pdf", b"one");
    let out = TempDir::new().unwrap();
    let archive_path = out.path().join("result.zip");

    let summary = create_archive(source.path(), &archive_path).unwrap();

    assert_eq!(summary.entries, vec!["a/1.pdf", "b/2.pdf"]);
    assert_eq!(summary.archive_path, archive_path);
    assert_eq!(
        zip_entries(&fs::read(&archive_path).unwrap()),
        vec![
            ("a/1.pdf".to_string(), b"one".to_vec()),
            ("b/2.pdf".to_string(), b"two".to_vec()),
        ]
    );
}

#[test]
fn identical_inputs_give_identical_archives() {
    let first = TempDir::new().unwrap();
    write(first.path(), "a/1.pdf", b"one");
    write(first.path(), "b/2.pdf", b"two");
    // Same content, created in the opposite order.
    let second = TempDir::new().unwrap();
    write(second.path(), "b/2.pdf", b"two");
    write(second.path(), "a/1.pdf", b"one");

    let out = TempDir::new().unwrap();
    let one = out.path().join("one.zip");
    let two = out.path().join("two.zip");
    let again = out.path().join("again.zip");
    create_archive(first.path(), &one).unwrap();
    create_archive(second.path(), &two).unwrap();
    create_archive(first.path(), &again).unwrap();

    let bytes = fs::read(&one).unwrap();
    assert_eq!(bytes, fs::read(&two).unwrap());
    assert_eq!(bytes, fs::read(&again).unwrap());
}

#[test]
fn entry_order_is_case_sensitive_byte_order() {
    let source = TempDir::new().unwrap();
    write(source.path(), "b.pdf", b"");
    write(source.path(), "B.pdf", b"");
    write(source.path(), "a.pdf", b"");

    let names: Vec<String> = list_archive_entries(source.path())
        .unwrap()
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(names, vec!["B.pdf", "a.pdf", "b.pdf"]);
}

#[test]
fn archive_inside_source_is_not_archived_into_itself() {
    let source = TempDir::new().unwrap();
    write(source.path(), "x.pdf", b"x");
    let archive_path = source.path().join("bundle.zip");
    fs::write(&archive_path, b"stale").unwrap();

    let summary = create_archive(source.path(), &archive_path).unwrap();
    assert_eq!(summary.entries, vec!["x.pdf"]);
}

#[test]
fn missing_source_is_an_error() {
    let temp = TempDir::new().unwrap();
    let err = create_archive(&temp.path().join("nope"), &temp.path().join("out.zip")).unwrap_err();
    assert!(matches!(err, ArchiveError::Io(_)), "{err}");
    assert!(!temp.path().join("out.zip").exists());
}

#[test]
fn file_source_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("plain.txt");
    fs::write(&file, b"x").unwrap();
    let err = create_archive(&file, &temp.path().join("out.zip")).unwrap_err();
    assert!(matches!(err, ArchiveError::NotADirectory(_)), "{err}");
}
