//! Local directory listing for the browse sub-protocol.
//!
//! Listings are rooted: paths outside the configured browse root (or inside
//! the OS-critical denylist) are refused before touching the filesystem.

use std::path::Path;

use warden_core::modules::safety;
use warden_types::models::{EntryKind, FileEntry};

/// List a directory for the owner's file browser. Folders first, then
/// files, both name-sorted; a `..` entry leads back up while still inside
/// the root.
pub fn list_directory(path: &str, browse_root: &str) -> Result<Vec<FileEntry>, String> {
    safety::validate_browse_path(path, browse_root)?;

    let dir = Path::new(path);
    if !dir.exists() {
        return Err("Path does not exist".to_string());
    }
    if !dir.is_dir() {
        return Err("Path is not a directory".to_string());
    }

    let mut items = Vec::new();

    if let Some(parent) = dir.parent() {
        let parent_str = parent.to_string_lossy();
        if safety::validate_browse_path(&parent_str, browse_root).is_ok() {
            items.push(FileEntry {
                name: "..".to_string(),
                path: parent_str.into_owned(),
                kind: EntryKind::Folder,
                size: None,
            });
        }
    }

    let entries = std::fs::read_dir(dir).map_err(|e| format!("Error listing directory: {}", e))?;
    let mut listed = Vec::new();
    for entry in entries {
        // Unreadable entries are skipped, not fatal
        let Ok(entry) = entry else { continue };
        let entry_path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        let Ok(file_type) = entry.file_type() else { continue };
        let kind = if file_type.is_dir() { EntryKind::Folder } else { EntryKind::File };
        let size = if kind == EntryKind::File {
            entry.metadata().ok().map(|m| m.len())
        } else {
            None
        };

        listed.push(FileEntry {
            name,
            path: entry_path.to_string_lossy().into_owned(),
            kind,
            size,
        });
    }

    listed.sort_by(|a, b| {
        (a.kind != EntryKind::Folder, a.name.to_lowercase())
            .cmp(&(b.kind != EntryKind::Folder, b.name.to_lowercase()))
    });
    items.extend(listed);

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn setup() -> (tempfile::TempDir, String, String) {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("data");
        let docs = root.join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(root.join("b.txt"), b"hello").unwrap();
        fs::write(root.join("A.txt"), b"hi").unwrap();
        let root_str = root.to_string_lossy().into_owned();
        let docs_str = docs.to_string_lossy().into_owned();
        (tmp, root_str, docs_str)
    }

    #[test]
    fn test_listing_folders_first_sorted() {
        let (_tmp, root, _docs) = setup();
        let items = list_directory(&root, &root).unwrap();

        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        // Root listing has no ".." (parent is outside the root)
        assert_eq!(names, vec!["docs", "A.txt", "b.txt"]);
        assert_eq!(items[0].kind, EntryKind::Folder);
        assert_eq!(items[1].size, Some(2));
    }

    #[test]
    fn test_subdirectory_gets_parent_entry() {
        let (_tmp, root, docs) = setup();
        let items = list_directory(&docs, &root).unwrap();
        assert_eq!(items[0].name, "..");
        assert_eq!(items[0].path, root);
    }

    #[test]
    fn test_outside_root_rejected() {
        let (_tmp, root, _docs) = setup();
        assert!(list_directory("/somewhere/else", &root).is_err());
    }

    #[test]
    fn test_blocked_path_rejected() {
        let err = list_directory("/etc", "/").unwrap_err();
        assert!(err.contains("blocked"));
    }

    #[test]
    fn test_missing_directory_errors() {
        let (_tmp, root, _docs) = setup();
        let missing = format!("{}/nope", root);
        assert_eq!(list_directory(&missing, &root).unwrap_err(), "Path does not exist");
    }
}
