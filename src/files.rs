//! File helpers shared by the analyzer and dashboard tools.
//!
//! Strict variants return `anyhow::Result` with the path in the error context.
//! The `safe_*` loaders log a warning and hand back a fallback instead.

use anyhow::{Context, Result};
use globset::GlobBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files whose presence marks a project root, checked in this order per directory.
pub const DEFAULT_ROOT_MARKERS: [&str; 6] = [
    ".git",
    "Cargo.toml",
    "pyproject.toml",
    "setup.py",
    "package.json",
    "requirements.txt",
];

#[derive(Debug, Clone, Copy)]
pub struct JsonWriteOptions {
    /// Spaces per nesting level.
    pub indent: usize,
    /// Create missing parent directories before writing.
    pub ensure_dir: bool,
}

impl Default for JsonWriteOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            ensure_dir: true,
        }
    }
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON file: {}", path.display()))
}

/// Load JSON, falling back to `default` if the file is missing or malformed.
pub fn safe_json_load<T: DeserializeOwned>(path: &Path, default: T) -> T {
    match load_json(path) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(path = %path.display(), "failed to load JSON: {:#}", e);
            default
        }
    }
}

/// Pretty-print `data` to `path`. Non-ASCII text is written as-is.
pub fn safe_json_save<T: Serialize + ?Sized>(data: &T, path: &Path, opts: JsonWriteOptions) -> Result<()> {
    if opts.ensure_dir {
        create_parent(path)?;
    }

    let indent = vec![b' '; opts.indent];
    let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    data.serialize(&mut ser)
        .with_context(|| format!("Failed to serialize JSON for {}", path.display()))?;

    std::fs::write(path, buf).with_context(|| format!("Failed to write JSON file: {}", path.display()))
}

/// Make sure `path` is a directory.
///
/// Returns `Ok(false)` if something other than a directory sits at `path`, or if
/// it is missing and `create_if_missing` is off.
pub fn ensure_directory(path: &Path, create_if_missing: bool) -> Result<bool> {
    if path.exists() {
        if path.is_dir() {
            return Ok(true);
        }
        tracing::warn!(path = %path.display(), "exists but is not a directory");
        return Ok(false);
    }

    if !create_if_missing {
        return Ok(false);
    }

    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    Ok(true)
}

/// Glob for entries under `dir`.
///
/// `*` never crosses a path separator. With `recursive`, the pattern may match at
/// any depth, otherwise it is anchored at `dir`. Results are sorted; a missing
/// or non-directory `dir` gives an empty list.
pub fn find_files_by_pattern(dir: &Path, pattern: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let anchored = pattern.trim_start_matches("./");
    let full_pattern = if recursive {
        format!("**/{}", anchored)
    } else {
        anchored.to_string()
    };
    let matcher = GlobBuilder::new(&full_pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("Invalid file pattern: {}", pattern))?
        .compile_matcher();

    let mut walker = WalkDir::new(dir).min_depth(1).follow_links(false);
    // `**` reaches any depth, so only literal segments bound the walk
    if !recursive && !anchored.contains("**") {
        walker = walker.max_depth(anchored.split('/').filter(|s| !s.is_empty()).count().max(1));
    }

    let mut found = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let Ok(rel) = entry.path().strip_prefix(dir) else {
            continue;
        };
        if matcher.is_match(rel) {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

pub fn get_file_size(path: &Path) -> Option<u64> {
    std::fs::metadata(path).ok().map(|m| m.len())
}

/// Read text as UTF-8, falling back to Latin-1 when the bytes aren't valid UTF-8.
pub fn read_text_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read text file: {}", path.display()))?;
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            tracing::debug!(path = %path.display(), "not UTF-8, decoding as Latin-1");
            Ok(e.into_bytes().into_iter().map(char::from).collect())
        }
    }
}

pub fn write_text_file(content: &str, path: &Path, ensure_dir: bool) -> Result<()> {
    if ensure_dir {
        create_parent(path)?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write text file: {}", path.display()))
}

/// Copy a file, creating the destination's parents. Permissions carry over.
pub fn copy_file(source: &Path, destination: &Path, overwrite: bool) -> Result<()> {
    if !source.exists() {
        anyhow::bail!("Source file {} does not exist", source.display());
    }
    if destination.exists() && !overwrite {
        anyhow::bail!("Destination {} exists and overwrite is off", destination.display());
    }
    create_parent(destination)?;
    std::fs::copy(source, destination).with_context(|| {
        format!("Failed to copy {} to {}", source.display(), destination.display())
    })?;
    Ok(())
}

/// Walk up from `start` to the first directory holding any of `markers`.
/// Relative starts are resolved against the current directory first.
pub fn get_project_root(start: &Path, markers: &[&str]) -> Option<PathBuf> {
    let start = match start.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!(path = %start.display(), error = %e, "cannot resolve start directory");
            return None;
        }
    };
    start
        .ancestors()
        .find(|dir| markers.iter().any(|m| dir.join(m).exists()))
        .map(Path::to_path_buf)
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_safe_json_load_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let v: Value = safe_json_load(&missing, json!({"fallback": true}));
        assert_eq!(v, json!({"fallback": true}));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{").unwrap();
        let v: Vec<u32> = safe_json_load(&broken, vec![]);
        assert!(v.is_empty());
    }

    #[test]
    fn test_json_save_creates_dirs_and_indents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.json");
        safe_json_save(&json!({"name": "caf\u{e9}"}), &path, JsonWriteOptions::default()).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\n  \"name\": \"caf\u{e9}\"\n}");

        let four = dir.path().join("four.json");
        let opts = JsonWriteOptions { indent: 4, ensure_dir: false };
        safe_json_save(&json!({"a": 1}), &four, opts).unwrap();
        assert_eq!(std::fs::read_to_string(&four).unwrap(), "{\n    \"a\": 1\n}");
    }

    #[test]
    fn test_json_save_without_ensure_dir_fails_on_missing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope/out.json");
        let opts = JsonWriteOptions { indent: 2, ensure_dir: false };
        assert!(safe_json_save(&json!({}), &path, opts).is_err());
    }

    #[test]
    fn test_ensure_directory_cases() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ensure_directory(dir.path(), false).unwrap());

        let target = dir.path().join("a/b");
        assert!(!ensure_directory(&target, false).unwrap());
        assert!(ensure_directory(&target, true).unwrap());
        assert!(target.is_dir());

        let file = dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(!ensure_directory(&file, true).unwrap());
    }

    #[test]
    fn test_find_files_recursive_and_flat() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub/deep")).unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("sub/c.json"), "{}").unwrap();
        std::fs::write(dir.path().join("sub/deep/d.json"), "{}").unwrap();

        let flat = find_files_by_pattern(dir.path(), "*.json", false).unwrap();
        assert_eq!(flat, vec![dir.path().join("a.json")]);

        let all = find_files_by_pattern(dir.path(), "*.json", true).unwrap();
        assert_eq!(
            all,
            vec![
                dir.path().join("a.json"),
                dir.path().join("sub/c.json"),
                dir.path().join("sub/deep/d.json"),
            ]
        );

        let nested = find_files_by_pattern(dir.path(), "sub/*.json", false).unwrap();
        assert_eq!(nested, vec![dir.path().join("sub/c.json")]);
    }

    #[test]
    fn test_find_files_double_star_without_recursive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub/deep")).unwrap();
        std::fs::write(dir.path().join("sub/c.json"), "{}").unwrap();
        std::fs::write(dir.path().join("sub/deep/d.json"), "{}").unwrap();

        let found = find_files_by_pattern(dir.path(), "**/*.json", false).unwrap();
        assert_eq!(
            found,
            vec![dir.path().join("sub/c.json"), dir.path().join("sub/deep/d.json")]
        );
    }

    #[test]
    fn test_find_files_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_files_by_pattern(&dir.path().join("ghost"), "*", true).unwrap().is_empty());
    }

    #[test]
    fn test_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("five.txt");
        std::fs::write(&path, "12345").unwrap();
        assert_eq!(get_file_size(&path), Some(5));
        assert_eq!(get_file_size(&dir.path().join("missing")), None);
    }

    #[test]
    fn test_read_text_latin1_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin.txt");
        // "café" in Latin-1
        std::fs::write(&path, [b'c', b'a', b'f', 0xE9]).unwrap();
        assert_eq!(read_text_file(&path).unwrap(), "caf\u{e9}");
        assert!(read_text_file(&dir.path().join("missing.txt")).is_err());
    }

    #[test]
    fn test_write_text_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x/y/z.txt");
        write_text_file("hello", &path, true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn test_copy_respects_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("out/dst.txt");
        std::fs::write(&src, "one").unwrap();

        copy_file(&src, &dst, false).unwrap();
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "one");

        std::fs::write(&src, "two").unwrap();
        assert!(copy_file(&src, &dst, false).is_err());
        copy_file(&src, &dst, true).unwrap();
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "two");

        assert!(copy_file(&dir.path().join("ghost"), &dst, true).is_err());
    }

    #[test]
    fn test_project_root_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        let inner = dir.path().join("src/components");
        std::fs::create_dir_all(&inner).unwrap();
        assert_eq!(
            get_project_root(&inner, &DEFAULT_ROOT_MARKERS),
            Some(dir.path().canonicalize().unwrap())
        );
        assert_eq!(get_project_root(&inner, &["no-such-marker-file"]), None);
    }

    #[test]
    fn test_project_root_from_relative_start() {
        // cargo runs tests from the package root, which holds Cargo.toml and src/
        let expected = Path::new(env!("CARGO_MANIFEST_DIR")).canonicalize().unwrap();
        assert_eq!(get_project_root(Path::new("src"), &["Cargo.toml"]), Some(expected));
        assert_eq!(get_project_root(Path::new("no/such/dir"), &["Cargo.toml"]), None);
    }
}
