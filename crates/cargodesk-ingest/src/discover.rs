//! Input file discovery.

use std::path::{Path, PathBuf};

use cargodesk_core::manifest::DocumentType;
use glob::{MatchOptions, Pattern};

use crate::{Error, Result};

/// Regular files directly in `dir` whose names match `pattern`, sorted by
/// name. Subdirectories (such as a processed directory nested under the
/// input directory) are never entered.
pub async fn discover(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
  let pattern = file_pattern(pattern)?;
  let mut entries = tokio::fs::read_dir(dir).await.map_err(Error::io(dir))?;
  let mut files = Vec::new();
  while let Some(entry) = entries.next_entry().await.map_err(Error::io(dir))? {
    let file_type = entry.file_type().await.map_err(Error::io(entry.path()))?;
    if !file_type.is_file() {
      continue;
    }
    if name_matches(&pattern, &entry.file_name().to_string_lossy()) {
      files.push(entry.path());
    }
  }
  files.sort();
  Ok(files)
}

/// Move base (HMNDOC) manifests ahead of their revisions, keeping name order
/// within each group.
pub fn home_documents_first(files: &mut [PathBuf]) {
  files.sort_by_key(|path| !DocumentType::is_home_file_name(&file_name(path)));
}

pub(crate) fn file_name(path: &Path) -> String {
  path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default()
}

/// Compile a case-insensitive file-name pattern (`*`, `?`, `[...]`).
pub fn file_pattern(pattern: &str) -> Result<Pattern> {
  Pattern::new(pattern).map_err(|e| {
    Error::Config(config::ConfigError::Message(format!(
      "invalid file pattern {pattern:?}: {e}"
    )))
  })
}

fn name_matches(pattern: &Pattern, name: &str) -> bool {
  pattern.matches_with(name, MatchOptions {
    case_sensitive: false,
    ..MatchOptions::new()
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn matches_name(pattern: &str, name: &str) -> bool {
    name_matches(&file_pattern(pattern).unwrap(), name)
  }

  #[test]
  fn patterns_ignore_case() {
    assert!(matches_name("*.xml", "C1_HMNDOC.xml"));
    assert!(matches_name("*.xml", "C1_HMNDOC.XML"));
    assert!(!matches_name("*.xml", "C1_HMNDOC.xml.part"));
    assert!(matches_name("boe_??.json", "boe_01.json"));
    assert!(!matches_name("boe_??.json", "boe_1.json"));
    assert!(matches_name("*_*DOC*", "C9_AMNDOC_002.xml"));
  }

  #[test]
  fn invalid_pattern_is_a_config_error() {
    assert!(matches!(file_pattern("[*.xml"), Err(Error::Config(_))));
  }

  #[tokio::test]
  async fn discover_rejects_invalid_pattern() {
    let dir = tempfile::tempdir().unwrap();
    let err = discover(dir.path(), "***.json").await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
  }

  #[test]
  fn home_documents_sort_first() {
    let mut files: Vec<PathBuf> =
      ["C1_ADLDOC.xml", "C1_AMNDOC.xml", "C1_HMNDOC.xml", "C2_hmndoc.xml"]
        .into_iter()
        .map(PathBuf::from)
        .collect();
    home_documents_first(&mut files);
    let names: Vec<String> = files.iter().map(|p| file_name(p)).collect();
    assert_eq!(names, ["C1_HMNDOC.xml", "C2_hmndoc.xml", "C1_ADLDOC.xml", "C1_AMNDOC.xml"]);
  }

  #[tokio::test]
  async fn discover_lists_matching_files_only() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["b.json", "a.json", "notes.txt"] {
      std::fs::write(dir.path().join(name), "[]").unwrap();
    }
    std::fs::create_dir(dir.path().join("processed.json")).unwrap();

    let files = discover(dir.path(), "*.json").await.unwrap();
    let names: Vec<String> = files.iter().map(|p| file_name(p)).collect();
    assert_eq!(names, ["a.json", "b.json"]);
  }

  #[tokio::test]
  async fn missing_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = discover(&dir.path().join("nope"), "*").await.unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
  }
}
