//! Ingestion configuration: an optional TOML file overlaid by `CARGODESK_*`
//! environment variables (`__` separates nested keys, e.g.
//! `CARGODESK_MANIFESTS__INPUT_DIR`).

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

pub const DEFAULT_BATCH_SIZE: usize = 10_000;

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
  pub store_path:   PathBuf,
  pub declarations: DirConfig,
  pub manifests:    DirConfig,
  pub header_feed:  FeedConfig,
}

/// Where one kind of input file is picked up and where it goes afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct DirConfig {
  pub input_dir:     PathBuf,
  pub processed_dir: PathBuf,
  pub error_dir:     PathBuf,
  /// File-name wildcard (`*`, `?`), matched case-insensitively.
  pub pattern:       String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
  #[serde(flatten)]
  pub dirs:       DirConfig,
  /// Rows between progress log lines.
  pub batch_size: usize,
}

impl IngestConfig {
  /// Load from `path` (missing file is fine) and the environment.
  pub fn load(path: &Path) -> Result<Self> {
    let mut builder = config::Config::builder().set_default("store_path", "cargodesk.db")?;
    for (section, pattern) in
      [("declarations", "*.json"), ("manifests", "*.xml"), ("header_feed", "*.xml")]
    {
      let base = format!("data/{section}");
      builder = builder
        .set_default(format!("{section}.input_dir"), base.clone())?
        .set_default(format!("{section}.processed_dir"), format!("{base}/processed"))?
        .set_default(format!("{section}.error_dir"), format!("{base}/error"))?
        .set_default(format!("{section}.pattern"), pattern)?;
    }

    let settings = builder
      .set_default("header_feed.batch_size", DEFAULT_BATCH_SIZE as u64)?
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("CARGODESK")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?;

    Ok(settings.try_deserialize()?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_without_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = IngestConfig::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(cfg.store_path, PathBuf::from("cargodesk.db"));
    assert_eq!(cfg.declarations.pattern, "*.json");
    assert_eq!(cfg.manifests.error_dir, PathBuf::from("data/manifests/error"));
    assert_eq!(cfg.header_feed.batch_size, DEFAULT_BATCH_SIZE);
  }

  #[test]
  fn file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cargodesk.toml");
    std::fs::write(
      &path,
      r#"
store_path = "/srv/cargodesk/cargo.db"

[manifests]
input_dir = "/srv/inbox/manifests"
pattern = "*_MAN*.xml"

[header_feed]
batch_size = 500
"#,
    )
    .unwrap();

    let cfg = IngestConfig::load(&path).unwrap();
    assert_eq!(cfg.store_path, PathBuf::from("/srv/cargodesk/cargo.db"));
    assert_eq!(cfg.manifests.input_dir, PathBuf::from("/srv/inbox/manifests"));
    assert_eq!(cfg.manifests.pattern, "*_MAN*.xml");
    assert_eq!(cfg.manifests.processed_dir, PathBuf::from("data/manifests/processed"));
    assert_eq!(cfg.header_feed.batch_size, 500);
    assert_eq!(cfg.header_feed.dirs.pattern, "*.xml");
  }
}
