use std::fmt;

use crate::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildStage {
  Ingestion,
  Clustering,
  Grouping,
  Simplification,
  Serialization,
}

impl fmt::Display for BuildStage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      BuildStage::Ingestion => "ingestion",
      BuildStage::Clustering => "clustering",
      BuildStage::Grouping => "grouping",
      BuildStage::Simplification => "simplification",
      BuildStage::Serialization => "serialization",
    };
    f.write_str(name)
  }
}

#[derive(thiserror::Error, Debug)]
pub enum LodGraphBuildError {
  #[error("invalid lod graph build config: {0}")]
  InvalidConfig(String),
  #[error("{stage} failed at level {level}: {reason}")]
  Stage {
    stage: BuildStage,
    level: usize,
    reason: String,
  },
  #[error("serialization failed at level {level}")]
  Serialization {
    level: usize,
    #[source]
    source: LodFileError,
  },
}

impl LodGraphBuildError {
  pub fn stage(stage: BuildStage, level: usize, reason: impl Into<String>) -> Self {
    Self::Stage {
      stage,
      level,
      reason: reason.into(),
    }
  }
}

/// Failure to read or write a level file. Every variant names the level it happened at.
#[derive(thiserror::Error, Debug)]
pub enum LodFileError {
  #[error("level 0: no level file found for prefix {prefix:?}")]
  NoLevels { prefix: PathBuf },
  #[error("level {level}: failed to open {path:?}")]
  Open {
    level: usize,
    path: PathBuf,
    #[source]
    source: io::Error,
  },
  #[error("level {level}: magic tag mismatch, found {found:?}")]
  BadMagic { level: usize, found: [u8; 4] },
  #[error("level {level}: file truncated in the {section}, {expected} bytes expected")]
  Truncated {
    level: usize,
    section: &'static str,
    expected: usize,
  },
  #[error("level {level}: io failure")]
  Io {
    level: usize,
    #[source]
    source: io::Error,
  },
  #[error(
    "level {level}: cluster {cluster} references group {group} but only {group_count} exist"
  )]
  DanglingGroup {
    level: usize,
    cluster: u32,
    group: u32,
    group_count: u32,
  },
  #[error("level {level}: cluster {cluster} is corrupt: {reason}")]
  CorruptCluster {
    level: usize,
    cluster: u32,
    reason: &'static str,
  },
}

impl LodFileError {
  pub fn level(&self) -> usize {
    match self {
      LodFileError::NoLevels { .. } => 0,
      LodFileError::Open { level, .. }
      | LodFileError::BadMagic { level, .. }
      | LodFileError::Truncated { level, .. }
      | LodFileError::Io { level, .. }
      | LodFileError::DanglingGroup { level, .. }
      | LodFileError::CorruptCluster { level, .. } => *level,
    }
  }
}
