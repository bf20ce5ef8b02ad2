//! Run parameters for the feedback question migration.
//!
//! Edit the constants below and rebuild to change what a run does.

use crate::selection::Selection;
use anyhow::{Context, Result};

/// When true, only report what would be created.
pub const PREVIEW: bool = true;

/// Which legacy questions to migrate. One of:
///   "BY_TIME#<days>"       questions updated in the past <days> days
///   "BY_COURSE#<course>"   questions in exactly <course>
///   "ALL"                  every legacy question
pub const TARGET: &str = "ALL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    pub selection: Selection,
    pub preview: bool,
}

impl MigrationConfig {
    pub fn new(selection: Selection, preview: bool) -> Self {
        Self { selection, preview }
    }

    /// Build the config from the compiled-in constants.
    pub fn from_static() -> Result<Self> {
        Self::parse(TARGET, PREVIEW)
    }

    pub fn parse(target: &str, preview: bool) -> Result<Self> {
        let selection = target
            .parse::<Selection>()
            .with_context(|| format!("Invalid migration target configured: '{}'", target))?;
        Ok(Self::new(selection, preview))
    }

    pub fn mode(&self) -> &'static str {
        if self.preview { "PREVIEW" } else { "APPLY" }
    }
}
