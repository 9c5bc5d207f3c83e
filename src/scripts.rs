//! Branch-to-script resolution with `#default` fallback.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::config::{DEFAULT_SCRIPTS_KEY, ScriptEntry};
use crate::error::{HookError, Result};

/// Pipeline stage a script belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Build,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Build => f.write_str("build"),
            Stage::Publish => f.write_str("publish"),
        }
    }
}

/// The script paths resolved for one task. Read-only once built.
#[derive(Debug, Clone)]
pub struct ScriptPair {
    pub build: PathBuf,
    pub publish: PathBuf,
}

impl ScriptPair {
    /// Resolves both stages for a branch up front, before anything runs.
    ///
    /// A miss on either stage with no `#default` entry is a configuration
    /// error that aborts the whole task.
    pub fn resolve(scripts: &HashMap<String, ScriptEntry>, branch: &str) -> Result<Self> {
        Ok(ScriptPair {
            build: resolve(scripts, branch, Stage::Build)?,
            publish: resolve(scripts, branch, Stage::Publish)?,
        })
    }
}

/// Looks up the script for `branch` and `stage`, falling back to the
/// `#default` entry. Each stage falls back independently.
pub fn resolve(
    scripts: &HashMap<String, ScriptEntry>,
    branch: &str,
    stage: Stage,
) -> Result<PathBuf> {
    let stage_of = |entry: &ScriptEntry| match stage {
        Stage::Build => entry.build.clone(),
        Stage::Publish => entry.publish.clone(),
    };

    scripts
        .get(branch)
        .and_then(|entry| stage_of(entry))
        .or_else(|| scripts.get(DEFAULT_SCRIPTS_KEY).and_then(|entry| stage_of(entry)))
        .ok_or_else(|| HookError::ScriptUnresolved {
            branch: branch.to_string(),
            stage,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(build: Option<&str>, publish: Option<&str>) -> ScriptEntry {
        ScriptEntry {
            build: build.map(PathBuf::from),
            publish: publish.map(PathBuf::from),
        }
    }

    #[test]
    fn branch_entry_wins_over_default() {
        let mut scripts = HashMap::new();
        scripts.insert("master".to_string(), entry(Some("m-build"), Some("m-pub")));
        scripts.insert(
            DEFAULT_SCRIPTS_KEY.to_string(),
            entry(Some("d-build"), Some("d-pub")),
        );

        let pair = ScriptPair::resolve(&scripts, "master").unwrap();
        assert_eq!(pair.build, PathBuf::from("m-build"));
        assert_eq!(pair.publish, PathBuf::from("m-pub"));
    }

    #[test]
    fn unknown_branch_falls_back_to_default() {
        let mut scripts = HashMap::new();
        scripts.insert(
            DEFAULT_SCRIPTS_KEY.to_string(),
            entry(Some("d-build"), Some("d-pub")),
        );

        let pair = ScriptPair::resolve(&scripts, "feature/x").unwrap();
        assert_eq!(pair.build, PathBuf::from("d-build"));
        assert_eq!(pair.publish, PathBuf::from("d-pub"));
    }

    #[test]
    fn stages_fall_back_independently() {
        let mut scripts = HashMap::new();
        // Branch entry only defines a build script.
        scripts.insert("master".to_string(), entry(Some("m-build"), None));
        scripts.insert(
            DEFAULT_SCRIPTS_KEY.to_string(),
            entry(Some("d-build"), Some("d-pub")),
        );

        let pair = ScriptPair::resolve(&scripts, "master").unwrap();
        assert_eq!(pair.build, PathBuf::from("m-build"));
        assert_eq!(pair.publish, PathBuf::from("d-pub"));
    }

    #[test]
    fn no_entry_and_no_default_is_fatal() {
        let scripts = HashMap::new();
        let err = resolve(&scripts, "master", Stage::Build).unwrap_err();
        match err {
            HookError::ScriptUnresolved { branch, stage } => {
                assert_eq!(branch, "master");
                assert_eq!(stage, Stage::Build);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_stage_on_default_is_fatal() {
        let mut scripts = HashMap::new();
        scripts.insert(DEFAULT_SCRIPTS_KEY.to_string(), entry(Some("d-build"), None));

        assert!(resolve(&scripts, "master", Stage::Build).is_ok());
        assert!(matches!(
            resolve(&scripts, "master", Stage::Publish),
            Err(HookError::ScriptUnresolved {
                stage: Stage::Publish,
                ..
            })
        ));
    }
}
