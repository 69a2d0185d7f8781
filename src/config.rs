use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::RegenError;
use crate::pipeline::Pipeline;
use crate::regen_config::RegenToml;
use crate::skip::SkipSet;

/// Command-line values layered over `regen.toml`.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub checkpoint_file: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub package_prefix: Option<String>,
    pub skip: Vec<String>,
    pub skip_file: Option<PathBuf>,
    pub skip_steps: Vec<String>,
    pub skip_test: bool,
    pub test_only: bool,
    pub verbose: bool,
}

/// Runtime configuration for one regen invocation.
///
/// Resolution order for every value is CLI flag, then `regen.toml`, then the
/// built-in default. Skip identifiers are the union of all sources.
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub checkpoint_file: PathBuf,
    pub timeout: Duration,
    pub package_prefix: String,
    pub skip: SkipSet,
    pub pipeline: Pipeline,
    pub verbose: bool,
}

impl Config {
    pub fn new(root: PathBuf, toml: &RegenToml, overrides: ConfigOverrides) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve root directory {}", root.display()))?;

        let timeout_secs = overrides
            .timeout_secs
            .unwrap_or(toml.defaults.timeout_secs);
        if timeout_secs == 0 {
            return Err(RegenError::InvalidTimeout("timeout must be at least 1 second".into()).into());
        }

        let mut pipeline = Pipeline::new(toml.pipeline_steps())?;
        if overrides.skip_test {
            pipeline.skip_tests()?;
        }
        if overrides.test_only {
            pipeline.test_only()?;
        }
        for name in &overrides.skip_steps {
            pipeline.skip_step(name)?;
        }

        let mut skip = SkipSet::from_entries(&toml.skip.packages);
        if let Some(file) = &toml.skip.file {
            skip.extend(SkipSet::load_file(file).entries());
        }
        skip.extend(&overrides.skip);
        if let Some(file) = &overrides.skip_file {
            skip.extend(SkipSet::load_file(file).entries());
        }

        Ok(Self {
            root,
            checkpoint_file: overrides
                .checkpoint_file
                .unwrap_or_else(|| toml.defaults.checkpoint_file.clone()),
            timeout: Duration::from_secs(timeout_secs),
            package_prefix: overrides
                .package_prefix
                .unwrap_or_else(|| toml.defaults.package_prefix.clone()),
            skip,
            pipeline,
            verbose: overrides.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{Decision, discover_packages, plan_traversal};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_from_empty_toml() {
        let dir = tempdir().unwrap();
        let config = Config::new(
            dir.path().to_path_buf(),
            &RegenToml::default(),
            ConfigOverrides::default(),
        )
        .unwrap();
        assert_eq!(config.root, dir.path().canonicalize().unwrap());
        assert_eq!(config.timeout, Duration::from_secs(1800));
        assert_eq!(config.package_prefix, "Azure.ResourceManager");
        assert_eq!(config.checkpoint_file, PathBuf::from("progress.txt"));
        assert!(config.skip.is_empty());
        assert_eq!(config.pipeline.active_count(), 3);
    }

    #[test]
    fn test_cli_overrides_file_values() {
        let dir = tempdir().unwrap();
        let toml = RegenToml::parse(
            "[defaults]\ntimeout_secs = 60\npackage_prefix = \"A.\"\ncheckpoint_file = \"a.txt\"\n",
        )
        .unwrap();
        let config = Config::new(
            dir.path().to_path_buf(),
            &toml,
            ConfigOverrides {
                timeout_secs: Some(5),
                package_prefix: Some("B.".into()),
                checkpoint_file: Some(PathBuf::from("b.txt")),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.package_prefix, "B.");
        assert_eq!(config.checkpoint_file, PathBuf::from("b.txt"));
    }

    #[test]
    fn test_skip_sources_are_merged() {
        let dir = tempdir().unwrap();
        let skip_file = dir.path().join("skip.txt");
        fs::write(&skip_file, "FromFile\n").unwrap();
        let toml = RegenToml::parse("[skip]\npackages = [\"FromToml\"]\n").unwrap();

        let config = Config::new(
            dir.path().to_path_buf(),
            &toml,
            ConfigOverrides {
                skip: vec!["FromCli".into()],
                skip_file: Some(skip_file),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(config.skip.entries(), vec!["FromCli", "FromFile", "FromToml"]);
    }

    #[test]
    fn test_unreadable_skip_file_is_ignored() {
        let dir = tempdir().unwrap();
        let config = Config::new(
            dir.path().to_path_buf(),
            &RegenToml::default(),
            ConfigOverrides {
                skip_file: Some(dir.path().join("missing.txt")),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(config.skip.is_empty());
    }

    #[test]
    fn test_step_directives_applied() {
        let dir = tempdir().unwrap();
        let config = Config::new(
            dir.path().to_path_buf(),
            &RegenToml::default(),
            ConfigOverrides {
                skip_test: true,
                skip_steps: vec!["restore".into()],
                ..Default::default()
            },
        )
        .unwrap();
        assert!(config.pipeline.is_skipped("test"));
        assert!(config.pipeline.is_skipped("restore"));
        assert!(!config.pipeline.is_skipped("generate"));
    }

    #[test]
    fn test_unknown_skip_step_errors() {
        let dir = tempdir().unwrap();
        let result = Config::new(
            dir.path().to_path_buf(),
            &RegenToml::default(),
            ConfigOverrides {
                skip_steps: vec!["lint".into()],
                ..Default::default()
            },
        );
        assert!(result.unwrap_err().to_string().contains("Unknown step 'lint'"));
    }

    #[test]
    fn test_zero_timeout_errors() {
        let dir = tempdir().unwrap();
        let result = Config::new(
            dir.path().to_path_buf(),
            &RegenToml::default(),
            ConfigOverrides {
                timeout_secs: Some(0),
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_root_errors() {
        let dir = tempdir().unwrap();
        let result = Config::new(
            dir.path().join("nope"),
            &RegenToml::default(),
            ConfigOverrides::default(),
        );
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to resolve root directory")
        );
    }

    #[test]
    fn test_non_canonical_skip_path_excludes_package() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("repo/sdk/a/Azure.ResourceManager.Foo")).unwrap();
        fs::create_dir_all(dir.path().join("repo/sdk/b/Azure.ResourceManager.Bar")).unwrap();
        let skip = dir.path().join("repo/sdk/b/../a/Azure.ResourceManager.Foo");

        let config = Config::new(
            dir.path().join("repo/sdk/.."),
            &RegenToml::default(),
            ConfigOverrides {
                skip: vec![skip.display().to_string()],
                ..Default::default()
            },
        )
        .unwrap();

        let packages = discover_packages(&config.root).unwrap();
        let plan = plan_traversal(packages, &config.skip, &config.package_prefix, None);
        let decisions: Vec<(&str, Decision)> =
            plan.entries.iter().map(|(p, d)| (p.name(), *d)).collect();
        assert_eq!(
            decisions,
            vec![
                ("Azure.ResourceManager.Foo", Decision::SkipExplicit),
                ("Azure.ResourceManager.Bar", Decision::Run),
            ]
        );
    }

    #[test]
    fn test_zero_step_timeout_errors() {
        let dir = tempdir().unwrap();
        let toml = RegenToml::parse(
            "[[steps]]\nname = \"build\"\nprogram = \"make\"\ntimeout_secs = 0\n",
        )
        .unwrap();
        let err = Config::new(dir.path().to_path_buf(), &toml, ConfigOverrides::default())
            .unwrap_err();
        assert!(err.to_string().contains("Invalid timeout"));
    }
}
