// Copyright (c) The hindsight Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Harness configuration.
//!
//! The main structure in this module is [`HarnessConfig`]. Configuration is layered: the default
//! config embedded in this library comes first, and a user config file, if any, overrides it.

use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind},
    record::RetentionPolicy,
    runner::RunnerOptions,
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{collections::BTreeSet, num::NonZeroUsize};
use tracing::{debug, warn};

/// Overall configuration for the hindsight harness.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    workspace_root: Utf8PathBuf,
    inner: HarnessConfigDeserialize,
}

impl HarnessConfig {
    /// The default location of the config within the workspace: `.config/hindsight.toml`.
    pub const CONFIG_PATH: &'static str = ".config/hindsight.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from the given file, or if not specified from `.config/hindsight.toml` in
    /// the workspace root.
    ///
    /// An explicitly passed-in file must exist. The default location is optional.
    pub fn from_sources(
        workspace_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let workspace_root = workspace_root.into();

        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };
        debug!(%config_file, "loading config");

        let builder = Self::make_default_config().add_source(source);
        let (inner, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        for key in &unknown {
            warn!(%config_file, "ignoring unknown config key `{key}`");
        }

        Ok(Self {
            workspace_root,
            inner,
        })
    }

    /// Returns the workspace root.
    pub fn workspace_root(&self) -> &Utf8Path {
        &self.workspace_root
    }

    /// Returns the absolute store directory.
    pub fn store_dir(&self) -> Utf8PathBuf {
        self.workspace_root.join(&self.inner.store.dir)
    }

    /// Returns the maximum number of program calls in flight at once.
    pub fn concurrency(&self) -> NonZeroUsize {
        self.inner.run.concurrency
    }

    /// Returns the retention config.
    pub fn retention(&self) -> &RetentionConfig {
        &self.inner.retention
    }

    /// Returns execution engine options derived from this config.
    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions::new(self.concurrency())
    }

    /// Returns the retention policy derived from this config.
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy::from(&self.inner.retention)
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(HarnessConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: HarnessConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // serde_path_to_error already reports the key, so drop it from the config error.
                let path = error.path().clone();
                let config_error = error.into_inner();
                let error = match config_error {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct HarnessConfigDeserialize {
    store: StoreConfig,
    run: RunConfig,
    retention: RetentionConfig,
}

/// Store configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct StoreConfig {
    dir: Utf8PathBuf,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RunConfig {
    concurrency: NonZeroUsize,
}

/// Retention configuration: how many committed runs to keep per suite.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetentionConfig {
    /// The number of most recent committed runs to keep.
    pub keep: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;

    fn write_config(dir: &Utf8TempDir, contents: &str) -> Utf8PathBuf {
        let path = dir.path().join(HarnessConfig::CONFIG_PATH);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn default_config_is_valid() {
        let dir = Utf8TempDir::new().unwrap();
        let builder = HarnessConfig::make_default_config();
        let (_, unknown) = HarnessConfig::build_and_deserialize_config(&builder).unwrap();
        assert!(unknown.is_empty(), "default config has unknown keys: {unknown:?}");

        let config = HarnessConfig::from_sources(dir.path(), None).unwrap();
        assert_eq!(config.store_dir(), dir.path().join("target/hindsight"));
        assert_eq!(config.concurrency().get(), 1);
        assert_eq!(config.retention_policy(), RetentionPolicy::new(1));
        assert_eq!(config.runner_options().concurrency().get(), 1);
    }

    #[test]
    fn user_config_overrides_defaults() {
        let dir = Utf8TempDir::new().unwrap();
        write_config(
            &dir,
            indoc! {r#"
                [run]
                concurrency = 8

                [retention]
                keep = 3
            "#},
        );

        let config = HarnessConfig::from_sources(dir.path(), None).unwrap();
        assert_eq!(config.concurrency().get(), 8);
        assert_eq!(config.retention().keep, 3);
        // Unset keys keep their defaults.
        assert_eq!(config.store_dir(), dir.path().join("target/hindsight"));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let dir = Utf8TempDir::new().unwrap();
        let path = write_config(
            &dir,
            indoc! {r#"
                [store]
                dir = "out"
                compress = true
            "#},
        );

        let config = HarnessConfig::from_sources(dir.path(), Some(path.as_path())).unwrap();
        assert_eq!(config.store_dir(), dir.path().join("out"));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let dir = Utf8TempDir::new().unwrap();
        let path = write_config(
            &dir,
            indoc! {r#"
                [run]
                concurrency = 0
            "#},
        );

        let error = HarnessConfig::from_sources(dir.path(), None).unwrap_err();
        assert_eq!(error.config_file(), path.as_path());
        match error.kind() {
            ConfigParseErrorKind::DeserializeError(error) => {
                assert_eq!(error.path().to_string(), "run.concurrency");
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = Utf8TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");
        let error = HarnessConfig::from_sources(dir.path(), Some(path.as_path())).unwrap_err();
        assert!(matches!(error.kind(), ConfigParseErrorKind::BuildError(_)));
    }
}
