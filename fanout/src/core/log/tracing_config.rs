// Copyright (c) 2024-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::path::PathBuf;
use tracing_core::LevelFilter;

/// Where tracing output goes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WriterConfig {
    /// Tracing is disabled.
    #[default]
    None,
    /// Append to this file.
    File(PathBuf),
}

/// Configuration used by [`crate::try_create_layers`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub writer_config: WriterConfig,
    pub level_filter: LevelFilter,
}

impl TracingConfig {
    /// Tracing to `maybe_file` at `DEBUG` level, or disabled when there is no file.
    #[must_use]
    pub fn new(maybe_file: Option<PathBuf>) -> Self {
        match maybe_file {
            Some(path) => Self {
                writer_config: WriterConfig::File(path),
                level_filter: LevelFilter::DEBUG,
            },
            None => Self {
                writer_config: WriterConfig::None,
                level_filter: LevelFilter::OFF,
            },
        }
    }

    #[must_use]
    pub fn get_level_filter(&self) -> LevelFilter { self.level_filter }

    #[must_use]
    pub fn get_writer_config(&self) -> WriterConfig { self.writer_config.clone() }
}
