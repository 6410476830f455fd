/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::Path;

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, YamlLoader};

/// Load the first yaml document from a string.
pub fn load_str(content: &str) -> anyhow::Result<Yaml> {
    let docs = YamlLoader::load_from_str(content).map_err(|e| anyhow!("invalid yaml: {e}"))?;
    docs.into_iter()
        .next()
        .ok_or_else(|| anyhow!("no yaml document found"))
}

/// Load the first yaml document from a file.
pub fn load_doc(path: &Path) -> anyhow::Result<Yaml> {
    let content = std::fs::read_to_string(path)
        .context(format!("failed to read config file {}", path.display()))?;
    load_str(&content).context(format!("failed to load config file {}", path.display()))
}
