/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint, value_parser};

use crate::config::FetchConfig;

const GLOBAL_ARG_CONFIG_FILE: &str = "config-file";
const GLOBAL_ARG_VERBOSE: &str = "verbose";

#[derive(Debug, Default)]
pub struct ProcArgs {
    config_file: Option<PathBuf>,
    pub verbose_level: u8,
}

impl ProcArgs {
    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    pub fn load_config(&self) -> anyhow::Result<FetchConfig> {
        let path = self
            .config_file
            .as_ref()
            .ok_or_else(|| anyhow!("no config file given"))?;
        crate::config::load_config(path)
    }
}

pub fn add_global_args(app: Command) -> Command {
    app.arg(
        Arg::new(GLOBAL_ARG_CONFIG_FILE)
            .help("Config file path")
            .value_name("CONFIG FILE")
            .short('c')
            .long(GLOBAL_ARG_CONFIG_FILE)
            .visible_alias("config")
            .global(true)
            .num_args(1)
            .value_parser(value_parser!(PathBuf))
            .value_hint(ValueHint::FilePath),
    )
    .arg(
        Arg::new(GLOBAL_ARG_VERBOSE)
            .help("Show verbose output")
            .short('v')
            .long(GLOBAL_ARG_VERBOSE)
            .global(true)
            .action(ArgAction::Count),
    )
}

pub fn parse_global_args(args: &ArgMatches) -> anyhow::Result<ProcArgs> {
    let mut proc_args = ProcArgs::default();

    if let Some(path) = args.get_one::<PathBuf>(GLOBAL_ARG_CONFIG_FILE) {
        proc_args.config_file = Some(path.clone());
    }
    proc_args.verbose_level = args.get_count(GLOBAL_ARG_VERBOSE);

    Ok(proc_args)
}
