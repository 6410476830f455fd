/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Arg, ArgMatches, Command};

use crate::{FtpFetchComponent, ProcArgs};

pub const COMMAND: &str = "list";

const ARG_PATH: &str = "path";

pub fn command() -> Command {
    Command::new(COMMAND)
        .about("List a remote directory on the configured server")
        .arg(
            Arg::new(ARG_PATH)
                .help("Remote directory, the login directory if absent")
                .value_name("PATH")
                .num_args(1),
        )
}

pub async fn run(proc_args: &ProcArgs, cmd_args: &ArgMatches) -> anyhow::Result<ExitCode> {
    let config = proc_args.load_config()?;
    let mut component = FtpFetchComponent::from_config(config);

    let path = cmd_args.get_one::<String>(ARG_PATH).map(|s| s.as_str());
    let lines = component
        .list_files(path)
        .await
        .context(format!("failed to list {}", path.unwrap_or("login directory")))?;

    let mut stdout = std::io::stdout().lock();
    for line in lines {
        writeln!(stdout, "{line}")?;
    }
    Ok(ExitCode::SUCCESS)
}
