/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::manifest::{EntryOutcome, ManifestReport};
use crate::{FtpFetchComponent, ProcArgs};

pub const COMMAND: &str = "fetch";

const ARG_DUMP_CONFIG: &str = "dump-config";

pub fn command() -> Command {
    Command::new(COMMAND)
        .about("Fetch every file listed in the config file")
        .arg(
            Arg::new(ARG_DUMP_CONFIG)
                .help("Log the loaded config before fetching")
                .long(ARG_DUMP_CONFIG)
                .action(ArgAction::SetTrue),
        )
}

fn print_report<W: Write>(w: &mut W, report: &ManifestReport) -> std::io::Result<()> {
    for entry in report.entries() {
        match entry.outcome() {
            EntryOutcome::Fetched(n) => writeln!(w, "{}: {n} bytes", entry.id())?,
            EntryOutcome::Failed(e) => writeln!(w, "{}: {}: {e}", entry.id(), e.kind())?,
            EntryOutcome::Skipped => writeln!(w, "{}: skipped", entry.id())?,
        }
    }
    writeln!(
        w,
        "fetched: {}, failed: {}, skipped: {}",
        report.succeeded(),
        report.failed(),
        report.skipped()
    )
}

pub async fn run(proc_args: &ProcArgs, cmd_args: &ArgMatches) -> anyhow::Result<ExitCode> {
    let config = proc_args.load_config()?;
    let mut component = FtpFetchComponent::from_config(config);
    if cmd_args.get_flag(ARG_DUMP_CONFIG) {
        component.dump_config();
    }

    let report = component.setup().await?;
    let mut stdout = std::io::stdout().lock();
    print_report(&mut stdout, report).context("failed to write report")?;

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
