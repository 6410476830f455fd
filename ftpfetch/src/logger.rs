/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Write};

use chrono::Local;
use log::{Level, SetLoggerError};
use slog::{Drain, slog_o};
use slog_scope::GlobalLoggerGuard;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

fn log_level(verbose_level: u8) -> Level {
    match verbose_level {
        0 => Level::Warn,
        1 => Level::Info,
        2 => Level::Debug,
        _ => Level::Trace,
    }
}

fn write_timestamp(w: &mut dyn Write) -> io::Result<()> {
    write!(w, "{}", Local::now().format(TIME_FORMAT))
}

/// Route `log` records to stderr through a global slog logger.
///
/// Records are dropped once the returned guard goes away.
pub fn setup(verbose_level: u8) -> Result<GlobalLoggerGuard, SetLoggerError> {
    let decorator = slog_term::PlainSyncDecorator::new(io::stderr());
    let drain = slog_term::FullFormat::new(decorator)
        .use_custom_timestamp(write_timestamp)
        .build();
    let logger = slog::Logger::root(drain.fuse(), slog_o!());

    let scope_guard = slog_scope::set_global_logger(logger);

    slog_stdlog::init_with_level(log_level(verbose_level))?;
    Ok(scope_guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_level() {
        assert_eq!(log_level(0), Level::Warn);
        assert_eq!(log_level(1), Level::Info);
        assert_eq!(log_level(2), Level::Debug);
        assert_eq!(log_level(5), Level::Trace);
    }

    #[test]
    fn timestamp() {
        let mut buf = Vec::new();
        write_timestamp(&mut buf).unwrap();
        let s = String::from_utf8(buf).unwrap();
        // 2025-01-02 03:04:05.123456
        assert_eq!(s.len(), 26);
        assert_eq!(&s[4..5], "-");
        assert_eq!(&s[19..20], ".");
    }
}
