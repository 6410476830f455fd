/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;
use humanize_rs::ParseError;
use yaml_rust::Yaml;

fn parse_humanized(value: &str, bare_unit: fn(u64) -> Duration) -> anyhow::Result<Duration> {
    match humanize_rs::duration::parse(value) {
        Ok(v) => Ok(v),
        Err(ParseError::MissingUnit) => {
            let u = u64::from_str(value).map_err(|_| anyhow!("invalid duration string"))?;
            Ok(bare_unit(u))
        }
        Err(e) => Err(anyhow!("invalid humanize duration string: {e}")),
    }
}

fn as_duration_with(v: &Yaml, bare_unit: fn(u64) -> Duration) -> anyhow::Result<Duration> {
    match v {
        Yaml::String(value) => parse_humanized(value, bare_unit),
        Yaml::Integer(value) => {
            let u = u64::try_from(*value).map_err(|_| anyhow!("negative duration value"))?;
            Ok(bare_unit(u))
        }
        _ => Err(anyhow!(
            "yaml value type for humanize duration should be 'string' or 'integer'"
        )),
    }
}

/// Bare numbers are seconds.
pub fn as_duration(v: &Yaml) -> anyhow::Result<Duration> {
    as_duration_with(v, Duration::from_secs)
}

/// Bare numbers are milliseconds.
pub fn as_millis_duration(v: &Yaml) -> anyhow::Result<Duration> {
    as_duration_with(v, Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_by_default() {
        assert_eq!(as_duration(&yaml_str!("1m30s")).unwrap(), Duration::from_secs(90));
        assert_eq!(as_duration(&yaml_str!("15")).unwrap(), Duration::from_secs(15));
        assert_eq!(as_duration(&Yaml::Integer(10)).unwrap(), Duration::from_secs(10));
        assert_eq!(
            as_duration(&yaml_str!("500ms")).unwrap(),
            Duration::from_millis(500)
        );

        assert!(as_duration(&yaml_str!("-10s")).is_err());
        assert!(as_duration(&yaml_str!("5z")).is_err());
        assert!(as_duration(&Yaml::Integer(-1)).is_err());
        assert!(as_duration(&Yaml::Null).is_err());
    }

    #[test]
    fn millis_for_bare_numbers() {
        assert_eq!(
            as_millis_duration(&Yaml::Integer(30000)).unwrap(),
            Duration::from_secs(30)
        );
        assert_eq!(
            as_millis_duration(&yaml_str!("1500")).unwrap(),
            Duration::from_millis(1500)
        );
        assert_eq!(
            as_millis_duration(&yaml_str!("5s")).unwrap(),
            Duration::from_secs(5)
        );
        assert!(as_millis_duration(&yaml_str!("1.5")).is_err());
    }
}
