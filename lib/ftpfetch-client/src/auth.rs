/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;

use anyhow::anyhow;

const USERNAME_MAX_LENGTH: usize = u8::MAX as usize;
const PASSWORD_MAX_LENGTH: usize = u8::MAX as usize;

fn check_command_safe(s: &str) -> anyhow::Result<()> {
    if s.bytes().any(|b| b == b'\r' || b == b'\n') {
        Err(anyhow!("line break characters are not allowed"))
    } else {
        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Username {
    inner: String,
}

impl Username {
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn from_original(s: &str) -> anyhow::Result<Self> {
        if s.len() > USERNAME_MAX_LENGTH {
            return Err(anyhow!("too long string for a username"));
        }
        check_command_safe(s)?;
        Ok(Username {
            inner: s.to_string(),
        })
    }

    pub fn as_original(&self) -> &str {
        &self.inner
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

#[derive(Clone, Eq, PartialEq)]
pub struct Password {
    inner: String,
}

impl Password {
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn from_original(s: &str) -> anyhow::Result<Self> {
        if s.len() > PASSWORD_MAX_LENGTH {
            return Err(anyhow!("too long string for a password"));
        }
        check_command_safe(s)?;
        Ok(Password {
            inner: s.to_string(),
        })
    }

    pub fn as_original(&self) -> &str {
        &self.inner
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(****)")
    }
}
