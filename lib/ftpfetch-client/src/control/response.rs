/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use tokio::io::{AsyncRead, AsyncWrite};

use super::FtpControlChannel;
use crate::error::FtpRawResponseError;
use crate::io::LimitedBufReadExt;

#[derive(Debug)]
pub(super) enum FtpRawResponse {
    SingleLine(u16, String),
    /// Only the code is kept, no reply we act on spans multiple lines.
    MultiLine(u16),
}

fn parse_reply_code(line: &[u8]) -> Result<u16, FtpRawResponseError> {
    if !line[..3].iter().all(u8::is_ascii_digit) {
        return Err(FtpRawResponseError::InvalidLineFormat);
    }
    let code = line[..3]
        .iter()
        .fold(0u16, |acc, c| acc * 10 + (c - b'0') as u16);
    if !(100..600).contains(&code) {
        return Err(FtpRawResponseError::InvalidReplyCode(code));
    }
    Ok(code)
}

fn message_text(line: &[u8]) -> Result<String, FtpRawResponseError> {
    let msg = std::str::from_utf8(line).map_err(|_| FtpRawResponseError::LineIsNotUtf8)?;
    Ok(msg.trim_end().to_string())
}

/// Text between the first '(' and the following ')'.
fn parenthesized(line: &str) -> Option<&str> {
    let p_start = memchr::memchr(b'(', line.as_bytes())?;
    let p_end = memchr::memchr(b')', &line.as_bytes()[p_start..])? + p_start;
    Some(&line[p_start + 1..p_end])
}

impl FtpRawResponse {
    pub(super) fn parse_single_line(line: &[u8]) -> Result<Self, FtpRawResponseError> {
        let code = parse_reply_code(line)?;
        let msg = message_text(&line[4..])?;
        Ok(FtpRawResponse::SingleLine(code, msg))
    }

    pub(super) fn get_multi_line_parser(
        line: &[u8],
    ) -> Result<FtpMultiLineReplyParser, FtpRawResponseError> {
        let code = parse_reply_code(line)?;
        let end_prefix = [line[0], line[1], line[2], b' '];
        Ok(FtpMultiLineReplyParser { code, end_prefix })
    }

    pub(super) fn code(&self) -> u16 {
        match self {
            FtpRawResponse::SingleLine(code, _) => *code,
            FtpRawResponse::MultiLine(code) => *code,
        }
    }

    pub(super) fn line_trimmed(&self) -> Option<&str> {
        match self {
            FtpRawResponse::SingleLine(_, line) => Some(line.as_str().trim()),
            FtpRawResponse::MultiLine(_) => None,
        }
    }

    /// Parse `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)`.
    pub(super) fn parse_pasv_227_reply(&self) -> Option<SocketAddr> {
        let FtpRawResponse::SingleLine(_, line) = self else {
            return None;
        };

        let a: Vec<&str> = parenthesized(line)?.split(',').map(str::trim).collect();
        if a.len() != 6 {
            return None;
        }
        let mut v = [0u8; 6];
        for (i, s) in a.iter().enumerate() {
            v[i] = u8::from_str(s).ok()?;
        }

        let ip = IpAddr::V4(Ipv4Addr::new(v[0], v[1], v[2], v[3]));
        let port = ((v[4] as u16) << 8) + (v[5] as u16);
        Some(SocketAddr::new(ip, port))
    }

    /// Parse `229 Entering Extended Passive Mode (|||port|)`.
    pub(super) fn parse_epsv_229_reply(&self) -> Option<u16> {
        let FtpRawResponse::SingleLine(_, line) = self else {
            return None;
        };

        let inner = parenthesized(line)?;
        let port = inner.strip_prefix("|||")?.strip_suffix('|')?;
        match u16::from_str(port) {
            Ok(0) | Err(_) => None,
            Ok(port) => Some(port),
        }
    }
}

pub(super) struct FtpMultiLineReplyParser {
    code: u16,
    end_prefix: [u8; 4],
}

impl FtpMultiLineReplyParser {
    pub(super) fn feed_line(&self, line: &[u8]) -> bool {
        line.starts_with(&self.end_prefix)
    }

    pub(super) fn finish(self) -> FtpRawResponse {
        FtpRawResponse::MultiLine(self.code)
    }
}

impl<T> FtpControlChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    async fn read_line(&mut self, buf: &mut Vec<u8>, min_len: usize) -> Result<(), FtpRawResponseError> {
        buf.clear();

        let (found, len) = self
            .stream
            .limited_read_until(b'\n', self.config.max_line_len, buf)
            .await
            .map_err(FtpRawResponseError::ReadFailed)?;

        #[cfg(feature = "log-raw-io")]
        if len > 0 {
            crate::debug::log_rsp(buf);
        }

        if len == 0 {
            Err(FtpRawResponseError::ConnectionClosed)
        } else if !found {
            if len >= self.config.max_line_len {
                Err(FtpRawResponseError::LineTooLong)
            } else {
                Err(FtpRawResponseError::ConnectionClosed)
            }
        } else if len < min_len {
            Err(FtpRawResponseError::InvalidLineFormat)
        } else {
            Ok(())
        }
    }

    pub(super) async fn read_raw_response(&mut self) -> Result<FtpRawResponse, FtpRawResponseError> {
        let mut buf = Vec::<u8>::with_capacity(self.config.max_line_len);
        // at least "<code> \n"
        self.read_line(&mut buf, 5).await?;

        match buf[3] {
            b' ' => FtpRawResponse::parse_single_line(&buf),
            b'-' => {
                let ml_parser = FtpRawResponse::get_multi_line_parser(&buf)?;
                for _i in 0..self.config.max_multi_lines {
                    self.read_line(&mut buf, 1).await?;
                    if ml_parser.feed_line(&buf) {
                        return Ok(ml_parser.finish());
                    }
                }
                Err(FtpRawResponseError::TooManyLines)
            }
            _ => Err(FtpRawResponseError::InvalidLineFormat),
        }
    }

    pub(super) async fn timed_read_raw_response(
        &mut self,
        stage: &'static str,
    ) -> Result<FtpRawResponse, FtpRawResponseError> {
        match tokio::time::timeout(self.config.command_timeout, self.read_raw_response()).await {
            Ok(r) => r,
            Err(_) => Err(FtpRawResponseError::ReadResponseTimedOut(stage)),
        }
    }
}
