/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use async_trait::async_trait;
use tokio::io::{AsyncRead, BufReader};

use crate::config::FtpTransferConfig;
use crate::error::FtpLineDataReadError;
use crate::io::LimitedBufReadExt;

/// Consumer of the lines sent on a LIST data connection.
#[async_trait]
pub trait FtpLineDataReceiver {
    /// Called once for each line, with the line terminator removed.
    async fn recv_line(&mut self, line: &str);
    fn should_return_early(&self) -> bool;
}

pub(crate) struct FtpLineDataTransfer<T: AsyncRead> {
    io: BufReader<T>,
    max_lines: usize,
    max_line_len: usize,
    line_buf: Vec<u8>,
}

impl<T> FtpLineDataTransfer<T>
where
    T: AsyncRead + Unpin,
{
    pub(crate) fn new(io: T, config: &FtpTransferConfig) -> Self {
        FtpLineDataTransfer {
            io: BufReader::new(io),
            max_lines: config.list_max_entries,
            max_line_len: config.list_max_line_len,
            line_buf: Vec::with_capacity(config.list_max_line_len),
        }
    }

    async fn send_buf_to_receiver<R>(&mut self, receiver: &mut R) -> Result<(), FtpLineDataReadError>
    where
        R: FtpLineDataReceiver,
    {
        let s = std::str::from_utf8(&self.line_buf)
            .map_err(|_| FtpLineDataReadError::UnsupportedEncoding)?;
        let s = s.trim_end_matches(['\r', '\n']);
        receiver.recv_line(s).await;
        self.line_buf.clear();
        if receiver.should_return_early() {
            return Err(FtpLineDataReadError::AbortedByCallback);
        }
        Ok(())
    }

    pub(crate) async fn read_to_end<R>(mut self, receiver: &mut R) -> Result<usize, FtpLineDataReadError>
    where
        R: FtpLineDataReceiver,
    {
        for i in 0..self.max_lines {
            let (found, nr) = self
                .io
                .limited_read_until(b'\n', self.max_line_len, &mut self.line_buf)
                .await?;
            if nr == 0 {
                return Ok(i);
            }

            if !found {
                if nr >= self.max_line_len {
                    return Err(FtpLineDataReadError::LineTooLong(i + 1));
                }
                // the last line has no terminator
                self.send_buf_to_receiver(receiver).await?;
                return Ok(i + 1);
            }

            self.send_buf_to_receiver(receiver).await?;
        }

        // tolerate a listing that ends exactly at the limit
        let (_, nr) = self
            .io
            .limited_read_until(b'\n', self.max_line_len, &mut self.line_buf)
            .await?;
        if nr == 0 {
            Ok(self.max_lines)
        } else {
            Err(FtpLineDataReadError::TooManyLines)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[derive(Default)]
    struct Collector {
        lines: Vec<String>,
        stop_after: Option<usize>,
    }

    #[async_trait]
    impl FtpLineDataReceiver for Collector {
        async fn recv_line(&mut self, line: &str) {
            self.lines.push(line.to_string());
        }

        fn should_return_early(&self) -> bool {
            self.stop_after.is_some_and(|n| self.lines.len() >= n)
        }
    }

    fn config(max_entries: usize, max_line_len: usize) -> FtpTransferConfig {
        FtpTransferConfig {
            list_max_entries: max_entries,
            list_max_line_len: max_line_len,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn read_lines() {
        let mock = Builder::new()
            .read(b"-rw-r--r-- 1 ftp ftp 4096 Jan 01 00:00 a.bin\r\n")
            .read(b"-rw-r--r-- 1 ftp ftp   12 Jan 01 00:00 b.txt\r\n")
            .read(b"drwxr-xr-x 2 ftp ftp 4096 Jan 01 00:00 sub")
            .build();
        let mut collector = Collector::default();
        let n = FtpLineDataTransfer::new(mock, &config(16, 128))
            .read_to_end(&mut collector)
            .await
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(
            collector.lines[0],
            "-rw-r--r-- 1 ftp ftp 4096 Jan 01 00:00 a.bin"
        );
        assert!(collector.lines[2].ends_with(" sub"));
    }

    #[tokio::test]
    async fn line_too_long() {
        let mock = Builder::new().read(b"a short line\r\n").read(b"0123456789abcdef").build();
        let mut collector = Collector::default();
        let e = FtpLineDataTransfer::new(mock, &config(16, 16))
            .read_to_end(&mut collector)
            .await
            .unwrap_err();
        assert!(matches!(e, FtpLineDataReadError::LineTooLong(2)));
    }

    #[tokio::test]
    async fn too_many_lines() {
        let mock = Builder::new().read(b"a\r\nb\r\nc\r\n").build();
        let mut collector = Collector::default();
        let e = FtpLineDataTransfer::new(mock, &config(2, 16))
            .read_to_end(&mut collector)
            .await
            .unwrap_err();
        assert!(matches!(e, FtpLineDataReadError::TooManyLines));

        let mock = Builder::new().read(b"a\r\nb\r\n").build();
        let mut collector = Collector::default();
        let n = FtpLineDataTransfer::new(mock, &config(2, 16))
            .read_to_end(&mut collector)
            .await
            .unwrap();
        assert_eq!(n, 2);
    }

    #[tokio::test]
    async fn abort_by_receiver() {
        let mock = Builder::new().read(b"a\r\nb\r\nc\r\n").build();
        let mut collector = Collector {
            stop_after: Some(1),
            ..Default::default()
        };
        let e = FtpLineDataTransfer::new(mock, &config(16, 16))
            .read_to_end(&mut collector)
            .await
            .unwrap_err();
        assert!(matches!(e, FtpLineDataReadError::AbortedByCallback));
        assert_eq!(collector.lines, vec!["a"]);
    }
}
