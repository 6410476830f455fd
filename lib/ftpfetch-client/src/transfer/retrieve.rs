/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::FtpFileRetrieveError;

/// Copy a RETR data connection into a local writer through a caller owned buffer.
pub(crate) struct FtpRetrieveDataTransfer<'a, T> {
    io: T,
    buf: &'a mut [u8],
    read_timeout: Duration,
}

impl<'a, T> FtpRetrieveDataTransfer<'a, T>
where
    T: AsyncRead + Unpin,
{
    pub(crate) fn new(io: T, buf: &'a mut [u8], read_timeout: Duration) -> Self {
        FtpRetrieveDataTransfer {
            io,
            buf,
            read_timeout,
        }
    }

    /// Returns the number of bytes written once the server closes the data connection.
    pub(crate) async fn copy_to<W>(mut self, writer: &mut W) -> Result<u64, FtpFileRetrieveError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut total: u64 = 0;
        loop {
            let nr = match tokio::time::timeout(self.read_timeout, self.io.read(self.buf)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(FtpFileRetrieveError::DataReadFailed(e)),
                Err(_) => return Err(FtpFileRetrieveError::TimeoutToWaitData),
            };
            writer
                .write_all(&self.buf[..nr])
                .await
                .map_err(FtpFileRetrieveError::LocalWriteFailed)?;
            total += nr as u64;
        }
        writer
            .flush()
            .await
            .map_err(FtpFileRetrieveError::LocalWriteFailed)?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn copy_chunks() {
        let data = Builder::new()
            .read(b"0123456789")
            .read(b"abcdef")
            .build();
        let mut buf = [0u8; 4];
        let mut out = Vec::new();
        let n = FtpRetrieveDataTransfer::new(data, &mut buf, Duration::from_secs(1))
            .copy_to(&mut out)
            .await
            .unwrap();
        assert_eq!(n, 16);
        assert_eq!(out, b"0123456789abcdef");
    }

    #[tokio::test]
    async fn read_error() {
        let data = Builder::new()
            .read(b"0123")
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let mut buf = [0u8; 128];
        let mut out = Vec::new();
        let e = FtpRetrieveDataTransfer::new(data, &mut buf, Duration::from_secs(1))
            .copy_to(&mut out)
            .await
            .unwrap_err();
        assert!(matches!(e, FtpFileRetrieveError::DataReadFailed(_)));
        assert_eq!(out, b"0123");
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout() {
        let data = Builder::new()
            .read(b"0123")
            .wait(Duration::from_secs(5))
            .build();
        let mut buf = [0u8; 128];
        let mut out = Vec::new();
        let e = FtpRetrieveDataTransfer::new(data, &mut buf, Duration::from_secs(1))
            .copy_to(&mut out)
            .await
            .unwrap_err();
        assert!(e.is_timeout());
    }
}
