/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use super::FtpControlChannel;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FtpCommand(&'static str);

impl fmt::Display for FtpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

macro_rules! ftp_commands {
    (
        $(
            $(#[$docs:meta])*
            ($konst:ident, $phrase:expr);
        )+
    ) => {
        impl FtpCommand {
        $(
            $(#[$docs])*
            pub const $konst: FtpCommand = FtpCommand($phrase);
        )+
        }
    };
}

ftp_commands! {
    /// a fake command for greeting
    (GREETING, "-");
    (USER, "USER");
    (PASS, "PASS");
    (QUIT, "QUIT");
    (TYPE_A, "TYPE A");
    (TYPE_I, "TYPE I");
    (PASV, "PASV");
    (EPSV, "EPSV");
    (PORT, "PORT");
    (EPRT, "EPRT");
    (SIZE, "SIZE");
    (LIST, "LIST");
    (RETR, "RETR");
}

/// Format the argument of PORT (IPv4) or EPRT (IPv6) for a local listen address.
pub(super) fn active_port_param(addr: SocketAddr) -> (FtpCommand, String) {
    match addr.ip() {
        IpAddr::V4(ip4) => {
            let [h1, h2, h3, h4] = ip4.octets();
            let port = addr.port();
            (
                FtpCommand::PORT,
                format!("{h1},{h2},{h3},{h4},{},{}", port >> 8, port & 0xFF),
            )
        }
        IpAddr::V6(ip6) => (FtpCommand::EPRT, format!("|2|{ip6}|{}|", addr.port())),
    }
}

impl<T> FtpControlChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    async fn send_all(&mut self, buf: &[u8]) -> io::Result<()> {
        #[cfg(feature = "log-raw-io")]
        crate::debug::log_cmd(buf);

        self.stream.write_all(buf).await?;
        self.stream.flush().await?;
        Ok(())
    }

    pub(super) async fn send_cmd(&mut self, cmd: FtpCommand) -> io::Result<()> {
        let mut buf: Vec<u8> = Vec::with_capacity(cmd.0.len() + 2);
        buf.extend_from_slice(cmd.0.as_bytes());
        buf.extend_from_slice(b"\r\n");

        self.send_all(&buf).await
    }

    pub(super) async fn send_cmd1(&mut self, cmd: FtpCommand, param1: &str) -> io::Result<()> {
        if param1.bytes().any(|b| matches!(b, b'\r' | b'\n' | b'\0')) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("line break in {cmd} argument"),
            ));
        }
        let mut buf: Vec<u8> = Vec::with_capacity(cmd.0.len() + 1 + param1.len() + 2);
        buf.extend_from_slice(cmd.0.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(param1.as_bytes());
        buf.extend_from_slice(b"\r\n");

        self.send_all(&buf).await
    }
}
