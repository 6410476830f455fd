/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::error::Error;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::UpstreamAddr;

/// Source of the sockets used by an [`FtpClient`](crate::FtpClient).
#[async_trait]
pub trait FtpConnectionProvider<T: AsyncRead + AsyncWrite, E: Error> {
    async fn new_control_connection(&mut self, upstream: &UpstreamAddr) -> Result<T, E>;

    /// Connect to a passive mode data endpoint announced by the server.
    async fn new_data_connection(&mut self, server_addr: &UpstreamAddr) -> Result<T, E>;

    /// Start listening for an active mode data connection.
    ///
    /// Returns the address that should be announced to the server.
    async fn listen_data_connection(&mut self) -> Result<SocketAddr, E>;

    /// Accept the data connection from the server on the current listener.
    async fn accept_data_connection(&mut self) -> Result<T, E>;
}
