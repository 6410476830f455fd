/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::marker::PhantomData;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::control::{FtpCommand, FtpControlChannel};
use crate::error::{
    FtpAuthStatus, FtpCommandError, FtpConnectError, FtpFileListError, FtpFileRetrieveError,
    FtpFileRetrieveStartError, FtpSessionOpenError, FtpTransferSetupError,
};
use crate::log_msg;
use crate::transfer::{
    FtpLineDataReceiver, FtpLineDataTransfer, FtpRetrieveDataTransfer, FtpTransferType,
};
use crate::{FtpClientConfig, FtpConnectionProvider, FtpMode, Password, UpstreamAddr, Username};

/// Data connection state between the port negotiation and the transfer command.
enum PendingDataConnection<S> {
    Connected(S),
    Listening(SocketAddr),
}

pub struct FtpClient<CP, S, E>
where
    CP: FtpConnectionProvider<S, E>,
    S: AsyncRead + AsyncWrite + Unpin,
    E: std::error::Error,
{
    config: Arc<FtpClientConfig>,
    server: UpstreamAddr,
    conn_provider: CP,
    control: FtpControlChannel<S>,
    transfer_type: Option<FtpTransferType>,
    _phantom: PhantomData<E>,
}

impl<CP, S, E> FtpClient<CP, S, E>
where
    CP: FtpConnectionProvider<S, E>,
    S: AsyncRead + AsyncWrite + Unpin,
    E: std::error::Error,
{
    /// Open the control connection and wait for the server greeting.
    ///
    /// The provider is handed back on failure so that the caller may retry.
    pub async fn connect_to(
        server: UpstreamAddr,
        mut conn_provider: CP,
        config: &Arc<FtpClientConfig>,
    ) -> Result<Self, (FtpConnectError<E>, CP)> {
        let stream = match tokio::time::timeout(
            config.connect_timeout,
            conn_provider.new_control_connection(&server),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err((FtpConnectError::ConnectIoError(e), conn_provider)),
            Err(_) => return Err((FtpConnectError::ConnectTimedOut, conn_provider)),
        };

        let mut control = FtpControlChannel::new(stream, config.control.clone());
        match tokio::time::timeout(config.greeting_timeout, control.wait_greetings()).await {
            Ok(Ok(_)) => {}
            Ok(Err(FtpCommandError::ServiceNotAvailable)) => {
                return Err((FtpConnectError::ServiceNotAvailable, conn_provider));
            }
            Ok(Err(e)) => return Err((FtpConnectError::GreetingFailed(e), conn_provider)),
            Err(_) => return Err((FtpConnectError::GreetingTimedOut, conn_provider)),
        }
        log_msg!("connected to server {}", server);

        Ok(FtpClient {
            config: Arc::clone(config),
            server,
            conn_provider,
            control,
            transfer_type: None,
            _phantom: PhantomData,
        })
    }

    #[inline]
    pub fn server(&self) -> &UpstreamAddr {
        &self.server
    }

    pub async fn new_user_session(
        &mut self,
        username: Option<&Username>,
        password: Option<&Password>,
    ) -> Result<(), FtpSessionOpenError> {
        let status = match self.control.send_username(username).await? {
            FtpAuthStatus::NeedPassword => self.control.send_password(password).await?,
            status => status,
        };
        match status {
            FtpAuthStatus::LoggedIn => {
                log_msg!("logged in as {}", username.map(|u| u.as_original()).unwrap_or("anonymous"));
                Ok(())
            }
            FtpAuthStatus::NeedAccount => Err(FtpSessionOpenError::AccountIsNeeded),
            FtpAuthStatus::NotLoggedIn | FtpAuthStatus::NeedPassword => {
                Err(FtpSessionOpenError::NotLoggedIn)
            }
        }
    }

    /// Switch the representation type if it differs from the current one.
    pub async fn set_transfer_type(&mut self, t: FtpTransferType) -> Result<(), FtpCommandError> {
        if self.transfer_type == Some(t) {
            return Ok(());
        }
        self.control.request_transfer_type(t).await?;
        self.transfer_type = Some(t);
        Ok(())
    }

    /// Query the remote file size, `None` if the server does not know or support it.
    pub async fn fetch_file_size(&mut self, path: &str) -> Result<Option<u64>, FtpCommandError> {
        // SIZE is defined relative to the current representation type
        self.set_transfer_type(FtpTransferType::Image).await?;
        match self.control.request_size(path).await {
            Ok(size) => Ok(size),
            Err(
                FtpCommandError::CommandNotImplemented(_) | FtpCommandError::RejectedCommandSyntax(_),
            ) => {
                log_msg!("SIZE not usable for {}", path);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn passive_data_address(&mut self) -> Result<UpstreamAddr, FtpCommandError> {
        if self.config.always_try_epsv {
            match self.control.request_epsv_port().await {
                Ok(port) => return Ok(UpstreamAddr::new(self.server.host().clone(), port)),
                Err(
                    FtpCommandError::CommandNotImplemented(_)
                    | FtpCommandError::RejectedCommandSyntax(_),
                ) => {
                    log_msg!("EPSV refused by {}, fallback to PASV", self.server);
                }
                Err(e) => return Err(e),
            }
        }

        let addr = self.control.request_pasv_port().await?;
        Ok(UpstreamAddr::from(addr))
    }

    async fn prepare_data_connection(
        &mut self,
    ) -> Result<PendingDataConnection<S>, FtpTransferSetupError<E>> {
        match self.config.mode {
            FtpMode::Passive => {
                let addr = self.passive_data_address().await?;
                log_msg!("open passive data connection to {}", addr);
                match tokio::time::timeout(
                    self.config.connect_timeout,
                    self.conn_provider.new_data_connection(&addr),
                )
                .await
                {
                    Ok(Ok(stream)) => Ok(PendingDataConnection::Connected(stream)),
                    Ok(Err(e)) => Err(FtpTransferSetupError::ConnectIoError(e)),
                    Err(_) => Err(FtpTransferSetupError::ConnectTimedOut),
                }
            }
            FtpMode::Active => {
                let local_addr = self
                    .conn_provider
                    .listen_data_connection()
                    .await
                    .map_err(FtpTransferSetupError::ListenIoError)?;
                self.control.request_active_port(local_addr).await?;
                Ok(PendingDataConnection::Listening(local_addr))
            }
        }
    }

    async fn complete_data_connection(
        &mut self,
        pending: PendingDataConnection<S>,
    ) -> Result<S, FtpTransferSetupError<E>> {
        match pending {
            PendingDataConnection::Connected(stream) => Ok(stream),
            PendingDataConnection::Listening(local_addr) => {
                log_msg!("wait active data connection on {}", local_addr);
                match tokio::time::timeout(
                    self.config.connect_timeout,
                    self.conn_provider.accept_data_connection(),
                )
                .await
                {
                    Ok(Ok(stream)) => Ok(stream),
                    Ok(Err(e)) => Err(FtpTransferSetupError::AcceptIoError(e)),
                    Err(_) => Err(FtpTransferSetupError::AcceptTimedOut),
                }
            }
        }
    }

    /// Send RETR and return the established data connection.
    pub async fn retrieve_file_start(
        &mut self,
        path: &str,
    ) -> Result<S, FtpFileRetrieveStartError<E>> {
        self.set_transfer_type(FtpTransferType::Image).await?;
        let pending = self.prepare_data_connection().await?;
        self.control.start_retrieve(path).await?;
        let stream = self.complete_data_connection(pending).await?;
        Ok(stream)
    }

    /// Copy the data connection into `writer` and wait for the end reply.
    ///
    /// `buf` is the only intermediate storage used for the copy.
    pub async fn retrieve_file_receive<W>(
        &mut self,
        data_stream: S,
        writer: &mut W,
        buf: &mut [u8],
    ) -> Result<u64, FtpFileRetrieveError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let transfer =
            FtpRetrieveDataTransfer::new(data_stream, buf, self.config.transfer.data_read_timeout);
        let copied = transfer.copy_to(writer).await?;

        match tokio::time::timeout(
            self.config.transfer.end_wait_timeout,
            self.control.wait_retrieve(),
        )
        .await
        {
            Ok(Ok(_)) => {
                log_msg!("retrieved {} bytes", copied);
                Ok(copied)
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(FtpFileRetrieveError::TimeoutToWaitEndReply),
        }
    }

    /// Send LIST and return the established data connection.
    pub async fn list_directory_start(
        &mut self,
        path: Option<&str>,
    ) -> Result<S, FtpFileRetrieveStartError<E>> {
        self.set_transfer_type(FtpTransferType::Ascii).await?;
        let pending = self.prepare_data_connection().await?;
        self.control.start_list(path).await?;
        let stream = self.complete_data_connection(pending).await?;
        Ok(stream)
    }

    /// Deliver every listing line to `receiver`, returning the number of lines.
    pub async fn list_directory_receive<R>(
        &mut self,
        data_stream: S,
        receiver: &mut R,
    ) -> Result<usize, FtpFileListError>
    where
        R: FtpLineDataReceiver,
    {
        let transfer = FtpLineDataTransfer::new(data_stream, &self.config.transfer);
        let lines = match tokio::time::timeout(
            self.config.transfer.list_all_timeout,
            transfer.read_to_end(receiver),
        )
        .await
        {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(FtpFileListError::TimeoutToWaitAllData),
        };

        match tokio::time::timeout(
            self.config.transfer.end_wait_timeout,
            self.control.wait_list(),
        )
        .await
        {
            Ok(Ok(_)) => Ok(lines),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(FtpFileListError::TimeoutToWaitEndReply),
        }
    }

    pub async fn quit_and_close(mut self) -> Result<(), FtpCommandError> {
        let r = self.control.send_quit().await;
        log_msg!("closed connection to {}", self.server);
        match r {
            Ok(_) => Ok(()),
            Err(FtpCommandError::UnexpectedReplyCode(FtpCommand::QUIT, 421)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
