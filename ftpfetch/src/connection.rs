/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use ftpfetch_client::{
    FtpClient, FtpClientConfig, FtpConnectionProvider, FtpTransferType, Host, Password,
    UpstreamAddr, Username,
};

use crate::config::ClientConfig;
use crate::error::FetchError;

/// Creates one connection provider for each control connection.
pub trait ConnectionFactory: Send {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;
    type Error: std::error::Error + Send + Sync + 'static;
    type Provider: FtpConnectionProvider<Self::Stream, Self::Error> + Send;

    fn new_provider(&mut self) -> Self::Provider;
}

#[derive(Default)]
pub struct TcpConnectionFactory {
    bind_ip: Option<IpAddr>,
}

impl TcpConnectionFactory {
    pub fn set_bind_ip(&mut self, ip: IpAddr) {
        self.bind_ip = Some(ip);
    }
}

impl ConnectionFactory for TcpConnectionFactory {
    type Stream = TcpStream;
    type Error = io::Error;
    type Provider = TcpConnectionProvider;

    fn new_provider(&mut self) -> TcpConnectionProvider {
        TcpConnectionProvider {
            bind_ip: self.bind_ip,
            ..Default::default()
        }
    }
}

#[derive(Default)]
pub struct TcpConnectionProvider {
    bind_ip: Option<IpAddr>,
    remote_addr: Option<SocketAddr>,
    local_ip: Option<IpAddr>,
    listener: Option<TcpListener>,
}

fn new_socket_to(peer_ip: IpAddr, bind_ip: Option<IpAddr>) -> io::Result<TcpSocket> {
    let socket = match peer_ip {
        IpAddr::V4(_) => TcpSocket::new_v4()?,
        IpAddr::V6(_) => TcpSocket::new_v6()?,
    };
    if let Some(ip) = bind_ip {
        socket.bind(SocketAddr::new(ip, 0))?;
    }
    Ok(socket)
}

#[async_trait]
impl FtpConnectionProvider<TcpStream, io::Error> for TcpConnectionProvider {
    async fn new_control_connection(&mut self, upstream: &UpstreamAddr) -> io::Result<TcpStream> {
        let mut err = io::Error::new(io::ErrorKind::AddrNotAvailable, "no addr resolved");
        for addr in tokio::net::lookup_host(upstream.to_string()).await? {
            let socket = new_socket_to(addr.ip(), self.bind_ip)?;
            match socket.connect(addr).await {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    self.remote_addr = Some(addr);
                    self.local_ip = Some(stream.local_addr()?.ip());
                    debug!("control connection {} <-> {addr}", stream.local_addr()?);
                    return Ok(stream);
                }
                Err(e) => {
                    debug!("failed to connect to {addr}: {e}");
                    err = e;
                }
            }
        }

        Err(err)
    }

    async fn new_data_connection(&mut self, server: &UpstreamAddr) -> io::Result<TcpStream> {
        let ip = match server.host() {
            Host::Ip(ip) => *ip,
            // EPSV only carries a port, reuse the control peer
            Host::Domain(_) => match self.remote_addr {
                Some(addr) => addr.ip(),
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::AddrNotAvailable,
                        "no resolved upstream addr found",
                    ));
                }
            },
        };
        let data_addr = SocketAddr::new(ip, server.port());
        let socket = new_socket_to(ip, self.bind_ip)?;
        socket.connect(data_addr).await
    }

    async fn listen_data_connection(&mut self) -> io::Result<SocketAddr> {
        let Some(ip) = self.local_ip else {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "no control connection local address found",
            ));
        };
        let listener = TcpListener::bind(SocketAddr::new(ip, 0)).await?;
        let local_addr = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(local_addr)
    }

    async fn accept_data_connection(&mut self) -> io::Result<TcpStream> {
        let Some(listener) = self.listener.take() else {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "no listening data socket",
            ));
        };
        let (stream, peer) = listener.accept().await?;
        if let Some(remote) = self.remote_addr
            && remote.ip() != peer.ip()
        {
            warn!("active data connection from {peer} while server is {remote}");
        }
        Ok(stream)
    }
}

type Client<CF> = FtpClient<
    <CF as ConnectionFactory>::Provider,
    <CF as ConnectionFactory>::Stream,
    <CF as ConnectionFactory>::Error,
>;

/// Owns the single logged in control connection of a run.
pub struct ConnectionManager<CF: ConnectionFactory> {
    factory: CF,
    server: UpstreamAddr,
    username: Username,
    password: Password,
    protocol: Arc<FtpClientConfig>,
    client: Option<Client<CF>>,
}

impl<CF: ConnectionFactory> ConnectionManager<CF> {
    pub fn new(config: &ClientConfig, factory: CF) -> Self {
        ConnectionManager {
            factory,
            server: config.server().clone(),
            username: config.username().clone(),
            password: config.password().clone(),
            protocol: Arc::clone(config.protocol()),
            client: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    async fn connect(&mut self) -> Result<Client<CF>, FetchError> {
        let provider = self.factory.new_provider();
        let mut client = FtpClient::connect_to(self.server.clone(), provider, &self.protocol)
            .await
            .map_err(|(e, _)| FetchError::from(e))?;

        if let Err(e) = client
            .new_user_session(Some(&self.username), Some(&self.password))
            .await
        {
            if e.is_rejected() {
                // the control connection is still usable for a clean QUIT
                if let Err(e) = client.quit_and_close().await {
                    debug!("QUIT after login failure: {e}");
                }
            }
            return Err(e.into());
        }
        client.set_transfer_type(FtpTransferType::Image).await?;

        info!("logged in to {} as {}", self.server, self.username);
        Ok(client)
    }

    /// Return the current session, establishing a new one if needed.
    pub async fn session(&mut self) -> Result<&mut Client<CF>, FetchError> {
        let client = match self.client.take() {
            Some(client) => client,
            None => self.connect().await?,
        };
        Ok(self.client.insert(client))
    }

    /// Drop a session whose control connection is no longer in a known state.
    pub fn discard(&mut self) {
        if self.client.take().is_some() {
            debug!("dropped control connection to {}", self.server);
        }
    }

    /// Close the session with QUIT. Failures are only logged.
    pub async fn release(&mut self) {
        if let Some(client) = self.client.take() {
            match client.quit_and_close().await {
                Ok(_) => debug!("disconnected from {}", self.server),
                Err(e) => warn!("failed to quit from {}: {e}", self.server),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::str::FromStr;
    use std::sync::Mutex;
    use std::time::Duration;

    use ftpfetch_client::FtpMode;
    use tokio_test::io::{Builder, Mock};

    /// Streams handed out in order, shared by all providers of one factory.
    #[derive(Default)]
    pub(crate) struct MockScript {
        pub(crate) control: VecDeque<Mock>,
        pub(crate) data: VecDeque<Mock>,
        pub(crate) data_addrs: Vec<UpstreamAddr>,
        pub(crate) providers: usize,
        pub(crate) accept_delay: Option<Duration>,
    }

    #[derive(Clone, Default)]
    pub(crate) struct MockFactory {
        pub(crate) script: Arc<Mutex<MockScript>>,
    }

    impl MockFactory {
        pub(crate) fn new(control: Vec<Mock>, data: Vec<Mock>) -> Self {
            MockFactory {
                script: Arc::new(Mutex::new(MockScript {
                    control: control.into(),
                    data: data.into(),
                    ..Default::default()
                })),
            }
        }

        pub(crate) fn providers(&self) -> usize {
            self.script.lock().unwrap().providers
        }

        pub(crate) fn data_addrs(&self) -> Vec<UpstreamAddr> {
            self.script.lock().unwrap().data_addrs.clone()
        }

        /// Hold every active mode accept for `delay` before handing out a stream.
        pub(crate) fn delay_accept(&self, delay: Duration) {
            self.script.lock().unwrap().accept_delay = Some(delay);
        }
    }

    pub(crate) struct MockProvider {
        script: Arc<Mutex<MockScript>>,
    }

    fn no_stream() -> io::Error {
        io::Error::new(io::ErrorKind::ConnectionRefused, "no mock stream left")
    }

    #[async_trait]
    impl FtpConnectionProvider<Mock, io::Error> for MockProvider {
        async fn new_control_connection(&mut self, _upstream: &UpstreamAddr) -> io::Result<Mock> {
            self.script
                .lock()
                .unwrap()
                .control
                .pop_front()
                .ok_or_else(no_stream)
        }

        async fn new_data_connection(&mut self, server_addr: &UpstreamAddr) -> io::Result<Mock> {
            let mut script = self.script.lock().unwrap();
            script.data_addrs.push(server_addr.clone());
            script.data.pop_front().ok_or_else(no_stream)
        }

        async fn listen_data_connection(&mut self) -> io::Result<SocketAddr> {
            Ok(SocketAddr::from_str("127.0.0.1:50000").unwrap())
        }

        async fn accept_data_connection(&mut self) -> io::Result<Mock> {
            let delay = self.script.lock().unwrap().accept_delay;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.script
                .lock()
                .unwrap()
                .data
                .pop_front()
                .ok_or_else(no_stream)
        }
    }

    impl ConnectionFactory for MockFactory {
        type Stream = Mock;
        type Error = io::Error;
        type Provider = MockProvider;

        fn new_provider(&mut self) -> MockProvider {
            self.script.lock().unwrap().providers += 1;
            MockProvider {
                script: Arc::clone(&self.script),
            }
        }
    }

    pub(crate) fn client_config() -> ClientConfig {
        let mut builder = ClientConfig::builder();
        builder.set_server("ftp.example.com");
        builder.set_username("user");
        builder.set_password("pass");
        builder.build().unwrap()
    }

    pub(crate) fn active_client_config() -> ClientConfig {
        let mut builder = ClientConfig::builder();
        builder.set_server("ftp.example.com");
        builder.set_username("user");
        builder.set_password("pass");
        builder.set_mode(FtpMode::Active);
        builder.build().unwrap()
    }

    /// Greeting, login and TYPE I.
    pub(crate) fn login_script(builder: &mut Builder) -> &mut Builder {
        builder
            .read(b"220 FTP server ready\r\n")
            .write(b"USER user\r\n")
            .read(b"331 password required\r\n")
            .write(b"PASS pass\r\n")
            .read(b"230 logged in\r\n")
            .write(b"TYPE I\r\n")
            .read(b"200 type set to I\r\n")
    }

    #[tokio::test]
    async fn session_is_reused() {
        let control = login_script(&mut Builder::new())
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();
        let factory = MockFactory::new(vec![control], vec![]);
        let mut manager = ConnectionManager::new(&client_config(), factory.clone());

        manager.session().await.unwrap();
        manager.session().await.unwrap();
        assert!(manager.is_connected());
        assert_eq!(factory.providers(), 1);

        manager.release().await;
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn reconnect_after_discard() {
        let first = login_script(&mut Builder::new()).build();
        let second = login_script(&mut Builder::new())
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();
        let factory = MockFactory::new(vec![first, second], vec![]);
        let mut manager = ConnectionManager::new(&client_config(), factory.clone());

        manager.session().await.unwrap();
        manager.discard();
        manager.session().await.unwrap();
        assert_eq!(factory.providers(), 2);
        manager.release().await;
    }

    #[tokio::test]
    async fn authentication_rejected() {
        let control = Builder::new()
            .read(b"220 FTP server ready\r\n")
            .write(b"USER user\r\n")
            .read(b"331 password required\r\n")
            .write(b"PASS pass\r\n")
            .read(b"530 login incorrect\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();
        let factory = MockFactory::new(vec![control], vec![]);
        let mut manager = ConnectionManager::new(&client_config(), factory);

        let e = manager.session().await.err().unwrap();
        assert_eq!(e.kind(), "AuthenticationError");
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn quit_failure_is_ignored() {
        let control = login_script(&mut Builder::new())
            .write(b"QUIT\r\n")
            .read(b"500 what\r\n")
            .build();
        let factory = MockFactory::new(vec![control], vec![]);
        let mut manager = ConnectionManager::new(&client_config(), factory);

        manager.session().await.unwrap();
        manager.release().await;
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn connect_failure() {
        let factory = MockFactory::new(vec![], vec![]);
        let mut manager = ConnectionManager::new(&client_config(), factory);
        let e = manager.session().await.err().unwrap();
        assert_eq!(e.kind(), "ConnectionError");
    }

    #[tokio::test]
    async fn tcp_passive_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut provider = TcpConnectionFactory::default().new_provider();

        let upstream = UpstreamAddr::from(addr);
        let (control, accepted) =
            tokio::join!(provider.new_control_connection(&upstream), listener.accept());
        control.unwrap();
        accepted.unwrap();

        // EPSV style address: host is taken from the control connection
        let data_upstream = UpstreamAddr::new(Host::Domain("localhost".to_string()), addr.port());
        let (data, accepted) =
            tokio::join!(provider.new_data_connection(&data_upstream), listener.accept());
        data.unwrap();
        accepted.unwrap();
    }

    #[tokio::test]
    async fn tcp_active_listen() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut provider = TcpConnectionFactory::default().new_provider();
        assert!(provider.listen_data_connection().await.is_err());

        let upstream = UpstreamAddr::from(addr);
        let (control, accepted) =
            tokio::join!(provider.new_control_connection(&upstream), listener.accept());
        control.unwrap();
        accepted.unwrap();

        let data_addr = provider.listen_data_connection().await.unwrap();
        assert_eq!(data_addr.ip(), addr.ip());
        let (accepted, connected) = tokio::join!(
            provider.accept_data_connection(),
            TcpStream::connect(data_addr)
        );
        accepted.unwrap();
        connected.unwrap();
    }
}
