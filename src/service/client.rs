use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio_util::udp::UdpFramed;
use tracing::{debug, instrument};

use crate::core::codec::ClientCodec;
use crate::core::packet::{LoginKind, LoginReply, LoginRequest, Password};
use crate::error::{constants, LoginError, Result};
use crate::utils::timeout::{with_timeout_error, DEFAULT_TIMEOUT};

/// UDP client for the login extension
///
/// Sends one request and waits for the matching reply. UDP gives no delivery
/// guarantee, so a [`LoginError::Timeout`] means "retry", not "refused".
pub struct LoginClient {
    framed: UdpFramed<ClientCodec>,
    server: SocketAddr,
    timeout: Duration,
}

impl LoginClient {
    /// Bind an ephemeral local port for talking to `server`
    #[instrument]
    pub async fn connect(server: SocketAddr) -> Result<Self> {
        let local: SocketAddr = if server.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local).await?;
        debug!(local = %socket.local_addr()?, "Login client bound");

        Ok(Self {
            framed: UdpFramed::new(socket, ClientCodec),
            server,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Set how long to wait for each reply
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    pub async fn login_anonymous(&mut self) -> Result<LoginReply> {
        self.request(LoginRequest::anonymous()).await
    }

    /// Password login; unknown usernames are registered by the server
    pub async fn login(&mut self, username: &str, password: Password) -> Result<LoginReply> {
        let request = LoginRequest::with_credentials(LoginKind::Password, username, password)?;
        self.request(request).await
    }

    pub async fn create_account(
        &mut self,
        username: &str,
        password: Password,
    ) -> Result<LoginReply> {
        let request = LoginRequest::with_credentials(LoginKind::CreateAccount, username, password)?;
        self.request(request).await
    }

    /// Send a request and wait for the reply
    pub async fn request(&mut self, request: LoginRequest) -> Result<LoginReply> {
        self.framed.send((request, self.server)).await?;
        self.recv().await
    }

    /// Send arbitrary bytes, bypassing the codec
    pub async fn send_raw(&mut self, datagram: &[u8]) -> Result<()> {
        self.framed.get_ref().send_to(datagram, self.server).await?;
        Ok(())
    }

    /// Wait for the next reply from the server, ignoring other senders
    pub async fn recv(&mut self) -> Result<LoginReply> {
        let server = self.server;
        let framed = &mut self.framed;
        with_timeout_error(
            async move {
                while let Some(received) = framed.next().await {
                    let (reply, from) = received?;
                    if from == server {
                        return Ok(reply);
                    }
                    debug!(%from, "Ignoring datagram from unexpected peer");
                }
                Err(LoginError::TransportError(constants::ERR_NO_REPLY.to_string()))
            },
            self.timeout,
        )
        .await
    }
}
