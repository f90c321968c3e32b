//! End-to-end tests over a real UDP socket

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use stnp_login::config::ServerConfig;
use stnp_login::core::packet::{FailureReason, LoginKind, LoginReply, Password, FIELD_LEN};
use stnp_login::error::LoginError;
use stnp_login::protocol::Dispatcher;
use stnp_login::service::client::LoginClient;
use stnp_login::store::CredentialStore;
use stnp_login::transport::udp;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct TestServer {
    addr: SocketAddr,
    shutdown: mpsc::Sender<()>,
    handle: JoinHandle<stnp_login::Result<()>>,
    store: Arc<CredentialStore>,
}

impl TestServer {
    async fn start() -> Self {
        let store = Arc::new(CredentialStore::in_memory());
        let socket = udp::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let config = ServerConfig {
            address: addr.to_string(),
            shutdown_timeout: Duration::from_secs(1),
            ..ServerConfig::default()
        };

        let (shutdown, shutdown_rx) = mpsc::channel(1);
        let dispatcher = Dispatcher::new(store.clone());
        let handle = tokio::spawn(async move {
            udp::serve_with_shutdown(socket, dispatcher, &config, shutdown_rx).await
        });

        Self {
            addr,
            shutdown,
            handle,
            store,
        }
    }

    async fn stop(self) {
        self.shutdown.send(()).await.unwrap();
        self.handle.await.unwrap().unwrap();
    }
}

async fn client(server: &TestServer) -> LoginClient {
    LoginClient::connect(server.addr)
        .await
        .unwrap()
        .with_timeout(Duration::from_secs(2))
}

#[tokio::test]
async fn test_anonymous_ids_increase() {
    let server = TestServer::start().await;
    let mut client = client(&server).await;

    for expected in 0..3 {
        assert_eq!(
            client.login_anonymous().await.unwrap(),
            LoginReply::logged_in(LoginKind::Anonymous, expected)
        );
    }

    server.stop().await;
}

#[tokio::test]
async fn test_account_flow_over_udp() {
    let server = TestServer::start().await;
    let mut client = client(&server).await;
    let password = Password::new([3; FIELD_LEN]);

    assert_eq!(
        client.create_account("abc", password).await.unwrap(),
        LoginReply::logged_in(LoginKind::CreateAccount, 0x8000_0000)
    );
    assert_eq!(
        client.create_account("abc", password).await.unwrap(),
        LoginReply::failed(FailureReason::UsernameTaken)
    );
    assert_eq!(
        client.login("abc", password).await.unwrap(),
        LoginReply::logged_in(LoginKind::Password, 0x8000_0000)
    );
    assert_eq!(
        client
            .login("abc", Password::new([4; FIELD_LEN]))
            .await
            .unwrap(),
        LoginReply::failed(FailureReason::InvalidCredentials)
    );
    assert_eq!(
        client.login("ab", password).await.unwrap(),
        LoginReply::failed(FailureReason::UsernameTooShort)
    );

    assert_eq!(
        server.store.lookup_by_id(0x8000_0000).unwrap().as_deref(),
        Some("abc")
    );
    server.stop().await;
}

#[tokio::test]
async fn test_garbage_gets_no_reply() {
    let server = TestServer::start().await;
    let mut client = LoginClient::connect(server.addr)
        .await
        .unwrap()
        .with_timeout(Duration::from_millis(300));

    client.send_raw(&[1, 2, 3]).await.unwrap();
    assert!(matches!(client.recv().await, Err(LoginError::Timeout)));

    // the service keeps answering afterwards
    let mut client = client.with_timeout(Duration::from_secs(2));
    assert_eq!(
        client.login_anonymous().await.unwrap(),
        LoginReply::logged_in(LoginKind::Anonymous, 0)
    );

    server.stop().await;
}

#[tokio::test]
async fn test_unknown_kind_over_udp() {
    let server = TestServer::start().await;
    let mut client = client(&server).await;

    client.send_raw(&[255, 9]).await.unwrap();
    assert_eq!(
        client.recv().await.unwrap(),
        LoginReply::failed(FailureReason::InvalidLoginMessage)
    );

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_clients() {
    let server = TestServer::start().await;
    let clients = 16u32;

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..clients {
        let mut client = client(&server).await;
        tasks.spawn(async move {
            client
                .create_account(&format!("user{i}"), Password::new([i as u8; FIELD_LEN]))
                .await
                .unwrap()
        });
    }

    let mut ids = Vec::new();
    while let Some(reply) = tasks.join_next().await {
        match reply.unwrap() {
            LoginReply::LoggedIn { kind, user_id } => {
                assert_eq!(kind, LoginKind::CreateAccount.as_byte());
                ids.push(user_id);
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }
    ids.sort_unstable();
    assert_eq!(ids, (0..clients).map(|i| 0x8000_0000 + i).collect::<Vec<_>>());

    server.stop().await;
}
