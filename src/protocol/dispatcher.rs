use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::core::packet::{
    Credentials, FailureReason, LoginKind, LoginReply, LoginRequest, LOGIN_MSG_TYPE,
};
use crate::error::{constants, LoginError, Result};
use crate::store::CredentialStore;
use crate::utils::metrics::{global_metrics, Timer};

/// Usernames shorter than this are refused.
pub const MIN_USERNAME_LEN: usize = 3;

/// How the header of a datagram reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Header {
    Known(LoginKind),
    Unknown(u8),
}

/// Turns login datagrams into replies, reading and updating the credential store.
///
/// Holds no per-client state: one datagram in, at most one reply out.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    store: Arc<CredentialStore>,
}

impl Dispatcher {
    pub fn new(store: Arc<CredentialStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Handle one datagram from `peer`.
    ///
    /// Store failures are logged here and answered with silence, so the
    /// caller only ever sends a well-formed reply or nothing.
    pub fn handle(&self, datagram: &[u8], peer: SocketAddr) -> Option<LoginReply> {
        debug!(%peer, len = datagram.len(), "Got message");
        global_metrics().datagram_received(datagram.len() as u64);

        match self.dispatch(datagram) {
            Ok(reply) => reply,
            Err(e) => {
                if e.is_fatal() {
                    error!(%peer, error = %e, "Store invariant violated when handling message");
                } else {
                    error!(%peer, error = %e, "Error when handling message");
                }
                global_metrics().internal_error();
                None
            }
        }
    }

    /// Classify and process a datagram.
    ///
    /// `Ok(None)` means the datagram is dropped without a reply.
    pub fn dispatch(&self, datagram: &[u8]) -> Result<Option<LoginReply>> {
        let _timer = Timer::start("dispatch");

        let kind = match read_header(datagram) {
            Ok(Header::Known(kind)) => kind,
            Ok(Header::Unknown(byte)) => {
                debug!(kind = byte, "Unknown login method");
                return Ok(Some(refuse(FailureReason::InvalidLoginMessage)));
            }
            Err(e) => {
                debug!(error = %e, "Ignoring datagram");
                global_metrics().datagram_dropped();
                return Ok(None);
            }
        };

        match kind {
            LoginKind::Anonymous => self.login_anonymous().map(Some),
            LoginKind::Password | LoginKind::CreateAccount => {
                self.login_with_credentials(kind, datagram)
            }
        }
    }

    /// Subtypes carrying a username and password: the full frame is required.
    fn login_with_credentials(
        &self,
        kind: LoginKind,
        datagram: &[u8],
    ) -> Result<Option<LoginReply>> {
        let request = match LoginRequest::from_bytes(datagram) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, kind = kind.name(), "Ill-formed login request");
                global_metrics().datagram_dropped();
                return Ok(None);
            }
        };
        let credentials = match check_credentials(&request) {
            Ok(credentials) => credentials,
            Err(reason) => return Ok(Some(refuse(reason))),
        };

        if kind == LoginKind::CreateAccount {
            self.create_account(credentials).map(Some)
        } else {
            self.login_password(credentials).map(Some)
        }
    }

    fn login_anonymous(&self) -> Result<LoginReply> {
        let user_id = self.store.allocate_anonymous()?;
        global_metrics().anonymous_login();
        Ok(LoginReply::logged_in(LoginKind::Anonymous, user_id))
    }

    /// Log in with a password, registering unknown usernames on the fly.
    fn login_password(&self, credentials: Credentials) -> Result<LoginReply> {
        let account = {
            let mut store = self.store.lock()?;
            match store.lookup(&credentials.username) {
                Some(account) => account,
                None => {
                    info!(username = %credentials.username, "New user");
                    let account = store.register(&credentials.username, credentials.password)?;
                    global_metrics().account_created();
                    account
                }
            }
        };

        if account.password == credentials.password {
            global_metrics().password_login();
            Ok(LoginReply::logged_in(LoginKind::Password, account.user_id))
        } else {
            debug!(username = %credentials.username, "Password mismatch");
            Ok(refuse(FailureReason::InvalidCredentials))
        }
    }

    fn create_account(&self, credentials: Credentials) -> Result<LoginReply> {
        let mut store = self.store.lock()?;
        if store.lookup(&credentials.username).is_some() {
            return Ok(refuse(FailureReason::UsernameTaken));
        }

        info!(username = %credentials.username, "New user");
        store.register(&credentials.username, credentials.password)?;
        global_metrics().account_created();

        match store.lookup(&credentials.username) {
            Some(account) if account.password == credentials.password => Ok(
                LoginReply::logged_in(LoginKind::CreateAccount, account.user_id),
            ),
            _ => {
                error!(username = %credentials.username, "Failed to create account");
                Ok(refuse(FailureReason::AccountCreationFailed))
            }
        }
    }
}

fn read_header(datagram: &[u8]) -> Result<Header> {
    if datagram.len() < 2 {
        return Err(LoginError::MalformedFrame(constants::ERR_SHORT_FRAME));
    }
    if datagram[0] != LOGIN_MSG_TYPE {
        return Err(LoginError::MalformedFrame(constants::ERR_WRONG_TAG));
    }
    Ok(match LoginKind::try_from(datagram[1]) {
        Ok(kind) => Header::Known(kind),
        Err(_) => Header::Unknown(datagram[1]),
    })
}

fn check_credentials(request: &LoginRequest) -> std::result::Result<Credentials, FailureReason> {
    let credentials = request.credentials().map_err(|e| {
        warn!(error = %e, "Ill-formed login request");
        FailureReason::MalformedCredentials
    })?;
    if credentials.username.chars().count() < MIN_USERNAME_LEN {
        return Err(FailureReason::UsernameTooShort);
    }
    Ok(credentials)
}

fn refuse(reason: FailureReason) -> LoginReply {
    global_metrics().login_failed();
    LoginReply::failed(reason)
}
