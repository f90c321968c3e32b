use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::core::packet::Password;
use crate::error::{LoginError, Result};
use crate::store::account::{
    Account, AccountRecord, StoreState, ANONYMOUS_ID_LIMIT, REGISTERED_ID_LIMIT,
};

/// Registered accounts and identifier counters behind one exclusive lock.
///
/// Every mutation rewrites the whole document to `<path>.tmp` and renames it
/// over `<path>` before returning, so the file on disk always holds a
/// committed state. Without a path the store lives in memory only.
#[derive(Debug)]
pub struct CredentialStore {
    path: Option<PathBuf>,
    state: Mutex<StoreState>,
}

impl CredentialStore {
    /// Store without persistence
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Load the store from `path`, starting empty when the file does not exist.
    ///
    /// A file that is not valid JSON or breaks a store invariant is an error:
    /// the service must not start on top of it.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.is_file() {
            let data = fs::read(&path)?;
            let state: StoreState = serde_json::from_slice(&data)?;
            state.validate()?;
            info!(
                accounts = state.accounts.len(),
                next_anonymous_id = state.next_anonymous_id,
                next_registered_id = state.next_registered_id,
                "Loaded credential store"
            );
            state
        } else {
            info!("No credential store file, starting empty");
            StoreState::default()
        };

        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    /// `open` for a configured path, `in_memory` for none.
    pub fn from_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::open(path),
            None => Ok(Self::in_memory()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Take the store lock.
    ///
    /// Hold the guard across a lookup and the mutation that depends on it.
    pub fn lock(&self) -> Result<StoreGuard<'_>> {
        let state = self.state.lock().map_err(|_| LoginError::LockPoisoned)?;
        Ok(StoreGuard {
            state,
            path: self.path.as_deref(),
        })
    }

    pub fn allocate_anonymous(&self) -> Result<u32> {
        self.lock()?.allocate_anonymous()
    }

    pub fn lookup(&self, username: &str) -> Result<Option<Account>> {
        Ok(self.lock()?.lookup(username))
    }

    pub fn lookup_by_id(&self, user_id: u32) -> Result<Option<String>> {
        Ok(self.lock()?.lookup_by_id(user_id))
    }

    pub fn register(&self, username: &str, password: Password) -> Result<Account> {
        self.lock()?.register(username, password)
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> Result<StoreState> {
        Ok(self.lock()?.state.clone())
    }
}

/// Exclusive access to the store for the lifetime of the guard
pub struct StoreGuard<'a> {
    state: MutexGuard<'a, StoreState>,
    path: Option<&'a Path>,
}

impl StoreGuard<'_> {
    /// Hand out the next anonymous identifier.
    ///
    /// The counter wraps at `0x8000_0000`, so identifiers repeat over a long
    /// enough lifetime.
    pub fn allocate_anonymous(&mut self) -> Result<u32> {
        let user_id = self.state.next_anonymous_id;
        self.state.next_anonymous_id = (user_id + 1) % ANONYMOUS_ID_LIMIT;

        if let Err(e) = self.commit() {
            self.state.next_anonymous_id = user_id;
            return Err(e);
        }
        Ok(user_id)
    }

    pub fn lookup(&self, username: &str) -> Option<Account> {
        self.state.account(username)
    }

    pub fn lookup_by_id(&self, user_id: u32) -> Option<String> {
        self.state.username_of(user_id).map(str::to_string)
    }

    /// Create an account with the next registered identifier.
    ///
    /// Callers check that `username` is free first; an existing username is
    /// a broken precondition reported as [`LoginError::AccountExists`].
    pub fn register(&mut self, username: &str, password: Password) -> Result<Account> {
        if self.state.accounts.contains_key(username) {
            return Err(LoginError::AccountExists(username.to_string()));
        }

        let next = self.state.next_registered_id;
        if next >= REGISTERED_ID_LIMIT {
            return Err(LoginError::IdSpaceExhausted);
        }
        let user_id = u32::try_from(next).map_err(|_| LoginError::IdSpaceExhausted)?;

        self.state.next_registered_id = next + 1;
        self.state
            .accounts
            .insert(username.to_string(), AccountRecord { password, user_id });

        if let Err(e) = self.commit() {
            self.state.accounts.remove(username);
            self.state.next_registered_id = next;
            return Err(e);
        }

        debug!(username, user_id, "Registered account");
        Ok(Account {
            username: username.to_string(),
            password,
            user_id,
        })
    }

    fn commit(&self) -> Result<()> {
        match self.path {
            Some(path) => write_atomically(path, &self.state).map_err(|e| {
                warn!(error = %e, path = %path.display(), "Failed to persist credential store");
                e
            }),
            None => Ok(()),
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Replace `path` with `state`; on failure `path` keeps its previous content
/// and the temporary file is removed.
fn write_atomically(path: &Path, state: &StoreState) -> Result<()> {
    let tmp = tmp_path(path);
    let data = serde_json::to_vec(state)?;

    let written = write_synced(&tmp, &data).and_then(|()| fs::rename(&tmp, path));
    if let Err(e) = written {
        if tmp.is_file() {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                warn!(error = %cleanup, path = %tmp.display(), "Failed to remove temporary store file");
            }
        }
        return Err(e.into());
    }
    Ok(())
}

fn write_synced(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::store::account::REGISTERED_ID_BASE;

    fn pw(byte: u8) -> Password {
        Password::new([byte; 16])
    }

    #[test]
    fn test_anonymous_ids_count_up() {
        let store = CredentialStore::in_memory();
        for expected in 0..5 {
            assert_eq!(store.allocate_anonymous().unwrap(), expected);
        }
    }

    #[test]
    fn test_anonymous_counter_wraps() {
        let store = CredentialStore::in_memory();
        store.lock().unwrap().state.next_anonymous_id = ANONYMOUS_ID_LIMIT - 1;
        assert_eq!(store.allocate_anonymous().unwrap(), ANONYMOUS_ID_LIMIT - 1);
        assert_eq!(store.allocate_anonymous().unwrap(), 0);
    }

    #[test]
    fn test_register_assigns_increasing_ids() {
        let store = CredentialStore::in_memory();
        let alice = store.register("alice", pw(1)).unwrap();
        let bob = store.register("bob", pw(2)).unwrap();
        assert_eq!(alice.user_id, REGISTERED_ID_BASE);
        assert_eq!(bob.user_id, REGISTERED_ID_BASE + 1);
        assert_eq!(store.lookup("bob").unwrap(), Some(bob));
        assert_eq!(store.lookup_by_id(REGISTERED_ID_BASE).unwrap().as_deref(), Some("alice"));
        assert_eq!(store.lookup_by_id(7).unwrap(), None);
    }

    #[test]
    fn test_register_existing_is_precondition_violation() {
        let store = CredentialStore::in_memory();
        store.register("alice", pw(1)).unwrap();
        let err = store.register("alice", pw(2)).unwrap_err();
        assert!(matches!(err, LoginError::AccountExists(ref name) if name == "alice"));
        assert!(err.is_fatal());
        assert_eq!(store.snapshot().unwrap().next_registered_id, REGISTERED_ID_BASE as u64 + 1);
    }

    #[test]
    fn test_registered_space_exhaustion() {
        let store = CredentialStore::in_memory();
        store.lock().unwrap().state.next_registered_id = REGISTERED_ID_LIMIT - 1;
        let last = store.register("last", pw(1)).unwrap();
        assert_eq!(last.user_id, u32::MAX);
        assert!(matches!(
            store.register("overflow", pw(1)),
            Err(LoginError::IdSpaceExhausted)
        ));
        assert!(store.lookup("overflow").unwrap().is_none());
    }

    #[test]
    fn test_tmp_path_appends_suffix() {
        assert_eq!(
            tmp_path(Path::new("/var/lib/stb/db.json")),
            PathBuf::from("/var/lib/stb/db.json.tmp")
        );
    }
}
