//! Observability and Metrics
//!
//! Counters for datagrams, logins and lookups handled by the login service.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Global metrics collector for login operations
#[derive(Debug)]
pub struct Metrics {
    /// Datagrams received on the UDP socket
    pub datagrams_received: AtomicU64,
    /// Bytes received on the UDP socket
    pub bytes_received: AtomicU64,
    /// Datagrams dropped without a reply
    pub datagrams_dropped: AtomicU64,
    /// Replies sent
    pub replies_sent: AtomicU64,
    /// Bytes sent
    pub bytes_sent: AtomicU64,
    /// Anonymous identities handed out
    pub anonymous_logins: AtomicU64,
    /// Successful password logins
    pub password_logins: AtomicU64,
    /// Accounts registered, explicitly or on first password login
    pub accounts_created: AtomicU64,
    /// Login-failed replies
    pub login_failures: AtomicU64,
    /// Requests abandoned on a store error
    pub internal_errors: AtomicU64,
    /// Username lookups served over REST
    pub lookups: AtomicU64,
    /// REST requests refused by the allow-list
    pub lookups_denied: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            datagrams_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            datagrams_dropped: AtomicU64::new(0),
            replies_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            anonymous_logins: AtomicU64::new(0),
            password_logins: AtomicU64::new(0),
            accounts_created: AtomicU64::new(0),
            login_failures: AtomicU64::new(0),
            internal_errors: AtomicU64::new(0),
            lookups: AtomicU64::new(0),
            lookups_denied: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a datagram received
    pub fn datagram_received(&self, byte_count: u64) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a datagram dropped
    pub fn datagram_dropped(&self) {
        self.datagrams_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a reply sent
    pub fn reply_sent(&self, byte_count: u64) {
        self.replies_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn anonymous_login(&self) {
        self.anonymous_logins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn password_login(&self) {
        self.password_logins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn account_created(&self) {
        self.accounts_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn login_failed(&self) {
        self.login_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn internal_error(&self) {
        self.internal_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn lookup(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn lookup_denied(&self) {
        self.lookups_denied.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            datagrams_dropped: self.datagrams_dropped.load(Ordering::Relaxed),
            replies_sent: self.replies_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            anonymous_logins: self.anonymous_logins.load(Ordering::Relaxed),
            password_logins: self.password_logins.load(Ordering::Relaxed),
            accounts_created: self.accounts_created.load(Ordering::Relaxed),
            login_failures: self.login_failures.load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
            lookups: self.lookups.load(Ordering::Relaxed),
            lookups_denied: self.lookups_denied.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            datagrams_received = snapshot.datagrams_received,
            bytes_received = snapshot.bytes_received,
            datagrams_dropped = snapshot.datagrams_dropped,
            replies_sent = snapshot.replies_sent,
            bytes_sent = snapshot.bytes_sent,
            anonymous_logins = snapshot.anonymous_logins,
            password_logins = snapshot.password_logins,
            accounts_created = snapshot.accounts_created,
            login_failures = snapshot.login_failures,
            internal_errors = snapshot.internal_errors,
            lookups = snapshot.lookups,
            lookups_denied = snapshot.lookups_denied,
            uptime_seconds = snapshot.uptime_seconds,
            "Login service metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub datagrams_received: u64,
    pub bytes_received: u64,
    pub datagrams_dropped: u64,
    pub replies_sent: u64,
    pub bytes_sent: u64,
    pub anonymous_logins: u64,
    pub password_logins: u64,
    pub accounts_created: u64,
    pub login_failures: u64,
    pub internal_errors: u64,
    pub lookups: u64,
    pub lookups_denied: u64,
    pub uptime_seconds: u64,
}

static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

/// Get the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    &METRICS
}

/// Initialize metrics collection (call once at startup)
pub fn init_metrics() {
    let _ = global_metrics();
    info!("Metrics collection initialized");
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_us = duration.as_micros() as u64,
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = Metrics::new();
        metrics.datagram_received(34);
        metrics.datagram_received(2);
        metrics.reply_sent(7);
        metrics.login_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.datagrams_received, 2);
        assert_eq!(snapshot.bytes_received, 36);
        assert_eq!(snapshot.replies_sent, 1);
        assert_eq!(snapshot.bytes_sent, 7);
        assert_eq!(snapshot.login_failures, 1);
        assert_eq!(snapshot.accounts_created, 0);
    }
}
