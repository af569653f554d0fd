//! Session-token persistence and expiry tracking.
//!
//! The broker enforces both a rolling 24-hour validity and a hard midnight
//! cutoff, evaluated in the local time zone the token was issued in; a
//! session is valid until whichever bound comes first. Corrupted or missing
//! state is always treated as absence — callers are steered toward
//! re-authentication, never crashed.
//!
//! Session file format, one line: `<token>|<expires_at RFC3339>`
//! e.g. `58593|2025-10-26T00:00:00+05:30`

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_lock::RwLock;
use chrono::{DateTime, FixedOffset, Local, TimeZone};

use crate::error::TraderError;

/// An active broker session credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<FixedOffset>,
}

impl Session {
    /// `true` strictly before `expires_at`; `false` at or after it.
    pub fn is_valid_at(&self, now: DateTime<FixedOffset>) -> bool {
        now < self.expires_at
    }

    /// `expires_at - now`, clamped to zero once expired.
    pub fn time_until_expiry_at(&self, now: DateTime<FixedOffset>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Broker expiry rule: the earlier of `issued_at + 24h` and the next local
/// midnight after `issued_at`, in the offset the token was issued in.
pub fn compute_expiry(issued_at: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let rolling = issued_at + chrono::Duration::hours(24);
    let midnight = issued_at
        .date_naive()
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|naive| issued_at.offset().from_local_datetime(&naive).single())
        .unwrap_or(rolling);
    rolling.min(midnight)
}

/// Persists and validates the single active session.
///
/// The file is assumed single-writer (one client process); anything another
/// writer leaves behind that does not parse is reported as no session.
pub struct SessionStore {
    path: PathBuf,
    cached: RwLock<Option<Session>>,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compute the expiry for `issued_at`, persist `token|expiry`, and
    /// overwrite any prior session. The file is readable by the owner only.
    pub async fn save(
        &self,
        token: &str,
        issued_at: DateTime<FixedOffset>,
    ) -> Result<Session, TraderError> {
        let session = Session {
            token: token.to_string(),
            expires_at: compute_expiry(issued_at),
        };

        let line = format!("{}|{}\n", session.token, session.expires_at.to_rfc3339());
        fs::write(&self.path, line)
            .map_err(|e| TraderError::Configuration(format!("failed to save session file: {e}")))?;
        restrict_permissions(&self.path)
            .map_err(|e| TraderError::Configuration(format!("failed to restrict session file: {e}")))?;

        *self.cached.write().await = Some(session.clone());
        tracing::info!(expires_at = %session.expires_at, "session saved");
        Ok(session)
    }

    /// Read the persisted session. Missing or structurally invalid state
    /// yields `None`, never an error.
    pub async fn load(&self) -> Option<Session> {
        if let Some(session) = self.cached.read().await.clone() {
            return Some(session);
        }

        let session = read_session_file(&self.path)?;
        *self.cached.write().await = Some(session.clone());
        Some(session)
    }

    /// Whether a session exists and has not reached its expiry.
    pub async fn is_valid(&self) -> bool {
        match self.load().await {
            Some(session) => session.is_valid_at(local_now()),
            None => false,
        }
    }

    /// Time remaining before expiry, zero if absent or already expired.
    pub async fn time_until_expiry(&self) -> Duration {
        match self.load().await {
            Some(session) => session.time_until_expiry_at(local_now()),
            None => Duration::ZERO,
        }
    }

    /// Emit a warning when the session expires within `threshold_minutes`.
    ///
    /// An observability signal only — logged via `tracing::warn!` and
    /// returned for callers that want to surface it, never a gate.
    pub async fn warn_if_expiring_soon(&self, threshold_minutes: u64) -> Option<String> {
        let session = self.load().await?;
        let now = local_now();
        if !session.is_valid_at(now) {
            return None;
        }

        let remaining = session.time_until_expiry_at(now);
        if remaining >= Duration::from_secs(threshold_minutes * 60) {
            return None;
        }

        let total_minutes = remaining.as_secs() / 60;
        let (hours, minutes) = (total_minutes / 60, total_minutes % 60);
        let time_str = if hours > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{minutes}m")
        };
        let message =
            format!("Session expires in {time_str} — run the login flow to refresh it.");
        tracing::warn!("{message}");
        Some(message)
    }

    /// Delete the persisted session. Idempotent.
    pub async fn clear(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("failed to remove session file: {e}");
            }
        }
        *self.cached.write().await = None;
    }
}

fn local_now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

fn read_session_file(path: &Path) -> Option<Session> {
    let content = fs::read_to_string(path).ok()?;
    let line = content.trim();
    let (token, expiry_str) = line.split_once('|')?;
    if token.is_empty() {
        return None;
    }
    let expires_at = DateTime::parse_from_rfc3339(expiry_str.trim()).ok()?;
    Some(Session {
        token: token.to_string(),
        expires_at,
    })
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
