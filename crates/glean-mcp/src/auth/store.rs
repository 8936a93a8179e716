//! Per-user persistence for OAuth tokens and discovered server metadata.
//!
//! Files live under `<state-dir>/glean/`:
//! - `tokens.json`: the current [`TokenSet`]
//! - `oauth.json`: the last resolved [`OAuthServerConfig`] plus a `timestamp`
//!
//! Both are written owner-only (0600) on Unix and replaced via rename, so a
//! reader never observes a partially written file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::metadata::OAuthServerConfig;
use super::token::TokenSet;
use crate::error::{AuthError, ConfigError};

/// Directory name below the state root.
pub const APP_NAME: &str = "glean";

/// Cached server metadata is reused while strictly younger than this.
pub const METADATA_TTL: Duration = Duration::hours(6);

/// File permissions for state files (Unix only): owner read/write.
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Directory permissions (Unix only): owner read/write/execute.
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

/// The per-user state directory, `<state-root>/glean`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    /// Use an explicit directory (tests, `--state-dir`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$XDG_STATE_HOME/glean`, falling back to `~/.local/state/glean`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = match std::env::var_os("XDG_STATE_HOME").filter(|v| !v.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => directories::BaseDirs::new()
                .ok_or(ConfigError::NoHomeDir)?
                .home_dir()
                .join(".local")
                .join("state"),
        };
        Ok(Self::new(base.join(APP_NAME)))
    }

    /// Root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// `tokens.json`
    #[must_use]
    pub fn tokens_path(&self) -> PathBuf {
        self.root.join("tokens.json")
    }

    /// `oauth.json`
    #[must_use]
    pub fn oauth_path(&self) -> PathBuf {
        self.root.join("oauth.json")
    }

    /// Log directory.
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}

/// Storage abstraction for persisted OAuth tokens.
pub trait TokenStore: Send + Sync {
    /// Load saved tokens. Absent or unreadable state is `None`, never an error.
    fn load(&self) -> Option<TokenSet>;

    /// Persist tokens, replacing whatever was saved.
    fn save(&self, tokens: &TokenSet) -> Result<(), AuthError>;
}

/// File-backed token store (`tokens.json`).
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store tokens in the given state directory.
    #[must_use]
    pub fn new(state: &StateDir) -> Self {
        Self { path: state.tokens_path() }
    }

    /// Path of the token file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the token file if present.
    pub fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(store_error(&self.path, &e)),
        }
    }
}

impl TokenStore for FileTokenStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Option<TokenSet> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(error = %e, "Unable to read token file");
                return None;
            }
        };

        if content.trim().is_empty() {
            return None;
        }

        match serde_json::from_str::<TokenSet>(&content) {
            Ok(tokens) if !tokens.access_token.is_empty() => Some(tokens),
            Ok(_) => {
                warn!("Token file has an empty access token; ignoring it");
                None
            }
            Err(e) => {
                warn!(error = %e, "Token file is malformed; ignoring it");
                None
            }
        }
    }

    #[instrument(skip(self, tokens), fields(path = %self.path.display()))]
    fn save(&self, tokens: &TokenSet) -> Result<(), AuthError> {
        let body = serde_json::to_vec_pretty(tokens).map_err(|e| AuthError::Store {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        write_private(&self.path, &body).map_err(|e| store_error(&self.path, &e))?;
        debug!(expires_at = ?tokens.expires_at, "Saved tokens");
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedServerConfig {
    #[serde(flatten)]
    config: OAuthServerConfig,
    timestamp: DateTime<Utc>,
}

/// Short-lived cache of resolved OAuth server metadata (`oauth.json`).
#[derive(Debug, Clone)]
pub struct MetadataCache {
    path: PathBuf,
}

impl MetadataCache {
    /// Cache in the given state directory.
    #[must_use]
    pub fn new(state: &StateDir) -> Self {
        Self { path: state.oauth_path() }
    }

    /// Return the cached config for `issuer` + `client_id` if younger than [`METADATA_TTL`].
    #[must_use]
    pub fn load_fresh(
        &self,
        issuer: &str,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> Option<OAuthServerConfig> {
        let content = fs::read_to_string(&self.path).ok()?;
        let cached: CachedServerConfig = match serde_json::from_str(&content) {
            Ok(cached) => cached,
            Err(e) => {
                debug!(error = %e, "Ignoring malformed OAuth metadata cache");
                return None;
            }
        };

        if cached.config.issuer != issuer || cached.config.client_id != client_id {
            debug!("OAuth metadata cache is for a different issuer or client");
            return None;
        }
        if !is_fresh(cached.timestamp, now) {
            debug!(cached_at = %cached.timestamp, "OAuth metadata cache is stale");
            return None;
        }
        Some(cached.config)
    }

    /// Record a resolved config at `now`. The client secret is never written.
    pub fn save(&self, config: &OAuthServerConfig, now: DateTime<Utc>) -> Result<(), AuthError> {
        let cached = CachedServerConfig { config: config.clone(), timestamp: now };
        let body = serde_json::to_vec_pretty(&cached).map_err(|e| AuthError::Store {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        write_private(&self.path, &body).map_err(|e| store_error(&self.path, &e))
    }
}

/// Metadata cached at `cached_at` is fresh at `now` while its age is under [`METADATA_TTL`].
#[must_use]
pub fn is_fresh(cached_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - cached_at < METADATA_TTL
}

fn store_error(path: &Path, err: &std::io::Error) -> AuthError {
    AuthError::Store { path: path.to_path_buf(), reason: err.to_string() }
}

/// Write `body` to `path` owner-only, replacing the file via rename.
fn write_private(path: &Path, body: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let tmp = path.with_extension("json.tmp");
    {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(FILE_MODE);
        }
        let mut file = options.open(&tmp)?;
        file.write_all(body)?;
        file.sync_all()?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp, fs::Permissions::from_mode(FILE_MODE))?;
    }

    fs::rename(&tmp, path)
}

fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if dir.exists() {
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(DIR_MODE))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthType;
    use tempfile::TempDir;

    fn temp_state() -> (TempDir, StateDir) {
        let dir = TempDir::new().unwrap();
        let state = StateDir::new(dir.path().join("glean"));
        (dir, state)
    }

    fn server_config() -> OAuthServerConfig {
        OAuthServerConfig {
            base_url: "https://acme-be.glean.com/".into(),
            issuer: "https://auth.example.com".into(),
            client_id: "client-123".into(),
            client_secret: Some("secret".into()),
            device_authorization_endpoint: "https://auth.example.com/device".into(),
            token_endpoint: "https://auth.example.com/token".into(),
            auth_type: AuthType::OAuth,
            code_challenge_methods: vec!["S256".into()],
            pkce: None,
        }
    }

    #[test]
    fn test_load_missing_file() {
        let (_dir, state) = temp_state();
        assert!(FileTokenStore::new(&state).load().is_none());
    }

    #[test]
    fn test_load_soft_fails_on_bad_content() {
        let (_dir, state) = temp_state();
        let store = FileTokenStore::new(&state);
        fs::create_dir_all(state.path()).unwrap();

        for content in ["", "   \n", "not json", "{\"refreshToken\": \"r\"}", "{\"accessToken\": \"\"}", "[1,2]"] {
            fs::write(store.path(), content).unwrap();
            assert!(store.load().is_none(), "content {content:?} should load as None");
        }
    }

    #[test]
    fn test_save_creates_dirs() {
        let (_dir, state) = temp_state();
        let store = FileTokenStore::new(&state);
        store.save(&TokenSet::new("access", None, None)).unwrap();
        assert!(store.path().exists());
        assert!(!state.path().join("tokens.json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_save_sets_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, state) = temp_state();
        let store = FileTokenStore::new(&state);
        store.save(&TokenSet::new("access", None, None)).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_clear() {
        let (_dir, state) = temp_state();
        let store = FileTokenStore::new(&state);
        store.save(&TokenSet::new("access", None, None)).unwrap();
        store.clear().unwrap();
        assert!(store.load().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_metadata_cache_roundtrip_without_secret() {
        let (_dir, state) = temp_state();
        let cache = MetadataCache::new(&state);
        let now = Utc::now();
        cache.save(&server_config(), now).unwrap();

        let raw = fs::read_to_string(state.oauth_path()).unwrap();
        assert!(!raw.contains("clientSecret"), "client secret must not be cached: {raw}");
        assert!(raw.contains("timestamp"));

        let loaded = cache.load_fresh("https://auth.example.com", "client-123", now).unwrap();
        assert_eq!(loaded.token_endpoint, "https://auth.example.com/token");
        assert!(loaded.client_secret.is_none());
    }

    #[test]
    fn test_metadata_cache_key_mismatch() {
        let (_dir, state) = temp_state();
        let cache = MetadataCache::new(&state);
        let now = Utc::now();
        cache.save(&server_config(), now).unwrap();

        assert!(cache.load_fresh("https://other.example.com", "client-123", now).is_none());
        assert!(cache.load_fresh("https://auth.example.com", "other-client", now).is_none());
    }

    #[test]
    fn test_metadata_cache_freshness_boundary() {
        let now = Utc::now();
        assert!(is_fresh(now - Duration::hours(6) + Duration::milliseconds(1), now));
        assert!(!is_fresh(now - Duration::hours(6), now));
        assert!(!is_fresh(now - Duration::hours(7), now));

        let (_dir, state) = temp_state();
        let cache = MetadataCache::new(&state);
        cache.save(&server_config(), now - Duration::hours(6)).unwrap();
        assert!(cache.load_fresh("https://auth.example.com", "client-123", now).is_none());
    }

    #[test]
    fn test_state_dir_paths() {
        let state = StateDir::new("/tmp/state/glean");
        assert_eq!(state.tokens_path(), PathBuf::from("/tmp/state/glean/tokens.json"));
        assert_eq!(state.oauth_path(), PathBuf::from("/tmp/state/glean/oauth.json"));
        assert_eq!(state.logs_dir(), PathBuf::from("/tmp/state/glean/logs"));
    }
}
