use super::KeyValueStore;
use crate::config::normalize_server_url;
use crate::error::StoreError;
use crate::session::{Locale, PartitionKey, Session};
use parkops_proto::Operator;

const SERVER_URL_KEY: &str = "server_url";
const AUTH_TOKEN_KEY: &str = "auth_token";
const USER_DATA_KEY: &str = "user_data";
const LANGUAGE_KEY: &str = "app_language";

/// Device-local credentials and preferences: the selected server, the login
/// session and the display language.
pub struct CredentialVault<S> {
    backend: S,
}

impl<S: KeyValueStore> CredentialVault<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    /// Read a key, treating a failed read as absent. The broken entry is
    /// removed so the next read starts clean.
    fn read_or_clear(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, error = %err, "credential read failed, clearing entry");
                if let Err(err) = self.backend.delete(key) {
                    tracing::warn!(key, error = %err, "failed to clear credential entry");
                }
                None
            }
        }
    }

    pub fn server_url(&self) -> Option<String> {
        self.read_or_clear(SERVER_URL_KEY)
            .filter(|url| !url.trim().is_empty())
    }

    /// Store the server URL in normalized form and return what was stored.
    pub fn set_server_url(&self, url: &str) -> Result<String, StoreError> {
        let normalized = normalize_server_url(url);
        self.backend.set(SERVER_URL_KEY, &normalized)?;
        Ok(normalized)
    }

    /// The stored login session, if both the token and the operator record
    /// are present and readable.
    pub fn session(&self) -> Option<Session> {
        let token = self.read_or_clear(AUTH_TOKEN_KEY)?;
        let raw_user = self.read_or_clear(USER_DATA_KEY)?;
        match serde_json::from_str::<Operator>(&raw_user) {
            Ok(operator) => Some(Session::new(token, operator)),
            Err(err) => {
                tracing::warn!(error = %err, "stored operator record is corrupt, clearing it");
                if let Err(err) = self.backend.delete(USER_DATA_KEY) {
                    tracing::warn!(error = %err, "failed to clear operator record");
                }
                None
            }
        }
    }

    pub fn save_session(&self, session: &Session) -> Result<(), StoreError> {
        let user = serde_json::to_string(&session.operator).map_err(|source| {
            StoreError::Encode {
                key: USER_DATA_KEY.to_string(),
                source,
            }
        })?;
        self.backend.set(AUTH_TOKEN_KEY, &session.token)?;
        self.backend.set(USER_DATA_KEY, &user)?;
        tracing::info!(operator = %session.operator.id, "session saved");
        Ok(())
    }

    /// Forget the login session and drop the operator's mission partition.
    /// Returns the session that was cleared, if any.
    pub fn clear_session(&self) -> Result<Option<Session>, StoreError> {
        let previous = self.session();
        if let Some(session) = &previous {
            let partition = PartitionKey::for_operator(&session.operator);
            self.backend.delete(partition.as_str())?;
        }
        self.backend.delete(AUTH_TOKEN_KEY)?;
        self.backend.delete(USER_DATA_KEY)?;
        Ok(previous)
    }

    /// The stored language preference, if one was chosen.
    pub fn stored_locale(&self) -> Option<Locale> {
        self.read_or_clear(LANGUAGE_KEY)
            .and_then(|raw| raw.parse().ok())
    }

    /// Display language, `en` when unset or unrecognized.
    pub fn locale(&self) -> Locale {
        self.stored_locale().unwrap_or_default()
    }

    pub fn set_locale(&self, locale: Locale) -> Result<(), StoreError> {
        self.backend.set(LANGUAGE_KEY, locale.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{LocalMissionStore, MemoryStore};
    use parkops_proto::{Mission, MissionPayload};
    use std::sync::Arc;

    fn session() -> Session {
        Session::new("tok-123", Operator::new("42", "nadia"))
    }

    #[test]
    fn server_url_is_normalized() {
        let vault = CredentialVault::new(MemoryStore::new());
        assert_eq!(vault.server_url(), None);
        let stored = vault.set_server_url("  https://ops.example.com/  ").unwrap();
        assert_eq!(stored, "https://ops.example.com");
        assert_eq!(vault.server_url().as_deref(), Some("https://ops.example.com"));
    }

    #[test]
    fn session_round_trip_and_logout_clears_partition() {
        let backend = Arc::new(MemoryStore::new());
        let vault = CredentialVault::new(backend.clone());
        let missions = LocalMissionStore::new(backend.clone());

        let other = PartitionKey::for_operator(&Operator::new("7", "someone"));
        missions
            .write_all(&other, &[Mission::new("x", MissionPayload::default())])
            .unwrap();

        vault.save_session(&session()).unwrap();
        let loaded = vault.session().unwrap();
        assert_eq!(loaded, session());

        let key = loaded.partition_key();
        missions
            .write_all(&key, &[Mission::new("m-1", MissionPayload::default())])
            .unwrap();

        let cleared = vault.clear_session().unwrap();
        assert_eq!(cleared, Some(session()));
        assert!(vault.session().is_none());
        assert!(missions.read_all(&key).unwrap().is_empty());
        assert_eq!(missions.read_all(&other).unwrap().len(), 1);
    }

    #[test]
    fn corrupt_operator_record_reads_as_absent_and_is_cleared() {
        let backend = Arc::new(MemoryStore::new());
        backend.set(AUTH_TOKEN_KEY, "tok").unwrap();
        backend.set(USER_DATA_KEY, "{broken").unwrap();
        let vault = CredentialVault::new(backend.clone());

        assert!(vault.session().is_none());
        assert_eq!(backend.get(USER_DATA_KEY).unwrap(), None);
    }

    #[test]
    fn locale_defaults_to_english() {
        let backend = Arc::new(MemoryStore::new());
        let vault = CredentialVault::new(backend.clone());
        assert_eq!(vault.locale(), Locale::En);
        assert_eq!(vault.stored_locale(), None);
        vault.set_locale(Locale::Fr).unwrap();
        assert_eq!(vault.locale(), Locale::Fr);
        backend.set(LANGUAGE_KEY, "klingon").unwrap();
        assert_eq!(vault.locale(), Locale::En);
    }
}
