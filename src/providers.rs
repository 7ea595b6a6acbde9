//! Provider normalization.
//!
//! Provider rows store their settings as a JSON blob in one of two
//! generations:
//!
//! ```text
//! current: { "env": { "ANTHROPIC_BASE_URL": ..., "ANTHROPIC_AUTH_TOKEN": ... }, "model": ... }
//! legacy:  { "base_url": ..., "api_key": ..., "model": ... }
//! ```
//!
//! [`normalize_records`] reconciles both into [`ProviderDescriptor`]s whose
//! `settings.env` always uses the current generation's keys, with the
//! resolved endpoint and credential mirrored at the top level.
//!
//! Only non-empty strings count as credentials. A numeric or boolean
//! `api_key` is left in the settings as-is but never resolved or mirrored.

use serde_json::{Map, Value};
use std::path::Path;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::models::{ProviderDescriptor, ProviderRecord, ProvidersEnvelope, PROVIDER_SOURCE};
use crate::store::{RecordStore, SqliteRecordStore};

pub const ENV_BASE_URL: &str = "ANTHROPIC_BASE_URL";
pub const ENV_AUTH_TOKEN: &str = "ANTHROPIC_AUTH_TOKEN";
pub const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const LEGACY_BASE_URL: &str = "base_url";
pub const LEGACY_API_KEY: &str = "api_key";

const SETTINGS_COLUMN: &str = "settings_config";

/// Where a credential value can come from inside a settings blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// A key inside the nested `env` object.
    Env(&'static str),
    /// A top-level key of the legacy schema.
    Legacy(&'static str),
}

impl CredentialSource {
    fn lookup<'a>(&self, settings: &'a Map<String, Value>) -> Option<&'a str> {
        let value = match self {
            CredentialSource::Env(key) => settings.get("env")?.get(*key)?,
            CredentialSource::Legacy(key) => settings.get(*key)?,
        };
        value.as_str().filter(|s| !s.is_empty())
    }
}

/// Base URL candidates, highest precedence first.
pub const BASE_URL_SOURCES: &[CredentialSource] = &[
    CredentialSource::Env(ENV_BASE_URL),
    CredentialSource::Legacy(LEGACY_BASE_URL),
];

/// Auth token candidates, highest precedence first.
pub const AUTH_TOKEN_SOURCES: &[CredentialSource] = &[
    CredentialSource::Env(ENV_AUTH_TOKEN),
    CredentialSource::Env(ENV_API_KEY),
    CredentialSource::Legacy(LEGACY_API_KEY),
];

/// First non-empty string among `sources`, with the source it came from.
pub fn resolve_credential(
    settings: &Map<String, Value>,
    sources: &[CredentialSource],
) -> Option<(CredentialSource, String)> {
    sources
        .iter()
        .find_map(|source| source.lookup(settings).map(|v| (*source, v.to_string())))
}

/// Normalize a batch of rows, skipping (and logging) rows that cannot be parsed.
pub fn normalize_records(records: &[ProviderRecord]) -> Vec<ProviderDescriptor> {
    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| match normalize_record(index, record) {
            Ok(descriptor) => Some(descriptor),
            Err(err) => {
                tracing::warn!(row = index, "{}", err);
                None
            }
        })
        .collect()
}

/// Normalize one row. Fails with [`BridgeError::RowParse`].
pub fn normalize_record(index: usize, record: &ProviderRecord) -> Result<ProviderDescriptor> {
    let row_error = |reason: String| BridgeError::RowParse { row: index, reason };

    let id = non_empty_scalar(record.get("id"))
        .ok_or_else(|| row_error("missing provider id".to_string()))?;
    let settings = parse_settings(record.get(SETTINGS_COLUMN)).map_err(row_error)?;

    let base_url = resolve_credential(&settings, BASE_URL_SOURCES);
    let auth_token = resolve_credential(&settings, AUTH_TOKEN_SOURCES);
    if let Some((source, _)) = &auth_token {
        tracing::debug!(provider = %id, ?source, "resolved auth token");
    }
    let base_url = base_url.map(|(_, v)| v);
    let auth_token = auth_token.map(|(_, v)| v);

    let mut env = match settings.get("env") {
        Some(Value::Object(existing)) => existing.clone(),
        _ => Map::new(),
    };
    if let Some(url) = &base_url {
        env.insert(ENV_BASE_URL.to_string(), Value::String(url.clone()));
    }
    if let Some(token) = &auth_token {
        env.insert(ENV_AUTH_TOKEN.to_string(), Value::String(token.clone()));
    }
    let mut merged = settings;
    merged.insert("env".to_string(), Value::Object(env));

    let name = non_empty_scalar(record.get("name")).unwrap_or_else(|| id.clone());

    Ok(ProviderDescriptor {
        id,
        name,
        source: PROVIDER_SOURCE,
        settings: merged,
        base_url,
        auth_token,
        website_url: present(record.get("website_url")),
        remark: present(record.get("remark")),
        created_at: present(record.get("created_at")),
        updated_at: present(record.get("updated_at")),
    })
}

fn parse_settings(raw: Option<&Value>) -> std::result::Result<Map<String, Value>, String> {
    let text = match raw {
        None | Some(Value::Null) => return Ok(Map::new()),
        Some(Value::String(s)) if s.is_empty() => return Ok(Map::new()),
        Some(Value::String(s)) => s,
        Some(other) => return Err(format!("settings_config is not text: {}", other)),
    };
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("settings_config is not a JSON object".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// Text or number rendered as a string; `None` for null, empty, or other types.
fn non_empty_scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn present(value: Option<&Value>) -> Option<Value> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        v => Some(v.clone()),
    }
}

/// Fetch and normalize the providers from any [`RecordStore`].
pub async fn list_providers<S: RecordStore + ?Sized>(
    store: &S,
    config: &BridgeConfig,
) -> Result<ProvidersEnvelope> {
    let set = store.fetch_records(&config.store.app_type).await?;
    tracing::debug!(rows = set.rows.len(), columns = ?set.columns, "fetched provider rows");
    Ok(ProvidersEnvelope::new(normalize_records(&set.rows)))
}

/// The `providers` command: open the store at `db_path` and normalize its rows.
pub async fn run_providers(
    config: &BridgeConfig,
    db_path: Option<&Path>,
) -> Result<ProvidersEnvelope> {
    let db_path = db_path.ok_or(BridgeError::ArgumentMissing)?;
    let store = SqliteRecordStore::open(db_path).await?;
    let result = list_providers(&store, config).await;
    store.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryRecordStore, NAMESPACE_COLUMN};
    use serde_json::json;

    fn record(id: &str, settings: &str) -> ProviderRecord {
        let mut r = ProviderRecord::new();
        r.insert("id".into(), json!(id));
        r.insert(NAMESPACE_COLUMN.into(), json!("claude"));
        r.insert(SETTINGS_COLUMN.into(), json!(settings));
        r
    }

    #[test]
    fn test_invalid_settings_row_skipped_others_kept() {
        let rows = vec![
            record("a", r#"{"env":{"ANTHROPIC_BASE_URL":"https://a"}}"#),
            record("broken", "{not json"),
            record("c", r#"{"base_url":"https://c"}"#),
        ];
        let out = normalize_records(&rows);
        let ids: Vec<_> = out.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_env_base_url_beats_legacy_and_is_mirrored() {
        let rows = vec![record(
            "p",
            r#"{"env":{"ANTHROPIC_BASE_URL":"X"},"base_url":"Y"}"#,
        )];
        let p = &normalize_records(&rows)[0];
        assert_eq!(p.base_url.as_deref(), Some("X"));
        assert_eq!(p.settings["env"][ENV_BASE_URL], json!("X"));
        // Legacy field is preserved untouched in the merged settings.
        assert_eq!(p.settings["base_url"], json!("Y"));
    }

    #[test]
    fn test_no_token_means_no_keys() {
        let rows = vec![record("p", r#"{"env":{"ANTHROPIC_BASE_URL":"X"}}"#)];
        let p = &normalize_records(&rows)[0];
        assert!(p.auth_token.is_none());
        assert!(p.settings["env"].get(ENV_AUTH_TOKEN).is_none());

        let v = serde_json::to_value(p).unwrap();
        assert!(v.get("authToken").is_none());
        assert!(v["settings"]["env"].get(ENV_AUTH_TOKEN).is_none());
    }

    #[test]
    fn test_api_key_fallback_order() {
        let rows = vec![
            record(
                "both",
                r#"{"env":{"ANTHROPIC_AUTH_TOKEN":"tok","ANTHROPIC_API_KEY":"key"},"api_key":"legacy"}"#,
            ),
            record("apikey", r#"{"env":{"ANTHROPIC_API_KEY":"key"},"api_key":"legacy"}"#),
            record("legacy", r#"{"api_key":"legacy"}"#),
            record("empty", r#"{"env":{"ANTHROPIC_AUTH_TOKEN":""},"api_key":"legacy"}"#),
        ];
        let out = normalize_records(&rows);
        let tokens: Vec<_> = out.iter().map(|p| p.auth_token.as_deref()).collect();
        assert_eq!(
            tokens,
            vec![Some("tok"), Some("key"), Some("legacy"), Some("legacy")]
        );
        for p in &out {
            assert_eq!(
                p.settings["env"][ENV_AUTH_TOKEN].as_str(),
                p.auth_token.as_deref()
            );
        }
    }

    #[test]
    fn test_non_string_credentials_not_resolved() {
        let rows = vec![record(
            "p",
            r#"{"env":{"ANTHROPIC_AUTH_TOKEN":12345},"api_key":true,"base_url":7}"#,
        )];
        let p = &normalize_records(&rows)[0];
        assert!(p.auth_token.is_none());
        assert!(p.base_url.is_none());
        assert_eq!(p.settings["env"][ENV_AUTH_TOKEN], json!(12345));
        assert_eq!(p.settings["api_key"], json!(true));
    }

    #[test]
    fn test_resolve_credential_reports_source() {
        let settings: Map<String, Value> =
            serde_json::from_str(r#"{"env":{"ANTHROPIC_API_KEY":"k"}}"#).unwrap();
        let (source, value) = resolve_credential(&settings, AUTH_TOKEN_SOURCES).unwrap();
        assert_eq!(source, CredentialSource::Env(ENV_API_KEY));
        assert_eq!(value, "k");
        assert!(resolve_credential(&settings, BASE_URL_SOURCES).is_none());
    }

    #[test]
    fn test_other_settings_preserved() {
        let rows = vec![record(
            "p",
            r#"{"model":"opus","alwaysThinkingEnabled":true,"env":{"FOO":"bar"}}"#,
        )];
        let p = &normalize_records(&rows)[0];
        assert_eq!(p.settings["model"], json!("opus"));
        assert_eq!(p.settings["alwaysThinkingEnabled"], json!(true));
        assert_eq!(p.settings["env"]["FOO"], json!("bar"));
    }

    #[test]
    fn test_missing_settings_yields_empty_env() {
        let mut r = record("p", "");
        r.remove(SETTINGS_COLUMN);
        let p = &normalize_records(&[r])[0];
        assert_eq!(p.settings, serde_json::from_str::<Map<String, Value>>(r#"{"env":{}}"#).unwrap());
    }

    #[test]
    fn test_non_object_settings_skipped() {
        let out = normalize_records(&[record("p", "[1,2,3]")]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_name_and_metadata() {
        let mut r = record("p", "{}");
        r.insert("name".into(), json!(""));
        r.insert("website_url".into(), json!("https://example.com"));
        r.insert("remark".into(), json!(""));
        r.insert("created_at".into(), json!(1700000000));
        r.insert("updated_at".into(), Value::Null);

        let p = &normalize_records(&[r])[0];
        assert_eq!(p.name, "p");
        assert_eq!(p.source, "external-store");
        assert_eq!(p.website_url, Some(json!("https://example.com")));
        assert!(p.remark.is_none());
        assert_eq!(p.created_at, Some(json!(1700000000)));
        assert!(p.updated_at.is_none());
    }

    #[test]
    fn test_row_without_id_skipped() {
        let mut r = record("x", "{}");
        r.remove("id");
        assert!(normalize_records(&[r]).is_empty());
    }

    #[tokio::test]
    async fn test_list_providers_from_store() {
        let mut other = record("other", "{}");
        other.insert(NAMESPACE_COLUMN.into(), json!("codex"));
        let store = InMemoryRecordStore::new(vec![
            record("a", r#"{"env":{"ANTHROPIC_AUTH_TOKEN":"t"}}"#),
            other,
        ]);

        let envelope = list_providers(&store, &BridgeConfig::default()).await.unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.count, 1);
        assert_eq!(envelope.providers[0].auth_token.as_deref(), Some("t"));
    }

    #[tokio::test]
    async fn test_run_providers_skips_row_with_invalid_utf8_settings() {
        use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};

        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("store.db");
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.unwrap();
        sqlx::query("CREATE TABLE providers (id TEXT, app_type TEXT, settings_config TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            r#"INSERT INTO providers VALUES ('good', 'claude', '{"env":{"ANTHROPIC_AUTH_TOKEN":"t"}}')"#,
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO providers VALUES ('bad', 'claude', CAST(x'7bff7d' AS TEXT))")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        let envelope = run_providers(&BridgeConfig::default(), Some(&path))
            .await
            .unwrap();
        assert_eq!(envelope.count, 1);
        assert_eq!(envelope.providers[0].id, "good");
        assert_eq!(envelope.providers[0].auth_token.as_deref(), Some("t"));
    }

    #[tokio::test]
    async fn test_run_providers_missing_argument() {
        let err = run_providers(&BridgeConfig::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::ArgumentMissing));
    }
}
