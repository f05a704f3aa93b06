//! Helper functions could be used in api/, front/, ...

use crate::config::AppConfig;
use anyhow::Context;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
};
use std::str::FromStr;

/// Builds the options for `db_host`, keyed with SQLCipher when a password is set
pub fn sqlite_connect_options(app_config: &AppConfig) -> anyhow::Result<SqliteConnectOptions> {
    let options = SqliteConnectOptions::from_str(&app_config.db_host)
        .with_context(|| format!("invalid DB_HOST: {}", app_config.db_host))?
        .create_if_missing(true)
        .pragma("foreign_keys", "ON");

    let Some(db_pass) = app_config.db_pass_encrypt.as_deref() else {
        return Ok(options);
    };

    Ok(options
        .pragma("key", db_pass.to_string())
        .pragma("cipher_page_size", "1024")
        .pragma("kdf_iter", "64000")
        .pragma("cipher_hmac_algorithm", "HMAC_SHA1")
        .pragma("cipher_kdf_algorithm", "PBKDF2_HMAC_SHA1")
        .journal_mode(SqliteJournalMode::Delete))
}

pub async fn setup_sqlite_db_pool(app_config: &AppConfig) -> anyhow::Result<SqlitePool> {
    let options = sqlite_connect_options(app_config)?;

    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    Ok(SqlitePool::connect_with(options).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use envconfig::Envconfig;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> AppConfig {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::init_from_hashmap(&env).unwrap()
    }

    #[test]
    fn test_sqlite_connect_options() {
        let options =
            sqlite_connect_options(&config_with(&[("DB_HOST", "sqlite:data/test.db")])).unwrap();
        assert!(options.get_filename().ends_with("data/test.db"));
    }

    #[test]
    fn test_sqlcipher_options_when_password_set() {
        let options = sqlite_connect_options(&config_with(&[
            ("DB_HOST", "sqlite:data/test.db"),
            ("DB_PASS_ENCRYPT", "hunter2"),
        ]))
        .unwrap();

        assert!(options.get_filename().ends_with("data/test.db"));
    }

    #[ntex::test]
    async fn test_setup_in_memory_pool() {
        let pool = setup_sqlite_db_pool(&config_with(&[("DB_HOST", "sqlite::memory:")]))
            .await
            .unwrap();

        let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&pool).await.unwrap();
        assert_eq!(one, 1);
    }
}
