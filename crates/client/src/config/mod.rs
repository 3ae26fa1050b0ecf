pub mod types;
pub mod validate;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Env var naming the config directory (default `./config`).
pub const CONFIG_DIR_ENV: &str = "STABLEFI_CONFIG_DIR";

/// Env var holding the development wallet's private key.
pub const PRIVATE_KEY_ENV: &str = "STABLEFI_PRIVATE_KEY";

/// Config directory from `STABLEFI_CONFIG_DIR`, falling back to `./config`.
pub fn config_dir() -> PathBuf {
    env_string(CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config"))
}

/// Load `app.json` and `chain.json` into a [`ClientConfig`], then apply
/// environment variable overrides and validate.
///
/// # Environment variable overrides
///
/// | Env Var                        | Config Field                   |
/// |--------------------------------|--------------------------------|
/// | `STABLEFI_RPC_URL`             | `chain.rpc.http_url`           |
/// | `STABLEFI_WALLET_URL`          | `chain.rpc.wallet_url`         |
/// | `STABLEFI_ENGINE_ADDRESS`      | `chain.contracts.engine`       |
/// | `STABLEFI_STABLECOIN_ADDRESS`  | `chain.contracts.stablecoin`   |
/// | `STABLEFI_CHAIN_ID`            | `chain.chain_id`               |
pub fn load_config(config_dir: &Path) -> Result<ClientConfig> {
    let read = |name: &str| -> Result<String> {
        let path = config_dir.join(name);
        std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))
    };

    let app: AppConfig = serde_json::from_str(&read("app.json")?).context("parsing app.json")?;
    let chain: ChainConfig =
        serde_json::from_str(&read("chain.json")?).context("parsing chain.json")?;

    let mut config = ClientConfig { app, chain };

    apply_env_overrides(&mut config);
    validate::validate_config(&config)?;

    Ok(config)
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Only non-empty env vars take effect. Parse failures are logged and
/// skipped (the JSON value remains).
fn apply_env_overrides(config: &mut ClientConfig) {
    if let Some(val) = env_string("STABLEFI_RPC_URL") {
        info!("env override: STABLEFI_RPC_URL");
        config.chain.rpc.http_url = val;
    }

    if let Some(val) = env_string("STABLEFI_WALLET_URL") {
        info!("env override: STABLEFI_WALLET_URL");
        config.chain.rpc.wallet_url = val;
    }

    if let Some(val) = env_string("STABLEFI_ENGINE_ADDRESS") {
        info!(engine = %val, "env override: STABLEFI_ENGINE_ADDRESS");
        config.chain.contracts.engine = val;
    }

    if let Some(val) = env_string("STABLEFI_STABLECOIN_ADDRESS") {
        info!(stablecoin = %val, "env override: STABLEFI_STABLECOIN_ADDRESS");
        config.chain.contracts.stablecoin = val;
    }

    if let Some(val) = env_parse::<u64>("STABLEFI_CHAIN_ID") {
        info!(chain_id = val, "env override: STABLEFI_CHAIN_ID");
        config.chain.chain_id = val;
    }
}

/// Read a non-empty env var as a `String`.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Read a non-empty env var and parse it as `T`.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENGINE: &str = "0xEd9014597218ab886faA057B23E2bF9C0F9FbbfB";

    fn project_config_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
    }

    fn write_test_configs(dir: &Path, wallet_url: &str) {
        std::fs::write(
            dir.join("app.json"),
            r#"{
                "logging": { "log_dir": "logs" },
                "orchestrator": { "pending_notice_seconds": 15 },
                "wallet": { "poll_interval_seconds": 2 }
            }"#,
        )
        .unwrap();

        std::fs::write(
            dir.join("chain.json"),
            format!(
                r#"{{
                    "chain_id": 11155111,
                    "chain_name": "Sepolia",
                    "rpc": {{
                        "http_url": "https://rpc.sepolia.org",
                        "wallet_url": "{wallet_url}"
                    }},
                    "contracts": {{ "engine": "{ENGINE}", "stablecoin": "" }}
                }}"#
            ),
        )
        .unwrap();
    }

    /// Remove all client env vars so tests don't interfere with each other.
    fn clean_client_env() {
        for key in [
            "STABLEFI_RPC_URL",
            "STABLEFI_WALLET_URL",
            "STABLEFI_ENGINE_ADDRESS",
            "STABLEFI_STABLECOIN_ADDRESS",
            "STABLEFI_CHAIN_ID",
            CONFIG_DIR_ENV,
            PRIVATE_KEY_ENV,
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_load_real_configs() {
        clean_client_env();
        let dir = project_config_dir();
        if !dir.exists() {
            eprintln!("skipping: config dir not found at {}", dir.display());
            return;
        }
        std::env::set_var(PRIVATE_KEY_ENV, "0x01");
        let config = load_config(&dir).expect("config should load and validate");
        assert!(config.chain.chain_id > 0);
        assert!(config.chain.engine_address().is_ok());
        clean_client_env();
    }

    #[test]
    #[serial]
    fn test_load_test_configs() {
        clean_client_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path(), "http://127.0.0.1:1248");
        let config = load_config(tmp.path()).expect("test config should load");
        assert_eq!(config.chain.chain_id, 11_155_111);
        assert_eq!(config.app.orchestrator.pending_notice_seconds, 15);
        assert_eq!(config.app.wallet.poll_interval_seconds, 2);
        assert_eq!(
            config.chain.stablecoin_address().unwrap(),
            config.chain.engine_address().unwrap()
        );
        clean_client_env();
    }

    #[test]
    #[serial]
    fn test_missing_config_file_errors() {
        clean_client_env();
        let tmp = tempfile::tempdir().unwrap();
        let err = load_config(tmp.path()).unwrap_err();
        assert!(
            err.to_string().contains("failed to read config file"),
            "expected file-not-found error, got: {err}"
        );
    }

    #[test]
    #[serial]
    fn test_env_overrides_apply() {
        clean_client_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path(), "http://127.0.0.1:1248");

        std::env::set_var("STABLEFI_RPC_URL", "http://127.0.0.1:8545");
        std::env::set_var("STABLEFI_CHAIN_ID", "31337");
        std::env::set_var(
            "STABLEFI_STABLECOIN_ADDRESS",
            "0x00000000000000000000000000000000000000c0",
        );
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.chain.rpc.http_url, "http://127.0.0.1:8545");
        assert_eq!(config.chain.chain_id, 31337);
        assert_ne!(
            config.chain.stablecoin_address().unwrap(),
            config.chain.engine_address().unwrap()
        );
        clean_client_env();
    }

    #[test]
    #[serial]
    fn test_empty_and_invalid_overrides_ignored() {
        clean_client_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path(), "http://127.0.0.1:1248");

        std::env::set_var("STABLEFI_RPC_URL", "");
        std::env::set_var("STABLEFI_CHAIN_ID", "sepolia");
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.chain.rpc.http_url, "https://rpc.sepolia.org");
        assert_eq!(config.chain.chain_id, 11_155_111);
        clean_client_env();
    }

    #[test]
    #[serial]
    fn test_key_wallet_requires_private_key() {
        clean_client_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path(), "");

        let err = load_config(tmp.path()).unwrap_err();
        assert!(err.to_string().contains(PRIVATE_KEY_ENV), "got: {err}");

        std::env::set_var(PRIVATE_KEY_ENV, "0x01");
        assert!(load_config(tmp.path()).is_ok());
        clean_client_env();
    }

    #[test]
    #[serial]
    fn test_validation_collects_every_error() {
        clean_client_env();
        let tmp = tempfile::tempdir().unwrap();
        write_test_configs(tmp.path(), "http://127.0.0.1:1248");
        std::env::set_var("STABLEFI_ENGINE_ADDRESS", "0x1234");
        std::env::set_var("STABLEFI_RPC_URL", "ftp://example.com");
        std::env::set_var("STABLEFI_CHAIN_ID", "0");

        let err = load_config(tmp.path()).unwrap_err().to_string();
        assert!(err.contains("3 errors"), "got: {err}");
        assert!(err.contains("chain.contracts.engine"));
        assert!(err.contains("chain.rpc.http_url"));
        assert!(err.contains("chain_id"));
        clean_client_env();
    }

    #[test]
    #[serial]
    fn test_config_dir_env() {
        clean_client_env();
        assert_eq!(config_dir(), PathBuf::from("config"));
        std::env::set_var(CONFIG_DIR_ENV, "/etc/stablefi");
        assert_eq!(config_dir(), PathBuf::from("/etc/stablefi"));
        clean_client_env();
    }
}
