//! Daemon configuration with TOML file support.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use gavel_governance::{FixedPriceMarketplace, StaticBalanceOracle};
use gavel_types::{Amount, AssetId, EntityId, GovernanceParams};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(String),
}

/// Configuration for the `gavel` CLI.
///
/// Loaded from a TOML file via [`DaemonConfig::from_toml_file`]; every
/// field has a default so an empty file is valid.
#[derive(Clone, Debug, Deserialize)]
pub struct DaemonConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Treasury owner used by `init` when `--owner` is not given.
    #[serde(default)]
    pub owner: Option<String>,

    /// Governance tunables.
    #[serde(default)]
    pub params: GovernanceParams,

    /// Eligibility-token holdings served by the static balance oracle.
    #[serde(default)]
    pub balances: BTreeMap<String, u64>,

    /// Asking price of the fixed-price marketplace. Defaults to
    /// `params.purchase_price`.
    #[serde(default)]
    pub marketplace_price: Option<Amount>,

    /// When set, only these asset ids are for sale.
    #[serde(default)]
    pub marketplace_listed: Option<Vec<u64>>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./gavel_data")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl DaemonConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, DaemonError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DaemonError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, DaemonError> {
        toml::from_str(s).map_err(|e| DaemonError::Config(e.to_string()))
    }

    pub fn balance_oracle(&self) -> StaticBalanceOracle {
        let balances: HashMap<EntityId, u64> = self
            .balances
            .iter()
            .map(|(entity, balance)| (EntityId::new(entity.as_str()), *balance))
            .collect();
        StaticBalanceOracle::new(balances)
    }

    pub fn marketplace(&self) -> FixedPriceMarketplace {
        let price = self.marketplace_price.unwrap_or(self.params.purchase_price);
        let market = FixedPriceMarketplace::new(price);
        match &self.marketplace_listed {
            Some(listed) => market.with_catalogue(listed.iter().copied().map(AssetId::new)),
            None => market,
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            owner: None,
            params: GovernanceParams::default(),
            balances: BTreeMap::new(),
            marketplace_price: None,
            marketplace_listed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_toml_uses_defaults() {
        let config = DaemonConfig::from_toml_str("").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./gavel_data"));
        assert_eq!(config.log_format, "human");
        assert_eq!(config.params, GovernanceParams::default());
        assert!(config.balances.is_empty());
        assert!(config.owner.is_none());
    }

    #[test]
    fn partial_toml_overrides() {
        let config = DaemonConfig::from_toml_str(
            r#"
            data_dir = "/var/lib/gavel"
            owner = "treasurer"
            marketplace_price = 250
            marketplace_listed = [1, 2, 3]

            [params]
            voting_period_secs = 60
            purchase_price = 300

            [balances]
            alice = 2
            bob = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/gavel"));
        assert_eq!(config.owner.as_deref(), Some("treasurer"));
        assert_eq!(config.params.voting_period_secs, 60);
        assert_eq!(config.params.purchase_price, Amount::new(300));
        assert_eq!(config.params.oracle_timeout_ms, 5_000);
        assert_eq!(config.balances.get("bob"), Some(&5));
        assert_eq!(config.marketplace_price, Some(Amount::new(250)));
    }

    #[test]
    fn amounts_beyond_u64_are_written_as_strings() {
        let config = DaemonConfig::from_toml_str(
            r#"
            [params]
            initial_treasury = "100_000_000_000_000_000_000"
            purchase_price = 1_000
            "#,
        )
        .unwrap();
        assert_eq!(config.params.initial_treasury, Amount::whole(100));
        assert_eq!(config.params.purchase_price, Amount::new(1_000));
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = DaemonConfig::from_toml_str("params = 3").unwrap_err();
        assert!(matches!(err, DaemonError::Config(_)));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let err = DaemonConfig::from_toml_file(Path::new("/nonexistent/gavel.toml")).unwrap_err();
        assert!(matches!(err, DaemonError::Config(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"debug\"").unwrap();
        let config = DaemonConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.log_level, "debug");
    }

    #[tokio::test]
    async fn marketplace_follows_catalogue_and_price() {
        use gavel_governance::MarketplaceClient;

        let config = DaemonConfig::from_toml_str(
            r#"
            marketplace_listed = [4]
            [params]
            purchase_price = 9
            "#,
        )
        .unwrap();
        let market = config.marketplace();
        assert_eq!(market.price().await.unwrap(), Amount::new(9));
        assert!(market.is_available(AssetId::new(4)).await.unwrap());
        assert!(!market.is_available(AssetId::new(5)).await.unwrap());
    }
}
