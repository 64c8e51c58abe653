//! Starknet network configuration.

use std::env;
use std::path::PathBuf;

use client_blockchain_core::BlockchainConfig;
use game_core::Address;

/// Starknet network types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarknetNetwork {
    /// Starknet mainnet
    Mainnet,
    /// Starknet Sepolia testnet
    Sepolia,
    /// Local Katana devnet
    Katana,
}

impl StarknetNetwork {
    pub fn default_rpc_url(&self) -> &str {
        match self {
            StarknetNetwork::Mainnet => "https://api.cartridge.gg/x/starknet/mainnet",
            StarknetNetwork::Sepolia => "https://api.cartridge.gg/x/starknet/sepolia",
            StarknetNetwork::Katana => "http://localhost:5050",
        }
    }

    fn parse(value: &str) -> Result<Self, String> {
        match value.to_lowercase().as_str() {
            "mainnet" => Ok(StarknetNetwork::Mainnet),
            "sepolia" => Ok(StarknetNetwork::Sepolia),
            "katana" | "local" => Ok(StarknetNetwork::Katana),
            other => Err(format!(
                "Invalid STARKNET_NETWORK: {}. Must be mainnet, sepolia, or katana",
                other
            )),
        }
    }
}

/// Starknet-specific configuration.
#[derive(Debug, Clone)]
pub struct StarknetConfig {
    /// Network to connect to
    pub network: StarknetNetwork,

    /// Custom RPC endpoint URL (overrides network default)
    pub rpc_url: Option<String>,

    /// Dojo deployment manifest with contract addresses and event selectors
    pub manifest_path: Option<PathBuf>,

    /// Dojo namespace the game is deployed under
    pub namespace: String,

    /// Game contract address (overrides the manifest entry)
    pub game_contract: Option<Address>,

    /// Account that signs and submits transactions
    pub account_address: Option<Address>,

    /// Player address used for ownership checks (defaults to the account)
    pub player_address: Option<Address>,
}

impl StarknetConfig {
    pub const DEFAULT_NAMESPACE: &'static str = "hexed";

    /// Create a new Starknet configuration.
    pub fn new(network: StarknetNetwork) -> Self {
        Self {
            network,
            rpc_url: None,
            manifest_path: None,
            namespace: Self::DEFAULT_NAMESPACE.to_string(),
            game_contract: None,
            account_address: None,
            player_address: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `STARKNET_NETWORK` - Network name (mainnet, sepolia, katana) (default: katana)
    /// - `STARKNET_RPC_URL` - Custom RPC endpoint URL
    /// - `DOJO_MANIFEST_PATH` - Path to the Dojo deployment manifest
    /// - `DOJO_NAMESPACE` - Dojo namespace (default: hexed)
    /// - `HEXED_GAME_CONTRACT` - Game contract address
    /// - `HEXED_ACCOUNT_ADDRESS` - Submitting account address
    /// - `HEXED_PLAYER_ADDRESS` - Connected player address
    pub fn from_env() -> Result<Self, String> {
        let network = match env::var("STARKNET_NETWORK") {
            Ok(value) => StarknetNetwork::parse(&value)?,
            Err(_) => StarknetNetwork::Katana,
        };

        let namespace =
            env::var("DOJO_NAMESPACE").unwrap_or_else(|_| Self::DEFAULT_NAMESPACE.to_string());

        Ok(Self {
            network,
            rpc_url: env::var("STARKNET_RPC_URL").ok(),
            manifest_path: env::var("DOJO_MANIFEST_PATH").ok().map(PathBuf::from),
            namespace,
            game_contract: read_address("HEXED_GAME_CONTRACT")?,
            account_address: read_address("HEXED_ACCOUNT_ADDRESS")?,
            player_address: read_address("HEXED_PLAYER_ADDRESS")?,
        })
    }

    /// Set custom RPC URL.
    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }

    /// Set manifest path.
    pub fn with_manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = Some(path.into());
        self
    }

    /// Set game contract address.
    pub fn with_game_contract(mut self, address: Address) -> Self {
        self.game_contract = Some(address);
        self
    }

    /// Set account address.
    pub fn with_account(mut self, address: Address) -> Self {
        self.account_address = Some(address);
        self
    }

    /// Get the RPC URL (custom or default for network).
    pub fn get_rpc_url(&self) -> &str {
        self.rpc_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_rpc_url())
    }

    /// Address of the connected player: explicit player, else the account.
    pub fn player(&self) -> Option<Address> {
        self.player_address.or(self.account_address)
    }

    /// Tag of the game contract inside the manifest.
    pub fn contract_tag(&self) -> String {
        format!("{}-game_systems", self.namespace)
    }
}

fn read_address(key: &str) -> Result<Option<Address>, String> {
    match env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .parse::<Address>()
            .map(Some)
            .map_err(|e| format!("Invalid {key}: {e}")),
        Err(_) => Ok(None),
    }
}

impl BlockchainConfig for StarknetConfig {
    fn network_name(&self) -> &str {
        match self.network {
            StarknetNetwork::Mainnet => "starknet-mainnet",
            StarknetNetwork::Sepolia => "starknet-sepolia",
            StarknetNetwork::Katana => "katana",
        }
    }

    fn rpc_url(&self) -> &str {
        self.get_rpc_url()
    }

    fn validate(&self) -> Result<(), String> {
        let url = self.get_rpc_url();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(format!("Invalid RPC URL format: {}", url));
        }

        if self.namespace.is_empty() {
            return Err("Namespace cannot be empty".to_string());
        }

        if self.game_contract.is_none() && self.manifest_path.is_none() {
            return Err(
                "Either HEXED_GAME_CONTRACT or DOJO_MANIFEST_PATH must be set".to_string(),
            );
        }

        if let Some(contract) = self.game_contract
            && contract.is_zero()
        {
            return Err("Game contract address cannot be zero".to_string());
        }

        Ok(())
    }
}

impl Default for StarknetConfig {
    fn default() -> Self {
        Self::new(StarknetNetwork::Katana)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_names_parse_case_insensitively() {
        assert_eq!(
            StarknetNetwork::parse("Sepolia").unwrap(),
            StarknetNetwork::Sepolia
        );
        assert_eq!(
            StarknetNetwork::parse("local").unwrap(),
            StarknetNetwork::Katana
        );
        assert!(StarknetNetwork::parse("goerli").is_err());
    }

    #[test]
    fn custom_url_overrides_network_default() {
        let config = StarknetConfig::default();
        assert_eq!(config.get_rpc_url(), "http://localhost:5050");

        let config = config.with_rpc_url("http://127.0.0.1:6060");
        assert_eq!(config.get_rpc_url(), "http://127.0.0.1:6060");
    }

    #[test]
    fn validate_requires_a_contract_source() {
        let config = StarknetConfig::default();
        assert!(config.validate().is_err());

        let contract: Address = "0x1234".parse().unwrap();
        let config = config.with_game_contract(contract);
        assert!(config.validate().is_ok());

        let config = config.with_rpc_url("localhost:5050");
        assert!(config.validate().is_err());
    }

    #[test]
    fn player_falls_back_to_account() {
        let account: Address = "0xabc".parse().unwrap();
        let config = StarknetConfig::default().with_account(account);
        assert_eq!(config.player(), Some(account));
        assert_eq!(config.contract_tag(), "hexed-game_systems");
    }
}
