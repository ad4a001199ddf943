//! Facilitator server configuration.
//!
//! Loads configuration from a TOML file with support for environment
//! variable expansion in string values. Variables use `$VAR` or `${VAR}`
//! syntax.
//!
//! # Example configuration
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 4021
//! rpc_url = "https://api.devnet.solana.com"
//! min_replay_ttl_seconds = 600
//! networks = ["solana-devnet"]
//! ```
//!
//! # Environment variables
//!
//! - `CONFIG` — path to the configuration file (default: `config.toml`)
//! - `HOST` — override the bind address
//! - `PORT` — override the bind port
//! - `RPC_URL` — override the Solana RPC endpoint, supports `$VAR` expansion
//!   in the file itself

use std::net::IpAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use x402_proto::Network;

/// Top-level facilitator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilitatorConfig {
    /// Server bind address (default: `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Server port (default: `4021`).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Solana JSON-RPC endpoint the ledger client talks to.
    pub rpc_url: String,

    /// Networks this facilitator is willing to settle against.
    #[serde(default = "default_networks")]
    pub networks: Vec<Network>,

    /// Floor applied to every replay-cache TTL, regardless of a
    /// requirement's `maxTimeoutSeconds` (§4.2's `MIN_REPLAY_TTL_SECONDS`).
    #[serde(default = "default_min_replay_ttl_seconds")]
    pub min_replay_ttl_seconds: u64,

    /// Replay cache backend: `"memory"` or `"external"`.
    #[serde(default = "default_replay_backend")]
    pub replay_backend: String,
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0))
}

const fn default_port() -> u16 {
    4021
}

fn default_networks() -> Vec<Network> {
    vec![Network::SolanaDevnet]
}

const fn default_min_replay_ttl_seconds() -> u64 {
    600
}

fn default_replay_backend() -> String {
    "memory".to_string()
}

impl FacilitatorConfig {
    /// Loads configuration from the path given by the `CONFIG` environment
    /// variable, falling back to `config.toml` in the current directory.
    ///
    /// After loading, all string values with `$VAR` / `${VAR}` references
    /// are expanded from the process environment. `HOST`, `PORT`, and
    /// `RPC_URL` env vars override the file values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = std::env::var("CONFIG").unwrap_or_else(|_| "config.toml".to_owned());
        Self::load_from(&path)
    }

    /// Loads configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = if Path::new(path).exists() { std::fs::read_to_string(path)? } else { String::new() };

        let expanded = expand_env_vars(&content);
        let mut config: Self = toml::from_str(&expanded)?;

        if let Ok(host) = std::env::var("HOST") {
            if let Ok(addr) = host.parse() {
                config.host = addr;
            }
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(p) = port.parse() {
                config.port = p;
            }
        }
        if let Ok(rpc_url) = std::env::var("RPC_URL") {
            config.rpc_url = rpc_url;
        }

        Ok(config)
    }
}

/// Expands `$VAR` and `${VAR}` patterns in a string from environment
/// variables. Unresolved variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' {
            let braced = chars.peek() == Some(&'{');
            if braced {
                chars.next();
            }

            let mut var_name = String::new();
            while let Some(&c) = chars.peek() {
                if braced {
                    if c == '}' {
                        chars.next();
                        break;
                    }
                } else if !c.is_ascii_alphanumeric() && c != '_' {
                    break;
                }
                var_name.push(c);
                chars.next();
            }

            if var_name.is_empty() {
                result.push('$');
                if braced {
                    result.push('{');
                }
            } else if let Ok(val) = std::env::var(&var_name) {
                result.push_str(&val);
            } else {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&var_name);
                if braced {
                    result.push('}');
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_braced_and_bare_vars() {
        // SAFETY-equivalent: single-threaded test, no concurrent env access.
        unsafe {
            std::env::set_var("X402_TEST_VAR", "resolved");
        }
        assert_eq!(expand_env_vars("prefix-${X402_TEST_VAR}-suffix"), "prefix-resolved-suffix");
        assert_eq!(expand_env_vars("$X402_TEST_VAR"), "resolved");
        unsafe {
            std::env::remove_var("X402_TEST_VAR");
        }
    }

    #[test]
    fn leaves_unresolved_vars_untouched() {
        assert_eq!(expand_env_vars("$X402_DOES_NOT_EXIST"), "$X402_DOES_NOT_EXIST");
    }

    #[test]
    fn default_config_has_sensible_values() {
        let config: FacilitatorConfig = toml::from_str(r#"rpc_url = "https://api.devnet.solana.com""#).unwrap();
        assert_eq!(config.port, 4021);
        assert_eq!(config.min_replay_ttl_seconds, 600);
        assert_eq!(config.networks, vec![Network::SolanaDevnet]);
    }
}
