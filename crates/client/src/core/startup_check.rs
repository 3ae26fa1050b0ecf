//! Startup diagnostics for the read endpoint and protocol deployment.
//!
//! Runs before the wallet connects and logs one line per check so a
//! misconfigured chain or engine address shows up immediately.

use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::errors::ClientError;

/// The chain reads the diagnostics need.
#[async_trait]
pub trait ChainProbe: Send + Sync {
    async fn chain_id(&self) -> Result<u64, ClientError>;
    async fn block_number(&self) -> Result<u64, ClientError>;
    async fn has_code(&self, address: Address) -> Result<bool, ClientError>;
}

#[async_trait]
impl ChainProbe for DynProvider {
    async fn chain_id(&self) -> Result<u64, ClientError> {
        Ok(self.get_chain_id().await?)
    }

    async fn block_number(&self) -> Result<u64, ClientError> {
        Ok(self.get_block_number().await?)
    }

    async fn has_code(&self, address: Address) -> Result<bool, ClientError> {
        let code = self.get_code_at(address).await?;
        Ok(!code.is_empty())
    }
}

/// Outcome of one check.
#[derive(Debug, Clone)]
pub struct CheckStatus {
    pub name: &'static str,
    pub passed: bool,
    pub critical: bool,
    pub latency_ms: u64,
    pub message: String,
}

#[derive(Debug)]
pub struct StartupCheckResult {
    pub all_critical_passed: bool,
    pub checks: Vec<CheckStatus>,
    pub warnings: Vec<String>,
}

pub struct StartupCheck {
    probe: Arc<dyn ChainProbe>,
    chain_id: u64,
    engine: Address,
    stablecoin: Address,
}

impl StartupCheck {
    pub fn new(probe: Arc<dyn ChainProbe>, chain_id: u64, engine: Address, stablecoin: Address) -> Self {
        Self {
            probe,
            chain_id,
            engine,
            stablecoin,
        }
    }

    pub async fn run(&self) -> StartupCheckResult {
        info!(
            expected_chain_id = self.chain_id,
            engine = %self.engine,
            stablecoin = %self.stablecoin,
            "running startup checks"
        );

        let mut checks = vec![self.check_chain().await, self.check_code("engine", self.engine, true).await];
        if self.stablecoin != self.engine {
            checks.push(self.check_code("stablecoin", self.stablecoin, false).await);
        }
        checks.push(self.check_head().await);

        let warnings: Vec<String> = checks
            .iter()
            .filter(|c| !c.passed && !c.critical)
            .map(|c| format!("{}: {}", c.name, c.message))
            .collect();
        let critical_failures = checks.iter().filter(|c| !c.passed && c.critical).count();

        log_summary(&checks, &warnings, critical_failures);

        StartupCheckResult {
            all_critical_passed: critical_failures == 0,
            checks,
            warnings,
        }
    }

    async fn check_chain(&self) -> CheckStatus {
        let start = Instant::now();
        let (passed, message) = match self.probe.chain_id().await {
            Ok(id) if id == self.chain_id => (true, format!("chain id {id}")),
            Ok(id) => (
                false,
                format!("endpoint serves chain {id}, expected {}", self.chain_id),
            ),
            Err(e) => (false, format!("rpc unreachable: {e}")),
        };
        CheckStatus {
            name: "rpc",
            passed,
            critical: true,
            latency_ms: start.elapsed().as_millis() as u64,
            message,
        }
    }

    async fn check_code(&self, name: &'static str, address: Address, critical: bool) -> CheckStatus {
        let start = Instant::now();
        let (passed, message) = match self.probe.has_code(address).await {
            Ok(true) => (true, format!("contract deployed at {address}")),
            Ok(false) => (false, format!("no contract code at {address}")),
            Err(e) => (false, format!("code lookup failed: {e}")),
        };
        CheckStatus {
            name,
            passed,
            critical,
            latency_ms: start.elapsed().as_millis() as u64,
            message,
        }
    }

    async fn check_head(&self) -> CheckStatus {
        let start = Instant::now();
        let (passed, message) = match self.probe.block_number().await {
            Ok(block) => (true, format!("head at block {block}")),
            Err(e) => (false, format!("block number unavailable: {e}")),
        };
        CheckStatus {
            name: "head",
            passed,
            critical: false,
            latency_ms: start.elapsed().as_millis() as u64,
            message,
        }
    }
}

fn log_summary(checks: &[CheckStatus], warnings: &[String], critical_failures: usize) {
    for check in checks {
        if check.passed {
            info!(check = check.name, latency_ms = check.latency_ms, "{}", check.message);
        } else if check.critical {
            error!(check = check.name, latency_ms = check.latency_ms, "{}", check.message);
        } else {
            warn!(check = check.name, latency_ms = check.latency_ms, "{}", check.message);
        }
    }

    let passed = checks.iter().filter(|c| c.passed).count();
    if critical_failures > 0 {
        error!(
            passed,
            total = checks.len(),
            critical_failures,
            "startup checks failed"
        );
    } else {
        info!(
            passed,
            total = checks.len(),
            warnings = warnings.len(),
            "startup checks passed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use std::collections::HashSet;

    const ENGINE: Address = address!("Ed9014597218ab886faA057B23E2bF9C0F9FbbfB");
    const TOKEN: Address = address!("00000000000000000000000000000000000000c0");

    struct FakeChain {
        chain_id: Option<u64>,
        deployed: HashSet<Address>,
    }

    #[async_trait]
    impl ChainProbe for FakeChain {
        async fn chain_id(&self) -> Result<u64, ClientError> {
            self.chain_id.ok_or_else(|| ClientError::ProviderUnavailable {
                reason: "connection refused".into(),
            })
        }

        async fn block_number(&self) -> Result<u64, ClientError> {
            Ok(42)
        }

        async fn has_code(&self, address: Address) -> Result<bool, ClientError> {
            Ok(self.deployed.contains(&address))
        }
    }

    fn check(chain_id: Option<u64>, deployed: &[Address], stablecoin: Address) -> StartupCheck {
        let probe = Arc::new(FakeChain {
            chain_id,
            deployed: deployed.iter().copied().collect(),
        });
        StartupCheck::new(probe, 11_155_111, ENGINE, stablecoin)
    }

    #[tokio::test]
    async fn healthy_deployment_passes() {
        let result = check(Some(11_155_111), &[ENGINE], ENGINE).run().await;
        assert!(result.all_critical_passed);
        assert_eq!(result.checks.len(), 3);
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn chain_mismatch_is_critical() {
        let result = check(Some(1), &[ENGINE], ENGINE).run().await;
        assert!(!result.all_critical_passed);
        assert!(result.checks[0].message.contains("expected 11155111"));
    }

    #[tokio::test]
    async fn unreachable_rpc_is_critical() {
        let result = check(None, &[ENGINE], ENGINE).run().await;
        assert!(!result.all_critical_passed);
        assert!(result.checks[0].message.contains("connection refused"));
    }

    #[tokio::test]
    async fn missing_engine_code_is_critical() {
        let result = check(Some(11_155_111), &[], ENGINE).run().await;
        assert!(!result.all_critical_passed);
        assert_eq!(result.checks[1].name, "engine");
    }

    #[tokio::test]
    async fn missing_stablecoin_code_only_warns() {
        let result = check(Some(11_155_111), &[ENGINE], TOKEN).run().await;
        assert!(result.all_critical_passed);
        assert_eq!(result.checks.len(), 4);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].starts_with("stablecoin"));
    }
}
