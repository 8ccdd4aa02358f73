use crate::core::currency::CurrencyPair;
use crate::core::error::{LedgerError, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Hard ceiling for the loan-to-value ratio.
pub const MAX_LTV_BPS: u32 = 9_500;

/// Ledger-wide parameters.
///
/// Every field has a default, so a JSON file only needs the overrides:
///
/// ```
/// use lending_engine::core::config::LedgerConfig;
///
/// let config = LedgerConfig::from_json_str(r#"{ "default_ltv_bps": 7000 }"#).unwrap();
/// assert_eq!(config.default_ltv_bps, 7000);
/// assert_eq!(config.grace_period_secs, 4 * 3600);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Ceiling on any request's maximum fee rate.
    pub max_fee_bps: u32,
    /// Loan-to-value applied until the administrator changes it.
    pub default_ltv_bps: u32,
    /// Time a deal may stay under water before liquidation.
    pub grace_period_secs: u64,
    /// Oldest acceptable reference-rate observation when locking.
    pub rate_freshness_secs: u64,
    /// Validity window of a locked rate.
    pub rate_lock_secs: u64,
    /// Pair locked for every deal: collateral currency / loan currency.
    pub rate_pair: CurrencyPair,
    /// Domain separator mixed into attestation signatures.
    pub chain_id: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_fee_bps: 5_000,
            default_ltv_bps: 8_000,
            grace_period_secs: 4 * 3_600,
            rate_freshness_secs: 5 * 60,
            rate_lock_secs: 10 * 60,
            rate_pair: CurrencyPair::default(),
            chain_id: 1,
        }
    }
}

impl LedgerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| LedgerError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_ltv_bps > MAX_LTV_BPS {
            return Err(LedgerError::InvalidConfig(format!(
                "default_ltv_bps {} exceeds {}",
                self.default_ltv_bps, MAX_LTV_BPS
            )));
        }
        if self.max_fee_bps > 10_000 {
            return Err(LedgerError::InvalidConfig(format!(
                "max_fee_bps {} exceeds 10000",
                self.max_fee_bps
            )));
        }
        self.grace_period()?;
        self.rate_freshness()?;
        self.rate_lock()?;
        Ok(())
    }

    /// Time a deal may stay under water before liquidation.
    pub fn grace_period(&self) -> Result<Duration> {
        window("grace_period_secs", self.grace_period_secs)
    }

    pub fn rate_freshness(&self) -> Result<Duration> {
        window("rate_freshness_secs", self.rate_freshness_secs)
    }

    pub fn rate_lock(&self) -> Result<Duration> {
        window("rate_lock_secs", self.rate_lock_secs)
    }
}

fn window(name: &str, secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(LedgerError::InvalidConfig(format!("{} must be non-zero", name)));
    }
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| LedgerError::InvalidConfig(format!("{} {} is out of range", name, secs)))
}
