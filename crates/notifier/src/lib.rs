//! Webhook delivery of ledger events.
//!
//! Translates each `LedgerEvent` into a human-readable payload and posts it
//! as JSON to a configured webhook URL. Delivery failures are reported to
//! the caller (and logged there); they never feed back into the ledger.

use ember_common::types::{EventRecord, LedgerEvent, NotificationPayload, Severity};

/// Posts ledger events to a single webhook endpoint.
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(webhook_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }

    /// Deliver one event record to the webhook.
    pub async fn deliver(&self, record: &EventRecord) -> anyhow::Result<()> {
        let payload = payload_for(&record.event);
        let body = serde_json::json!({
            "id": record.id,
            "at": record.at,
            "title": payload.title,
            "body": payload.body,
            "severity": payload.severity,
            "event": record.event,
        });

        let response = self.client.post(&self.webhook_url).json(&body).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("webhook returned {}", response.status());
        }

        tracing::debug!(event_id = %record.id, severity = %payload.severity, "event delivered");
        Ok(())
    }
}

/// Translate a ledger event into a human-readable notification payload.
pub fn payload_for(event: &LedgerEvent) -> NotificationPayload {
    let (title, body, severity) = match event {
        LedgerEvent::MarketAdded {
            asset,
            collateral_factor_bps,
            ..
        } => (
            "Market Listed".to_string(),
            format!(
                "New market listed for {} at collateral factor {} bps",
                asset, collateral_factor_bps
            ),
            Severity::Info,
        ),
        LedgerEvent::MarketUpdated {
            asset,
            collateral_factor_bps,
        } => (
            "Market Risk Parameters Updated".to_string(),
            format!(
                "Collateral factor for {} is now {} bps",
                asset, collateral_factor_bps
            ),
            Severity::Warning,
        ),
        LedgerEvent::RatesUpdated {
            asset,
            supply_rate_bps,
            borrow_rate_bps,
        } => (
            "Market Rates Updated".to_string(),
            format!(
                "Rates for {}: supply {} bps, borrow {} bps",
                asset, supply_rate_bps, borrow_rate_bps
            ),
            Severity::Info,
        ),
        LedgerEvent::Deposit {
            account,
            asset,
            amount,
        } => (
            "Collateral Deposited".to_string(),
            format!("{} deposited {} of {}", account, amount, asset),
            Severity::Info,
        ),
        LedgerEvent::Withdraw {
            account,
            asset,
            amount,
        } => (
            "Collateral Withdrawn".to_string(),
            format!("{} withdrew {} of {}", account, amount, asset),
            Severity::Warning,
        ),
        LedgerEvent::Borrow {
            account,
            asset,
            amount,
        } => (
            "Assets Borrowed".to_string(),
            format!("{} borrowed {} of {}", account, amount, asset),
            Severity::Warning,
        ),
        LedgerEvent::Repay {
            account,
            asset,
            amount,
        } => (
            "Borrow Repaid".to_string(),
            format!("{} repaid {} of {}", account, amount, asset),
            Severity::Info,
        ),
        LedgerEvent::Liquidate {
            liquidator,
            account,
            repaid,
            seized,
            ..
        } => (
            "Position Liquidated".to_string(),
            format!(
                "CRITICAL: {} liquidated {}: repaid {}, seized {}",
                liquidator, account, repaid, seized
            ),
            Severity::Critical,
        ),
    };

    NotificationPayload {
        title,
        body,
        severity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, U256};

    fn account() -> Address {
        Address::repeat_byte(0x10)
    }

    fn asset() -> Address {
        Address::repeat_byte(0x01)
    }

    #[test]
    fn test_deposit_payload() {
        let payload = payload_for(&LedgerEvent::Deposit {
            account: account(),
            asset: asset(),
            amount: U256::from(1_000),
        });
        assert_eq!(payload.title, "Collateral Deposited");
        assert!(payload.body.contains("1000"));
        assert_eq!(payload.severity, Severity::Info);
    }

    #[test]
    fn test_withdraw_is_warning() {
        let payload = payload_for(&LedgerEvent::Withdraw {
            account: account(),
            asset: asset(),
            amount: U256::from(5),
        });
        assert_eq!(payload.severity, Severity::Warning);
    }

    #[test]
    fn test_liquidation_is_critical() {
        let payload = payload_for(&LedgerEvent::Liquidate {
            liquidator: Address::repeat_byte(0x77),
            account: account(),
            debt_asset: asset(),
            repaid: U256::from(900),
            collateral_asset: asset(),
            seized: U256::from(945),
        });
        assert!(payload.title.contains("Liquidated"));
        assert!(payload.body.contains("945"));
        assert_eq!(payload.severity, Severity::Critical);
    }

    #[test]
    fn test_market_update_is_warning() {
        let payload = payload_for(&LedgerEvent::MarketUpdated {
            asset: asset(),
            collateral_factor_bps: 3_000,
        });
        assert_eq!(payload.severity, Severity::Warning);
        assert!(payload.body.contains("3000"));
    }
}
