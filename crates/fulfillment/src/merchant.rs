//! Merchant accounts that receive manual payments.

use std::sync::Arc;

use async_trait::async_trait;
use common::MerchantAccountId;
use domain::{MerchantAccountType, ReceiverAccount};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{FulfillmentError, Result};

/// An admin-managed bank or mobile-wallet account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantAccount {
    pub id: MerchantAccountId,
    pub account_type: MerchantAccountType,
    pub account_name: String,
    pub account_number: String,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub branch_name: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub is_primary: bool,
}

impl MerchantAccount {
    /// True if payments of this type may be directed here.
    pub fn accepts_payments(&self) -> bool {
        self.is_active && self.is_verified && self.is_primary
    }

    /// Snapshot stored on the payment.
    pub fn receiver(&self) -> ReceiverAccount {
        ReceiverAccount {
            account_id: self.id,
            account_type: self.account_type,
            account_name: self.account_name.clone(),
            account_number: self.account_number.clone(),
            bank_name: self.bank_name.clone(),
            branch_name: self.branch_name.clone(),
        }
    }
}

/// Lookup of the account that receives a payment method.
#[async_trait]
pub trait MerchantAccountDirectory: Send + Sync {
    /// The active, verified, primary account of `account_type`, if any.
    async fn primary_for(&self, account_type: MerchantAccountType)
    -> Result<Option<MerchantAccount>>;
}

/// In-memory directory used by the API binary and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMerchantAccounts {
    accounts: Arc<RwLock<Vec<MerchantAccount>>>,
}

impl InMemoryMerchantAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an account. A primary account demotes the
    /// previous primary of the same type.
    pub async fn upsert(&self, account: MerchantAccount) {
        let mut accounts = self.accounts.write().await;
        if account.is_primary {
            for other in accounts.iter_mut() {
                if other.account_type == account.account_type && other.id != account.id {
                    other.is_primary = false;
                }
            }
        }
        match accounts.iter_mut().find(|a| a.id == account.id) {
            Some(existing) => *existing = account,
            None => accounts.push(account),
        }
    }

    pub async fn set_primary(&self, account_id: MerchantAccountId) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        let account_type = accounts
            .iter()
            .find(|a| a.id == account_id)
            .map(|a| a.account_type)
            .ok_or_else(|| FulfillmentError::NotFound("Merchant account".to_string()))?;

        for account in accounts.iter_mut().filter(|a| a.account_type == account_type) {
            account.is_primary = account.id == account_id;
        }
        Ok(())
    }

    pub async fn list(&self) -> Vec<MerchantAccount> {
        self.accounts.read().await.clone()
    }
}

#[async_trait]
impl MerchantAccountDirectory for InMemoryMerchantAccounts {
    async fn primary_for(
        &self,
        account_type: MerchantAccountType,
    ) -> Result<Option<MerchantAccount>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .iter()
            .find(|a| a.account_type == account_type && a.accepts_payments())
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(account_type: MerchantAccountType, primary: bool) -> MerchantAccount {
        MerchantAccount {
            id: MerchantAccountId::new(),
            account_type,
            account_name: "Tangail Looms Ltd".to_string(),
            account_number: "01700000000".to_string(),
            bank_name: None,
            branch_name: None,
            is_active: true,
            is_verified: true,
            is_primary: primary,
        }
    }

    #[tokio::test]
    async fn primary_is_unique_per_type() {
        let directory = InMemoryMerchantAccounts::new();
        let first = account(MerchantAccountType::Bkash, true);
        let second = account(MerchantAccountType::Bkash, true);
        let nagad = account(MerchantAccountType::Nagad, true);

        directory.upsert(first.clone()).await;
        directory.upsert(nagad.clone()).await;
        directory.upsert(second.clone()).await;

        let primary = directory.primary_for(MerchantAccountType::Bkash).await.unwrap();
        assert_eq!(primary.map(|a| a.id), Some(second.id));
        let nagad_primary = directory.primary_for(MerchantAccountType::Nagad).await.unwrap();
        assert_eq!(nagad_primary.map(|a| a.id), Some(nagad.id));

        directory.set_primary(first.id).await.unwrap();
        let primary = directory.primary_for(MerchantAccountType::Bkash).await.unwrap();
        assert_eq!(primary.map(|a| a.id), Some(first.id));

        let primaries = directory
            .list()
            .await
            .into_iter()
            .filter(|a| a.account_type == MerchantAccountType::Bkash && a.is_primary)
            .count();
        assert_eq!(primaries, 1);
    }

    #[tokio::test]
    async fn unverified_or_inactive_accounts_are_skipped() {
        let directory = InMemoryMerchantAccounts::new();
        let mut unverified = account(MerchantAccountType::Rocket, true);
        unverified.is_verified = false;
        directory.upsert(unverified).await;

        assert!(
            directory
                .primary_for(MerchantAccountType::Rocket)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn set_primary_on_unknown_account_is_not_found() {
        let directory = InMemoryMerchantAccounts::new();
        assert!(matches!(
            directory.set_primary(MerchantAccountId::new()).await,
            Err(FulfillmentError::NotFound(_))
        ));
    }
}
