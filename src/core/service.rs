//! Wallet service facade
//!
//! Entry point for every external caller. Parses and validates raw inputs,
//! then delegates to the repository for reads and wallet creation and to the
//! `OperationProcessor` for balance changes. Holds no balance logic of its own.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::processor::OperationProcessor;
use super::traits::Repository;
use crate::types::{Operation, OperationKind, OwnerId, Page, Wallet, WalletError, WalletId};

/// Request body for a balance-changing operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    pub wallet_id: String,
    pub operation_type: String,
    pub amount: i64,
}

/// Result of an accepted operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationReceipt {
    pub wallet_id: WalletId,
    pub operation_type: OperationKind,
    pub amount: i64,
    pub balance_after: i64,
}

/// Public wallet API over a shared repository
#[derive(Clone)]
pub struct WalletService {
    store: Arc<dyn Repository>,
    processor: OperationProcessor,
}

impl WalletService {
    /// Create a service over the given store
    pub fn new(store: Arc<dyn Repository>) -> Self {
        Self {
            processor: OperationProcessor::new(Arc::clone(&store)),
            store,
        }
    }

    /// Processor sharing this service's store
    pub fn processor(&self) -> &OperationProcessor {
        &self.processor
    }

    /// Create an empty wallet for an owner
    ///
    /// # Returns
    ///
    /// * `Ok(Wallet)` - The new wallet, balance 0 and no journal entries
    /// * `Err(WalletError::InvalidOwnerId)` - If `owner_id` is not a UUID
    pub fn create_wallet(&self, owner_id: &str) -> Result<Wallet, WalletError> {
        let owner: OwnerId = owner_id.parse()?;
        let wallet = Wallet::new(owner);
        self.store.create(&wallet)?;
        tracing::info!(wallet = %wallet.id, owner = %owner, "wallet created");
        Ok(wallet)
    }

    /// Read a wallet without taking its row lock
    ///
    /// The result may predate an operation that is committing concurrently.
    pub fn get_wallet(&self, wallet_id: &str) -> Result<Wallet, WalletError> {
        let id: WalletId = wallet_id.parse()?;
        self.store
            .find_by_id(id)?
            .ok_or_else(|| WalletError::wallet_not_found(id))
    }

    /// Validate a request and apply it atomically
    ///
    /// # Returns
    ///
    /// * `Ok(OperationReceipt)` - The accepted operation and the resulting balance
    /// * `Err(WalletError::InvalidWalletId)` - If the wallet id is malformed
    /// * `Err(WalletError::InvalidOperationKind)` - If the type is not DEPOSIT or WITHDRAW
    /// * `Err(...)` - Anything `OperationProcessor::process` can return
    pub fn process_operation(
        &self,
        request: &OperationRequest,
    ) -> Result<OperationReceipt, WalletError> {
        let wallet_id: WalletId = request.wallet_id.parse()?;
        let kind: OperationKind = request.operation_type.parse()?;

        let balance_after = self.processor.process(wallet_id, kind, request.amount)?;
        Ok(OperationReceipt {
            wallet_id,
            operation_type: kind,
            amount: request.amount,
            balance_after,
        })
    }

    /// All wallets of an owner, newest first
    pub fn list_user_wallets(&self, owner_id: &str) -> Result<Vec<Wallet>, WalletError> {
        let owner: OwnerId = owner_id.parse()?;
        self.store.find_by_owner(owner)
    }

    /// Journal entries of a wallet, newest first
    ///
    /// Fails with `WalletNotFound` rather than returning an empty page when
    /// the wallet does not exist.
    pub fn operation_history(
        &self,
        wallet_id: &str,
        page: Page,
    ) -> Result<Vec<Operation>, WalletError> {
        let id: WalletId = wallet_id.parse()?;
        if self.store.find_by_id(id)?.is_none() {
            return Err(WalletError::wallet_not_found(id));
        }
        self.store.list(id, page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rstest::{fixture, rstest};

    #[fixture]
    fn service() -> WalletService {
        WalletService::new(Arc::new(MemoryStore::new()))
    }

    fn owner() -> String {
        OwnerId::new_v4().to_string()
    }

    fn request(wallet: &Wallet, operation_type: &str, amount: i64) -> OperationRequest {
        OperationRequest {
            wallet_id: wallet.id.to_string(),
            operation_type: operation_type.to_string(),
            amount,
        }
    }

    #[rstest]
    fn test_create_wallet_starts_empty(service: WalletService) {
        let wallet = service.create_wallet(&owner()).unwrap();

        assert_eq!(wallet.balance, 0);
        assert_eq!(service.get_wallet(&wallet.id.to_string()).unwrap(), wallet);
        assert!(service
            .operation_history(&wallet.id.to_string(), Page::default())
            .unwrap()
            .is_empty());
    }

    #[rstest]
    #[case("")]
    #[case("alice")]
    #[case("67e55044-10b1-426f-9247")]
    fn test_create_wallet_rejects_bad_owner(service: WalletService, #[case] raw: &str) {
        assert_eq!(
            service.create_wallet(raw),
            Err(WalletError::invalid_owner_id(raw))
        );
    }

    #[rstest]
    fn test_get_wallet_errors(service: WalletService) {
        assert_eq!(
            service.get_wallet("nope"),
            Err(WalletError::invalid_wallet_id("nope"))
        );

        let missing = WalletId::new_v4();
        assert_eq!(
            service.get_wallet(&missing.to_string()),
            Err(WalletError::wallet_not_found(missing))
        );
    }

    #[rstest]
    fn test_get_wallet_is_repeatable(service: WalletService) {
        let wallet = service.create_wallet(&owner()).unwrap();
        service
            .process_operation(&request(&wallet, "DEPOSIT", 25))
            .unwrap();

        let first = service.get_wallet(&wallet.id.to_string()).unwrap();
        let second = service.get_wallet(&wallet.id.to_string()).unwrap();
        assert_eq!(first, second);
    }

    #[rstest]
    fn test_process_operation_receipt(service: WalletService) {
        let wallet = service.create_wallet(&owner()).unwrap();

        let receipt = service
            .process_operation(&request(&wallet, "deposit", 500))
            .unwrap();
        assert_eq!(
            receipt,
            OperationReceipt {
                wallet_id: wallet.id,
                operation_type: OperationKind::Deposit,
                amount: 500,
                balance_after: 500,
            }
        );

        let receipt = service
            .process_operation(&request(&wallet, "WITHDRAW", 200))
            .unwrap();
        assert_eq!(receipt.balance_after, 300);
    }

    #[rstest]
    #[case("TRANSFER", 10, WalletError::invalid_operation_kind("TRANSFER"))]
    #[case("DEPOSIT", 0, WalletError::invalid_amount(0))]
    #[case("WITHDRAW", -5, WalletError::invalid_amount(-5))]
    fn test_process_operation_validation(
        service: WalletService,
        #[case] operation_type: &str,
        #[case] amount: i64,
        #[case] expected: WalletError,
    ) {
        let wallet = service.create_wallet(&owner()).unwrap();

        assert_eq!(
            service.process_operation(&request(&wallet, operation_type, amount)),
            Err(expected)
        );
        assert_eq!(service.get_wallet(&wallet.id.to_string()).unwrap().balance, 0);
    }

    #[rstest]
    fn test_process_operation_bad_wallet_id(service: WalletService) {
        let request = OperationRequest {
            wallet_id: "42".to_string(),
            operation_type: "DEPOSIT".to_string(),
            amount: 10,
        };
        assert_eq!(
            service.process_operation(&request),
            Err(WalletError::invalid_wallet_id("42"))
        );
    }

    #[rstest]
    fn test_list_user_wallets(service: WalletService) {
        let alice = owner();
        let first = service.create_wallet(&alice).unwrap();
        let second = service.create_wallet(&alice).unwrap();
        service.create_wallet(&owner()).unwrap();

        let mut ids: Vec<WalletId> = service
            .list_user_wallets(&alice)
            .unwrap()
            .iter()
            .map(|w| w.id)
            .collect();
        ids.sort();
        let mut expected = vec![first.id, second.id];
        expected.sort();
        assert_eq!(ids, expected);

        assert!(service.list_user_wallets(&owner()).unwrap().is_empty());
    }

    #[rstest]
    fn test_operation_history(service: WalletService) {
        let wallet = service.create_wallet(&owner()).unwrap();
        for amount in [100, 200, 300] {
            service
                .process_operation(&request(&wallet, "DEPOSIT", amount))
                .unwrap();
        }
        service
            .process_operation(&request(&wallet, "WITHDRAW", 50))
            .unwrap();

        let history = service
            .operation_history(&wallet.id.to_string(), Page::new(2, 0))
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, OperationKind::Withdraw);
        assert_eq!(history[0].balance_after, 550);
        assert_eq!(history[1].balance_after, 600);

        let missing = WalletId::new_v4();
        assert_eq!(
            service.operation_history(&missing.to_string(), Page::default()),
            Err(WalletError::wallet_not_found(missing))
        );
    }

    #[test]
    fn test_request_uses_camel_case() {
        let request: OperationRequest = serde_json::from_str(
            r#"{"walletId":"67e55044-10b1-426f-9247-bb680e5fe0c8","operationType":"DEPOSIT","amount":1000}"#,
        )
        .unwrap();
        assert_eq!(request.operation_type, "DEPOSIT");
        assert_eq!(request.amount, 1000);

        let receipt = OperationReceipt {
            wallet_id: request.wallet_id.parse().unwrap(),
            operation_type: OperationKind::Deposit,
            amount: 1000,
            balance_after: 1000,
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["walletId"], "67e55044-10b1-426f-9247-bb680e5fe0c8");
        assert_eq!(json["operationType"], "DEPOSIT");
        assert_eq!(json["balanceAfter"], 1000);
    }
}
