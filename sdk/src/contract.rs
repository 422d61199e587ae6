//! Typed access to the airdrop contract

use serde::{Serialize, Serializer};
use tracing::{info, warn};

use crate::address::TonAddress;
use crate::amount::Coins;
use crate::client::{LedgerClient, StackEntry};
use crate::error::{Result, SdkError};
use crate::message::MessageBody;
use crate::wallet::WalletIdentity;

pub const DEFAULT_BALANCE_GETTER: &str = "balanceOf";

/// Outcome of a balance query
///
/// Both cases serialize as a decimal string; an unavailable balance reads "0".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceLookup {
    Known(Coins),
    Unavailable(String),
}

impl BalanceLookup {
    pub fn amount(&self) -> Coins {
        match self {
            BalanceLookup::Known(amount) => *amount,
            BalanceLookup::Unavailable(_) => Coins::ZERO,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, BalanceLookup::Known(_))
    }
}

impl Serialize for BalanceLookup {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.amount().to_string())
    }
}

/// The contract at `address`, seen through `client`
///
/// Cheap to build; holds nothing but borrowed handles.
pub struct ContractHandle<'a> {
    client: &'a dyn LedgerClient,
    address: TonAddress,
}

impl<'a> ContractHandle<'a> {
    pub fn new(client: &'a dyn LedgerClient, address: TonAddress) -> Self {
        Self { client, address }
    }

    pub fn address(&self) -> &TonAddress {
        &self.address
    }

    /// Query the balance `getter` for `target`; never fails
    pub async fn get_balance(&self, target: &str, getter: &str) -> BalanceLookup {
        match self.try_get_balance(target, getter).await {
            Ok(amount) => BalanceLookup::Known(amount),
            Err(e) => {
                warn!(
                    contract = %self.address,
                    wallet = target,
                    error = %e,
                    "Balance lookup failed, reporting zero"
                );
                BalanceLookup::Unavailable(e.to_string())
            }
        }
    }

    async fn try_get_balance(&self, target: &str, getter: &str) -> Result<Coins> {
        let target: TonAddress = target.parse()?;
        let output = self
            .client
            .run_get_method(&self.address, getter, vec![StackEntry::address(&target)?])
            .await?;

        if output.exit_code != 0 {
            return Err(SdkError::Rpc(format!(
                "{getter} exited with code {}",
                output.exit_code
            )));
        }

        let value = output
            .stack
            .first()
            .and_then(StackEntry::as_int)
            .ok_or_else(|| SdkError::Rpc(format!("{getter} returned no number")))?;
        let nano = u128::try_from(value)
            .map_err(|_| SdkError::Rpc(format!("{getter} returned negative balance {value}")))?;
        Ok(Coins::from_nano(nano)?)
    }

    /// Have the admin wallet send a `Claim` for `target` to the contract
    ///
    /// Every call broadcasts a new message; success means the endpoint accepted it.
    pub async fn claim(
        &self,
        admin: Option<&WalletIdentity>,
        target: &TonAddress,
        amount: Coins,
        gas: Coins,
    ) -> Result<()> {
        let admin = admin.ok_or_else(|| {
            SdkError::Configuration("admin mnemonic is not configured".to_string())
        })?;

        let body = MessageBody::Claim {
            user: *target,
            amount,
        }
        .to_cell()?;

        admin.send(self.client, &self.address, gas, body).await?;
        info!(
            contract = %self.address,
            wallet = %target,
            amount = %amount.to_decimal_string(),
            "Claim sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::deserialize_boc;
    use crate::client::{GetMethodOutput, MockLedgerClient};
    use crate::signer::{derive_key_pair, split_mnemonic, tests::TEST_MNEMONIC};

    const CONTRACT: &str = "EQDS6o3DqwMIrrPgLUt5bDUga-6kNeOBVNe19AZUvC_kHrJd";
    const USER: &str = "0:8bce7ec83a6b73ee9869fa8702891ace6a607187261f15b5ce09435c23423fdf";

    fn contract() -> TonAddress {
        CONTRACT.parse().unwrap()
    }

    fn admin() -> WalletIdentity {
        WalletIdentity::new(derive_key_pair(&split_mnemonic(TEST_MNEMONIC)).unwrap(), 0).unwrap()
    }

    fn one_ton() -> Coins {
        Coins::from_decimal_str("1").unwrap()
    }

    fn gas() -> Coins {
        Coins::from_decimal_str("0.05").unwrap()
    }

    // ========================================
    // Balance
    // ========================================

    #[tokio::test]
    async fn test_balance_known() {
        let mut mock = MockLedgerClient::new();
        mock.expect_run_get_method()
            .withf(|address, method, stack| {
                *address == contract()
                    && method == "balanceOf"
                    && stack.len() == 1
                    && matches!(&stack[0], StackEntry::Slice(_))
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(GetMethodOutput {
                    exit_code: 0,
                    stack: vec![StackEntry::Num(12_500_000_000)],
                })
            });

        let handle = ContractHandle::new(&mock, contract());
        let balance = handle.get_balance(USER, DEFAULT_BALANCE_GETTER).await;
        assert_eq!(balance, BalanceLookup::Known(Coins::from_nano(12_500_000_000).unwrap()));
        assert_eq!(serde_json::to_value(&balance).unwrap(), "12500000000");
    }

    #[tokio::test]
    async fn test_balance_rpc_failure_reads_zero() {
        let mut mock = MockLedgerClient::new();
        mock.expect_run_get_method()
            .times(1)
            .returning(|_, _, _| Err(SdkError::Rpc("request timed out".to_string())));

        let handle = ContractHandle::new(&mock, contract());
        let balance = handle.get_balance(USER, DEFAULT_BALANCE_GETTER).await;
        assert!(!balance.is_known());
        assert_eq!(balance.amount(), Coins::ZERO);
        assert_eq!(serde_json::to_value(&balance).unwrap(), "0");
    }

    #[tokio::test]
    async fn test_balance_nonzero_exit_code_reads_zero() {
        let mut mock = MockLedgerClient::new();
        mock.expect_run_get_method().returning(|_, _, _| {
            Ok(GetMethodOutput {
                exit_code: 11,
                stack: vec![],
            })
        });

        let handle = ContractHandle::new(&mock, contract());
        let balance = handle.get_balance(USER, DEFAULT_BALANCE_GETTER).await;
        assert!(matches!(balance, BalanceLookup::Unavailable(reason) if reason.contains("11")));
    }

    #[tokio::test]
    async fn test_balance_bad_address_skips_rpc() {
        let mut mock = MockLedgerClient::new();
        mock.expect_run_get_method().times(0);

        let handle = ContractHandle::new(&mock, contract());
        let balance = handle.get_balance("not-an-address", DEFAULT_BALANCE_GETTER).await;
        assert_eq!(balance.amount(), Coins::ZERO);
    }

    #[tokio::test]
    async fn test_balance_negative_reads_zero() {
        let mut mock = MockLedgerClient::new();
        mock.expect_run_get_method().returning(|_, _, _| {
            Ok(GetMethodOutput {
                exit_code: 0,
                stack: vec![StackEntry::Num(-5)],
            })
        });

        let handle = ContractHandle::new(&mock, contract());
        assert!(!handle.get_balance(USER, "balanceOf").await.is_known());
    }

    // ========================================
    // Claim
    // ========================================

    #[tokio::test]
    async fn test_claim_without_admin_sends_nothing() {
        let mut mock = MockLedgerClient::new();
        mock.expect_run_get_method().times(0);
        mock.expect_send_boc().times(0);

        let handle = ContractHandle::new(&mock, contract());
        let user: TonAddress = USER.parse().unwrap();
        let err = handle.claim(None, &user, one_ton(), gas()).await.unwrap_err();
        assert!(matches!(err, SdkError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_claim_broadcasts_signed_message() {
        let admin = admin();
        let admin_address = *admin.address();

        let mut mock = MockLedgerClient::new();
        mock.expect_run_get_method()
            .withf(move |address, method, _| *address == admin_address && method == "seqno")
            .returning(|_, _, _| {
                Ok(GetMethodOutput {
                    exit_code: 0,
                    stack: vec![StackEntry::Num(7)],
                })
            });
        mock.expect_send_boc()
            .withf(move |boc| {
                let root = deserialize_boc(boc).unwrap();
                // Deployed wallet: no state init, body is the only reference
                let mut external = root.parse();
                external.load_uint(4).unwrap();
                external.load_address().unwrap() == admin_address && root.references().len() == 1
            })
            .times(1)
            .returning(|_| Ok(()));

        let handle = ContractHandle::new(&mock, contract());
        let user: TonAddress = USER.parse().unwrap();
        handle.claim(Some(&admin), &user, one_ton(), gas()).await.unwrap();
    }

    #[tokio::test]
    async fn test_repeated_claims_are_not_deduplicated() {
        let admin = admin();

        let mut mock = MockLedgerClient::new();
        mock.expect_run_get_method().times(2).returning(|_, _, _| {
            Ok(GetMethodOutput {
                exit_code: -13,
                stack: vec![],
            })
        });
        mock.expect_send_boc().times(2).returning(|_| Ok(()));

        let handle = ContractHandle::new(&mock, contract());
        let user: TonAddress = USER.parse().unwrap();
        handle.claim(Some(&admin), &user, one_ton(), gas()).await.unwrap();
        handle.claim(Some(&admin), &user, one_ton(), gas()).await.unwrap();
    }

    #[tokio::test]
    async fn test_claim_propagates_send_failure() {
        let admin = admin();

        let mut mock = MockLedgerClient::new();
        mock.expect_run_get_method().returning(|_, _, _| {
            Ok(GetMethodOutput {
                exit_code: 0,
                stack: vec![StackEntry::Num(1)],
            })
        });
        mock.expect_send_boc()
            .returning(|_| Err(SdkError::Rpc("sendBoc failed with code 500".to_string())));

        let handle = ContractHandle::new(&mock, contract());
        let user: TonAddress = USER.parse().unwrap();
        let err = handle.claim(Some(&admin), &user, one_ton(), gas()).await.unwrap_err();
        assert!(matches!(err, SdkError::Rpc(_)));
    }
}
