//! End-to-end flows through the public SDK surface

use async_trait::async_trait;
use std::sync::Mutex;

use warriors_sdk::cell::deserialize_boc;
use warriors_sdk::{
    build_withdraw_payload, derive_key_pair, split_mnemonic, BalanceLookup, Coins,
    ContractHandle, GetMethodOutput, LedgerClient, MessageBody, SdkError, StackEntry, TonAddress,
    WalletIdentity, DEFAULT_CONTRACT_ADDRESS,
};

const MNEMONIC: &str = "tattoo stock spice enlist kiwi jungle brave feature ocean mention fine \
    rescue slogan cinnamon liar rural expose fabric bicycle orange leaf quarter enforce gather";

/// In-memory ledger: an undeployed admin wallet and a fixed token balance
#[derive(Default)]
struct RecordingLedger {
    getters: Mutex<Vec<String>>,
    broadcasts: Mutex<Vec<Vec<u8>>>,
    fail_getters: bool,
}

#[async_trait]
impl LedgerClient for RecordingLedger {
    async fn run_get_method(
        &self,
        _address: &TonAddress,
        method: &str,
        _stack: Vec<StackEntry>,
    ) -> Result<GetMethodOutput, SdkError> {
        self.getters.lock().unwrap().push(method.to_string());
        if self.fail_getters {
            return Err(SdkError::Rpc("request timed out".to_string()));
        }
        match method {
            "seqno" => Ok(GetMethodOutput {
                exit_code: -13,
                stack: vec![],
            }),
            _ => Ok(GetMethodOutput {
                exit_code: 0,
                stack: vec![StackEntry::Num(3_000_000_000)],
            }),
        }
    }

    async fn send_boc(&self, boc: &[u8]) -> Result<(), SdkError> {
        self.broadcasts.lock().unwrap().push(boc.to_vec());
        Ok(())
    }
}

fn contract() -> TonAddress {
    DEFAULT_CONTRACT_ADDRESS.parse().unwrap()
}

fn admin() -> WalletIdentity {
    WalletIdentity::new(derive_key_pair(&split_mnemonic(MNEMONIC)).unwrap(), 0).unwrap()
}

#[test]
fn test_raw_and_friendly_forms_agree() {
    let friendly: TonAddress = DEFAULT_CONTRACT_ADDRESS.parse().unwrap();
    let raw: TonAddress = friendly.to_raw().parse().unwrap();
    assert_eq!(friendly, raw);
    assert_eq!(raw.to_string(), DEFAULT_CONTRACT_ADDRESS);
}

#[tokio::test]
async fn test_balance_then_claim() {
    let ledger = RecordingLedger::default();
    let handle = ContractHandle::new(&ledger, contract());
    let user = "UQCLzn7IOmtz7php-ocCiRrOamBxhyYfFbXOCUNcI0I_3512";

    let balance = handle.get_balance(user, "balanceOf").await;
    assert_eq!(balance, BalanceLookup::Known(Coins::from_nano(3_000_000_000).unwrap()));

    let admin = admin();
    let target: TonAddress = user.parse().unwrap();
    let amount = Coins::from_decimal_str("1").unwrap();
    handle
        .claim(Some(&admin), &target, amount, Coins::DEFAULT_GAS)
        .await
        .unwrap();

    assert_eq!(*ledger.getters.lock().unwrap(), vec!["balanceOf", "seqno"]);

    let broadcasts = ledger.broadcasts.lock().unwrap();
    assert_eq!(broadcasts.len(), 1);

    // Undeployed wallet: state init and body are both attached
    let external = deserialize_boc(&broadcasts[0]).unwrap();
    assert_eq!(external.references().len(), 2);
    assert_eq!(external.references()[0].hash(), admin.state_init().hash());

    // Walk down to the claim carried by the internal message
    let signed_body = &external.references()[1];
    let internal = &signed_body.references()[0];
    let claim = MessageBody::from_cell(&internal.references()[0]).unwrap();
    assert_eq!(claim, MessageBody::Claim { user: target, amount });
}

#[tokio::test]
async fn test_unreachable_ledger_reads_zero_balance() {
    let ledger = RecordingLedger {
        fail_getters: true,
        ..Default::default()
    };
    let handle = ContractHandle::new(&ledger, contract());

    let balance = handle
        .get_balance("EQCLzn7IOmtz7php-ocCiRrOamBxhyYfFbXOCUNcI0I_38Cz", "balanceOf")
        .await;
    assert_eq!(serde_json::to_string(&balance).unwrap(), "\"0\"");
}

#[test]
fn test_withdraw_payload_for_wallet_app() {
    let tx = build_withdraw_payload("12.5", &contract(), Coins::DEFAULT_GAS).unwrap();
    let json = serde_json::to_value(&tx).unwrap();

    assert_eq!(json["to"], DEFAULT_CONTRACT_ADDRESS);
    assert_eq!(json["value"], "50000000");
    assert_eq!(
        MessageBody::from_base64_boc(json["payload"].as_str().unwrap()).unwrap(),
        MessageBody::WithdrawRequest {
            amount: Coins::from_nano(12_500_000_000).unwrap()
        }
    );
}
