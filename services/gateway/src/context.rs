//! Process-wide state shared by the request handlers

use std::sync::Arc;
use warriors_sdk::{Coins, ContractHandle, LedgerClient, TonAddress, WalletIdentity};

pub struct GatewayContext {
    pub ledger: Arc<dyn LedgerClient>,

    pub contract: TonAddress,

    /// `None` when no admin mnemonic is configured
    pub admin: Option<WalletIdentity>,

    pub claim_amount: Coins,

    /// Value attached to claim messages
    pub gas: Coins,

    pub balance_getter: String,
}

impl GatewayContext {
    pub fn contract(&self) -> ContractHandle<'_> {
        ContractHandle::new(self.ledger.as_ref(), self.contract)
    }
}
