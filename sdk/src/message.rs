//! Airdrop contract message schema and payload codec
//!
//! Both messages are a single cell with no references:
//!
//! | message           | op (uint32)  | fields                                  |
//! |-------------------|--------------|-----------------------------------------|
//! | `Claim`           | `0x6f5a1c07` | `user: MsgAddressInt`, `amount: coins`  |
//! | `WithdrawRequest` | `0x2a9d4b30` | `amount: coins`                         |
//!
//! `coins` is `VarUInteger 16` (4-bit byte length, then the value).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::sync::Arc;

use crate::address::TonAddress;
use crate::amount::Coins;
use crate::cell::{deserialize_boc, serialize_boc, Cell, CellBuilder, CellError};
use crate::error::{Result, SdkError};

pub const CLAIM_OPCODE: u32 = 0x6f5a_1c07;
pub const WITHDRAW_REQUEST_OPCODE: u32 = 0x2a9d_4b30;

const OPCODE_BITS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Claim { user: TonAddress, amount: Coins },
    WithdrawRequest { amount: Coins },
}

impl MessageBody {
    pub fn opcode(&self) -> u32 {
        match self {
            MessageBody::Claim { .. } => CLAIM_OPCODE,
            MessageBody::WithdrawRequest { .. } => WITHDRAW_REQUEST_OPCODE,
        }
    }

    pub fn to_cell(&self) -> std::result::Result<Cell, CellError> {
        let mut builder = CellBuilder::new();
        builder.store_uint(u128::from(self.opcode()), OPCODE_BITS)?;
        match self {
            MessageBody::Claim { user, amount } => {
                builder.store_address(user)?.store_coins(*amount)?;
            }
            MessageBody::WithdrawRequest { amount } => {
                builder.store_coins(*amount)?;
            }
        }
        Ok(builder.build())
    }

    pub fn from_cell(cell: &Cell) -> std::result::Result<Self, CellError> {
        let mut slice = cell.parse();
        let body = match slice.load_u32()? {
            CLAIM_OPCODE => MessageBody::Claim {
                user: slice.load_address()?,
                amount: slice.load_coins()?,
            },
            WITHDRAW_REQUEST_OPCODE => MessageBody::WithdrawRequest {
                amount: slice.load_coins()?,
            },
            other => return Err(CellError::UnknownOpcode(other)),
        };
        slice.ensure_empty()?;
        Ok(body)
    }

    /// Base64 of the body serialized as a bag of cells
    pub fn to_base64_boc(&self) -> std::result::Result<String, CellError> {
        Ok(STANDARD.encode(serialize_boc(&self.to_cell()?, true)))
    }

    pub fn from_base64_boc(payload: &str) -> std::result::Result<Self, CellError> {
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| CellError::InvalidBoc(e.to_string()))?;
        let root: Arc<Cell> = deserialize_boc(&bytes)?;
        Self::from_cell(&root)
    }
}

/// An unsigned transaction for the client wallet to sign and send
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawTransaction {
    pub to: TonAddress,
    pub value: Coins,
    pub payload: String,
}

/// Build the `WithdrawRequest` payload for an amount given in TON
pub fn build_withdraw_payload(
    amount: &str,
    contract: &TonAddress,
    gas: Coins,
) -> Result<WithdrawTransaction> {
    let amount = Coins::from_decimal_str(amount)?;
    let payload = MessageBody::WithdrawRequest { amount }
        .to_base64_boc()
        .map_err(|e| SdkError::Encoding(e.to_string()))?;

    Ok(WithdrawTransaction {
        to: *contract,
        value: gas,
        payload,
    })
}
