//! Admin wallet identity (wallet v3 revision 2)
//!
//! The wallet contract accepts external messages of the form
//! `signature:bits512 subwallet_id:u32 valid_until:u32 seqno:u32 (mode:u8 ^InternalMessage)*`
//! where the signature covers the hash of everything after it.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::address::TonAddress;
use crate::amount::Coins;
use crate::cell::{deserialize_boc, serialize_boc, Cell, CellBuilder, CellError};
use crate::client::{LedgerClient, StackEntry};
use crate::error::{Result, SdkError};
use crate::signer::{derive_key_pair, split_mnemonic, KeyPair};

/// Compiled wallet v3r2 code
const WALLET_V3R2_CODE: &str = "te6cckEBAQEAcQAA3v8AIN0gggFMl7ohggEznLqxn3Gw7UTQ0x/THzHXC//jBOCk8mCDCNcYINMf0x/TH/gjE7vyY+1E0NMf0x/T/9FRMrryoVFEuvKiBPkBVBBV+RDyo/gAkyDXSpbTB9QC+wDo0QGkyMsfyx/L/8ntVBC9ba0=";

/// Default subwallet id; the workchain id is added to it
pub const DEFAULT_SUBWALLET_ID: u32 = 698_983_191;

/// Pay fees separately from the value and ignore errors during the action phase
pub const DEFAULT_SEND_MODE: u8 = 3;

/// Seconds a signed message stays valid
const MESSAGE_TTL_SECS: u64 = 60;

fn wallet_code() -> std::result::Result<Arc<Cell>, CellError> {
    static CODE: OnceLock<Arc<Cell>> = OnceLock::new();
    if let Some(code) = CODE.get() {
        return Ok(code.clone());
    }
    let bytes = STANDARD
        .decode(WALLET_V3R2_CODE)
        .map_err(|e| CellError::InvalidBoc(e.to_string()))?;
    let code = deserialize_boc(&bytes)?;
    Ok(CODE.get_or_init(|| code).clone())
}

/// One outgoing internal message carried by a wallet transfer
#[derive(Debug, Clone)]
pub struct Transfer {
    pub destination: TonAddress,
    pub value: Coins,
    pub bounce: bool,
    pub body: Option<Arc<Cell>>,
}

impl Transfer {
    /// `int_msg_info$0` with no state init; the body goes into a reference
    fn to_internal_message(&self) -> std::result::Result<Cell, CellError> {
        let mut builder = CellBuilder::new();
        builder
            .store_bit(false)? // int_msg_info$0
            .store_bit(true)? // ihr_disabled
            .store_bit(self.bounce)?
            .store_bit(false)? // bounced
            .store_address_none()? // src, filled in by the validator
            .store_address(&self.destination)?
            .store_coins(self.value)?
            .store_bit(false)? // no extra currencies
            .store_coins(Coins::ZERO)? // ihr_fee
            .store_coins(Coins::ZERO)? // fwd_fee
            .store_uint(0, 64)? // created_lt
            .store_uint(0, 32)? // created_at
            .store_bit(false)?; // no state init

        match &self.body {
            Some(body) => {
                builder.store_bit(true)?.store_ref(body.clone())?;
            }
            None => {
                builder.store_bit(false)?;
            }
        }
        Ok(builder.build())
    }
}

/// The signer's key pair bound to a workchain and the wallet v3r2 contract
#[derive(Debug)]
pub struct WalletIdentity {
    key_pair: KeyPair,
    workchain: i8,
    subwallet_id: u32,
    address: TonAddress,
    state_init: Arc<Cell>,
}

impl WalletIdentity {
    pub fn new(key_pair: KeyPair, workchain: i8) -> std::result::Result<Self, CellError> {
        let subwallet_id = DEFAULT_SUBWALLET_ID.wrapping_add_signed(i32::from(workchain));

        let data = CellBuilder::new()
            .store_uint(0, 32)? // seqno
            .store_uint(u128::from(subwallet_id), 32)?
            .store_bytes(&key_pair.public_key())?
            .build();

        // split_depth:(Maybe) special:(Maybe) code:(Maybe ^Cell) data:(Maybe ^Cell) library:(HashmapE)
        let state_init = CellBuilder::new()
            .store_uint(0b00110, 5)?
            .store_ref(wallet_code()?)?
            .store_ref(Arc::new(data))?
            .build();

        let address = TonAddress::new(workchain, state_init.hash());

        Ok(Self {
            key_pair,
            workchain,
            subwallet_id,
            address,
            state_init: Arc::new(state_init),
        })
    }

    /// Derive the key pair from a whitespace separated phrase and build the wallet
    pub fn from_mnemonic(phrase: &str, workchain: i8) -> Result<Self> {
        let key_pair = derive_key_pair(&split_mnemonic(phrase))?;
        Ok(Self::new(key_pair, workchain)?)
    }

    pub fn address(&self) -> &TonAddress {
        &self.address
    }

    pub fn workchain(&self) -> i8 {
        self.workchain
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.key_pair.public_key()
    }

    pub fn state_init(&self) -> &Arc<Cell> {
        &self.state_init
    }

    /// Build the signed external message for `transfers`
    ///
    /// With `seqno == 0` the wallet is assumed undeployed: the state init is
    /// attached and the message never expires.
    pub fn create_transfer(
        &self,
        seqno: u32,
        transfers: &[Transfer],
        valid_until: u32,
    ) -> std::result::Result<Cell, CellError> {
        if transfers.len() > 4 {
            return Err(CellError::RefOverflow);
        }

        let valid_until = if seqno == 0 { u32::MAX } else { valid_until };

        let mut signing = CellBuilder::new();
        signing
            .store_uint(u128::from(self.subwallet_id), 32)?
            .store_uint(u128::from(valid_until), 32)?
            .store_uint(u128::from(seqno), 32)?;
        for transfer in transfers {
            signing
                .store_uint(u128::from(DEFAULT_SEND_MODE), 8)?
                .store_ref(Arc::new(transfer.to_internal_message()?))?;
        }
        let signing = signing.build();

        let signature = self.key_pair.sign(&signing.hash());
        let body = CellBuilder::new()
            .store_bytes(&signature)?
            .store_cell(&signing)?
            .build();

        // ext_in_msg_info$10 src:addr_none dest import_fee:0
        let mut message = CellBuilder::new();
        message
            .store_uint(0b10, 2)?
            .store_address_none()?
            .store_address(&self.address)?
            .store_coins(Coins::ZERO)?;
        if seqno == 0 {
            message.store_bit(true)?.store_bit(true)?.store_ref(self.state_init.clone())?;
        } else {
            message.store_bit(false)?;
        }
        message.store_bit(true)?.store_ref(Arc::new(body))?;

        Ok(message.build())
    }

    /// Current sequence number as reported by the wallet's `seqno` getter
    ///
    /// An uninitialized wallet fails the getter with a non-zero exit code and
    /// counts as seqno 0.
    pub async fn fetch_seqno(&self, client: &dyn LedgerClient) -> Result<u32> {
        let output = client
            .run_get_method(&self.address, "seqno", Vec::new())
            .await?;

        if output.exit_code != 0 {
            debug!(
                wallet = %self.address,
                exit_code = output.exit_code,
                "seqno getter failed, treating wallet as undeployed"
            );
            return Ok(0);
        }

        let seqno = output
            .stack
            .first()
            .and_then(StackEntry::as_int)
            .ok_or_else(|| SdkError::Rpc("seqno getter returned no number".to_string()))?;
        u32::try_from(seqno).map_err(|_| SdkError::Rpc(format!("seqno out of range: {seqno}")))
    }

    /// Sign and broadcast a single transfer
    pub async fn send(
        &self,
        client: &dyn LedgerClient,
        destination: &TonAddress,
        value: Coins,
        body: Cell,
    ) -> Result<()> {
        let seqno = self.fetch_seqno(client).await?;
        let transfer = Transfer {
            destination: *destination,
            value,
            bounce: true,
            body: Some(Arc::new(body)),
        };

        let external = self.create_transfer(seqno, &[transfer], expiry_from_now())?;
        let boc = serialize_boc(&external, true);

        client.send_boc(&boc).await?;
        info!(
            wallet = %self.address,
            destination = %destination,
            value = %value,
            seqno,
            "transfer broadcast"
        );
        Ok(())
    }
}

fn expiry_from_now() -> u32 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    u32::try_from(now + MESSAGE_TTL_SECS).unwrap_or(u32::MAX)
}
