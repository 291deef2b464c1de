//! Minimal Solidity ABI encoding for static arguments

use alloy_primitives::{Address, U256};
use thiserror::Error;
use tiny_keccak::{Hasher, Keccak};

/// Selector of the `Error(string)` revert payload
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// ABI word size
pub const WORD: usize = 32;

/// Failure to decode ABI data
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AbiError {
    /// Input is not valid hex
    #[error("invalid hex: {0}")]
    Hex(String),
    /// Fewer bytes than one word
    #[error("return data too short: {0} bytes")]
    Short(usize),
    /// Word is larger than the target integer
    #[error("value does not fit in u64")]
    Overflow,
}

/// Compute keccak256 hash
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// First four bytes of the signature hash
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Static argument of a contract call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token {
    /// `address`
    Address(Address),
    /// `uint256`
    Uint(U256),
}

impl Token {
    /// Encode as one big-endian word, addresses left-padded
    pub fn to_word(&self) -> [u8; WORD] {
        match self {
            Self::Address(address) => {
                let mut word = [0u8; WORD];
                word[12..].copy_from_slice(address.as_slice());
                word
            }
            Self::Uint(value) => value.to_be_bytes::<WORD>(),
        }
    }
}

impl From<Address> for Token {
    fn from(address: Address) -> Self {
        Self::Address(address)
    }
}

impl From<U256> for Token {
    fn from(value: U256) -> Self {
        Self::Uint(value)
    }
}

impl From<u64> for Token {
    fn from(value: u64) -> Self {
        Self::Uint(U256::from(value))
    }
}

/// Selector followed by the encoded arguments
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut calldata = Vec::with_capacity(4 + WORD * args.len());
    calldata.extend_from_slice(&selector(signature));
    for arg in args {
        calldata.extend_from_slice(&arg.to_word());
    }
    calldata
}

/// Decode `0x`-prefixed (or bare) hex
pub fn parse_hex(hex_str: &str) -> Result<Vec<u8>, AbiError> {
    hex::decode(hex_str.trim_start_matches("0x")).map_err(|e| AbiError::Hex(e.to_string()))
}

/// First return word as uint256
pub fn decode_uint(data: &[u8]) -> Result<U256, AbiError> {
    if data.len() < WORD {
        return Err(AbiError::Short(data.len()));
    }
    Ok(U256::from_be_slice(&data[..WORD]))
}

/// First return word as u64
pub fn decode_u64(data: &[u8]) -> Result<u64, AbiError> {
    let value = decode_uint(data)?;
    u64::try_from(value).map_err(|_| AbiError::Overflow)
}

/// Reason carried by an `Error(string)` revert payload
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let body = data.strip_prefix(&ERROR_STRING_SELECTOR[..])?;
    let offset = usize::try_from(decode_uint(body).ok()?).ok()?;
    let len_word = body.get(offset..)?;
    let len = usize::try_from(decode_uint(len_word).ok()?).ok()?;
    let start = offset.checked_add(WORD)?;
    let bytes = body.get(start..start.checked_add(len)?)?;
    String::from_utf8(bytes.to_vec()).ok()
}

/// Build an `Error(string)` revert payload
pub fn encode_revert_reason(reason: &str) -> Vec<u8> {
    let bytes = reason.as_bytes();
    let padded = bytes.len().div_ceil(WORD) * WORD;

    let mut data = Vec::with_capacity(4 + 2 * WORD + padded);
    data.extend_from_slice(&ERROR_STRING_SELECTOR);
    data.extend_from_slice(&Token::from(WORD as u64).to_word());
    data.extend_from_slice(&Token::from(bytes.len() as u64).to_word());
    data.extend_from_slice(bytes);
    data.resize(4 + 2 * WORD + padded, 0);
    data
}
