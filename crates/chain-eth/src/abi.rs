//! Contract-interface (ABI) handling for EVM function calls.
//!
//! Parses the JSON interface description emitted by Solidity toolchains and
//! encodes/decodes calls for the subset of types the erasure contracts use:
//! `address`, `bool`, `uint<N>`, `bytes<N>`, `bytes` and `string`.

use std::fmt;

use alloy_primitives::U256;
use serde::Deserialize;
use sha3::{Digest, Keccak256};

use crate::error::EthError;

const WORD: usize = 32;

/// A parameter type supported by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Bool,
    /// Unsigned integer with the given bit width (8..=256, multiple of 8).
    Uint(usize),
    /// Fixed-size byte array `bytes<N>` (1..=32).
    FixedBytes(usize),
    Bytes,
    String,
}

impl ParamType {
    /// Parses a Solidity type name such as `uint256` or `bytes32`.
    pub fn parse(name: &str) -> Result<Self, EthError> {
        let unsupported = || EthError::UnsupportedType(name.to_string());

        match name {
            "address" => return Ok(Self::Address),
            "bool" => return Ok(Self::Bool),
            "bytes" => return Ok(Self::Bytes),
            "string" => return Ok(Self::String),
            "uint" => return Ok(Self::Uint(256)),
            "byte" => return Ok(Self::FixedBytes(1)),
            _ => {}
        }

        if let Some(bits) = name.strip_prefix("uint") {
            let bits: usize = bits.parse().map_err(|_| unsupported())?;
            if bits == 0 || bits > 256 || bits % 8 != 0 {
                return Err(unsupported());
            }
            return Ok(Self::Uint(bits));
        }

        if let Some(size) = name.strip_prefix("bytes") {
            let size: usize = size.parse().map_err(|_| unsupported())?;
            if size == 0 || size > WORD {
                return Err(unsupported());
            }
            return Ok(Self::FixedBytes(size));
        }

        Err(unsupported())
    }

    /// Whether values of this type live in the tail section of the encoding.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Bytes | Self::String)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address => f.write_str("address"),
            Self::Bool => f.write_str("bool"),
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::FixedBytes(size) => write!(f, "bytes{size}"),
            Self::Bytes => f.write_str("bytes"),
            Self::String => f.write_str("string"),
        }
    }
}

/// A single ABI value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address([u8; 20]),
    Bool(bool),
    Uint(U256),
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    String(String),
}

impl Token {
    pub fn into_address(self) -> Option<[u8; 20]> {
        match self {
            Self::Address(addr) => Some(addr),
            _ => None,
        }
    }

    pub fn into_bool(self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_uint(self) -> Option<U256> {
        match self {
            Self::Uint(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Bytes(bytes) | Self::FixedBytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// A named function parameter as declared in the JSON interface.
#[derive(Debug, Clone, Deserialize)]
pub struct Param {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateMutability {
    Pure,
    View,
    NonPayable,
    Payable,
}

/// A callable contract function.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
    pub state_mutability: StateMutability,
}

impl Function {
    /// Canonical signature, e.g. `createPostExplicit(address,bytes,bytes,bytes)`.
    pub fn signature(&self) -> String {
        let types: Vec<String> = self
            .inputs
            .iter()
            .map(|p| match ParamType::parse(&p.kind) {
                Ok(ty) => ty.to_string(),
                Err(_) => p.kind.clone(),
            })
            .collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// First four bytes of the Keccak-256 hash of the signature.
    pub fn selector(&self) -> [u8; 4] {
        let hash = Keccak256::digest(self.signature().as_bytes());
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&hash[..4]);
        selector
    }

    pub fn is_read_only(&self) -> bool {
        matches!(
            self.state_mutability,
            StateMutability::View | StateMutability::Pure
        )
    }

    /// Encodes `selector || abi_encode(args)` after checking the arguments
    /// against the declared inputs.
    pub fn encode_input(&self, args: &[Token]) -> Result<Vec<u8>, EthError> {
        if args.len() != self.inputs.len() {
            return Err(EthError::InvalidArguments(format!(
                "{} expects {} arguments, got {}",
                self.name,
                self.inputs.len(),
                args.len()
            )));
        }

        let types = parse_params(&self.inputs)?;
        for (i, (ty, token)) in types.iter().zip(args).enumerate() {
            check_token(ty, token).map_err(|reason| {
                EthError::InvalidArguments(format!("{} argument {i}: {reason}", self.name))
            })?;
        }

        let mut data = Vec::with_capacity(4 + args.len() * WORD);
        data.extend_from_slice(&self.selector());
        data.extend_from_slice(&encode_tokens(&types, args));
        Ok(data)
    }

    /// Decodes return data according to the declared outputs.
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<Token>, EthError> {
        let types = parse_params(&self.outputs)?;
        decode_tokens(&types, data)
    }
}

/// A parsed contract interface.
#[derive(Debug, Clone, Default)]
pub struct Abi {
    functions: Vec<Function>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AbiEntry {
    #[serde(rename = "type", default = "default_entry_type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<Param>,
    #[serde(default)]
    outputs: Vec<Param>,
    #[serde(default)]
    state_mutability: Option<String>,
    #[serde(default)]
    constant: Option<bool>,
    #[serde(default)]
    payable: Option<bool>,
}

fn default_entry_type() -> String {
    "function".to_string()
}

impl Abi {
    /// Builds an interface from the JSON array found under an artifact's
    /// `abi` key. Constructors, events and fallbacks are skipped.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, EthError> {
        let entries: Vec<AbiEntry> = serde_json::from_value(value.clone())
            .map_err(|e| EthError::InvalidAbi(e.to_string()))?;

        let functions = entries
            .into_iter()
            .filter(|entry| entry.kind == "function")
            .map(|entry| {
                let state_mutability = match entry.state_mutability.as_deref() {
                    Some("pure") => StateMutability::Pure,
                    Some("view") => StateMutability::View,
                    Some("payable") => StateMutability::Payable,
                    Some("nonpayable") => StateMutability::NonPayable,
                    Some(other) => {
                        return Err(EthError::InvalidAbi(format!(
                            "unknown state mutability `{other}` on {}",
                            entry.name
                        )))
                    }
                    // Pre-0.5 compilers only emit `constant` and `payable`.
                    None if entry.constant == Some(true) => StateMutability::View,
                    None if entry.payable == Some(true) => StateMutability::Payable,
                    None => StateMutability::NonPayable,
                };

                Ok(Function {
                    name: entry.name,
                    inputs: entry.inputs,
                    outputs: entry.outputs,
                    state_mutability,
                })
            })
            .collect::<Result<Vec<_>, EthError>>()?;

        Ok(Self { functions })
    }

    pub fn from_json_str(json: &str) -> Result<Self, EthError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| EthError::InvalidAbi(e.to_string()))?;
        Self::from_json(&value)
    }

    /// Looks up a function by name. For overloaded names the first
    /// declaration wins.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn parse_params(params: &[Param]) -> Result<Vec<ParamType>, EthError> {
    params.iter().map(|p| ParamType::parse(&p.kind)).collect()
}

fn check_token(ty: &ParamType, token: &Token) -> Result<(), String> {
    match (ty, token) {
        (ParamType::Address, Token::Address(_))
        | (ParamType::Bool, Token::Bool(_))
        | (ParamType::Bytes, Token::Bytes(_))
        | (ParamType::String, Token::String(_)) => Ok(()),
        (ParamType::Uint(bits), Token::Uint(value)) => {
            if value.bit_len() > *bits {
                Err(format!("value does not fit in uint{bits}"))
            } else {
                Ok(())
            }
        }
        (ParamType::FixedBytes(size), Token::FixedBytes(bytes)) => {
            if bytes.len() != *size {
                Err(format!("expected {size} bytes, got {}", bytes.len()))
            } else {
                Ok(())
            }
        }
        (ty, token) => Err(format!("expected {ty}, got {token:?}")),
    }
}

/// Head/tail encoding: static values inline, dynamic values as an offset
/// into the tail.
fn encode_tokens(types: &[ParamType], tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for (ty, token) in types.iter().zip(tokens) {
        if ty.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            tail.extend_from_slice(&encode_dynamic(token));
        } else {
            head.extend_from_slice(&encode_static(token));
        }
    }

    head.extend_from_slice(&tail);
    head
}

fn encode_static(token: &Token) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    match token {
        Token::Address(addr) => word[12..].copy_from_slice(addr),
        Token::Bool(value) => word[31] = *value as u8,
        Token::Uint(value) => word = value.to_be_bytes::<WORD>(),
        Token::FixedBytes(bytes) => word[..bytes.len()].copy_from_slice(bytes),
        Token::Bytes(_) | Token::String(_) => unreachable!("dynamic token in head"),
    }
    word
}

fn encode_dynamic(token: &Token) -> Vec<u8> {
    let bytes = match token {
        Token::Bytes(bytes) => bytes.as_slice(),
        Token::String(s) => s.as_bytes(),
        _ => unreachable!("static token in tail"),
    };

    let padded_len = bytes.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(WORD + padded_len);
    out.extend_from_slice(&usize_word(bytes.len()));
    out.extend_from_slice(bytes);
    out.resize(WORD + padded_len, 0);
    out
}

fn usize_word(value: usize) -> [u8; WORD] {
    U256::from(value as u64).to_be_bytes::<WORD>()
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn decode_tokens(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, EthError> {
    types
        .iter()
        .enumerate()
        .map(|(i, ty)| {
            let word = read_word(data, i * WORD)?;
            if ty.is_dynamic() {
                let offset = word_to_usize(word)?;
                let len = word_to_usize(read_word(data, offset)?)?;
                let start = offset + WORD;
                let bytes = start
                    .checked_add(len)
                    .and_then(|end| data.get(start..end))
                    .ok_or_else(|| {
                        EthError::DecodingError(format!(
                            "dynamic value of {len} bytes at offset {offset} exceeds output"
                        ))
                    })?;
                decode_dynamic(ty, bytes)
            } else {
                decode_static(ty, word)
            }
        })
        .collect()
}

fn read_word(data: &[u8], offset: usize) -> Result<&[u8; WORD], EthError> {
    offset
        .checked_add(WORD)
        .and_then(|end| data.get(offset..end))
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| {
            EthError::DecodingError(format!(
                "output of {} bytes has no word at offset {offset}",
                data.len()
            ))
        })
}

fn word_to_usize(word: &[u8; WORD]) -> Result<usize, EthError> {
    let value = U256::from_be_bytes(*word);
    usize::try_from(value)
        .map_err(|_| EthError::DecodingError(format!("offset or length {value} out of range")))
}

fn decode_static(ty: &ParamType, word: &[u8; WORD]) -> Result<Token, EthError> {
    match ty {
        ParamType::Address => {
            if word[..12].iter().any(|&b| b != 0) {
                return Err(EthError::DecodingError("address word has dirty padding".into()));
            }
            let mut addr = [0u8; 20];
            addr.copy_from_slice(&word[12..]);
            Ok(Token::Address(addr))
        }
        ParamType::Bool => match U256::from_be_bytes(*word) {
            v if v.is_zero() => Ok(Token::Bool(false)),
            v if v == U256::from(1u64) => Ok(Token::Bool(true)),
            v => Err(EthError::DecodingError(format!("invalid bool value {v}"))),
        },
        ParamType::Uint(bits) => {
            let value = U256::from_be_bytes(*word);
            if value.bit_len() > *bits {
                return Err(EthError::DecodingError(format!(
                    "value does not fit in uint{bits}"
                )));
            }
            Ok(Token::Uint(value))
        }
        ParamType::FixedBytes(size) => Ok(Token::FixedBytes(word[..*size].to_vec())),
        ParamType::Bytes | ParamType::String => unreachable!("dynamic type in head"),
    }
}

fn decode_dynamic(ty: &ParamType, bytes: &[u8]) -> Result<Token, EthError> {
    match ty {
        ParamType::Bytes => Ok(Token::Bytes(bytes.to_vec())),
        ParamType::String => String::from_utf8(bytes.to_vec())
            .map(Token::String)
            .map_err(|e| EthError::DecodingError(format!("invalid utf-8 string: {e}"))),
        _ => unreachable!("static type in tail"),
    }
}
