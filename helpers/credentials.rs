//! Administrator credentials read from process input.

use std::fmt;

use starknet::{
    core::types::Felt,
    signers::{LocalWallet, SigningKey},
};

use crate::error::{DeployError, Result};

/// Order of the Stark curve; valid private keys live in `[1, ORDER)`.
const CURVE_ORDER: Felt =
    Felt::from_hex_unchecked("0x0800000000000010ffffffffffffffffb781126dcae7b2321e66a241adc64d2f");

/// Private key, account address and the public key derived from them.
#[derive(Clone)]
pub struct Credentials {
    private_key: Felt,
    account_address: Felt,
    public_key: Felt,
}

impl Credentials {
    /// Parses a private key (decimal or `0x` hex) and a hex account address.
    ///
    /// Malformed input is a configuration error; a key outside the curve's
    /// scalar range cannot produce a key pair and is a client init error.
    pub fn parse(private_key: &str, account_address: &str) -> Result<Self> {
        let private_key = parse_felt(private_key)
            .map_err(|reason| DeployError::config(format!("invalid private key: {reason}")))?;
        let account_address = parse_hex_felt(account_address)
            .map_err(|reason| DeployError::config(format!("invalid account address: {reason}")))?;
        Self::new(private_key, account_address)
    }

    pub fn new(private_key: Felt, account_address: Felt) -> Result<Self> {
        if private_key == Felt::ZERO
            || private_key.to_bytes_be() >= CURVE_ORDER.to_bytes_be()
        {
            return Err(DeployError::ClientInit(
                "private key is not a valid Stark curve scalar".to_string(),
            ));
        }
        if account_address == Felt::ZERO {
            return Err(DeployError::config("account address must be non-zero"));
        }

        let public_key = SigningKey::from_secret_scalar(private_key)
            .verifying_key()
            .scalar();

        Ok(Self {
            private_key,
            account_address,
            public_key,
        })
    }

    pub fn account_address(&self) -> Felt {
        self.account_address
    }

    pub fn public_key(&self) -> Felt {
        self.public_key
    }

    pub fn wallet(&self) -> LocalWallet {
        LocalWallet::from_signing_key(SigningKey::from_secret_scalar(self.private_key))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("private_key", &"<redacted>")
            .field("account_address", &format_args!("{:#x}", self.account_address))
            .field("public_key", &format_args!("{:#x}", self.public_key))
            .finish()
    }
}

/// Parses a field element written either in decimal or as `0x`-prefixed hex.
///
/// Values at or above the field prime are rejected rather than reduced.
pub fn parse_felt(value: &str) -> std::result::Result<Felt, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("empty value".to_string());
    }
    if value.starts_with("0x") || value.starts_with("0X") {
        return parse_hex_felt(value);
    }
    if !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("`{value}` is not a decimal or hex number"));
    }
    let felt = Felt::from_dec_str(value).map_err(|e| format!("`{value}` is not a felt: {e}"))?;
    // the parser reduces modulo the prime, so anything out of range comes back different
    if felt.to_string() != significant_digits(value) {
        return Err(out_of_range(value));
    }
    Ok(felt)
}

/// Parses a hex field element, with or without the `0x` prefix.
pub fn parse_hex_felt(value: &str) -> std::result::Result<Felt, String> {
    let value = value.trim();
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("`{value}` is not a hex number"));
    }
    if digits.trim_start_matches('0').len() > 64 {
        return Err(out_of_range(value));
    }
    let felt = Felt::from_hex(&format!("0x{digits}"))
        .map_err(|e| format!("`{value}` is not a felt: {e}"))?;
    if format!("{felt:x}") != significant_digits(digits).to_ascii_lowercase() {
        return Err(out_of_range(value));
    }
    Ok(felt)
}

fn significant_digits(digits: &str) -> &str {
    match digits.trim_start_matches('0') {
        "" => "0",
        rest => rest,
    }
}

fn out_of_range(value: &str) -> String {
    format!("`{value}` is not below the field prime")
}
