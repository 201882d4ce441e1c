//! Binary plist bodies of the SRP `/pair-setup` exchange

use std::io::Cursor;

use plist::{Dictionary, Value};

use super::PairingError;

/// Dictionary keys
pub mod keys {
    /// Exchange step selector (`pin`)
    pub const METHOD: &str = "method";
    /// SRP username
    pub const USER: &str = "user";
    /// SRP public ephemeral (A or B)
    pub const PUBLIC_KEY: &str = "pk";
    /// SRP salt
    pub const SALT: &str = "salt";
    /// SRP proof (M1 or M2)
    pub const PROOF: &str = "proof";
}

/// Salt and server public key from the first `/pair-setup` reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrpChallenge {
    /// SRP salt
    pub salt: Vec<u8>,
    /// Server public ephemeral B, as received
    pub server_public: Vec<u8>,
}

fn encode(dict: Dictionary) -> Result<Vec<u8>, PairingError> {
    let mut buf = Vec::new();
    Value::Dictionary(dict)
        .to_writer_binary(Cursor::new(&mut buf))
        .map_err(|e| PairingError::Plist(e.to_string()))?;
    Ok(buf)
}

fn decode(data: &[u8]) -> Result<Dictionary, PairingError> {
    match plist::from_bytes::<Value>(data) {
        Ok(Value::Dictionary(dict)) => Ok(dict),
        Ok(_) => Err(PairingError::MalformedResponse(
            "pair-setup reply is not a dictionary".to_string(),
        )),
        Err(e) => Err(PairingError::Plist(e.to_string())),
    }
}

fn data_field<'a>(dict: &'a Dictionary, key: &str) -> Option<&'a [u8]> {
    dict.get(key).and_then(Value::as_data)
}

/// `{ method: "pin", user: <identity>, pk: A }`
///
/// # Errors
/// Returns `PairingError::Plist` if serialization fails.
pub fn start_request(identity: &str, client_public: &[u8]) -> Result<Vec<u8>, PairingError> {
    let mut dict = Dictionary::new();
    dict.insert(keys::METHOD.to_string(), Value::String("pin".to_string()));
    dict.insert(keys::USER.to_string(), Value::String(identity.to_string()));
    dict.insert(
        keys::PUBLIC_KEY.to_string(),
        Value::Data(client_public.to_vec()),
    );
    encode(dict)
}

/// `{ pk: A, proof: M1 }`
///
/// # Errors
/// Returns `PairingError::Plist` if serialization fails.
pub fn proof_request(client_public: &[u8], proof: &[u8]) -> Result<Vec<u8>, PairingError> {
    let mut dict = Dictionary::new();
    dict.insert(
        keys::PUBLIC_KEY.to_string(),
        Value::Data(client_public.to_vec()),
    );
    dict.insert(keys::PROOF.to_string(), Value::Data(proof.to_vec()));
    encode(dict)
}

/// Read `salt` and `pk` from the start reply
///
/// # Errors
/// Returns `PairingError::MalformedResponse` if either entry is missing or
/// not data.
pub fn parse_challenge(data: &[u8]) -> Result<SrpChallenge, PairingError> {
    let dict = decode(data)?;
    let salt = data_field(&dict, keys::SALT)
        .ok_or_else(|| PairingError::MalformedResponse("missing salt".to_string()))?;
    let server_public = data_field(&dict, keys::PUBLIC_KEY)
        .ok_or_else(|| PairingError::MalformedResponse("missing pk".to_string()))?;
    Ok(SrpChallenge {
        salt: salt.to_vec(),
        server_public: server_public.to_vec(),
    })
}

/// Read the optional server proof M2 from the proof reply
///
/// An empty body carries no proof.
///
/// # Errors
/// Returns an error if a non-empty body is not a dictionary plist.
pub fn parse_server_proof(data: &[u8]) -> Result<Option<Vec<u8>>, PairingError> {
    if data.is_empty() {
        return Ok(None);
    }
    let dict = decode(data)?;
    Ok(data_field(&dict, keys::PROOF).map(<[u8]>::to_vec))
}

/// Encode a challenge the way a receiver does (test receivers use this)
///
/// # Errors
/// Returns `PairingError::Plist` if serialization fails.
pub fn challenge_response(challenge: &SrpChallenge) -> Result<Vec<u8>, PairingError> {
    let mut dict = Dictionary::new();
    dict.insert(keys::SALT.to_string(), Value::Data(challenge.salt.clone()));
    dict.insert(
        keys::PUBLIC_KEY.to_string(),
        Value::Data(challenge.server_public.clone()),
    );
    encode(dict)
}

/// Encode a proof reply carrying M2 (test receivers use this)
///
/// # Errors
/// Returns `PairingError::Plist` if serialization fails.
pub fn server_proof_response(proof: &[u8]) -> Result<Vec<u8>, PairingError> {
    let mut dict = Dictionary::new();
    dict.insert(keys::PROOF.to_string(), Value::Data(proof.to_vec()));
    encode(dict)
}

/// Decode any pairing request dictionary (test receivers use this)
///
/// # Errors
/// Returns an error if `data` is not a dictionary plist.
pub fn decode_request(data: &[u8]) -> Result<Dictionary, PairingError> {
    decode(data)
}
