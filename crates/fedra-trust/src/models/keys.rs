//! Federation key sets.
//!
//! Every entity statement carries the subject's signing keys as a JWK set in
//! its `jwks` claim; the validator resolves each hop's verification key from
//! the set declared one hop closer to the anchor.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

/// A set of federation signing keys, as embedded in a statement's `jwks`
/// claim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JwkSet {
    /// The keys in this set.
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// An empty key set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from a list of keys.
    #[must_use]
    pub fn from_keys(keys: Vec<Jwk>) -> Self {
        Self { keys }
    }

    /// Find a key by its key ID.
    #[must_use]
    pub fn find_key(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }

    /// Find a key suitable for signature verification.
    ///
    /// With a kid, match by kid. Without one, return the first RSA key whose
    /// declared use permits signing.
    #[must_use]
    pub fn find_signing_key(&self, kid: Option<&str>) -> Option<&Jwk> {
        match kid {
            Some(kid) => self.find_key(kid),
            None => self.keys.iter().find(|k| k.is_rsa() && k.is_signing_key()),
        }
    }

    /// Key IDs present in this set, in declaration order.
    #[must_use]
    pub fn key_ids(&self) -> Vec<&str> {
        self.keys.iter().filter_map(|k| k.kid.as_deref()).collect()
    }

    /// Whether the set contains no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// A single federation key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type (e.g., "RSA").
    pub kty: String,

    /// Public key use ("sig" or "enc").
    #[serde(rename = "use")]
    pub use_: Option<String>,

    /// Key ID.
    pub kid: Option<String>,

    /// Algorithm (e.g., "RS256").
    pub alg: Option<String>,

    /// RSA modulus (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA exponent (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

impl Jwk {
    /// Construct an RS256 signing key from raw base64url modulus/exponent.
    #[must_use]
    pub fn rsa_signing(kid: impl Into<String>, n: impl Into<String>, e: impl Into<String>) -> Self {
        Self {
            kty: "RSA".to_string(),
            use_: Some("sig".to_string()),
            kid: Some(kid.into()),
            alg: Some("RS256".to_string()),
            n: Some(n.into()),
            e: Some(e.into()),
        }
    }

    /// Whether this is an RSA key.
    #[must_use]
    pub fn is_rsa(&self) -> bool {
        self.kty == "RSA"
    }

    /// Whether this key may be used for signature verification.
    #[must_use]
    pub fn is_signing_key(&self) -> bool {
        self.use_.is_none() || self.use_.as_deref() == Some("sig")
    }

    /// Convert an RSA key to a PEM-encoded SubjectPublicKeyInfo.
    ///
    /// Returns None for non-RSA keys or when modulus/exponent are missing or
    /// not valid base64url.
    #[must_use]
    pub fn to_pem(&self) -> Option<Vec<u8>> {
        if !self.is_rsa() {
            return None;
        }

        let n = URL_SAFE_NO_PAD.decode(self.n.as_ref()?).ok()?;
        let e = URL_SAFE_NO_PAD.decode(self.e.as_ref()?).ok()?;

        let der = rsa_spki_der(&n, &e);
        Some(pem_encode("PUBLIC KEY", &der))
    }
}

/// DER-encode an RSA SubjectPublicKeyInfo from modulus and exponent.
fn rsa_spki_der(n: &[u8], e: &[u8]) -> Vec<u8> {
    // RSAPublicKey ::= SEQUENCE { modulus INTEGER, publicExponent INTEGER }
    let rsa_pub_key = der_sequence(&[&der_integer(n), &der_integer(e)]);

    // AlgorithmIdentifier: OID 1.2.840.113549.1.1.1 (rsaEncryption), NULL params
    let rsa_oid = [
        0x06, 0x09, 0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x01,
    ];
    let null_param = [0x05, 0x00];
    let algorithm = der_sequence(&[&rsa_oid, &null_param]);

    // BIT STRING wrapping the RSAPublicKey, unused bits = 0
    let mut bit_string = vec![0x03];
    der_length(&mut bit_string, rsa_pub_key.len() + 1);
    bit_string.push(0x00);
    bit_string.extend_from_slice(&rsa_pub_key);

    der_sequence(&[&algorithm, &bit_string])
}

fn der_integer(data: &[u8]) -> Vec<u8> {
    let mut result = vec![0x02];

    // Strip leading zeros, keep at least one byte.
    let mut start = 0;
    while start < data.len().saturating_sub(1) && data[start] == 0 {
        start += 1;
    }
    let trimmed = &data[start..];

    // Prepend a zero byte when the high bit is set so the integer stays positive.
    let needs_zero = !trimmed.is_empty() && (trimmed[0] & 0x80) != 0;

    der_length(&mut result, trimmed.len() + usize::from(needs_zero));
    if needs_zero {
        result.push(0x00);
    }
    result.extend_from_slice(trimmed);
    result
}

fn der_sequence(items: &[&[u8]]) -> Vec<u8> {
    let mut result = vec![0x30];
    der_length(&mut result, items.iter().map(|i| i.len()).sum());
    for item in items {
        result.extend_from_slice(item);
    }
    result
}

fn der_length(buf: &mut Vec<u8>, len: usize) {
    if len < 128 {
        buf.push(len as u8);
    } else if len < 256 {
        buf.push(0x81);
        buf.push(len as u8);
    } else {
        buf.push(0x82);
        buf.push((len >> 8) as u8);
        buf.push((len & 0xFF) as u8);
    }
}

fn pem_encode(label: &str, der: &[u8]) -> Vec<u8> {
    use base64::engine::general_purpose::STANDARD;

    let mut pem = format!("-----BEGIN {label}-----\n").into_bytes();
    let b64 = STANDARD.encode(der);
    for chunk in b64.as_bytes().chunks(64) {
        pem.extend_from_slice(chunk);
        pem.push(b'\n');
    }
    pem.extend_from_slice(format!("-----END {label}-----\n").as_bytes());
    pem
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> JwkSet {
        JwkSet::from_keys(vec![
            Jwk::rsa_signing("fed-key-1", "dGVzdA", "AQAB"),
            Jwk::rsa_signing("fed-key-2", "dGVzdDI", "AQAB"),
        ])
    }

    #[test]
    fn test_find_key_by_kid() {
        let set = sample_set();

        assert!(set.find_key("fed-key-1").is_some());
        assert!(set.find_key("fed-key-9").is_none());
    }

    #[test]
    fn test_find_signing_key_without_kid_picks_rsa_sig() {
        let mut keys = vec![Jwk {
            kty: "EC".to_string(),
            use_: Some("sig".to_string()),
            kid: Some("ec-key".to_string()),
            alg: None,
            n: None,
            e: None,
        }];
        keys.extend(sample_set().keys);
        let set = JwkSet::from_keys(keys);

        let key = set.find_signing_key(None).unwrap();
        assert_eq!(key.kid.as_deref(), Some("fed-key-1"));
    }

    #[test]
    fn test_encryption_key_is_not_signing_key() {
        let enc = Jwk {
            kty: "RSA".to_string(),
            use_: Some("enc".to_string()),
            kid: None,
            alg: None,
            n: None,
            e: None,
        };
        assert!(!enc.is_signing_key());
    }

    #[test]
    fn test_to_pem_rejects_non_rsa() {
        let ec = Jwk {
            kty: "EC".to_string(),
            use_: Some("sig".to_string()),
            kid: None,
            alg: None,
            n: None,
            e: None,
        };
        assert!(ec.to_pem().is_none());
    }

    #[test]
    fn test_to_pem_produces_public_key_block() {
        let key = Jwk::rsa_signing(
            "k1",
            "uOs2bjkrVK1Vi6uSrZAGjy_YTQlC0eMz4YLJHVDgdXPm8UYjonBBykwbKm-C0p4syG93yBDeV7lC-U8zgSk94QHP4CilO9VShORDHG37iy1cU6o9PCto-z8wgoc88nWRowFn4rJ3QEnkDyCdRzNy4d1YV2q97sMW6U9iqsefQu0g6Qkx7GcLy1TLqchIi_tfKxSO7w75Zx8bqBuXZBmYcmay3ysdQN3l-PVIm4ic_CpuFLW0XmeTvlUp3R2JoSxVySh3faTq-18cspk7nBiW5mTpko2924GiIWMh_graaMU7agn1ItpBwmXQtXBhfd1J6i5jSKu53NGG4SSXPvu9jQ",
            "AQAB",
        );

        let pem = key.to_pem().unwrap();
        let text = String::from_utf8(pem).unwrap();
        assert!(text.starts_with("-----BEGIN PUBLIC KEY-----"));
        assert!(text.trim_end().ends_with("-----END PUBLIC KEY-----"));
    }

    #[test]
    fn test_key_ids_in_declaration_order() {
        let set = sample_set();
        assert_eq!(set.key_ids(), vec!["fed-key-1", "fed-key-2"]);
    }

    #[test]
    fn test_jwk_set_round_trips_as_claim_value() {
        let set = sample_set();
        let json = serde_json::to_string(&set).unwrap();
        let back: JwkSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.keys.len(), 2);
        assert_eq!(back.key_ids(), set.key_ids());
    }
}
