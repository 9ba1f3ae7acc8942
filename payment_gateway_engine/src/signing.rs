//! # Checkout and callback authentication
//!
//! Every form posted to the vendor, and every webhook the vendor posts back, carries a
//! `CheckMacValue` field: a keyed SHA-256 digest over a canonicalized rendering of all the other
//! fields. The canonicalization must be reproduced bit-exactly or nothing interoperates:
//!
//! 1. Take every field except `CheckMacValue`, sorted by key ascending, case-insensitively.
//! 2. Prefix the list with `HashKey=<secret>` and suffix it with `HashIV=<secret>`, then join
//!    the pairs as `key=value` with `&`.
//! 3. Percent-encode the whole string with the JavaScript `encodeURIComponent` keep-set,
//!    lowercase it, and apply three literal substitutions: `'` → `%27`, `~` → `%7e`,
//!    `%20` → `+`.
//! 4. SHA-256, hex-encode, uppercase.
//!
//! Verification recomputes the digest from everything except the presented MAC and compares
//! byte-for-byte. There is no partial trust: a mismatch is a hard authentication failure, and
//! the secrets are never logged (see [`Secret`]).

use std::collections::BTreeMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use pgw_common::Secret;
use sha2::{Digest, Sha256};

/// The name of the message-authentication field on the wire.
pub const CHECK_MAC_FIELD: &str = "CheckMacValue";

// The characters `encodeURIComponent` leaves bare. Everything else is percent-encoded before
// the lowercase + substitution pass.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Clone)]
pub struct CheckMacSigner {
    hash_key: Secret<String>,
    hash_iv: Secret<String>,
}

impl CheckMacSigner {
    pub fn new(hash_key: Secret<String>, hash_iv: Secret<String>) -> Self {
        Self { hash_key, hash_iv }
    }

    /// Compute the canonical checksum over the given fields. Any `CheckMacValue` field present
    /// in the input is excluded from the digest.
    pub fn checksum<'a, I>(&self, fields: I) -> String
    where I: IntoIterator<Item = (&'a str, &'a str)> {
        let mut fields =
            fields.into_iter().filter(|(k, _)| !k.eq_ignore_ascii_case(CHECK_MAC_FIELD)).collect::<Vec<_>>();
        fields.sort_by(|a, b| a.0.to_ascii_lowercase().cmp(&b.0.to_ascii_lowercase()));
        let joined = fields.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&");
        let raw = format!("HashKey={}&{joined}&HashIV={}", self.hash_key.reveal(), self.hash_iv.reveal());
        let encoded = utf8_percent_encode(&raw, URI_COMPONENT).to_string().to_lowercase();
        let canonical = encoded.replace('\'', "%27").replace('~', "%7e").replace("%20", "+");
        let digest = Sha256::digest(canonical.as_bytes());
        hex::encode_upper(digest)
    }

    /// Append the `CheckMacValue` field to an outbound payload.
    pub fn sign(&self, mut fields: Vec<(String, String)>) -> Vec<(String, String)> {
        let mac = self.checksum(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        fields.push((CHECK_MAC_FIELD.to_string(), mac));
        fields
    }

    /// Verify an inbound payload. A missing MAC field fails verification outright.
    pub fn verify(&self, fields: &BTreeMap<String, String>) -> bool {
        let Some(presented) = fields.get(CHECK_MAC_FIELD) else {
            return false;
        };
        let expected = self.checksum(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        expected.as_bytes() == presented.as_bytes()
    }
}
