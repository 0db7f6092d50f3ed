//! Connect SSO payload codec.
//!
//! A payload is an ordered set of named fields, serialized as an
//! `application/x-www-form-urlencoded` query string and wrapped in Base64.
//! The signature is computed over the Base64 text, so encoding must be
//! deterministic: fields serialize in insertion order.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use url::form_urlencoded;

use crate::error::{ConnectError, ConnectResult};

/// Opaque correlation token, round-tripped unchanged.
pub const FIELD_NONCE: &str = "nonce";
/// Forum callback URL, required on inbound payloads.
pub const FIELD_RETURN_URL: &str = "return_sso_url";
/// Local user id as known to the forum.
pub const FIELD_EXTERNAL_ID: &str = "external_id";
pub const FIELD_EMAIL: &str = "email";
pub const FIELD_USERNAME: &str = "username";
pub const FIELD_NAME: &str = "name";

/// Ordered key→value parameter set carried through the SSO handshake.
///
/// Keys are unique. Decoding keeps the first occurrence of a duplicated
/// key and drops the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsoPayload {
    fields: Vec<(String, String)>,
}

impl SsoPayload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a Base64-wrapped query string into a payload.
    ///
    /// Tolerates Base64 input with up to two missing `=` padding characters
    /// (the forum URL-transports the blob and padding is routinely lost).
    /// Values with percent-encoded `&`/`=` inside them decode correctly;
    /// this is a real query-string parser, not a split on separators.
    pub fn decode(blob: &str) -> ConnectResult<Self> {
        let bytes = BASE64
            .decode(pad_base64(blob).as_bytes())
            .map_err(|e| ConnectError::MalformedPayload(format!("invalid base64: {e}")))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| ConnectError::MalformedPayload(format!("payload is not UTF-8: {e}")))?;

        let mut payload = Self::new();
        for (key, value) in form_urlencoded::parse(text.as_bytes()) {
            // Duplicate keys: first occurrence wins.
            if payload.get(key.as_ref()).is_none() {
                payload.fields.push((key.into_owned(), value.into_owned()));
            }
        }
        Ok(payload)
    }

    /// Serialize to the wire form: query string in insertion order, then
    /// Base64. Exact inverse of [`SsoPayload::decode`] for payloads this
    /// system produces.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.fields {
            serializer.append_pair(key, value);
        }
        BASE64.encode(serializer.finish())
    }

    /// Look up a field value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a field, replacing any existing value and keeping its position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    /// A required field, or the `MissingField` rejection.
    pub fn require(&self, field: &'static str) -> ConnectResult<&str> {
        self.get(field).ok_or(ConnectError::MissingField { field })
    }

    #[must_use]
    pub fn nonce(&self) -> Option<&str> {
        self.get(FIELD_NONCE)
    }

    #[must_use]
    pub fn return_sso_url(&self) -> Option<&str> {
        self.get(FIELD_RETURN_URL)
    }

    #[must_use]
    pub fn external_id(&self) -> Option<&str> {
        self.get(FIELD_EXTERNAL_ID)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Restore `=` padding lost in URL transport.
fn pad_base64(blob: &str) -> String {
    match blob.len() % 4 {
        0 => blob.to_string(),
        rem => format!("{blob}{}", "=".repeat(4 - rem)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SsoPayload {
        let mut p = SsoPayload::new();
        p.set(FIELD_NONCE, "abc123");
        p.set(FIELD_RETURN_URL, "https://forum.example.com/session/sso_login");
        p
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let p = sample();
        assert_eq!(SsoPayload::decode(&p.encode()).unwrap(), p);
    }

    #[test]
    fn test_round_trip_preserves_reserved_characters() {
        let mut p = SsoPayload::new();
        p.set("name", "A&B=C team");
        p.set("email", "user+tag@example.com");
        let decoded = SsoPayload::decode(&p.encode()).unwrap();
        assert_eq!(decoded.get("name"), Some("A&B=C team"));
        assert_eq!(decoded.get("email"), Some("user+tag@example.com"));
    }

    #[test]
    fn test_decode_tolerates_missing_padding() {
        let encoded = sample().encode();
        let stripped = encoded.trim_end_matches('=');
        // 0, 1 or 2 chars of padding may be missing depending on length
        assert_eq!(SsoPayload::decode(stripped).unwrap(), sample());
        assert_eq!(SsoPayload::decode(&encoded).unwrap(), sample());
    }

    #[test]
    fn test_decode_all_padding_deficits() {
        // Query-string lengths chosen so the Base64 form needs two, one and
        // zero '=' characters respectively.
        for text in ["a=12", "a=123", "a=1234"] {
            let full = BASE64.encode(text);
            let stripped = full.trim_end_matches('=').to_string();
            assert_eq!(
                SsoPayload::decode(&full).unwrap(),
                SsoPayload::decode(&stripped).unwrap(),
                "{text}"
            );
        }
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        let err = SsoPayload::decode("!!!not-base64!!!").unwrap_err();
        assert_eq!(err.error_code(), "malformed_payload");
    }

    #[test]
    fn test_decode_rejects_non_utf8() {
        // 0xFF 0xFE is not valid UTF-8
        let blob = BASE64.encode([0xFF, 0xFE, 0x00, 0x01]);
        let err = SsoPayload::decode(&blob).unwrap_err();
        assert_eq!(err.error_code(), "malformed_payload");
    }

    #[test]
    fn test_duplicate_keys_first_occurrence_wins() {
        let blob = BASE64.encode("nonce=first&nonce=second&email=a%40b.c");
        let p = SsoPayload::decode(&blob).unwrap();
        assert_eq!(p.nonce(), Some("first"));
        assert_eq!(p.get("email"), Some("a@b.c"));
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut p = sample();
        p.set(FIELD_NONCE, "replaced");
        assert_eq!(p.nonce(), Some("replaced"));
        // position kept: nonce still serializes first
        let first = p.iter().next().unwrap();
        assert_eq!(first, (FIELD_NONCE, "replaced"));
    }

    #[test]
    fn test_require_missing_field() {
        let p = sample();
        let err = p.require(FIELD_EXTERNAL_ID).unwrap_err();
        assert!(matches!(
            err,
            ConnectError::MissingField {
                field: FIELD_EXTERNAL_ID
            }
        ));
    }

    #[test]
    fn test_decode_empty_payload() {
        let p = SsoPayload::decode(&BASE64.encode("")).unwrap();
        assert!(p.is_empty());
    }
}
