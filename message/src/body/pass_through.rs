use std::collections::BTreeSet;

use bytes::Bytes;
use regex::Regex;

use crate::reader::{
    text,
    DecodeError,
    Reader,
};

lazy_static::lazy_static! {
    /// 17 characters from the VIN alphabet (no I, O or Q), standing alone.
    pub static ref VIN_PATTERN: Regex = Regex::new(r"\b[A-HJ-NPR-Z0-9]{17}\b").expect("VIN pattern");
}

/// Which pass-through payloads carry text, and how to find a VIN in that text.
///
/// Both vary by terminal vendor, so they are supplied at startup rather than fixed here.
#[derive(Clone, Debug)]
pub struct PassThroughPolicy {
    text_kinds: BTreeSet<u8>,
    vin:        Regex,
}

impl PassThroughPolicy {
    pub fn new(text_kinds: impl IntoIterator<Item = u8>, vin: Regex) -> Self {
        Self {
            text_kinds: text_kinds.into_iter().collect(),
            vin,
        }
    }

    pub fn with_text_kinds(text_kinds: impl IntoIterator<Item = u8>) -> Self {
        Self::new(text_kinds, VIN_PATTERN.clone())
    }

    /// Serial-port channels (0x41, 0x42) and the user-defined range (0xf0..=0xff).
    pub fn default_text_kinds() -> impl Iterator<Item = u8> {
        [0x41, 0x42].into_iter().chain(0xf0..=0xff)
    }

    #[inline]
    pub fn is_text(&self, kind: u8) -> bool {
        self.text_kinds.contains(&kind)
    }

    pub fn find_vin(&self, text: &str) -> Option<String> {
        self.vin.find(text).map(|m| m.as_str().to_string())
    }
}

impl Default for PassThroughPolicy {
    fn default() -> Self {
        Self::with_text_kinds(Self::default_text_kinds())
    }
}

/// Upstream data pass-through (0x0900).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PassThrough {
    pub kind:    u8,
    pub payload: Bytes,
    pub text:    Option<String>,
    pub vin:     Option<String>,
}

impl PassThrough {
    pub(crate) fn decode(body: &[u8], policy: &PassThroughPolicy) -> Result<Self, DecodeError> {
        let mut r = Reader::new(body);

        let kind = r.u8("pass-through type")?;
        let payload = r.rest_bytes();

        let text = policy.is_text(kind).then(|| text(&payload));
        let vin = text.as_deref().and_then(|t| policy.find_vin(t));

        Ok(Self {
            kind,
            payload,
            text,
            vin,
        })
    }
}
