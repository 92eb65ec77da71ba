//! Response body sniffing.
//!
//! Decides whether a buffered body is text worth showing to
//! [`CredentialProvider::is_short_credential_expired`]. The body is only ever
//! read through a shared [`Bytes`] view, so the caller still receives the
//! complete, unread body afterwards.

use bytes::Bytes;
use twintoken_core::{Charset, CredentialProvider, MediaType};

/// Maximum number of body bytes examined by the plaintext heuristic.
const PREFIX_LEN: usize = 64;

/// Maximum number of code points examined by the plaintext heuristic.
const PREFIX_CODE_POINTS: usize = 16;

/// Outcome of sniffing a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The provider recognised an expiry marker in the body.
    Expired,
    /// The body is text and does not report expiry.
    Valid,
    /// The body could not be inspected.
    Inconclusive(InconclusiveReason),
}

/// Why a body was not inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InconclusiveReason {
    /// The declared charset is not one we can decode.
    UnsupportedCharset,
    /// The body prefix contains a non-whitespace control character.
    Binary,
    /// The body prefix ends in the middle of a UTF-8 sequence.
    Truncated,
}

/// Sniff a response body for a short-credential expiry marker.
///
/// The charset comes from `content_type`, defaulting to UTF-8. The text
/// check itself always reads the prefix as UTF-8.
pub fn sniff<P>(provider: &P, body: &Bytes, content_type: Option<&MediaType>) -> Verdict
where
    P: CredentialProvider + ?Sized,
{
    let charset = match content_type.map(MediaType::charset).transpose() {
        Ok(charset) => charset.unwrap_or_default(),
        Err(_) => return Verdict::Inconclusive(InconclusiveReason::UnsupportedCharset),
    };

    if let Err(reason) = check_plaintext(body) {
        return Verdict::Inconclusive(reason);
    }

    let view = body.clone();
    let text = charset.decode(&view);
    if provider.is_short_credential_expired(&text) {
        Verdict::Expired
    } else {
        Verdict::Valid
    }
}

/// Plaintext heuristic over the first code points of `body`.
pub(crate) fn check_plaintext(body: &[u8]) -> Result<(), InconclusiveReason> {
    let prefix = body.get(..PREFIX_LEN).unwrap_or(body);

    for decoded in CodePoints::new(prefix).take(PREFIX_CODE_POINTS) {
        let code_point = decoded?;
        if is_binary_marker(code_point) {
            return Err(InconclusiveReason::Binary);
        }
    }
    Ok(())
}

/// ISO control characters, except those that count as whitespace.
fn is_binary_marker(code_point: char) -> bool {
    code_point.is_control()
        && !matches!(
            code_point,
            '\t' | '\n' | '\u{0B}' | '\u{0C}' | '\r' | '\u{1C}'..='\u{1F}'
        )
}

/// Lenient UTF-8 decoder.
///
/// The lead byte alone fixes the sequence width (`0xC0..=0xDF` two bytes,
/// `0xE0..=0xEF` three, `0xF0..=0xF7` four). A sequence cut short by the end
/// of input yields [`InconclusiveReason::Truncated`] and ends the iteration.
/// A bad continuation byte ends the sequence there: everything before it
/// becomes a single U+FFFD. Overlong forms, surrogates and values past
/// U+10FFFF also become a single U+FFFD.
struct CodePoints<'a> {
    rest: &'a [u8],
}

impl<'a> CodePoints<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { rest: bytes }
    }

    fn advance(&mut self, count: usize) {
        self.rest = self.rest.get(count..).unwrap_or_default();
    }
}

impl Iterator for CodePoints<'_> {
    type Item = Result<char, InconclusiveReason>;

    fn next(&mut self) -> Option<Self::Item> {
        let &lead = self.rest.first()?;
        let (width, min): (usize, u32) = match lead {
            0x00..=0x7F => {
                self.advance(1);
                return Some(Ok(char::from(lead)));
            }
            0xC0..=0xDF => (2, 0x80),
            0xE0..=0xEF => (3, 0x800),
            0xF0..=0xF7 => (4, 0x1_0000),
            // stray continuation byte or 0xF8..=0xFF
            _ => {
                self.advance(1);
                return Some(Ok(char::REPLACEMENT_CHARACTER));
            }
        };

        let Some(sequence) = self.rest.get(..width) else {
            self.rest = &[];
            return Some(Err(InconclusiveReason::Truncated));
        };

        let mut value = u32::from(lead) & (0x7F >> width);
        for (index, &byte) in sequence.iter().enumerate().skip(1) {
            if byte & 0xC0 != 0x80 {
                self.advance(index);
                return Some(Ok(char::REPLACEMENT_CHARACTER));
            }
            value = (value << 6) | u32::from(byte & 0x3F);
        }
        self.advance(width);

        let code_point = char::from_u32(value)
            .filter(|_| value >= min)
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        Some(Ok(code_point))
    }
}
