//! `Content-Type` parsing and text charsets.
//!
//! Only what is needed to turn a response body into text: the media type
//! essence, its parameters, and the charset resolved through the
//! `encoding_rs` label registry.

use derive_more::{Display, Error};
use encoding_rs::Encoding;

/// A parsed media type such as `application/json; charset=utf-8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    essence: String,
    params: Vec<(String, String)>,
}

impl MediaType {
    /// Parse a `Content-Type` header value.
    ///
    /// Returns `None` if the value has no `type/subtype` part. Malformed
    /// parameters are skipped rather than failing the whole value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split(';');
        let essence = parts.next()?.trim();
        let (kind, subtype) = essence.split_once('/')?;
        if !is_token(kind) || !is_token(subtype) {
            return None;
        }

        let params = parts
            .filter_map(|param| {
                let (name, value) = param.split_once('=')?;
                let name = name.trim();
                if !is_token(name) {
                    return None;
                }
                let value = value.trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|quoted| quoted.strip_suffix('"'))
                    .unwrap_or(value);
                Some((name.to_ascii_lowercase(), value.to_string()))
            })
            .collect();

        Some(Self {
            essence: essence.to_ascii_lowercase(),
            params,
        })
    }

    /// Lower-cased `type/subtype`.
    #[must_use]
    pub fn essence(&self) -> &str {
        &self.essence
    }

    /// Value of a parameter, looked up case-insensitively.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Raw `charset` parameter, if declared.
    #[must_use]
    pub fn charset_param(&self) -> Option<&str> {
        self.param("charset")
    }

    /// Resolve the declared charset, defaulting to UTF-8 when none is declared.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedCharset`] when a charset is declared but unknown.
    pub fn charset(&self) -> Result<Charset, UnsupportedCharset> {
        match self.charset_param() {
            None => Ok(Charset::utf8()),
            Some(name) => Charset::from_name(name).ok_or_else(|| UnsupportedCharset {
                name: name.to_string(),
            }),
        }
    }
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value.bytes().all(|byte| {
            byte.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&byte)
        })
}

/// A declared charset this crate cannot decode.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("unsupported charset '{name}'")]
pub struct UnsupportedCharset {
    /// Charset name as declared.
    pub name: String,
}

/// A text encoding resolved from a `charset` label.
///
/// Any label known to the WHATWG encoding registry is accepted, which covers
/// the UTF family, the ISO-8859 and windows code pages, and the CJK legacy
/// encodings (GBK, GB18030, Big5, `Shift_JIS`, EUC-KR ...).
///
/// UTF-16 bodies decode correctly through [`Response::text`], but the
/// dual-token sniffer never hands them to a provider: its plaintext check
/// reads the body prefix as UTF-8, where the NUL bytes of UTF-16 text look
/// binary.
///
/// [`Response::text`]: crate::Response::text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charset(&'static Encoding);

impl Charset {
    /// UTF-8, the default when no charset is declared.
    #[must_use]
    pub fn utf8() -> Self {
        Self(encoding_rs::UTF_8)
    }

    /// Look up a charset by label, case-insensitively.
    ///
    /// Labels that only map to the registry's "replacement" encoding are
    /// treated as unknown, since that encoding cannot produce text.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Encoding::for_label(name.trim().as_bytes())
            .filter(|&encoding| encoding != encoding_rs::REPLACEMENT)
            .map(Self)
    }

    /// Canonical name of the encoding.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.0.name()
    }

    /// Decode bytes to text; malformed input becomes U+FFFD.
    ///
    /// A byte-order mark is not interpreted: the declared charset wins.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> String {
        let (text, _malformed) = self.0.decode_without_bom_handling(bytes);
        text.into_owned()
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self::utf8()
    }
}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn parse_plain_media_type() {
        let_assert!(Some(media_type) = MediaType::parse("application/json"));
        check!(media_type.essence() == "application/json");
        check!(media_type.charset_param().is_none());
        check!(media_type.charset() == Ok(Charset::utf8()));
    }

    #[test]
    fn parse_parameters() {
        let_assert!(
            Some(media_type) = MediaType::parse(r#"Text/HTML; Charset="UTF-16LE"; q=0.5"#)
        );
        check!(media_type.essence() == "text/html");
        check!(media_type.charset_param() == Some("UTF-16LE"));
        check!(media_type.param("Q") == Some("0.5"));
        let_assert!(Ok(charset) = media_type.charset());
        check!(charset.name() == "UTF-16LE");
    }

    #[test]
    fn parse_rejects_garbage() {
        check!(MediaType::parse("").is_none());
        check!(MediaType::parse("json").is_none());
        check!(MediaType::parse("application/").is_none());
        check!(MediaType::parse("app lication/json").is_none());
    }

    #[test]
    fn unsupported_charset() {
        let_assert!(Some(media_type) = MediaType::parse("text/plain; charset=x-unknown-9"));
        let_assert!(Err(err) = media_type.charset());
        check!(err.name == "x-unknown-9");
        check!(err.to_string() == "unsupported charset 'x-unknown-9'");
    }

    #[test]
    fn replacement_only_labels_are_unsupported() {
        check!(Charset::from_name("iso-2022-kr").is_none());
    }

    #[test]
    fn charset_labels() {
        check!(Charset::from_name("UTF8") == Some(Charset::utf8()));
        check!(Charset::from_name(" utf-8 ") == Some(Charset::utf8()));
        let_assert!(Some(gbk) = Charset::from_name("GBK"));
        check!(gbk.name() == "GBK");
        let_assert!(Some(sjis) = Charset::from_name("shift_jis"));
        check!(sjis.to_string() == "Shift_JIS");
        check!(Charset::from_name("big5").is_some());
        check!(Charset::from_name("gb18030").is_some());
    }

    #[test]
    fn decode_single_byte_charsets() {
        let_assert!(Some(latin1) = Charset::from_name("ISO-8859-1"));
        check!(latin1.decode(b"na\xefve") == "na\u{ef}ve");
        check!(Charset::utf8().decode(b"ok\xff") == "ok\u{FFFD}");
    }

    #[test]
    fn decode_cjk_charsets() {
        let_assert!(Some(gbk) = Charset::from_name("gbk"));
        check!(gbk.decode(b"\xc1\xee\xc5\xc6\xb9\xfd\xc6\xda") == "令牌过期");
    }

    #[test]
    fn decode_utf16_variants() {
        let_assert!(Some(be) = Charset::from_name("utf-16be"));
        let_assert!(Some(le) = Charset::from_name("utf-16le"));
        check!(be.decode(b"\x00h\x00i") == "hi");
        check!(le.decode(b"h\x00i\x00") == "hi");
        check!(le.decode(b"h\x00i") == "h\u{FFFD}");
    }
}
