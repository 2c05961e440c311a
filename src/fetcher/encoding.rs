//! Character set detection for static responses
//!
//! Many pages, GBK and GB2312 ones especially, declare their charset only in
//! a `<meta>` tag. The charset is taken from a byte order mark, then the
//! Content-Type header, then the first `<meta>` declaration, and guessed from
//! the bytes when none of those name one.

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// Bytes of the document searched for a `<meta>` declaration
const META_SCAN_LIMIT: usize = 4096;

/// Decodes a response body to text
pub fn decode_body(bytes: &[u8], content_type: &str) -> String {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| charset_param(content_type))
        .or_else(|| meta_charset(bytes))
        .unwrap_or_else(|| guess_encoding(bytes));

    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!("Malformed {} sequences replaced", encoding.name());
    }
    text.into_owned()
}

/// Encoding named by a `charset=` parameter in `text`
fn charset_param(text: &str) -> Option<&'static Encoding> {
    let lower = text.to_ascii_lowercase();
    let start = lower.find("charset")? + "charset".len();
    let value = lower[start..].trim_start().strip_prefix('=')?.trim_start();
    let label = value
        .trim_start_matches(['"', '\''])
        .split(|c: char| matches!(c, '"' | '\'' | ';' | '>' | '/') || c.is_whitespace())
        .next()?;
    Encoding::for_label(label.as_bytes())
}

/// Encoding declared by the first `<meta>` tag that names one
fn meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(META_SCAN_LIMIT)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();

    let mut rest = head.as_str();
    while let Some(start) = rest.find("<meta") {
        let tag = &rest[start..];
        let end = tag.find('>').unwrap_or(tag.len());
        if let Some(encoding) = charset_param(&tag[..end]) {
            return Some(encoding);
        }
        rest = &tag[end..];
    }
    None
}

fn guess_encoding(bytes: &[u8]) -> &'static Encoding {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}
