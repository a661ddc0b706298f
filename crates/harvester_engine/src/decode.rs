use encoding_rs::{Encoding, ISO_8859_2, UTF_8, WINDOWS_1252};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Encodings tried for uploaded input, in priority order.
pub const INPUT_ENCODINGS: &[&str] = &["utf-8-sig", "utf-8", "windows-1252", "iso-8859-2"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding_label: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("input could not be decoded as any of: {tried}")]
    Unsupported { tried: String },
}

/// Decode raw input using: UTF-8 with BOM -> UTF-8 -> windows-1252 -> ISO-8859-2.
///
/// The first encoding that decodes every byte wins. For the 8-bit encodings a
/// byte that only maps to a C1 control character counts as undecodable.
pub fn decode_input(bytes: &[u8]) -> Result<DecodedText, DecodeError> {
    // 1) BOM-marked UTF-8, BOM stripped
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        if let Some(text) = decode_strict(rest, UTF_8) {
            return Ok(decoded(text, INPUT_ENCODINGS[0]));
        }
    }

    // 2) plain UTF-8
    if let Some(text) = decode_strict(bytes, UTF_8) {
        return Ok(decoded(text, INPUT_ENCODINGS[1]));
    }

    // 3) legacy single-byte fallbacks
    for (encoding, label) in [(WINDOWS_1252, INPUT_ENCODINGS[2]), (ISO_8859_2, INPUT_ENCODINGS[3])] {
        if let Some(text) = decode_strict(bytes, encoding) {
            if !text.chars().any(is_c1_control) {
                return Ok(decoded(text, label));
            }
        }
    }

    Err(DecodeError::Unsupported {
        tried: INPUT_ENCODINGS.join(", "),
    })
}

fn decode_strict(bytes: &[u8], enc: &'static Encoding) -> Option<String> {
    enc.decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

fn is_c1_control(c: char) -> bool {
    ('\u{80}'..='\u{9F}').contains(&c)
}

fn decoded(text: String, label: &str) -> DecodedText {
    DecodedText {
        text,
        encoding_label: label.to_string(),
    }
}
