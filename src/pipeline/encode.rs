//! Payload encoding: raw bytes ⇄ base64 strings carried in JSON bodies.
//!
//! The generation surface takes the template as a base64 string and answers
//! with the rendered PDF as a base64 string. Providers differ on padding and
//! some wrap long strings with newlines or prefix a `data:` URI header, so
//! decoding is lenient about those and strict about everything else.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine as _;
use tracing::debug;

/// Encode binary content for a JSON request body.
pub fn encode_bytes(bytes: &[u8]) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded {} bytes → {} bytes base64", bytes.len(), b64.len());
    b64
}

/// Decode a base64 payload from a service response.
///
/// Accepts padded or unpadded input, embedded whitespace and a leading
/// `data:<mime>;base64,` header.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let body = match payload.split_once(";base64,") {
        Some((head, rest)) if head.starts_with("data:") => rest,
        _ => payload,
    };
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.ends_with('=') {
        STANDARD.decode(compact.as_bytes())
    } else {
        STANDARD_NO_PAD.decode(compact.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_padded_and_unpadded() {
        let encoded = encode_bytes(b"%PDF-1.7");
        assert_eq!(decode_payload(&encoded).unwrap(), b"%PDF-1.7");
        assert_eq!(
            decode_payload(encoded.trim_end_matches('=')).unwrap(),
            b"%PDF-1.7"
        );
    }

    #[test]
    fn tolerates_line_wrapping_and_data_uri() {
        let encoded = encode_bytes(&[7u8; 120]);
        let wrapped = format!("{}\r\n{}", &encoded[..60], &encoded[60..]);
        assert_eq!(decode_payload(&wrapped).unwrap(), vec![7u8; 120]);

        let uri = format!("data:application/pdf;base64,{encoded}");
        assert_eq!(decode_payload(&uri).unwrap(), vec![7u8; 120]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_payload("not base64 at all!").is_err());
    }
}
