//! Text encoding detection for credential files.
//!
//! Credential files come from ad-hoc editors and may be UTF-8 or a
//! regional encoding (GBK in practice). Detection runs first; when the
//! detector's confidence is low we prefer strict UTF-8, then strict GBK,
//! and only then force-decode the detected encoding with replacement
//! characters rather than failing.

use encoding_rs::{Encoding, GBK, UTF_8};
use thiserror::Error;

/// Confidence below which the detector's guess is not trusted outright.
const CONFIDENCE_THRESHOLD: f32 = 0.7;

/// The file's bytes are not valid text in the confidently-detected encoding.
#[derive(Error, Debug)]
#[error("file is not valid {encoding} text")]
pub struct DecodeError {
    pub encoding: &'static str,
}

/// Decoded file content plus the encoding that produced it.
pub struct Decoded {
    pub text: String,
    pub encoding: &'static str,
}

/// Decode raw file bytes to text.
///
/// Only the high-confidence path can fail: a confidently-detected
/// encoding whose strict decode still hits invalid sequences. The
/// low-confidence path always produces text, lossily if necessary.
pub fn decode(raw: &[u8]) -> Result<Decoded, DecodeError> {
    let (charset, confidence, _language) = chardet::detect(raw);
    let detected =
        Encoding::for_label(chardet::charset2encoding(&charset).as_bytes()).unwrap_or(UTF_8);

    if confidence < CONFIDENCE_THRESHOLD {
        if let Ok(text) = std::str::from_utf8(raw) {
            return Ok(Decoded {
                text: text.to_string(),
                encoding: UTF_8.name(),
            });
        }

        let (text, had_errors) = GBK.decode_without_bom_handling(raw);
        if !had_errors {
            return Ok(Decoded {
                text: text.into_owned(),
                encoding: GBK.name(),
            });
        }

        // Last resort: take the detector's guess and substitute invalid
        // sequences instead of failing the load.
        let (text, encoding, _had_errors) = detected.decode(raw);
        return Ok(Decoded {
            text: text.into_owned(),
            encoding: encoding.name(),
        });
    }

    let (text, encoding, had_errors) = detected.decode(raw);
    if had_errors {
        return Err(DecodeError {
            encoding: encoding.name(),
        });
    }
    Ok(Decoded {
        text: text.into_owned(),
        encoding: encoding.name(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ascii_decodes() {
        let decoded = decode(b"svc.key = value\n").unwrap();
        assert_eq!(decoded.text, "svc.key = value\n");
    }

    #[test]
    fn utf8_multibyte_decodes() {
        let input = "rain_report.city = 泸州\n";
        let decoded = decode(input.as_bytes()).unwrap();
        assert_eq!(decoded.text, input);
    }

    #[test]
    fn gbk_bytes_decode_to_expected_text() {
        // Enough Chinese text for the detector to settle on a GB encoding;
        // the bytes are invalid as UTF-8 either way, so the GBK attempt
        // must recover them.
        let input = "# 服务A的API密钥，用于访问天气接口\n\
                     # 全局管理员令牌，谨慎使用\n\
                     rain_report.city = 泸州市江阳区\n";
        let (gbk_bytes, _, _) = GBK.encode(input);
        let decoded = decode(&gbk_bytes).unwrap();
        assert!(decoded.text.contains("泸州市江阳区"));
    }

    #[test]
    fn garbage_bytes_still_produce_text() {
        // A stray invalid byte must never abort a load.
        let raw = [b's', b'v', b'c', 0xff, b'x'];
        let decoded = decode(&raw).unwrap();
        assert!(!decoded.text.is_empty());
    }

    #[test]
    fn empty_input_decodes_to_empty_text() {
        let decoded = decode(b"").unwrap();
        assert!(decoded.text.is_empty());
    }
}
