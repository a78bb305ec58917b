//! Byte-to-text decoding with a deterministic fallback chain.
//!
//! Layout exports collected over years of annotation campaigns arrive in a
//! mix of encodings. The chain favours correctness over guesswork: an exact
//! UTF-8 match wins outright, statistical detection is accepted only when the
//! detector is confident, and the remaining guesswork is bounded to a fixed
//! pair of single-byte Western encodings.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, ISO_8859_15, WINDOWS_1252};
use tracing::{debug, warn};

/// Single-byte Western fallbacks, tried in order after detection fails.
const FALLBACK_ENCODINGS: &[&Encoding] = &[WINDOWS_1252, ISO_8859_15];

/// Decode `raw` to text, or `None` when no supported encoding applies.
///
/// Order:
/// 1. strict UTF-8;
/// 2. statistical detection (chardetng), accepted only on a confident
///    verdict;
/// 3. the fixed fallback list, in order;
/// 4. `None`, logging `label` for diagnostics.
pub fn decode_bytes(raw: &[u8], label: &str) -> Option<String> {
    if let Ok(text) = std::str::from_utf8(raw) {
        return Some(text.to_owned());
    }

    let mut detector = EncodingDetector::new();
    detector.feed(raw, true);
    let (encoding, confident) = detector.guess_assess(None, true);
    if confident {
        let (text, _, had_errors) = encoding.decode(raw);
        if !had_errors {
            debug!("decoded {label} as detected {}", encoding.name());
            return Some(text.into_owned());
        }
    }

    for encoding in FALLBACK_ENCODINGS {
        let (text, _, had_errors) = encoding.decode(raw);
        if !had_errors {
            debug!("decoded {label} with fallback {}", encoding.name());
            return Some(text.into_owned());
        }
    }

    warn!("could not decode {label} with any supported encoding");
    None
}
