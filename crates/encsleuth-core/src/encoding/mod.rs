/// Encoding classification — byte-order-mark sniffing followed by strict
/// trial decoding against UTF-8 and the Cyrillic code pages.
///
/// Decision order (order matters, some signatures prefix others):
///
/// 1. empty input → `Undetermined`
/// 2. every byte < 0x80 → `Ascii`
/// 3. `EF BB BF` → `Utf8Bom`
/// 4. `FF FE 00 00` → `Utf32Le` (must precede the UTF-16 LE check)
/// 5. `00 00 FE FF` → `Utf32Be`
/// 6. `FF FE` → `Utf16Le`
/// 7. `FE FF` → `Utf16Be`
/// 8. first clean strict decode of UTF-8, Windows-1251, KOI8-R, KOI8-U
/// 9. otherwise `Undetermined`
///
/// Because Windows-1251 assigns every byte except 0x98 and KOI8-R assigns
/// all of them, KOI8-R text only classifies as `Koi8R` when it contains
/// 0x98, and `Koi8U` is unreachable through trial decoding. First match is
/// the accepted trade-off, not charset detection.
///
/// For the same reason step 9 never fires: every non-empty input decodes
/// under KOI8-R, so `Undetermined` only arises for empty input.
pub mod codepage;

use crate::model::EncodingLabel;
use codepage::{CodePage, KOI8_R, KOI8_U, WINDOWS_1251};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Maximum number of leading bytes inspected per file (1 MiB).
pub const MAX_PREFIX_BYTES: usize = 1 << 20;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF32_LE_BOM: [u8; 4] = [0xFF, 0xFE, 0x00, 0x00];
const UTF32_BE_BOM: [u8; 4] = [0x00, 0x00, 0xFE, 0xFF];
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Code pages tried after strict UTF-8, in order.
static TRIAL_CODE_PAGES: [&CodePage; 3] = [&WINDOWS_1251, &KOI8_R, &KOI8_U];

/// Classify a byte prefix.
///
/// Treats `prefix` as the complete content: a multi-byte UTF-8 sequence cut
/// at the end fails the UTF-8 trial.
pub fn classify(prefix: &[u8]) -> EncodingLabel {
    classify_prefix(prefix, false)
}

/// Classify a byte prefix that may have been cut from a longer file.
///
/// With `truncated` set, an incomplete UTF-8 sequence at the very end is
/// accepted, since the missing continuation bytes lie beyond the prefix.
pub fn classify_prefix(prefix: &[u8], truncated: bool) -> EncodingLabel {
    if prefix.is_empty() {
        return EncodingLabel::Undetermined;
    }

    if prefix.is_ascii() {
        return EncodingLabel::Ascii;
    }

    if let Some(label) = sniff_bom(prefix) {
        return label;
    }

    if is_strict_utf8(prefix, truncated) {
        return EncodingLabel::Utf8;
    }

    TRIAL_CODE_PAGES
        .iter()
        .find(|page| page.validate(prefix).is_ok())
        .map_or(EncodingLabel::Undetermined, |page| page.label)
}

/// Match the byte-order-mark signatures in priority order.
fn sniff_bom(bytes: &[u8]) -> Option<EncodingLabel> {
    if bytes.starts_with(&UTF8_BOM) {
        Some(EncodingLabel::Utf8Bom)
    } else if bytes.starts_with(&UTF32_LE_BOM) {
        Some(EncodingLabel::Utf32Le)
    } else if bytes.starts_with(&UTF32_BE_BOM) {
        Some(EncodingLabel::Utf32Be)
    } else if bytes.starts_with(&UTF16_LE_BOM) {
        Some(EncodingLabel::Utf16Le)
    } else if bytes.starts_with(&UTF16_BE_BOM) {
        Some(EncodingLabel::Utf16Be)
    } else {
        None
    }
}

fn is_strict_utf8(bytes: &[u8], truncated: bool) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(_) => true,
        // `error_len() == None` means the input ended mid-sequence.
        Err(e) => truncated && e.error_len().is_none() && bytes.len() - e.valid_up_to() < 4,
    }
}

/// Read at most `max_len` leading bytes of `path`.
///
/// Loops over short reads until the buffer is full or EOF is reached.
/// Returns the bytes read and whether the file continues past them.
pub fn read_prefix(path: &Path, max_len: usize) -> io::Result<(Vec<u8>, bool)> {
    let mut file = File::open(path)?;
    let hint = file
        .metadata()
        .map(|m| m.len().min(max_len as u64) as usize)
        .unwrap_or(0);
    let mut buf = Vec::with_capacity(hint);
    (&mut file).take(max_len as u64).read_to_end(&mut buf)?;

    let truncated = if buf.len() == max_len {
        let mut probe = [0u8; 1];
        file.read(&mut probe)? > 0
    } else {
        false
    };
    Ok((buf, truncated))
}

/// Read and classify a file.
///
/// Returns `Ok(None)` when the file turned out to be empty at read time.
pub fn classify_file(path: &Path, max_len: usize) -> io::Result<Option<EncodingLabel>> {
    let (prefix, truncated) = read_prefix(path, max_len)?;
    if prefix.is_empty() {
        return Ok(None);
    }
    Ok(Some(classify_prefix(&prefix, truncated)))
}
