/// Canonical encoding labels produced by the classifier.
use serde::{Deserialize, Serialize};
use std::fmt;

/// A detected text encoding, or `Undetermined` when nothing matched.
///
/// The declaration order is the report order: `Ord` follows it, so a
/// `BTreeMap<EncodingLabel, _>` iterates in a stable, meaningful sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EncodingLabel {
    #[serde(rename = "ASCII")]
    Ascii,
    #[serde(rename = "UTF8-BOM")]
    Utf8Bom,
    #[serde(rename = "UTF8-no-BOM")]
    Utf8,
    #[serde(rename = "UTF16-LE")]
    Utf16Le,
    #[serde(rename = "UTF16-BE")]
    Utf16Be,
    #[serde(rename = "UTF32-LE")]
    Utf32Le,
    #[serde(rename = "UTF32-BE")]
    Utf32Be,
    #[serde(rename = "CP1251")]
    Cp1251,
    #[serde(rename = "KOI8-R")]
    Koi8R,
    #[serde(rename = "KOI8-U")]
    Koi8U,
    Undetermined,
}

impl EncodingLabel {
    /// Number of distinct labels, sentinel included.
    pub const COUNT: usize = 11;

    /// Every label in report order.
    pub const ALL: [EncodingLabel; Self::COUNT] = [
        Self::Ascii,
        Self::Utf8Bom,
        Self::Utf8,
        Self::Utf16Le,
        Self::Utf16Be,
        Self::Utf32Le,
        Self::Utf32Be,
        Self::Cp1251,
        Self::Koi8R,
        Self::Koi8U,
        Self::Undetermined,
    ];

    /// Canonical report name.
    pub fn label(self) -> &'static str {
        match self {
            Self::Ascii => "ASCII",
            Self::Utf8Bom => "UTF8-BOM",
            Self::Utf8 => "UTF8-no-BOM",
            Self::Utf16Le => "UTF16-LE",
            Self::Utf16Be => "UTF16-BE",
            Self::Utf32Le => "UTF32-LE",
            Self::Utf32Be => "UTF32-BE",
            Self::Cp1251 => "CP1251",
            Self::Koi8R => "KOI8-R",
            Self::Koi8U => "KOI8-U",
            Self::Undetermined => "Undetermined",
        }
    }

    /// Dense index used by the aggregator's counter array.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for EncodingLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_matches_position_in_all() {
        for (i, label) in EncodingLabel::ALL.iter().enumerate() {
            assert_eq!(label.index(), i, "index mismatch for {label}");
        }
    }

    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&EncodingLabel::Utf8Bom).unwrap();
        assert_eq!(json, "\"UTF8-BOM\"");
        let back: EncodingLabel = serde_json::from_str("\"UTF8-no-BOM\"").unwrap();
        assert_eq!(back, EncodingLabel::Utf8);
    }
}
