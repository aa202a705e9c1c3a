/// Single-byte Cyrillic code pages: Windows-1251, KOI8-R and KOI8-U.
///
/// Each page is a static table for the upper half (0x80–0xFF); the lower
/// half is the ASCII identity mapping. Sources:
///
/// - Windows-1251: unicode.org `MAPPINGS/VENDORS/MICSFT/WINDOWS/CP1251.TXT`,
///   which leaves 0x98 unassigned, so strict decoding of that byte fails.
///   The WHATWG table maps it to U+0098 instead.
/// - KOI8-R: RFC 1489.
/// - KOI8-U: RFC 2319. 0xAE and 0xBE are box-drawing characters there; the
///   WHATWG table puts `ў`/`Ў` in those slots.
///
/// Both KOI8 pages assign every byte.
use crate::model::EncodingLabel;

/// Marker for an unassigned byte.
const UNDEF: u16 = 0xFFFF;

/// A single-byte code page.
#[derive(Debug)]
pub struct CodePage {
    /// IANA-style name.
    pub name: &'static str,
    /// Windows code page number.
    pub number: u16,
    /// Report label for text decoded with this page.
    pub label: EncodingLabel,
    high: &'static [u16; 128],
}

/// Byte at which strict decoding failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeError {
    pub offset: usize,
    pub byte: u8,
}

/// Character the code page cannot represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeError {
    pub offset: usize,
    pub ch: char,
}

impl CodePage {
    /// Map one byte, `None` if unassigned.
    #[inline]
    pub fn decode_byte(&self, byte: u8) -> Option<char> {
        if byte < 0x80 {
            return Some(byte as char);
        }
        match self.high[(byte - 0x80) as usize] {
            UNDEF => None,
            cp => char::from_u32(cp as u32),
        }
    }

    /// Fails at the first byte this page leaves unassigned.
    pub fn validate(&self, bytes: &[u8]) -> Result<(), DecodeError> {
        match bytes.iter().position(|&b| self.decode_byte(b).is_none()) {
            Some(offset) => Err(DecodeError {
                offset,
                byte: bytes[offset],
            }),
            None => Ok(()),
        }
    }

    /// Encode `text`, failing on the first character the page lacks.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::with_capacity(text.len());
        for (offset, ch) in text.char_indices() {
            match self.encode_char(ch) {
                Some(b) => out.push(b),
                None => return Err(EncodeError { offset, ch }),
            }
        }
        Ok(out)
    }

    fn encode_char(&self, ch: char) -> Option<u8> {
        let cp = ch as u32;
        if cp < 0x80 {
            return Some(cp as u8);
        }
        self.high
            .iter()
            .position(|&v| v != UNDEF && v as u32 == cp)
            .map(|i| 0x80 + i as u8)
    }
}

/// Windows-1251 (Cyrillic).
pub static WINDOWS_1251: CodePage = CodePage {
    name: "windows-1251",
    number: 1251,
    label: EncodingLabel::Cp1251,
    high: &WINDOWS_1251_HIGH,
};

/// KOI8-R (Russian).
pub static KOI8_R: CodePage = CodePage {
    name: "koi8-r",
    number: 20866,
    label: EncodingLabel::Koi8R,
    high: &KOI8_R_HIGH,
};

/// KOI8-U (Ukrainian).
pub static KOI8_U: CodePage = CodePage {
    name: "koi8-u",
    number: 21866,
    label: EncodingLabel::Koi8U,
    high: &KOI8_U_HIGH,
};

// ── Tables ───────────────────────────────────────────────────────────────────

const WINDOWS_1251_HIGH: [u16; 128] = [
    0x0402, 0x0403, 0x201A, 0x0453, 0x201E, 0x2026, 0x2020, 0x2021, // 0x80
    0x20AC, 0x2030, 0x0409, 0x2039, 0x040A, 0x040C, 0x040B, 0x040F, // 0x88
    0x0452, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014, // 0x90
    UNDEF, 0x2122, 0x0459, 0x203A, 0x045A, 0x045C, 0x045B, 0x045F, // 0x98
    0x00A0, 0x040E, 0x045E, 0x0408, 0x00A4, 0x0490, 0x00A6, 0x00A7, // 0xA0
    0x0401, 0x00A9, 0x0404, 0x00AB, 0x00AC, 0x00AD, 0x00AE, 0x0407, // 0xA8
    0x00B0, 0x00B1, 0x0406, 0x0456, 0x0491, 0x00B5, 0x00B6, 0x00B7, // 0xB0
    0x0451, 0x2116, 0x0454, 0x00BB, 0x0458, 0x0405, 0x0455, 0x0457, // 0xB8
    0x0410, 0x0411, 0x0412, 0x0413, 0x0414, 0x0415, 0x0416, 0x0417, // 0xC0
    0x0418, 0x0419, 0x041A, 0x041B, 0x041C, 0x041D, 0x041E, 0x041F, // 0xC8
    0x0420, 0x0421, 0x0422, 0x0423, 0x0424, 0x0425, 0x0426, 0x0427, // 0xD0
    0x0428, 0x0429, 0x042A, 0x042B, 0x042C, 0x042D, 0x042E, 0x042F, // 0xD8
    0x0430, 0x0431, 0x0432, 0x0433, 0x0434, 0x0435, 0x0436, 0x0437, // 0xE0
    0x0438, 0x0439, 0x043A, 0x043B, 0x043C, 0x043D, 0x043E, 0x043F, // 0xE8
    0x0440, 0x0441, 0x0442, 0x0443, 0x0444, 0x0445, 0x0446, 0x0447, // 0xF0
    0x0448, 0x0449, 0x044A, 0x044B, 0x044C, 0x044D, 0x044E, 0x044F, // 0xF8
];

const KOI8_R_HIGH: [u16; 128] = [
    0x2500, 0x2502, 0x250C, 0x2510, 0x2514, 0x2518, 0x251C, 0x2524, // 0x80
    0x252C, 0x2534, 0x253C, 0x2580, 0x2584, 0x2588, 0x258C, 0x2590, // 0x88
    0x2591, 0x2592, 0x2593, 0x2320, 0x25A0, 0x2219, 0x221A, 0x2248, // 0x90
    0x2264, 0x2265, 0x00A0, 0x2321, 0x00B0, 0x00B2, 0x00B7, 0x00F7, // 0x98
    0x2550, 0x2551, 0x2552, 0x0451, 0x2553, 0x2554, 0x2555, 0x2556, // 0xA0
    0x2557, 0x2558, 0x2559, 0x255A, 0x255B, 0x255C, 0x255D, 0x255E, // 0xA8
    0x255F, 0x2560, 0x2561, 0x0401, 0x2562, 0x2563, 0x2564, 0x2565, // 0xB0
    0x2566, 0x2567, 0x2568, 0x2569, 0x256A, 0x256B, 0x256C, 0x00A9, // 0xB8
    0x044E, 0x0430, 0x0431, 0x0446, 0x0434, 0x0435, 0x0444, 0x0433, // 0xC0
    0x0445, 0x0438, 0x0439, 0x043A, 0x043B, 0x043C, 0x043D, 0x043E, // 0xC8
    0x043F, 0x044F, 0x0440, 0x0441, 0x0442, 0x0443, 0x0436, 0x0432, // 0xD0
    0x044C, 0x044B, 0x0437, 0x0448, 0x044D, 0x0449, 0x0447, 0x044A, // 0xD8
    0x042E, 0x0410, 0x0411, 0x0426, 0x0414, 0x0415, 0x0424, 0x0413, // 0xE0
    0x0425, 0x0418, 0x0419, 0x041A, 0x041B, 0x041C, 0x041D, 0x041E, // 0xE8
    0x041F, 0x042F, 0x0420, 0x0421, 0x0422, 0x0423, 0x0416, 0x0412, // 0xF0
    0x042C, 0x042B, 0x0417, 0x0428, 0x042D, 0x0429, 0x0427, 0x042A, // 0xF8
];

const KOI8_U_HIGH: [u16; 128] = [
    0x2500, 0x2502, 0x250C, 0x2510, 0x2514, 0x2518, 0x251C, 0x2524, // 0x80
    0x252C, 0x2534, 0x253C, 0x2580, 0x2584, 0x2588, 0x258C, 0x2590, // 0x88
    0x2591, 0x2592, 0x2593, 0x2320, 0x25A0, 0x2219, 0x221A, 0x2248, // 0x90
    0x2264, 0x2265, 0x00A0, 0x2321, 0x00B0, 0x00B2, 0x00B7, 0x00F7, // 0x98
    0x2550, 0x2551, 0x2552, 0x0451, 0x0454, 0x2554, 0x0456, 0x0457, // 0xA0
    0x2557, 0x2558, 0x2559, 0x255A, 0x255B, 0x0491, 0x255D, 0x255E, // 0xA8
    0x255F, 0x2560, 0x2561, 0x0401, 0x0404, 0x2563, 0x0406, 0x0407, // 0xB0
    0x2566, 0x2567, 0x2568, 0x2569, 0x256A, 0x0490, 0x256C, 0x00A9, // 0xB8
    0x044E, 0x0430, 0x0431, 0x0446, 0x0434, 0x0435, 0x0444, 0x0433, // 0xC0
    0x0445, 0x0438, 0x0439, 0x043A, 0x043B, 0x043C, 0x043D, 0x043E, // 0xC8
    0x043F, 0x044F, 0x0440, 0x0441, 0x0442, 0x0443, 0x0436, 0x0432, // 0xD0
    0x044C, 0x044B, 0x0437, 0x0448, 0x044D, 0x0449, 0x0447, 0x044A, // 0xD8
    0x042E, 0x0410, 0x0411, 0x0426, 0x0414, 0x0415, 0x0424, 0x0413, // 0xE0
    0x0425, 0x0418, 0x0419, 0x041A, 0x041B, 0x041C, 0x041D, 0x041E, // 0xE8
    0x041F, 0x042F, 0x0420, 0x0421, 0x0422, 0x0423, 0x0416, 0x0412, // 0xF0
    0x042C, 0x042B, 0x0417, 0x0428, 0x042D, 0x0429, 0x0427, 0x042A, // 0xF8
];

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str = "Привет, мир";

    /// Known byte sequences, independent of the tables under test.
    #[test]
    fn encodes_known_cyrillic_bytes() {
        assert_eq!(
            WINDOWS_1251.encode(HELLO).unwrap(),
            [0xCF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2, 0x2C, 0x20, 0xEC, 0xE8, 0xF0]
        );
        assert_eq!(
            KOI8_R.encode(HELLO).unwrap(),
            [0xF0, 0xD2, 0xC9, 0xD7, 0xC5, 0xD4, 0x2C, 0x20, 0xCD, 0xC9, 0xD2]
        );
    }

    #[test]
    fn encoded_text_decodes_back() {
        for page in [&WINDOWS_1251, &KOI8_R, &KOI8_U] {
            let bytes = page.encode(HELLO).unwrap();
            assert!(page.validate(&bytes).is_ok(), "{}", page.name);
            let decoded: Option<String> = bytes.iter().map(|&b| page.decode_byte(b)).collect();
            assert_eq!(decoded.as_deref(), Some(HELLO), "{}", page.name);
        }
    }

    #[test]
    fn windows_1251_rejects_0x98() {
        let err = WINDOWS_1251.validate(b"ab\x98c").unwrap_err();
        assert_eq!(err, DecodeError { offset: 2, byte: 0x98 });
        assert_eq!(WINDOWS_1251.decode_byte(0x98), None);
        assert_eq!(WINDOWS_1251.decode_byte(0x99), Some('™'));
    }

    #[test]
    fn koi8_pages_assign_every_byte() {
        let all: Vec<u8> = (0..=255).collect();
        assert!(KOI8_R.validate(&all).is_ok());
        assert!(KOI8_U.validate(&all).is_ok());
    }

    /// KOI8-U differs from KOI8-R only in its Ukrainian letters.
    #[test]
    fn koi8_u_ukrainian_letters() {
        assert_eq!(KOI8_U.decode_byte(0xA4), Some('є'));
        assert_eq!(KOI8_U.decode_byte(0xAD), Some('ґ'));
        assert_eq!(KOI8_R.decode_byte(0xA4), Some('╓'));
        assert!(KOI8_R.encode("ґ").is_err());
    }

    /// RFC 2319 keeps box drawing at 0xAE/0xBE.
    #[test]
    fn koi8_u_follows_rfc_2319() {
        assert_eq!(KOI8_U.decode_byte(0xAE), Some('╝'));
        assert_eq!(KOI8_U.decode_byte(0xBE), Some('╬'));
    }

    #[test]
    fn encode_reports_unmappable_character() {
        let err = WINDOWS_1251.encode("a€✓").unwrap_err();
        assert_eq!(err.ch, '✓');
        assert_eq!(err.offset, 4);
    }
}
