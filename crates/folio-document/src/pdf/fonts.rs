// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Standard 14 fonts: names, WinAnsi encoding and AFM advance widths.

use std::str::FromStr;

use folio_core::error::FolioError;

/// The PDF standard 14 Type1 fonts every reader must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StandardFont {
    #[default]
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
    Symbol,
    ZapfDingbats,
}

impl StandardFont {
    pub fn base_font(self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::TimesRoman => "Times-Roman",
            Self::TimesBold => "Times-Bold",
            Self::TimesItalic => "Times-Italic",
            Self::TimesBoldItalic => "Times-BoldItalic",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
            Self::Symbol => "Symbol",
            Self::ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Symbol and ZapfDingbats carry their own built-in encodings.
    pub fn uses_win_ansi(self) -> bool {
        !matches!(self, Self::Symbol | Self::ZapfDingbats)
    }

    fn is_bold(self) -> bool {
        matches!(
            self,
            Self::HelveticaBold
                | Self::HelveticaBoldOblique
                | Self::TimesBold
                | Self::TimesBoldItalic
                | Self::CourierBold
                | Self::CourierBoldOblique
        )
    }

    fn is_monospaced(self) -> bool {
        matches!(
            self,
            Self::Courier | Self::CourierBold | Self::CourierOblique | Self::CourierBoldOblique
        )
    }

    /// Advance width of one character in 1/1000 em. Helvetica metrics stand
    /// in for the proportional faces we do not tabulate.
    pub fn char_width(self, ch: char) -> u16 {
        if self.is_monospaced() {
            return 600;
        }
        let table = if self.is_bold() {
            &HELVETICA_BOLD_WIDTHS
        } else {
            &HELVETICA_WIDTHS
        };
        match ch as u32 {
            code @ 32..=126 => table[(code - 32) as usize],
            0xA0 => 278,
            0xA1..=0xFF => 556,
            _ => 556,
        }
    }

    /// Width of `text` in points at `size`.
    pub fn text_width(self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|ch| self.char_width(ch) as u32).sum();
        units as f32 * size / 1000.0
    }
}

impl FromStr for StandardFont {
    type Err = FolioError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let normalised: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        Ok(match normalised.as_str() {
            "helvetica" | "arial" | "sansserif" | "" => Self::Helvetica,
            "helveticabold" | "arialbold" => Self::HelveticaBold,
            "helveticaoblique" | "helveticaitalic" => Self::HelveticaOblique,
            "helveticaboldoblique" | "helveticabolditalic" => Self::HelveticaBoldOblique,
            "timesroman" | "times" | "timesnewroman" | "serif" => Self::TimesRoman,
            "timesbold" => Self::TimesBold,
            "timesitalic" => Self::TimesItalic,
            "timesbolditalic" => Self::TimesBoldItalic,
            "courier" | "monospace" | "couriernew" => Self::Courier,
            "courierbold" => Self::CourierBold,
            "courieroblique" | "courieritalic" => Self::CourierOblique,
            "courierboldoblique" | "courierbolditalic" => Self::CourierBoldOblique,
            "symbol" => Self::Symbol,
            "zapfdingbats" => Self::ZapfDingbats,
            _ => {
                return Err(FolioError::Validation(format!(
                    "'{name}' is not one of the standard PDF fonts"
                )));
            }
        })
    }
}

/// Encode text as WinAnsi bytes. Characters with no WinAnsi code point become
/// `?`; the second value counts how many were replaced.
pub fn encode_win_ansi(text: &str) -> (Vec<u8>, usize) {
    let mut replaced = 0;
    let bytes = text
        .chars()
        .map(|ch| match win_ansi_byte(ch) {
            Some(byte) => byte,
            None => {
                replaced += 1;
                b'?'
            }
        })
        .collect();
    (bytes, replaced)
}

/// Replace anything outside printable ASCII with `?` (tabs become four
/// spaces). Used where the output font encoding is not under our control.
pub fn sanitize_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\t' => out.push_str("    "),
            ' '..='~' => out.push(ch),
            '\r' | '\n' => {}
            _ => out.push('?'),
        }
    }
    out
}

fn win_ansi_byte(ch: char) -> Option<u8> {
    let code = ch as u32;
    match code {
        0x20..=0x7E => Some(code as u8),
        0x09 => Some(b' '),
        0xA0..=0xFF => Some(code as u8),
        _ => match ch {
            '€' => Some(0x80),
            '‚' => Some(0x82),
            'ƒ' => Some(0x83),
            '„' => Some(0x84),
            '…' => Some(0x85),
            '†' => Some(0x86),
            '‡' => Some(0x87),
            'ˆ' => Some(0x88),
            '‰' => Some(0x89),
            'Š' => Some(0x8A),
            '‹' => Some(0x8B),
            'Œ' => Some(0x8C),
            'Ž' => Some(0x8E),
            '‘' => Some(0x91),
            '’' => Some(0x92),
            '“' => Some(0x93),
            '”' => Some(0x94),
            '•' => Some(0x95),
            '–' => Some(0x96),
            '—' => Some(0x97),
            '˜' => Some(0x98),
            '™' => Some(0x99),
            'š' => Some(0x9A),
            '›' => Some(0x9B),
            'œ' => Some(0x9C),
            'ž' => Some(0x9E),
            'Ÿ' => Some(0x9F),
            _ => None,
        },
    }
}

// AFM advance widths for codes 32..=126.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_known_widths() {
        let font = StandardFont::Helvetica;
        assert_eq!(font.char_width(' '), 278);
        assert_eq!(font.char_width('W'), 944);
        assert_eq!(font.char_width('i'), 222);
        assert_eq!(font.char_width('~'), 584);
        assert!((font.text_width("Hello", 10.0) - 22.78).abs() < 0.01);
    }

    #[test]
    fn bold_and_courier_metrics() {
        assert_eq!(StandardFont::HelveticaBold.char_width('b'), 611);
        assert_eq!(StandardFont::Courier.text_width("iiii", 10.0), 24.0);
    }

    #[test]
    fn win_ansi_replaces_unencodable() {
        let (bytes, replaced) = encode_win_ansi("Café – 漢");
        assert_eq!(bytes, vec![b'C', b'a', b'f', 0xE9, b' ', 0x96, b' ', b'?']);
        assert_eq!(replaced, 1);
    }

    #[test]
    fn ascii_sanitiser() {
        assert_eq!(sanitize_ascii("a\tb é"), "a    b ?");
    }

    #[test]
    fn font_names_parse_loosely() {
        assert_eq!("Helvetica-Bold".parse::<StandardFont>().unwrap(), StandardFont::HelveticaBold);
        assert_eq!("times".parse::<StandardFont>().unwrap(), StandardFont::TimesRoman);
        assert!("Comic Sans".parse::<StandardFont>().is_err());
    }
}
