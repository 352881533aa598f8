//! Base-14 font metrics, WinAnsi encoding and line wrapping.
//!
//! Generated documents only use the standard Type 1 fonts, so no font
//! program is embedded. Widths are the AFM advance widths in 1/1000 em for
//! the printable ASCII range; accented Latin letters measure as their base
//! letter.

use crate::document::fold_char;

/// Standard fonts used by the PDF serializer and the watermark overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Base14 {
    /// Helvetica
    Helvetica,
    /// Helvetica-Bold
    HelveticaBold,
    /// Times-Roman
    TimesRoman,
    /// Times-Bold
    TimesBold,
}

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

impl Base14 {
    /// Regular weight of a theme font family.
    pub fn regular(family: &str) -> Self {
        if family.starts_with("Times") {
            Base14::TimesRoman
        } else {
            Base14::Helvetica
        }
    }

    /// Bold weight of a theme font family.
    pub fn bold(family: &str) -> Self {
        if family.starts_with("Times") {
            Base14::TimesBold
        } else {
            Base14::HelveticaBold
        }
    }

    /// PostScript name used as `/BaseFont`.
    pub fn base_font(&self) -> &'static str {
        match self {
            Base14::Helvetica => "Helvetica",
            Base14::HelveticaBold => "Helvetica-Bold",
            Base14::TimesRoman => "Times-Roman",
            Base14::TimesBold => "Times-Bold",
        }
    }

    /// Resource name inside a page's `/Font` dictionary.
    pub fn resource_name(&self) -> &'static str {
        match self {
            Base14::Helvetica => "F1",
            Base14::HelveticaBold => "F2",
            Base14::TimesRoman => "F3",
            Base14::TimesBold => "F4",
        }
    }

    /// Ascender height in 1/1000 em.
    pub fn ascent(&self) -> f32 {
        match self {
            Base14::Helvetica | Base14::HelveticaBold => 718.0,
            Base14::TimesRoman => 683.0,
            Base14::TimesBold => 676.0,
        }
    }

    fn table(&self) -> &'static [u16; 95] {
        match self {
            Base14::Helvetica => &HELVETICA,
            Base14::HelveticaBold => &HELVETICA_BOLD,
            Base14::TimesRoman => &TIMES_ROMAN,
            Base14::TimesBold => &TIMES_BOLD,
        }
    }

    fn is_times(&self) -> bool {
        matches!(self, Base14::TimesRoman | Base14::TimesBold)
    }

    /// Advance width of one character in 1/1000 em.
    pub fn char_width(&self, c: char) -> f32 {
        let folded = fold_char(c);
        if (' '..='~').contains(&folded) {
            return self.table()[folded as usize - 0x20] as f32;
        }
        match c {
            '\u{2013}' => if self.is_times() { 500.0 } else { 556.0 },
            '\u{2014}' => 1000.0,
            '\u{2022}' => 350.0,
            '\u{2018}' | '\u{2019}' => 333.0,
            '\u{201C}' | '\u{201D}' => 500.0,
            '\u{2026}' => 1000.0,
            '\u{20AC}' => 556.0,
            '\u{00A0}' => self.table()[0] as f32,
            _ if self.is_times() => 500.0,
            _ => 556.0,
        }
    }

    /// Width of `text` at `size` points.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        text.chars().map(|c| self.char_width(c)).sum::<f32>() * size / 1000.0
    }
}

/// Encode text for a simple font with `/WinAnsiEncoding`.
///
/// Characters outside the encoding become `?`; control characters become spaces.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{00A0}'..='\u{00FF}' => c as u32 as u8,
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            c if c.is_control() => b' ',
            _ => b'?',
        })
        .collect()
}

/// Break text into lines no wider than `max_width`.
///
/// Explicit newlines are kept as paragraph breaks. Words wider than the
/// line are split by character. Always returns at least one line.
pub fn wrap_text(text: &str, font: Base14, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let space = font.char_width(' ') * size / 1000.0;

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_width = 0.0;

        for word in paragraph.split_whitespace() {
            let word_width = font.text_width(word, size);

            if word_width > max_width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0.0;
                }
                for c in word.chars() {
                    let w = font.char_width(c) * size / 1000.0;
                    if current_width + w > max_width && !current.is_empty() {
                        lines.push(std::mem::take(&mut current));
                        current_width = 0.0;
                    }
                    current.push(c);
                    current_width += w;
                }
                continue;
            }

            if current.is_empty() {
                current.push_str(word);
                current_width = word_width;
            } else if current_width + space + word_width <= max_width {
                current.push(' ');
                current.push_str(word);
                current_width += space + word_width;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
                current_width = word_width;
            }
        }
        lines.push(current);
    }

    // Drop trailing empty paragraphs but keep one line for empty input
    while lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_widths() {
        assert_eq!(Base14::Helvetica.char_width('A'), 667.0);
        assert_eq!(Base14::HelveticaBold.char_width('A'), 722.0);
        assert_eq!(Base14::TimesRoman.char_width(' '), 250.0);
        assert_eq!(Base14::Helvetica.text_width("ii", 10.0), 4.44);
    }

    #[test]
    fn test_accented_letters_measure_as_base() {
        assert_eq!(Base14::Helvetica.char_width('é'), Base14::Helvetica.char_width('e'));
        assert_eq!(Base14::TimesBold.char_width('Ñ'), Base14::TimesBold.char_width('N'));
    }

    #[test]
    fn test_family_selection() {
        assert_eq!(Base14::regular("Times-Roman"), Base14::TimesRoman);
        assert_eq!(Base14::bold("Helvetica"), Base14::HelveticaBold);
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Añ€–"), vec![b'A', 0xF1, 0x80, 0x96]);
        assert_eq!(encode_win_ansi("日\t"), vec![b'?', b' ']);
    }

    #[test]
    fn test_wrap_text_respects_width() {
        let text = "the quick brown fox jumps over the lazy dog again and again";
        let lines = wrap_text(text, Base14::Helvetica, 10.0, 100.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(Base14::Helvetica.text_width(line, 10.0) <= 100.0);
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wrap_text_splits_long_words_and_keeps_breaks() {
        let lines = wrap_text("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\nnext", Base14::Helvetica, 10.0, 50.0);
        assert!(lines.len() >= 3);
        assert_eq!(lines.last().map(String::as_str), Some("next"));
        assert_eq!(wrap_text("", Base14::Helvetica, 10.0, 50.0), vec![String::new()]);
    }
}
