//! Font metrics and text encoding for the PDF backend.
//!
//! Two faces exist:
//!
//! * [`FontFace::Embedded`]: a TrueType file (SimHei by default) embedded
//!   whole as a CID font with Identity-H encoding. Text is written as
//!   big-endian glyph ids; the glyphs actually used are remembered so the
//!   widths array and the ToUnicode map stay small.
//! * [`FontFace::Helvetica`]: the built-in base-14 font, used when the
//!   TrueType file is missing. WinAnsi only: characters outside it render as
//!   spaces.

use ab_glyph::{Font, FontVec, GlyphId};
use std::collections::BTreeMap;
use std::path::Path;

/// Points → millimetres.
pub const PT_TO_MM: f32 = 25.4 / 72.0;

/// A loaded TrueType face plus the glyphs drawn with it so far.
pub struct EmbeddedFont {
    /// Raw file bytes, embedded verbatim.
    pub data: Vec<u8>,
    /// PostScript-safe base name derived from the file name.
    pub base_name: String,
    font: FontVec,
    units_per_em: f32,
    used: BTreeMap<u16, char>,
}

impl EmbeddedFont {
    /// Parse TrueType bytes.
    pub fn from_bytes(data: Vec<u8>, base_name: &str) -> Result<Self, String> {
        let font = FontVec::try_from_vec(data.clone()).map_err(|e| e.to_string())?;
        let units_per_em = font.units_per_em().unwrap_or(1000.0);
        Ok(Self {
            data,
            base_name: base_name.to_string(),
            font,
            units_per_em,
            used: BTreeMap::new(),
        })
    }

    /// Read and parse a TrueType file.
    pub fn open(path: &Path) -> Result<Self, String> {
        let data = std::fs::read(path).map_err(|e| e.to_string())?;
        let base_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Embedded".to_string());
        let base_name: String = base_name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        Self::from_bytes(
            data,
            if base_name.is_empty() { "Embedded" } else { &base_name },
        )
    }

    fn glyph(&self, c: char) -> GlyphId {
        self.font.glyph_id(c)
    }

    /// Advance of glyph `gid` in 1/1000 em.
    pub fn glyph_advance(&self, gid: u16) -> f32 {
        self.font.h_advance_unscaled(GlyphId(gid)) * 1000.0 / self.units_per_em
    }

    /// Ascender in 1/1000 em.
    pub fn ascent(&self) -> f32 {
        self.font.ascent_unscaled() * 1000.0 / self.units_per_em
    }

    /// Descender in 1/1000 em (negative).
    pub fn descent(&self) -> f32 {
        self.font.descent_unscaled() * 1000.0 / self.units_per_em
    }

    /// Glyphs drawn so far with the character that first produced each.
    pub fn used_glyphs(&self) -> &BTreeMap<u16, char> {
        &self.used
    }
}

/// The font every run of text is drawn in.
pub enum FontFace {
    Embedded(Box<EmbeddedFont>),
    Helvetica,
}

impl FontFace {
    /// Advance of `c` in 1/1000 em.
    pub fn advance(&self, c: char) -> f32 {
        match self {
            FontFace::Embedded(f) => f.glyph_advance(f.glyph(c).0),
            FontFace::Helvetica => helvetica_width(winansi_byte(c)),
        }
    }

    /// Advance of `c` in mm at `size_pt`.
    pub fn char_width_mm(&self, c: char, size_pt: f32) -> f32 {
        self.advance(c) / 1000.0 * size_pt * PT_TO_MM
    }

    /// Encode `text` as a PDF string operand for this face.
    pub fn encode(&mut self, text: &str) -> Vec<u8> {
        match self {
            FontFace::Embedded(f) => {
                let mut out = Vec::with_capacity(text.len() * 2);
                for c in text.chars() {
                    let gid = f.glyph(c).0;
                    f.used.entry(gid).or_insert(c);
                    out.extend_from_slice(&gid.to_be_bytes());
                }
                out
            }
            FontFace::Helvetica => text.chars().map(winansi_byte).collect(),
        }
    }
}

/// Map a character to its WinAnsi byte; unmappable characters become a space.
fn winansi_byte(c: char) -> u8 {
    match c {
        ' '..='~' => c as u8,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '\u{A0}'..='\u{FF}' => c as u8,
        _ => b' ',
    }
}

/// Helvetica advance widths (1/1000 em) for ASCII 32..=126.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a..m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n..z
    334, 260, 334, 584, // {..~
];

fn helvetica_width(byte: u8) -> f32 {
    match byte {
        32..=126 => f32::from(HELVETICA_ASCII[usize::from(byte - 32)]),
        0x95 => 350.0,
        0x96 => 556.0,
        0x97 => 1000.0,
        0x91 | 0x92 => 222.0,
        0x93 | 0x94 => 333.0,
        _ => 556.0,
    }
}
