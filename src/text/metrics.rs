//! Font loading and width measurement.
//!
//! One [`FontBook`] is populated at process start: a preferred CJK-capable
//! face is located for glyph-advance measurement and the same database is
//! handed to the rasterizer, so measured and painted text agree. When no
//! usable face exists, measurement degrades to heuristic per-character
//! advances and the render continues with whatever the rasterizer finds.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::sync::Arc;

use once_cell::sync::Lazy;
use resvg::usvg::fontdb;
use tracing::warn;

use super::is_cjk;

/// Candidate font files probed in order, CJK-capable faces first. The
/// `INKMAP_FONT` environment variable prepends one more candidate.
const FONT_CANDIDATES: &[&str] = &[
    "assets/fonts/SourceHanSansSC-Regular.otf",
    "assets/fonts/NotoSansSC-Regular.ttf",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/System/Library/Fonts/PingFang.ttc",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
];

/// Heuristic advance factors (fraction of font size) used without a face.
const FALLBACK_CJK_FACTOR: f32 = 1.0;
const FALLBACK_LATIN_FACTOR: f32 = 0.55;
const FALLBACK_SPACE_FACTOR: f32 = 0.28;

/// Fonts available to this process: primary face bytes for measurement plus
/// the full database the rasterizer resolves text against.
pub struct FontBook {
    data: Option<Vec<u8>>,
    face_index: u32,
    family: Option<String>,
    db: Arc<fontdb::Database>,
}

impl FontBook {
    fn load() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();

        let mut data = None;
        let mut face_index = 0u32;
        let mut family = None;

        let override_path = env::var("INKMAP_FONT").ok();
        let candidates = override_path
            .iter()
            .map(String::as_str)
            .chain(FONT_CANDIDATES.iter().copied());
        for path in candidates {
            let Ok(bytes) = fs::read(path) else { continue };
            if ttf_parser::Face::parse(&bytes, 0).is_err() {
                continue;
            }
            db.load_font_data(bytes.clone());
            family = db
                .faces()
                .last()
                .and_then(|info| info.families.first())
                .map(|(name, _)| name.clone());
            data = Some(bytes);
            break;
        }

        // No preferred file: borrow any sans-serif face from the system
        // database so measurement still tracks real glyph advances.
        if data.is_none() {
            let query = fontdb::Query {
                families: &[fontdb::Family::SansSerif],
                ..fontdb::Query::default()
            };
            if let Some(id) = db.query(&query) {
                if let Some((bytes, index)) = db.with_face_data(id, |d, i| (d.to_vec(), i)) {
                    family = db
                        .face(id)
                        .and_then(|info| info.families.first().map(|(name, _)| name.clone()));
                    data = Some(bytes);
                    face_index = index;
                }
            }
        }

        if data.is_none() {
            warn!("no usable font face found; falling back to heuristic text metrics");
        }

        Self {
            data,
            face_index,
            family,
            db: Arc::new(db),
        }
    }

    /// The process-wide book, loaded on first use.
    pub fn shared() -> &'static Self {
        static BOOK: Lazy<FontBook> = Lazy::new(FontBook::load);
        &BOOK
    }

    /// Database handed to the rasterizer.
    pub fn database(&self) -> Arc<fontdb::Database> {
        Arc::clone(&self.db)
    }

    /// Family name text elements should request.
    pub fn family(&self) -> &str {
        self.family.as_deref().unwrap_or("sans-serif")
    }

    fn face(&self) -> Option<ttf_parser::Face<'_>> {
        let data = self.data.as_deref()?;
        ttf_parser::Face::parse(data, self.face_index).ok()
    }
}

/// Width measurement for one render pass.
///
/// Per-distinct-string results are memoized; the cache lives and dies with
/// the pass.
pub(crate) struct Measurer<'a> {
    face: Option<ttf_parser::Face<'a>>,
    font_size: f32,
    cache: HashMap<String, f32>,
}

impl<'a> Measurer<'a> {
    pub(crate) fn new(book: &'a FontBook, font_size: f32) -> Self {
        Self {
            face: book.face(),
            font_size,
            cache: HashMap::new(),
        }
    }

    /// Pixel width of `text` on a single line.
    pub(crate) fn width(&mut self, text: &str) -> f32 {
        if let Some(&w) = self.cache.get(text) {
            return w;
        }
        let w = self.measure_uncached(text);
        self.cache.insert(text.to_string(), w);
        w
    }

    fn measure_uncached(&self, text: &str) -> f32 {
        match &self.face {
            Some(face) => {
                let upem = f32::from(face.units_per_em());
                let scale = self.font_size / upem;
                text.chars()
                    .map(|c| {
                        face.glyph_index(c)
                            .and_then(|gid| face.glyph_hor_advance(gid))
                            .map_or_else(
                                || fallback_char_width(c, self.font_size),
                                |adv| f32::from(adv) * scale,
                            )
                    })
                    .sum()
            }
            None => text
                .chars()
                .map(|c| fallback_char_width(c, self.font_size))
                .sum(),
        }
    }
}

fn fallback_char_width(c: char, font_size: f32) -> f32 {
    if is_cjk(c) {
        font_size * FALLBACK_CJK_FACTOR
    } else if c == ' ' {
        font_size * FALLBACK_SPACE_FACTOR
    } else {
        font_size * FALLBACK_LATIN_FACTOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_is_memoized_and_stable() {
        let book = FontBook::shared();
        let mut measurer = Measurer::new(book, 15.0);
        let first = measurer.width("stable width");
        let second = measurer.width("stable width");
        assert!((first - second).abs() < f32::EPSILON);
        assert!(first > 0.0);
    }

    #[test]
    fn test_cjk_chars_measure_wider_than_latin() {
        let book = FontBook::shared();
        let mut measurer = Measurer::new(book, 15.0);
        let cjk = measurer.width("中");
        let latin = measurer.width("i");
        assert!(cjk > latin);
    }

    #[test]
    fn test_fallback_width_scales_with_font_size() {
        assert!(fallback_char_width('中', 30.0) > fallback_char_width('中', 15.0));
        assert!(fallback_char_width('a', 15.0) < fallback_char_width('中', 15.0));
    }
}
