//! Ayah reference data
//!
//! Static corpus: 6236 rows, seeded once, immutable at runtime.

use serde::{Deserialize, Serialize};

/// Total ayah count in the corpus
pub const TOTAL_AYAHS: i64 = 6236;

/// Total mushaf pages
pub const TOTAL_PAGES: i64 = 604;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ayah {
    pub id: i64,
    pub surah_number: i64,
    pub ayah_number: i64,
    pub juz_number: i64,
    pub page_number: i64,
    pub hizb_quarter: i64,
    pub text_uthmani: String,
}
