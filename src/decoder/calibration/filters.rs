//! dcraw-style filter words.
//!
//! A filter word packs a 2-wide, 8-tall colour cell into 32 bits, two bits per site:
//! site `(x, y)` lives at bit `(y * 4) + (x * 2)`.

use crate::decoder::metadata::types::XTRANS_FILTERS;
use crate::decoder::raw::types::CfaPattern;

/// Filter word for layouts that cannot be expressed in a 2x8 cell.
const FILTERS_UNKNOWN_LAYOUT: u32 = 1;

const CYGM_FILTERS: [u32; 4] = [0xb4b4_b4b4, 0x4b4b_4b4b, 0x1e1e_1e1e, 0xe1e1_e1e1];
const RGBE_FILTERS: [u32; 4] = [0x6363_6363, 0x3636_3636, 0x9c9c_9c9c, 0xc9c9_c9c9];

/// Packs `cfa` into a filter word.
pub fn dcraw_filters(cfa: &CfaPattern) -> u32 {
    if cfa.width() == 6 && cfa.height() == 6 {
        return XTRANS_FILTERS;
    }
    if cfa.width() > 2 || cfa.height() > 8 || !cfa.height().is_power_of_two() {
        return FILTERS_UNKNOWN_LAYOUT;
    }

    let mut filters = 0u32;
    for x in 0..2 {
        for y in 0..8 {
            let code = cfa.color_at(x, y).dcraw_code();
            filters |= code << ((x << 1) + (y << 2));
        }
    }
    filters
}

/// Re-expresses a filter word measured at crop offset `(x, y)` relative to the
/// uncropped origin. Special words (0, 1, 2, X-Trans) are returned untouched.
pub fn crop_dcraw_filters(filters: u32, x: usize, y: usize) -> u32 {
    if matches!(filters, 0 | 1 | 2 | XTRANS_FILTERS) {
        return filters;
    }

    let mut filters = filters;

    // An odd x shift swaps the two sites of every nibble.
    if x & 1 == 1 {
        for n in 0..8 {
            let i = n * 4;
            let j = i + 2;
            let t = ((filters >> i) ^ (filters >> j)) & 0b11;
            filters ^= (t << i) | (t << j);
        }
    }

    // A y shift rotates the word by one nibble per row.
    let rotation = ((y % 8) * 4) as u32;
    filters.rotate_right(rotation)
}

/// Four-colour arrays: CYGM and RGBE arrangements.
pub fn is_four_bayer(filters: u32) -> bool {
    CYGM_FILTERS.contains(&filters) || RGBE_FILTERS.contains(&filters)
}
