//! Small numeric and text helpers shared by the engines.

use bstr::ByteSlice;

/// Remove every whitespace character from `content`, keeping all other bytes, including
/// invalid UTF-8, untouched.
pub fn strip_whitespace(content: &[u8]) -> Vec<u8> {
    content.fields().flat_map(<[u8]>::iter).copied().collect()
}

/// Whether `a` and `b` hold the same bytes once all whitespace is removed.
pub fn equal_ignoring_whitespace(a: &[u8], b: &[u8]) -> bool {
    a.fields()
        .flat_map(<[u8]>::iter)
        .eq(b.fields().flat_map(<[u8]>::iter))
}

/// A power-of-two approximation of the square root, used for the discard and cost
/// thresholds. Part of the stored-diff compatibility contract: do not change.
pub const fn very_approx_sqrt(value: usize) -> usize {
    let mut result = 1;
    let mut value = value >> 2;
    while value > 0 {
        value >>= 2;
        result <<= 1;
    }
    result
}
