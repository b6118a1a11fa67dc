//! Constant-time helpers.

use constant_time_eq::constant_time_eq;

/// Compare two byte slices without leaking where they differ.
///
/// Used for identifier lookups in envelope headers.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    constant_time_eq(a, b)
}
