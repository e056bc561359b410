//! OSC 1.0 wire codec.
//! - timetag: NTP64 fixed-point timestamps
//! - encode: bundle → bytes into a caller-provided buffer (bounds-checked)
//! - decode: bytes → packet tree (f / i / s arguments)

pub mod decode;
pub mod encode;
pub mod timetag;

/// Length of `len` bytes plus NUL terminator, rounded up to a 4-byte boundary.
#[inline]
pub fn padded_str_len(len: usize) -> usize {
    (len + 4) & !3
}
