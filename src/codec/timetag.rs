//! NTP64 time tags.
//!
//! High word: whole seconds since 1900-01-01. Low word: binary fraction of a
//! second. The fraction is rounded, not truncated, so repeated conversions do
//! not drift backwards.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970).
pub const NTP_UNIX_OFFSET_SECS: u64 = 2_208_988_800;

const MICROS_PER_SEC: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timetag {
    pub seconds: u32,
    pub fraction: u32,
}

impl Timetag {
    /// OSC "execute immediately" tag.
    pub const IMMEDIATE: Timetag = Timetag { seconds: 0, fraction: 1 };

    /// Converts Unix wall-clock time to NTP64.
    ///
    /// `micros` beyond one second carries into `secs`. Seconds wrap at the
    /// 2036 NTP era boundary, as on the wire.
    pub fn from_unix(secs: u64, micros: u32) -> Self {
        let micros = micros as u64;
        let secs = secs.wrapping_add(micros / MICROS_PER_SEC);
        let micros = micros % MICROS_PER_SEC;

        let fraction = ((micros << 32) + MICROS_PER_SEC / 2) / MICROS_PER_SEC;

        Self {
            seconds: secs.wrapping_add(NTP_UNIX_OFFSET_SECS) as u32,
            fraction: fraction as u32,
        }
    }

    /// Times before the Unix epoch collapse onto it.
    pub fn from_system_time(time: SystemTime) -> Self {
        let since = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        Self::from_unix(since.as_secs(), since.subsec_micros())
    }

    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    pub fn from_bits(bits: u64) -> Self {
        Self {
            seconds: (bits >> 32) as u32,
            fraction: bits as u32,
        }
    }

    pub fn to_bits(self) -> u64 {
        ((self.seconds as u64) << 32) | self.fraction as u64
    }

    pub fn to_be_bytes(self) -> [u8; 8] {
        self.to_bits().to_be_bytes()
    }

    /// Back to Unix time (microsecond resolution, current NTP era only).
    pub fn to_system_time(self) -> SystemTime {
        let secs = (self.seconds as u64).saturating_sub(NTP_UNIX_OFFSET_SECS);
        let micros = ((self.fraction as u64 * MICROS_PER_SEC) + (1 << 31)) >> 32;
        UNIX_EPOCH + Duration::from_secs(secs) + Duration::from_micros(micros)
    }
}

impl From<SystemTime> for Timetag {
    fn from(time: SystemTime) -> Self {
        Self::from_system_time(time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_epoch_maps_to_ntp_offset() {
        let tag = Timetag::from_unix(0, 0);
        assert_eq!(tag.seconds, 2_208_988_800);
        assert_eq!(tag.fraction, 0);
        assert_eq!(tag.to_bits(), 2_208_988_800u64 << 32);
    }

    #[test]
    fn half_second_is_top_bit() {
        let tag = Timetag::from_unix(0, 500_000);
        assert_eq!(tag.fraction, 1 << 31);
    }

    #[test]
    fn fraction_is_rounded_not_truncated() {
        // 1 µs = 4294.967296 fraction units
        assert_eq!(Timetag::from_unix(0, 1).fraction, 4295);
        // 999_999 µs stays inside the second
        let tag = Timetag::from_unix(10, 999_999);
        assert_eq!(tag.seconds, 2_208_988_810);
        assert_eq!(tag.fraction, 4_294_963_001);
    }

    #[test]
    fn overflowing_micros_carry_into_seconds() {
        let tag = Timetag::from_unix(1, 1_500_000);
        assert_eq!(tag, Timetag::from_unix(2, 500_000));
    }

    #[test]
    fn big_endian_layout() {
        let tag = Timetag { seconds: 0x0102_0304, fraction: 0x0506_0708 };
        assert_eq!(tag.to_be_bytes(), [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(Timetag::from_bits(tag.to_bits()), tag);
    }

    #[test]
    fn system_time_survives_conversion_at_micro_resolution() {
        let time = UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_000);
        assert_eq!(Timetag::from(time).to_system_time(), time);
    }

    #[test]
    fn pre_epoch_times_clamp() {
        let before = UNIX_EPOCH - Duration::from_secs(5);
        assert_eq!(Timetag::from_system_time(before), Timetag::from_unix(0, 0));
    }
}
