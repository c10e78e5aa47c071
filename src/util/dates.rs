/*!
 Contains date parsing functions for the packed tick-count timestamps used in serialized streams.
*/

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

/// Ticks are 100-nanosecond intervals
pub const TICKS_PER_MICROSECOND: i64 = 10;
const NANOSECONDS_PER_TICK: i64 = 100;
/// The top two bits of a packed timestamp hold its kind
const KIND_SHIFT: u32 = 62;
const TICKS_MASK: u64 = (1 << KIND_SHIFT) - 1;
/// Set when the 62-bit tick field is negative
const TICKS_SIGN_BIT: u64 = 1 << 61;

/// The instant ticks are counted from, midnight on January 1 of year 1
pub fn tick_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1, 1, 1)?.and_hms_opt(0, 0, 0)
}

/// Split a packed timestamp into its kind bits and its signed tick count
pub fn unpack_ticks(raw: u64) -> (u8, i64) {
    let kind = (raw >> KIND_SHIFT) as u8;
    let field = raw & TICKS_MASK;
    // Both branches fit in an i64 since the field is at most 62 bits wide
    let ticks = if field & TICKS_SIGN_BIT != 0 {
        field as i64 - (1 << KIND_SHIFT)
    } else {
        field as i64
    };
    (kind, ticks)
}

/// Convert a signed tick count to a timestamp, keeping sub-microsecond precision
pub fn datetime_from_ticks(ticks: i64) -> Option<NaiveDateTime> {
    let micros = TimeDelta::microseconds(ticks / TICKS_PER_MICROSECOND);
    let nanos = TimeDelta::nanoseconds((ticks % TICKS_PER_MICROSECOND) * NANOSECONDS_PER_TICK);
    tick_epoch()?
        .checked_add_signed(micros)?
        .checked_add_signed(nanos)
}
