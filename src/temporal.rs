// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fixed-width date, time-of-day and time span fields
//!
//! Every field sits at a known offset from the start of the literal, so these
//! read the source bytes directly instead of going through the number grammar.
//! `at` arguments and returned positions are byte offsets into the source text.

use chrono::{NaiveDate, NaiveTime, TimeDelta};

/// A field is missing or malformed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldError {
	pub offset: usize,
	pub message: &'static str,
}

fn fault(offset: usize, message: &'static str) -> FieldError { FieldError { offset, message } }

/// exactly `width` ascii digits
fn digits(bytes: &[u8], at: usize, width: usize) -> Option<u32> {
	bytes.get(at..at + width)?.iter().try_fold(0_u32, |total, &ch| {
		ch.is_ascii_digit().then(|| total * 10 + u32::from(ch - b'0'))
	})
}

fn expect(bytes: &[u8], at: usize, ch: u8, message: &'static str) -> Result<(), FieldError> {
	if bytes.get(at) == Some(&ch) { Ok(()) } else { Err(fault(at, message)) }
}

/// `YYYY/MM/DD`
pub(crate) fn date(text: &str, at: usize) -> Result<(usize, NaiveDate), FieldError> {
	let bytes = text.as_bytes();
	if bytes.len() < at + 10 {
		return Err(fault(
			at,
			"Found what looks like a Date, but there are not enough characters to make a Date",
		));
	}
	let year = digits(bytes, at, 4).ok_or(fault(at, "Expected a 4 digit year"))?;
	expect(bytes, at + 4, b'/', "Expected a '/' following the year")?;
	let month = digits(bytes, at + 5, 2).ok_or(fault(at + 5, "Expected a 2 digit month"))?;
	expect(bytes, at + 7, b'/', "Expected a '/' following the month")?;
	let day = digits(bytes, at + 8, 2).ok_or(fault(at + 8, "Expected a 2 digit day"))?;
	// four digits always fit an i32
	let date = NaiveDate::from_ymd_opt(year as i32, month, day)
		.ok_or(fault(at, "This is not a valid calendar date"))?;
	Ok((at + 10, date))
}

/// Raw `HH:MM:SS.mmm` fields, not range checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Clock {
	pub hours: u32,
	pub minutes: u32,
	pub seconds: u32,
	pub millis: u32,
}

/// `HH:MM:SS` with an optional `.mmm`
pub(crate) fn clock(text: &str, at: usize) -> Result<(usize, Clock), FieldError> {
	let bytes = text.as_bytes();
	let hours = digits(bytes, at, 2).ok_or(fault(at, "Expected 2 digits for the hours"))?;
	expect(bytes, at + 2, b':', "Expected a ':' following the hours")?;
	let minutes = digits(bytes, at + 3, 2).ok_or(fault(at + 3, "Expected 2 digits for the minutes"))?;
	expect(bytes, at + 5, b':', "Expected a ':' following the minutes")?;
	let seconds = digits(bytes, at + 6, 2).ok_or(fault(at + 6, "Expected 2 digits for the seconds"))?;
	let mut end = at + 8;
	let mut millis = 0;
	if bytes.get(end) == Some(&b'.') {
		let exact = digits(bytes, end + 1, 3)
			.filter(|_| !bytes.get(end + 4).is_some_and(u8::is_ascii_digit));
		millis = exact.ok_or(fault(end + 1, "Expected exactly 3 digits for the milliseconds"))?;
		end += 4;
	}
	Ok((end, Clock {
		hours,
		minutes,
		seconds,
		millis,
	}))
}

/// [`clock`] that has to be a real time of day
pub(crate) fn time_of_day(text: &str, at: usize) -> Result<(usize, NaiveTime), FieldError> {
	let (end, clock) = clock(text, at)?;
	let time = NaiveTime::from_hms_milli_opt(clock.hours, clock.minutes, clock.seconds, clock.millis)
		.ok_or(fault(at, "This is not a valid time of day"))?;
	Ok((end, time))
}

/// Unsigned span of `days` plus the clock fields, `None` on overflow
pub(crate) fn span(days: i64, clock: Clock) -> Option<TimeDelta> {
	let within_day = i64::from(clock.hours) * 3_600_000
		+ i64::from(clock.minutes) * 60_000
		+ i64::from(clock.seconds) * 1_000
		+ i64::from(clock.millis);
	let total = days.checked_mul(86_400_000)?.checked_add(within_day)?;
	TimeDelta::try_milliseconds(total)
}
