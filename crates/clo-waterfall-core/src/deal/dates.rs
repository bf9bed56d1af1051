//! Date to payment-period conversion.

use chrono::{Datelike, NaiveDate};

use crate::error::CloError;
use crate::types::Period;
use crate::CloResult;

/// Whole calendar months from `from` to `to`, ignoring the day of month.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    i64::from(to.year() - from.year()) * 12 + i64::from(to.month()) - i64::from(from.month())
}

/// Payment period containing `date`.
///
/// Any date on or before the first coupon date is period 1. Later dates
/// count whole payment intervals (`12 / payment_frequency` months) from the
/// first coupon date.
pub fn period_for_date(
    date: NaiveDate,
    first_coupon_date: NaiveDate,
    payment_frequency: u32,
) -> CloResult<Period> {
    if payment_frequency == 0 || 12 % payment_frequency != 0 {
        return Err(CloError::DateError(format!(
            "payment frequency {payment_frequency} does not divide a year into whole months"
        )));
    }
    if date <= first_coupon_date {
        return Ok(1);
    }
    let interval = i64::from(12 / payment_frequency);
    let elapsed = months_between(first_coupon_date, date);
    Period::try_from(elapsed / interval + 1)
        .map_err(|_| CloError::DateError(format!("{date} is outside the period range")))
}
