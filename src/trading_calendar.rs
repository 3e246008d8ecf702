use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};
use chrono_tz::Asia::Shanghai;
use chrono_tz::Tz;

// Session bounds in minutes since midnight, exchange local time.
const MORNING_OPEN: u32 = 9 * 60 + 30;
const MORNING_CLOSE: u32 = 11 * 60 + 30;
const AFTERNOON_OPEN: u32 = 13 * 60;
const MARKET_CLOSE: u32 = 15 * 60;

/// Current wall-clock time in the exchange's timezone.
pub fn now_market() -> DateTime<Tz> {
    Utc::now().with_timezone(&Shanghai)
}

/// The calendar date the market is currently on.
pub fn market_date() -> NaiveDate {
    now_market().date_naive()
}

/// Weekday check only; exchange holidays are not modeled. A holiday behaves
/// like a day with no quote movement, which the frozen tier already covers.
pub fn is_trading_day(at: &DateTime<Tz>) -> bool {
    !matches!(at.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Whether the exchange is in a trading session (09:30-11:30, 13:00-15:00).
pub fn is_market_open(at: &DateTime<Tz>) -> bool {
    if !is_trading_day(at) {
        return false;
    }
    let minute_of_day = at.hour() * 60 + at.minute();
    (MORNING_OPEN..=MORNING_CLOSE).contains(&minute_of_day)
        || (AFTERNOON_OPEN..=MARKET_CLOSE).contains(&minute_of_day)
}

/// Whether `at` falls within +/- `window_minutes` of the 15:00 close.
pub fn is_close_window(at: &DateTime<Tz>, window_minutes: u32) -> bool {
    if !is_trading_day(at) {
        return false;
    }
    let minute_of_day = (at.hour() * 60 + at.minute()) as i64;
    (minute_of_day - MARKET_CLOSE as i64).abs() <= window_minutes as i64
}
