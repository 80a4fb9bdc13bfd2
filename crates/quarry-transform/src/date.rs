use chrono::format::{ParseErrorKind, ParseResult, Parsed, StrftimeItems, parse_and_remainder};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc};

use crate::error::TransformError;

/// Output format for every reformatted date: second precision, UTC, `Z` suffix.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A compiled input date pattern.
///
/// Accepts chrono `strftime` syntax (anything containing `%`) or the
/// letter-run syntax of `SimpleDateFormat` (`yyyy-MM-dd'T'HH:mm:ss`), which
/// is translated to `strftime` once here. Each instance owns its format;
/// nothing is shared between rules.
///
/// Supported letters are `y M d D H k h K m s S a E u Z X`. Zone names
/// (`z`), week fields (`w W Y F`) and era or standalone-month letters are
/// rejected when the pattern is built.
///
/// Parsing reads the longest prefix of the value that matches the pattern
/// and ignores what follows. Fields the pattern does not mention take the
/// values of the epoch: month and day 1, year 1970, time midnight. Without
/// an offset in the value the local time is taken as UTC. Dates that do not
/// exist (`31/02`) are errors, not rolled over into the next month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePattern {
    format: String,
}

impl DatePattern {
    pub fn new(pattern: &str) -> Result<Self, TransformError> {
        let format = if pattern.contains('%') {
            pattern.to_string()
        } else {
            translate_legacy(pattern)?
        };
        Ok(Self { format })
    }

    /// The effective `strftime` format.
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Parse `value` and normalize it to UTC.
    pub fn parse_utc(&self, value: &str) -> ParseResult<DateTime<Utc>> {
        let mut parsed = Parsed::new();
        parse_and_remainder(&mut parsed, value, StrftimeItems::new(&self.format))?;

        let offset = parsed.to_fixed_offset().unwrap_or_else(|_| Utc.fix());
        let local = match parsed.to_naive_datetime_with_offset(offset.local_minus_utc()) {
            Err(e) if e.kind() == ParseErrorKind::NotEnough => {
                NaiveDateTime::new(date_or_epoch(&mut parsed)?, time_or_midnight(&mut parsed)?)
            }
            other => other?,
        };
        Ok((local - offset).and_utc())
    }

    /// Parse `value` and render it in [`CANONICAL_FORMAT`].
    pub fn reformat(&self, value: &str) -> ParseResult<String> {
        Ok(self.parse_utc(value)?.format(CANONICAL_FORMAT).to_string())
    }
}

fn not_enough<T>(result: &ParseResult<T>) -> bool {
    matches!(result, Err(e) if e.kind() == ParseErrorKind::NotEnough)
}

// The setters only fill fields that were not parsed; a conflict means the
// field is already present, so their errors are ignored.
fn date_or_epoch(parsed: &mut Parsed) -> ParseResult<NaiveDate> {
    let date = parsed.to_naive_date();
    if !not_enough(&date) {
        return date;
    }
    let _ = parsed.set_day(1);
    let _ = parsed.set_month(1);
    let date = parsed.to_naive_date();
    if !not_enough(&date) {
        return date;
    }
    let _ = parsed.set_year(1970);
    parsed.to_naive_date()
}

fn time_or_midnight(parsed: &mut Parsed) -> ParseResult<NaiveTime> {
    let time = parsed.to_naive_time();
    if !not_enough(&time) {
        return time;
    }
    // A 12-hour clock without a marker reads as AM.
    let _ = parsed.set_ampm(false);
    let _ = parsed.set_minute(0);
    let time = parsed.to_naive_time();
    if !not_enough(&time) {
        return time;
    }
    let _ = parsed.set_hour(0);
    parsed.to_naive_time()
}

/// Translate a `SimpleDateFormat` pattern into `strftime`.
fn translate_legacy(pattern: &str) -> Result<String, TransformError> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            let mut j = i + 1;
            loop {
                match chars.get(j) {
                    None => {
                        return Err(TransformError::UnterminatedQuote {
                            pattern: pattern.to_string(),
                        });
                    }
                    Some('\'') if chars.get(j + 1) == Some(&'\'') => {
                        out.push('\'');
                        j += 2;
                    }
                    Some('\'') => break,
                    Some(&literal) => {
                        push_literal(&mut out, literal);
                        j += 1;
                    }
                }
            }
            i = j + 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        let directive = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1..=2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', _) => "%d",
            ('D', _) => "%j",
            ('u', _) => "%u",
            ('H' | 'k', _) => "%H",
            ('h' | 'K', _) => "%I",
            ('m', _) => "%M",
            ('s', _) => "%S",
            ('S', _) => "%3f",
            ('a', _) => "%p",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('Z', _) => "%z",
            // Permissive offset: also accepts a bare `Z`.
            ('X', _) => "%#z",
            _ => {
                return Err(TransformError::UnsupportedLetter {
                    pattern: pattern.to_string(),
                    letter: c,
                });
            }
        };
        out.push_str(directive);
        i += run;
    }
    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translated(pattern: &str) -> String {
        DatePattern::new(pattern).unwrap().format().to_string()
    }

    fn reformat(pattern: &str, value: &str) -> String {
        DatePattern::new(pattern).unwrap().reformat(value).unwrap()
    }

    #[test]
    fn translate_common_patterns() {
        assert_eq!(translated("yyyy-MM-dd"), "%Y-%m-%d");
        assert_eq!(translated("dd/MM/yy HH:mm"), "%d/%m/%y %H:%M");
        assert_eq!(
            translated("yyyy-MM-dd'T'HH:mm:ss.SSSZ"),
            "%Y-%m-%dT%H:%M:%S.%3f%z"
        );
        assert_eq!(translated("EEE, d MMM yyyy"), "%a, %d %b %Y");
        assert_eq!(translated("MMMM d, yyyy h:mm a"), "%B %d, %Y %I:%M %p");
        assert_eq!(translated("yyyy.DDD u"), "%Y.%j %u");
    }

    #[test]
    fn translate_quotes() {
        assert_eq!(translated("yyyy-MM-dd'T'HH:mm:ss'Z'"), "%Y-%m-%dT%H:%M:%SZ");
        assert_eq!(translated("h 'o''clock'"), "%I o'clock");
        assert_eq!(translated("''yy''"), "'%y'");
    }

    #[test]
    fn translate_escapes_percent_literals() {
        assert_eq!(translated("yyyy'%'"), "%Y%%");
    }

    #[test]
    fn strftime_passes_through() {
        assert_eq!(translated("%d.%m.%Y %H:%M"), "%d.%m.%Y %H:%M");
        assert_eq!(reformat("%d.%m.%Y %H:%M", "05.03.2021 17:04"), "2021-03-05T17:04:00Z");
    }

    #[test]
    fn unsupported_letter() {
        assert_eq!(
            DatePattern::new("yyyy-ww"),
            Err(TransformError::UnsupportedLetter {
                pattern: "yyyy-ww".into(),
                letter: 'w',
            })
        );
        // Zone names cannot be parsed back.
        assert!(DatePattern::new("HH:mm z").is_err());
    }

    #[test]
    fn unterminated_quote() {
        assert!(matches!(
            DatePattern::new("yyyy 'at"),
            Err(TransformError::UnterminatedQuote { .. })
        ));
    }

    #[test]
    fn reformat_date_only_is_midnight_utc() {
        assert_eq!(reformat("dd/MM/yyyy", "05/03/2021"), "2021-03-05T00:00:00Z");
        assert_eq!(reformat("yyyyMMdd", "20210305"), "2021-03-05T00:00:00Z");
        assert_eq!(reformat("d MMM yyyy", "5 Mar 2021"), "2021-03-05T00:00:00Z");
    }

    #[test]
    fn reformat_date_time() {
        assert_eq!(
            reformat("yyyy-MM-dd HH:mm:ss", "2021-03-05 17:04:09"),
            "2021-03-05T17:04:09Z"
        );
    }

    #[test]
    fn trailing_text_is_ignored() {
        assert_eq!(
            reformat("yyyy-MM-dd", "2021-03-05T10:00:00"),
            "2021-03-05T00:00:00Z"
        );
        assert_eq!(
            reformat("yyyy-MM-dd HH:mm", "2021-03-05 17:04:59.999+01:00"),
            "2021-03-05T17:04:00Z"
        );
    }

    #[test]
    fn missing_day_and_month_default_to_first() {
        assert_eq!(reformat("yyyy-MM", "2021-03"), "2021-03-01T00:00:00Z");
        assert_eq!(reformat("yyyy", "2021"), "2021-01-01T00:00:00Z");
        assert_eq!(reformat("MMM yy", "Mar 21"), "2021-03-01T00:00:00Z");
    }

    #[test]
    fn time_only_lands_on_the_epoch() {
        assert_eq!(reformat("HH:mm", "17:04"), "1970-01-01T17:04:00Z");
        assert_eq!(reformat("HH", "17"), "1970-01-01T17:00:00Z");
        assert_eq!(reformat("h:mm a", "5:04 PM"), "1970-01-01T17:04:00Z");
    }

    #[test]
    fn twelve_hour_clock_without_marker_is_morning() {
        assert_eq!(reformat("yyyy-MM-dd hh:mm", "2021-03-05 05:04"), "2021-03-05T05:04:00Z");
    }

    #[test]
    fn ordinal_day() {
        assert_eq!(reformat("yyyy-DDD", "2021-064"), "2021-03-05T00:00:00Z");
    }

    #[test]
    fn reformat_normalizes_offset_to_utc() {
        assert_eq!(
            reformat("yyyy-MM-dd HH:mm Z", "2021-03-05 23:30 +0200"),
            "2021-03-05T21:30:00Z"
        );
        assert_eq!(
            reformat("yyyy-MM-dd'T'HH:mm:ssX", "2021-03-05T01:00:00Z"),
            "2021-03-05T01:00:00Z"
        );
        assert_eq!(
            reformat("yyyy-MM-dd'T'HH:mm:ssX", "2021-03-05T01:00:00-05:00"),
            "2021-03-05T06:00:00Z"
        );
    }

    #[test]
    fn zoned_date_without_time_is_local_midnight() {
        assert_eq!(reformat("yyyy-MM-dd Z", "2021-03-05 +0200"), "2021-03-04T22:00:00Z");
        assert_eq!(reformat("yyyy-MM-dd Z", "2021-03-05 -0130"), "2021-03-05T01:30:00Z");
    }

    #[test]
    fn reformat_drops_fraction() {
        assert_eq!(
            reformat("yyyy-MM-dd'T'HH:mm:ss.SSS", "2021-03-05T17:04:09.123"),
            "2021-03-05T17:04:09Z"
        );
    }

    #[test]
    fn reformat_rejects_garbage() {
        let p = DatePattern::new("yyyy-MM-dd").unwrap();
        assert!(p.reformat("not a date").is_err());
        assert!(p.reformat("2021-13-01").is_err());
        assert!(p.reformat("2021-03").is_err());
    }

    #[test]
    fn impossible_dates_do_not_roll_over() {
        let p = DatePattern::new("dd/MM/yyyy").unwrap();
        assert!(p.reformat("31/02/2024").is_err());
        assert!(p.reformat("29/02/2023").is_err());
        assert_eq!(p.reformat("29/02/2024").unwrap(), "2024-02-29T00:00:00Z");
    }
}
