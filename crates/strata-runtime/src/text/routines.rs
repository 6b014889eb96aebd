//! String routines called by generated code (`Pos`, `IntToStr`, `Trim`, ...).

use super::{Char, Text};
use crate::error::{Result, RuntimeError};

/// C `isspace` in the "C" locale.
fn is_space(unit: Char) -> bool {
    matches!(unit, 0x20 | 0x09..=0x0D)
}

/// 1-based position of `needle` in `haystack`, 0 when absent.
pub fn pos(needle: &Text, haystack: &Text) -> i32 {
    let needle = needle.as_utf16();
    let haystack = haystack.as_utf16();
    if needle.is_empty() {
        return 1;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
        .map_or(0, |at| i32::try_from(at + 1).unwrap_or(0))
}

pub fn int_to_str(value: i32) -> Text {
    Text::from(value.to_string())
}

/// Parse a decimal integer, surrounding whitespace allowed.
pub fn try_str_to_int(s: &Text) -> Result<i32> {
    s.to_utf8()
        .trim()
        .parse::<i32>()
        .map_err(|_| RuntimeError::Convert("Invalid integer string".into()))
}

/// Parse a decimal integer, raising on malformed input.
pub fn str_to_int(s: &Text) -> i32 {
    try_str_to_int(s).unwrap_or_else(|err| crate::raise_error(err))
}

pub fn str_to_int_def(s: &Text, default: i32) -> i32 {
    try_str_to_int(s).unwrap_or(default)
}

/// Fixed notation with 15 decimals, trailing zeros removed.
pub fn float_to_str(value: f64) -> Text {
    let mut out = format!("{value:.15}");
    if out.contains('.') {
        let trimmed = out.trim_end_matches('0').trim_end_matches('.').len();
        out.truncate(trimmed);
    }
    Text::from(out)
}

pub fn try_str_to_float(s: &Text) -> Result<f64> {
    s.to_utf8()
        .trim()
        .parse::<f64>()
        .map_err(|_| RuntimeError::Convert("Invalid float string".into()))
}

/// Parse a floating point number, raising on malformed input.
pub fn str_to_float(s: &Text) -> f64 {
    try_str_to_float(s).unwrap_or_else(|err| crate::raise_error(err))
}

fn is_digit(unit: Char) -> bool {
    (u16::from(b'0')..=u16::from(b'9')).contains(&unit)
}

fn is_one_of(unit: Option<&Char>, options: &[u8]) -> bool {
    unit.is_some_and(|&u| options.iter().any(|&b| u == u16::from(b)))
}

fn starts_with_ignore_case(units: &[Char], word: &str) -> bool {
    units.len() >= word.len()
        && units.iter().zip(word.bytes()).all(|(&u, b)| low_case(u) == u16::from(b))
}

/// End of the longest prefix of `units` that `strtol` (or `strtod` when
/// `float` is set) would consume, `None` when no number starts there.
fn numeric_prefix(units: &[Char], float: bool) -> Option<usize> {
    let digits = |from: usize| units[from..].iter().take_while(|&&u| is_digit(u)).count();

    let mut at = units.iter().position(|&u| !is_space(u)).unwrap_or(units.len());
    if is_one_of(units.get(at), b"+-") {
        at += 1;
    }
    if float {
        let special = ["infinity", "inf", "nan"]
            .into_iter()
            .find(|word| starts_with_ignore_case(&units[at..], word));
        if let Some(word) = special {
            return Some(at + word.len());
        }
    }

    let int_digits = digits(at);
    at += int_digits;
    if !float {
        return (int_digits > 0).then_some(at);
    }
    let mut frac_digits = 0;
    if is_one_of(units.get(at), b".") {
        frac_digits = digits(at + 1);
        if int_digits + frac_digits > 0 {
            at += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return None;
    }
    if is_one_of(units.get(at), b"eE") {
        let mut exp = at + 1;
        if is_one_of(units.get(exp), b"+-") {
            exp += 1;
        }
        let exp_digits = digits(exp);
        if exp_digits > 0 {
            at = exp + exp_digits;
        }
    }
    Some(at)
}

/// 0 when the number spans all of `units`, else the 1-based position of the
/// first unit after it.
fn error_position(units: &[Char], end: usize) -> i32 {
    if end == units.len() {
        0
    } else {
        i32::try_from(end + 1).unwrap_or(i32::MAX)
    }
}

/// `Val(s, value, code)` for integers.
///
/// Returns the value and an error code: 0 when all of `s` is a number,
/// otherwise the 1-based position of the first character that is not part
/// of it. Leading whitespace is skipped. Input that does not start with a
/// number, or whose number does not fit, gives `(0, 1)`.
pub fn val_int(s: &Text) -> (i32, i32) {
    let units = s.as_utf16();
    let Some(end) = numeric_prefix(units, false) else {
        return (0, 1);
    };
    match Text::from_utf16(&units[..end]).to_utf8().trim_start().parse::<i32>() {
        Ok(value) => (value, error_position(units, end)),
        Err(_) => (0, 1),
    }
}

/// `Val(s, value, code)` for floating point numbers. Error codes as in
/// [`val_int`]; overflow and underflow to zero give `(0.0, 1)`.
pub fn val_float(s: &Text) -> (f64, i32) {
    let units = s.as_utf16();
    let Some(end) = numeric_prefix(units, true) else {
        return (0.0, 1);
    };
    let number = Text::from_utf16(&units[..end]).to_utf8();
    let number = number.trim_start();
    let Ok(value) = number.parse::<f64>() else {
        return (0.0, 1);
    };
    let mantissa = number.split(['e', 'E']).next().unwrap_or_default();
    let overflow = value.is_infinite() && mantissa.bytes().any(|b| b.is_ascii_digit());
    let underflow = value == 0.0 && mantissa.bytes().any(|b| (b'1'..=b'9').contains(&b));
    if overflow || underflow {
        return (0.0, 1);
    }
    (value, error_position(units, end))
}

/// `Str(value:width, s)`: right-aligned in at least `width` characters.
pub fn str_width(value: i32, width: i32) -> Text {
    let width = usize::try_from(width).unwrap_or(0);
    Text::from(format!("{value:>width$}"))
}

/// `Str(value:width:decimals, s)`: fixed notation with `decimals` digits
/// after the point, right-aligned in at least `width` characters. A
/// negative `decimals` means six digits and no padding.
pub fn str_fixed(value: f64, width: i32, decimals: i32) -> Text {
    let (width, decimals) = match usize::try_from(decimals) {
        Ok(decimals) => (usize::try_from(width).unwrap_or(0), decimals),
        Err(_) => (0, 6),
    };
    let body = if value.is_nan() {
        "nan".to_owned()
    } else if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        format!("{sign}inf")
    } else {
        format!("{value:.decimals$}")
    };
    Text::from(format!("{body:>width$}"))
}

/// ASCII upper case of one code unit.
pub fn up_case(ch: Char) -> Char {
    if (u16::from(b'a')..=u16::from(b'z')).contains(&ch) {
        ch - 32
    } else {
        ch
    }
}

fn low_case(ch: Char) -> Char {
    if (u16::from(b'A')..=u16::from(b'Z')).contains(&ch) {
        ch + 32
    } else {
        ch
    }
}

pub fn upper_case(s: &Text) -> Text {
    Text::from_units(s.as_utf16().iter().map(|&u| up_case(u)).collect())
}

pub fn lower_case(s: &Text) -> Text {
    Text::from_units(s.as_utf16().iter().map(|&u| low_case(u)).collect())
}

pub fn trim_left(s: &Text) -> Text {
    let units = s.as_utf16();
    let start = units.iter().position(|&u| !is_space(u)).unwrap_or(units.len());
    Text::from_utf16(&units[start..])
}

pub fn trim_right(s: &Text) -> Text {
    let units = s.as_utf16();
    let end = units.iter().rposition(|&u| !is_space(u)).map_or(0, |i| i + 1);
    Text::from_utf16(&units[..end])
}

pub fn trim(s: &Text) -> Text {
    trim_right(&trim_left(s))
}

/// `count` copies of `ch`; empty for non-positive counts.
pub fn string_of_char(ch: Char, count: i32) -> Text {
    let count = usize::try_from(count).unwrap_or(0);
    Text::from_units(vec![ch; count])
}

/// Replace `s` with the first `length` units of `buffer`.
pub fn set_string(s: &mut Text, buffer: &[Char], length: i32) {
    let length = usize::try_from(length).unwrap_or(0).min(buffer.len());
    *s = Text::from_utf16(&buffer[..length]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pos() {
        let hay = Text::from("hello world");
        assert_eq!(pos(&Text::from("world"), &hay), 7);
        assert_eq!(pos(&Text::from("h"), &hay), 1);
        assert_eq!(pos(&Text::from("xyz"), &hay), 0);
    }

    #[test]
    fn test_int_conversions() {
        assert_eq!(int_to_str(-42).to_utf8(), "-42");
        assert_eq!(str_to_int(&Text::from(" 17 ")), 17);
        assert_eq!(str_to_int_def(&Text::from("nope"), 5), 5);
        assert!(try_str_to_int(&Text::from("12abc")).is_err());
    }

    #[test]
    fn test_str_to_int_raises() {
        let mut message = Text::new();
        crate::try_catch(
            || {
                str_to_int(&Text::from("abc"));
            },
            || message = crate::exception_message(),
        );
        assert_eq!(message.to_utf8(), "Invalid integer string");
        assert_eq!(crate::exception_code(), crate::EXC_SOFTWARE);
    }

    #[test]
    fn test_float_to_str_trims_zeros() {
        assert_eq!(float_to_str(1.5).to_utf8(), "1.5");
        assert_eq!(float_to_str(3.0).to_utf8(), "3");
        assert_eq!(float_to_str(-0.25).to_utf8(), "-0.25");
        assert!((str_to_float(&Text::from("2.5")) - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_val_int_reports_error_position() {
        assert_eq!(val_int(&Text::from("123")), (123, 0));
        assert_eq!(val_int(&Text::from("  +42")), (42, 0));
        assert_eq!(val_int(&Text::from("12abc")), (12, 3));
        assert_eq!(val_int(&Text::from("-7 ")), (-7, 3));
        assert_eq!(val_int(&Text::from("abc")), (0, 1));
        assert_eq!(val_int(&Text::from("")), (0, 1));
        assert_eq!(val_int(&Text::from("-")), (0, 1));
        assert_eq!(val_int(&Text::from("99999999999")), (0, 1));
    }

    #[test]
    fn test_val_float() {
        assert_eq!(val_float(&Text::from("3.25")), (3.25, 0));
        assert_eq!(val_float(&Text::from(" 1e3")), (1000.0, 0));
        assert_eq!(val_float(&Text::from(".5")), (0.5, 0));
        assert_eq!(val_float(&Text::from("2.5x")), (2.5, 4));
        assert_eq!(val_float(&Text::from("1e")), (1.0, 2));
        assert_eq!(val_float(&Text::from("x")), (0.0, 1));
        assert_eq!(val_float(&Text::from(".")), (0.0, 1));
        assert_eq!(val_float(&Text::from("1e999")), (0.0, 1));
        assert_eq!(val_float(&Text::from("1e-999")), (0.0, 1));

        let (value, code) = val_float(&Text::from("-Inf"));
        assert!(value.is_infinite() && value < 0.0);
        assert_eq!(code, 0);
    }

    #[test]
    fn test_str_width_and_decimals() {
        assert_eq!(str_width(42, 5).to_utf8(), "   42");
        assert_eq!(str_width(12345, 3).to_utf8(), "12345");
        assert_eq!(str_width(-7, 0).to_utf8(), "-7");

        assert_eq!(str_fixed(3.14159, 8, 2).to_utf8(), "    3.14");
        assert_eq!(str_fixed(0.1, 0, 3).to_utf8(), "0.100");
        assert_eq!(str_fixed(1.0, 10, -1).to_utf8(), "1.000000");
        assert_eq!(str_fixed(f64::NEG_INFINITY, 6, 2).to_utf8(), "  -inf");
    }

    #[test]
    fn test_case_mapping_is_ascii_only() {
        assert_eq!(upper_case(&Text::from("abc\u{00E9}")).to_utf8(), "ABC\u{00E9}");
        assert_eq!(lower_case(&Text::from("MiXeD")).to_utf8(), "mixed");
        assert_eq!(up_case(u16::from(b'q')), u16::from(b'Q'));
    }

    #[test]
    fn test_trim_family() {
        let s = Text::from(" \t padded \r\n");
        assert_eq!(trim(&s).to_utf8(), "padded");
        assert_eq!(trim_left(&s).to_utf8(), "padded \r\n");
        assert_eq!(trim_right(&s).to_utf8(), " \t padded");
        assert!(trim(&Text::from("   ")).is_empty());
    }

    #[test]
    fn test_string_of_char_and_set_string() {
        assert_eq!(string_of_char(u16::from(b'-'), 3).to_utf8(), "---");
        assert!(string_of_char(u16::from(b'-'), -1).is_empty());

        let mut s = Text::new();
        set_string(&mut s, &[0x41, 0x42, 0x43], 2);
        assert_eq!(s.to_utf8(), "AB");
        set_string(&mut s, &[0x41], 10);
        assert_eq!(s.to_utf8(), "A");
    }
}
