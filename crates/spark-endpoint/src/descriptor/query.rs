//! 查询串与路径段的解码工具。
//!
//! - 严格解码（[`unescape`]、[`QueryParams::parse`]、[`parse_decimal`]）失败即报错，
//!   由解析器映射为对应协议的 [`ParseError`](crate::ParseError)；
//! - 宽松解码（[`query_bool`]、[`query_int`]）从不失败，仅用于非关键选项。

use std::{borrow::Cow, str::FromStr};

/// 转义序列非法或解码结果不是 UTF-8。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InvalidEscape;

/// 按查询串规则反转义：`+` 视为空格，`%XX` 解码，残缺的 `%` 序列视为错误。
pub fn unescape(input: &str) -> Result<Cow<'_, str>, InvalidEscape> {
    let bytes = input.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' {
            let well_formed = bytes
                .get(idx + 1..idx + 3)
                .is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit));
            if !well_formed {
                return Err(InvalidEscape);
            }
            idx += 3;
        } else {
            idx += 1;
        }
    }

    if !input.contains('+') {
        return urlencoding::decode(input).map_err(|_| InvalidEscape);
    }
    let spaced = input.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| Cow::Owned(decoded.into_owned()))
        .map_err(|_| InvalidEscape)
}

/// 解析后的查询参数多重映射，保留出现顺序。
///
/// # 教案式说明
/// - **意图 (Why)**：协议选项只认每个键的第一个值，且空值视同未设置；把这条规则收敛在
///   [`QueryParams::first`] 中，解析器无需逐处判断；
/// - **契约 (What)**：`parse` 对任一键或值的转义错误、以及出现 `;` 分隔符的情况整体失败；
/// - **风险 (Trade-offs)**：未知键原样保留但不会被读取，不做任何告警。
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn parse(raw: &str) -> Result<Self, InvalidEscape> {
        let mut pairs = Vec::new();
        for piece in raw.split('&') {
            if piece.is_empty() {
                continue;
            }
            if piece.contains(';') {
                return Err(InvalidEscape);
            }
            let (key, value) = piece.split_once('=').unwrap_or((piece, ""));
            let key = unescape(key)?.into_owned();
            let value = unescape(value)?.into_owned();
            pairs.push((key, value));
        }
        Ok(Self { pairs })
    }

    /// 返回键的首个取值；值为空时视为未设置。
    pub fn first(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }
}

/// 宽松布尔解码：首字符为 `1`~`9` 或 `Y`/`y`/`T`/`t` 时为真，其余（含空串）为假。
pub fn query_bool(value: &str) -> bool {
    matches!(value.as_bytes().first().copied(), Some(b'1'..=b'9' | b'Y' | b'y' | b'T' | b't'))
}

/// 宽松整数解码：十进制（允许正负号），解析失败返回 0。
pub fn query_int(value: &str) -> i64 {
    value.parse().unwrap_or(0)
}

/// 严格的无符号十进制解析：仅接受非空的 ASCII 数字串，溢出即失败。
pub fn parse_decimal<T: FromStr>(value: &str) -> Option<T> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_follows_leading_character() {
        assert!(query_bool("1"));
        assert!(query_bool("9"));
        assert!(query_bool("Yes"));
        assert!(query_bool("y"));
        assert!(query_bool("true"));
        assert!(query_bool("T"));
        assert!(!query_bool("0"));
        assert!(!query_bool(""));
        assert!(!query_bool("false"));
        assert!(!query_bool("no"));
        assert!(!query_bool("on"));
    }

    #[test]
    fn int_falls_back_to_zero() {
        assert_eq!(query_int("2"), 2);
        assert_eq!(query_int("-1"), -1);
        assert_eq!(query_int("+7"), 7);
        assert_eq!(query_int("12abc"), 0);
        assert_eq!(query_int(""), 0);
    }

    #[test]
    fn decimal_rejects_signs_and_overflow() {
        assert_eq!(parse_decimal::<u16>("6379"), Some(6379));
        assert_eq!(parse_decimal::<u16>("+6379"), None);
        assert_eq!(parse_decimal::<u16>("65536"), None);
        assert_eq!(parse_decimal::<u8>("256"), None);
        assert_eq!(parse_decimal::<u8>(""), None);
    }

    #[test]
    fn unescape_decodes_plus_and_percent() {
        assert_eq!(unescape("a+b%2Fc").as_deref(), Ok("a b/c"));
        assert_eq!(unescape("plain").as_deref(), Ok("plain"));
        assert_eq!(unescape("bad%zz"), Err(InvalidEscape));
        assert_eq!(unescape("tail%4"), Err(InvalidEscape));
    }

    #[test]
    fn query_keeps_first_value_and_skips_empty() {
        let params = QueryParams::parse("qos=1&qos=2&key=&flag&route=a%20b").expect("合法查询串");
        assert_eq!(params.first("qos"), Some("1"));
        assert_eq!(params.first("key"), None);
        assert_eq!(params.first("flag"), None);
        assert_eq!(params.first("route"), Some("a b"));
        assert_eq!(params.first("missing"), None);
    }

    #[test]
    fn query_rejects_semicolons_and_bad_escapes() {
        assert!(QueryParams::parse("a=1;b=2").is_err());
        assert!(QueryParams::parse("a=%g1").is_err());
    }
}
