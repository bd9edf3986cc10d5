use chrono::{Datelike, Local, TimeZone};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

// Mốc quy đổi serial Excel: số ngày từ 1899-12-30 tới 1970-01-01.
const EXCEL_EPOCH_OFFSET_DAYS: f64 = 25569.0;
const MS_PER_DAY: f64 = 86_400_000.0;

fn dmy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4})").expect("invalid dmy regex"))
}

fn ymd_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{4})/(\d{1,2})/(\d{1,2})(?:[ T](\d{1,2}):(\d{2})(?::(\d{2}))?)?")
            .expect("invalid ymd regex")
    })
}

pub fn ymd_to_ts(year: i32, month: u32, day: u32) -> i64 {
    Local
        .with_ymd_and_hms(year, month, day, 0, 0, 0)
        .earliest()
        .map(|d| d.timestamp_millis())
        .unwrap_or(0)
}

fn ymd_hms_to_ts(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> i64 {
    Local
        .with_ymd_and_hms(year, month, day, hour, min, sec)
        .earliest()
        .map(|d| d.timestamp_millis())
        .unwrap_or(0)
}

// Đọc giá trị ô ngày kiểu bất kỳ về epoch-ms. Không parse được thì trả 0,
// không bao giờ lỗi. Số trong [1, 100000) coi là serial Excel.
pub fn parse_date(val: Option<&Value>) -> i64 {
    let val = match val {
        Some(v) => v,
        None => return 0,
    };
    match val {
        Value::Null => 0,
        Value::Bool(_) => 0,
        Value::Number(n) => {
            let f = n.as_f64().unwrap_or(0.0);
            if f == 0.0 || !f.is_finite() {
                return 0;
            }
            if (1.0..100000.0).contains(&f) {
                return ((f - EXCEL_EPOCH_OFFSET_DAYS) * MS_PER_DAY) as i64;
            }
            f as i64
        }
        Value::String(s) => parse_date_str(s),
        _ => 0,
    }
}

fn parse_date_str(raw: &str) -> i64 {
    let s = raw.trim();
    if s.is_empty() {
        return 0;
    }
    let s = s.replace(['.', '-'], "/");
    if let Some(m) = dmy_re().captures(&s) {
        let day = m[1].parse::<u32>().unwrap_or(0);
        let month = m[2].parse::<u32>().unwrap_or(0);
        let year = m[3].parse::<i32>().unwrap_or(0);
        return ymd_to_ts(year, month, day);
    }
    if let Some(m) = ymd_re().captures(&s) {
        let year = m[1].parse::<i32>().unwrap_or(0);
        let month = m[2].parse::<u32>().unwrap_or(0);
        let day = m[3].parse::<u32>().unwrap_or(0);
        let hour = m.get(4).and_then(|v| v.as_str().parse().ok()).unwrap_or(0);
        let min = m.get(5).and_then(|v| v.as_str().parse().ok()).unwrap_or(0);
        let sec = m.get(6).and_then(|v| v.as_str().parse().ok()).unwrap_or(0);
        return ymd_hms_to_ts(year, month, day, hour, min, sec);
    }
    0
}

pub fn format_date_display(ts: i64) -> String {
    if ts == 0 {
        return "---".to_string();
    }
    match Local.timestamp_millis_opt(ts).single() {
        Some(d) => format!("{:02}/{:02}/{}", d.day(), d.month(), d.year()),
        None => "---".to_string(),
    }
}

pub fn date_to_ymd(ts: i64) -> String {
    if ts == 0 {
        return String::new();
    }
    match Local.timestamp_millis_opt(ts).single() {
        Some(d) => format!("{}-{:02}-{:02}", d.year(), d.month(), d.day()),
        None => String::new(),
    }
}

pub fn date_to_ym(ts: i64) -> String {
    if ts == 0 {
        return String::new();
    }
    match Local.timestamp_millis_opt(ts).single() {
        Some(d) => format!("{}-{:02}", d.year(), d.month()),
        None => String::new(),
    }
}

pub fn ts_year(ts: i64) -> i32 {
    Local
        .timestamp_millis_opt(ts)
        .single()
        .map(|d| d.year())
        .unwrap_or(0)
}

// Tháng 1-12; trả 0 khi ts không hợp lệ.
pub fn ts_month(ts: i64) -> u32 {
    Local
        .timestamp_millis_opt(ts)
        .single()
        .map(|d| d.month())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_date_handles_dmy_strings() {
        let ts = parse_date(Some(&json!("15/03/2026")));
        assert_eq!(ts, ymd_to_ts(2026, 3, 15));
        assert_eq!(parse_date(Some(&json!("15.03.2026"))), ts);
        assert_eq!(parse_date(Some(&json!("15-03-2026"))), ts);
        assert_eq!(format_date_display(ts), "15/03/2026");
    }

    #[test]
    fn parse_date_handles_ymd_strings() {
        assert_eq!(parse_date(Some(&json!("2026-01-10"))), ymd_to_ts(2026, 1, 10));
        assert_eq!(
            parse_date(Some(&json!("2026-01-10 08:30"))),
            ymd_hms_to_ts(2026, 1, 10, 8, 30, 0)
        );
    }

    #[test]
    fn parse_date_converts_excel_serials() {
        // 2026-03-15 = serial 46096 (số ngày từ 1899-12-30).
        let ts = parse_date(Some(&json!(46096)));
        assert_eq!(ts, 46096 * 86_400_000 - 25569 * 86_400_000);
        // Số lớn ngoài khoảng serial coi là epoch-ms sẵn.
        assert_eq!(parse_date(Some(&json!(1_770_000_000_000i64))), 1_770_000_000_000);
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert_eq!(parse_date(None), 0);
        assert_eq!(parse_date(Some(&Value::Null)), 0);
        assert_eq!(parse_date(Some(&json!(""))), 0);
        assert_eq!(parse_date(Some(&json!("không rõ"))), 0);
        assert_eq!(parse_date(Some(&json!(0))), 0);
        assert_eq!(parse_date(Some(&json!("32/13/2026"))), 0);
    }

    #[test]
    fn display_helpers_use_placeholders_when_empty() {
        assert_eq!(format_date_display(0), "---");
        assert_eq!(date_to_ymd(0), "");
        assert_eq!(date_to_ym(0), "");
        let ts = ymd_to_ts(2026, 2, 1);
        assert_eq!(date_to_ymd(ts), "2026-02-01");
        assert_eq!(date_to_ym(ts), "2026-02");
        assert_eq!(ts_year(ts), 2026);
        assert_eq!(ts_month(ts), 2);
    }
}
