use serde_json::Value;

use crate::date_parse::{ts_month, ts_year, ymd_to_ts};

pub const PLACEHOLDER: &str = "---";

// Ngữ nghĩa truthy của dữ liệu ô: null/false/0/"" coi như vắng mặt.
pub fn js_truthy(val: Option<&Value>) -> bool {
    match val {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

// Tương đương String(x || ""): giá trị vắng mặt về chuỗi rỗng, số nguyên không
// kèm phần thập phân.
pub fn value_to_string(val: Option<&Value>) -> String {
    if !js_truthy(val) {
        return String::new();
    }
    match val {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => format_number(n),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn format_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    let f = n.as_f64().unwrap_or(0.0);
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 {
        format!("{}", f as i64)
    } else {
        format!("{f}")
    }
}

// Excel/sheet_to_json thường đọc SĐT thành number và làm mất số 0 đầu; số
// nguyên đúng 9 chữ số không bắt đầu bằng 0 được bù lại "0". Sau đó giá trị
// dưới 9 ký tự hoặc chứa ký tự ngoài [0-9+.\s] bị thay bằng "---".
pub fn normalize_phone_value(val: Option<&Value>) -> String {
    let mut from_number: Option<String> = None;
    if let Some(Value::Number(n)) = val {
        if let Some(f) = n.as_f64() {
            if f.is_finite() && f.fract() == 0.0 {
                let s = format_number(n);
                if s.len() == 9 && s.starts_with(|c: char| c.is_ascii_digit() && c != '0') {
                    from_number = Some(format!("0{s}"));
                } else {
                    from_number = Some(s);
                }
            }
        }
    }
    let phone = match from_number {
        Some(s) if !s.is_empty() => s,
        _ => {
            let s = value_to_string(val);
            if s.is_empty() {
                PLACEHOLDER.to_string()
            } else {
                s
            }
        }
    };
    let phone = phone.trim().to_string();
    let invalid = phone == PLACEHOLDER
        || phone.chars().count() < 9
        || !phone
            .chars()
            .all(|c| c.is_ascii_digit() || c == '+' || c == '.' || c.is_whitespace());
    if invalid {
        PLACEHOLDER.to_string()
    } else {
        phone
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContractFlags {
    pub is_expiring_2026: bool,
    pub is_ptm: bool,
    pub is_active: bool,
    pub is_gia_han_2026: bool,
    pub is_gia_han_som_2026: bool,
    pub is_gia_han_dung_han_2026: bool,
    pub is_gia_han_tre_2025: bool,
}

// Cờ phân loại theo năm báo cáo 2026. Gia hạn trong năm đòi cả ngày cập nhật
// lẫn hạn cũ đều rơi vào 2026; cập nhật sau tháng hết hạn cũ thì không tính
// sớm cũng không tính đúng hạn, chỉ nằm trong tổng gia hạn.
pub fn compute_contract_flags(
    latest_ts: i64,
    prev_ts: i64,
    signing_ts: i64,
    update_ts: i64,
    now_ts: i64,
) -> ContractFlags {
    let is_gia_han_2026 =
        update_ts > 0 && ts_year(update_ts) == 2026 && prev_ts > 0 && ts_year(prev_ts) == 2026;
    let update_month = if update_ts > 0 { ts_month(update_ts) } else { 0 };
    let expiry_month_2026 = if prev_ts > 0 && ts_year(prev_ts) == 2026 {
        ts_month(prev_ts)
    } else {
        0
    };
    ContractFlags {
        // Hết hạn trong năm 2026 = hạn (mới nhất) rơi vào 2026, tính từ 1/1/2026.
        is_expiring_2026: latest_ts > 0
            && ts_year(latest_ts) == 2026
            && latest_ts >= ymd_to_ts(2026, 1, 1),
        is_ptm: signing_ts > 0 && ts_year(signing_ts) == 2026,
        is_active: latest_ts >= now_ts,
        is_gia_han_2026,
        is_gia_han_som_2026: is_gia_han_2026
            && update_month > 0
            && expiry_month_2026 > 0
            && update_month < expiry_month_2026,
        is_gia_han_dung_han_2026: is_gia_han_2026
            && update_month > 0
            && expiry_month_2026 > 0
            && update_month == expiry_month_2026,
        is_gia_han_tre_2025: update_ts > 0
            && ts_year(update_ts) == 2026
            && prev_ts > 0
            && ts_year(prev_ts) == 2025,
    }
}
