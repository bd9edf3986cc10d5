use serde_json::{Map, Value};
use unicode_normalization::UnicodeNormalization;

// Khóa so sánh chung toàn hệ thống: hai chuỗi là "cùng một nơi" khi và chỉ khi
// dạng chuẩn hóa của chúng bằng nhau. Lưu ý: "đ" (U+0111) không tách được qua
// NFD nên bị loại bỏ luôn, không thành "d"; danh mục cũng chuẩn hóa bằng hàm
// này nên hai phía vẫn nhất quán.
pub fn super_normalize(s: &str) -> String {
    s.to_lowercase()
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

// Hạ chữ thường và bỏ dấu nhưng giữ nguyên khoảng trắng/ký tự khác, dùng cho
// các phép dò từ khóa trên nguyên văn địa chỉ.
pub fn strip_diacritics(s: &str) -> String {
    s.to_lowercase()
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect()
}

// Tìm cột theo danh sách từ khóa: khóa cột đầu tiên (theo thứ tự cột trong
// file) khớp chính xác, hoặc chứa từ khóa khi khóa dài hơn 4 ký tự (chặn các
// khóa ngắn khớp bừa).
pub fn get_column_value<'a>(row: &'a Map<String, Value>, keywords: &[&str]) -> Option<&'a Value> {
    let norm_keywords = keywords
        .iter()
        .map(|k| super_normalize(k))
        .collect::<Vec<_>>();
    for (key, value) in row {
        let norm_key = super_normalize(key);
        let hit = norm_keywords
            .iter()
            .any(|nk| norm_key == *nk || (norm_key.chars().count() > 4 && norm_key.contains(nk.as_str())));
        if hit {
            return Some(value);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Map<String, Value> {
        let mut m = Map::new();
        for (k, v) in pairs {
            m.insert((*k).to_string(), v.clone());
        }
        m
    }

    #[test]
    fn super_normalize_strips_diacritics_and_punctuation() {
        assert_eq!(super_normalize("Tân An"), "tanan");
        assert_eq!(super_normalize("  Phường 6, TP. Tân An "), "phuong6tptanan");
        assert_eq!(super_normalize("Tây Ninh"), "tayninh");
        assert_eq!(super_normalize(""), "");
    }

    #[test]
    fn super_normalize_drops_d_bar_like_the_directory_side() {
        // "đ" không có phân tách NFD nên bị lọc bỏ; hai phía so sánh vẫn khớp.
        assert_eq!(super_normalize("Gò Dầu"), "godau");
        assert_eq!(super_normalize("đức hòa"), "uchoa");
        assert_eq!(super_normalize("Duc Hoa"), "duchoa");
    }

    #[test]
    fn super_normalize_is_idempotent() {
        for s in ["Ngày hết hạn", "TP Tân An, Long An", "abc123", "ĐƯỜNG 30/4"] {
            let once = super_normalize(s);
            assert_eq!(super_normalize(&once), once, "normalize phải bất biến khi áp lại: {s}");
        }
    }

    #[test]
    fn get_column_value_matches_exact_then_substring() {
        let r = row(&[
            ("STT", json!(1)),
            ("Ngay het han hop dong", json!("15/03/2026")),
            ("Ngày ký", json!("01/01/2025")),
        ]);
        let v = get_column_value(&r, &["Ngày hết hạn", "het han"]);
        assert_eq!(v, Some(&json!("15/03/2026")));
        let v = get_column_value(&r, &["Ngày ký", "Ngay ky"]);
        assert_eq!(v, Some(&json!("01/01/2025")));
    }

    #[test]
    fn get_column_value_first_key_wins() {
        let r = row(&[
            ("Ngày hết hạn 2025", json!("01/06/2025")),
            ("Ngày hết hạn", json!("01/06/2026")),
        ]);
        // Khóa cột đứng trước thắng, không phải thứ tự từ khóa.
        let v = get_column_value(&r, &["Ngày hết hạn"]);
        assert_eq!(v, Some(&json!("01/06/2025")));
    }

    #[test]
    fn get_column_value_short_keys_need_exact_match() {
        let r = row(&[("SDT", json!("0912345678"))]);
        // "sdt" (3 ký tự) chỉ khớp chính xác, không khớp chứa.
        assert_eq!(get_column_value(&r, &["SDT"]), Some(&json!("0912345678")));
        assert_eq!(get_column_value(&r, &["DT"]), None);
    }

    #[test]
    fn get_column_value_missing_returns_none() {
        let r = row(&[("Khách hàng", json!("NT A"))]);
        assert_eq!(get_column_value(&r, &["Mã hợp đồng", "Contract ID"]), None);
    }
}
