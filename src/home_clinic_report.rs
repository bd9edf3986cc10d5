use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::address::{get_address_tail_for_display, get_address_tail_for_mapping};
use crate::area_mapping::{
    build_area_directory, build_province_names, map_address_to_area, UNCLASSIFIED_AREA,
};
use crate::classify::{
    compute_contract_flags, js_truthy, normalize_phone_value, value_to_string, PLACEHOLDER,
};
use crate::date_parse::{format_date_display, parse_date};
use crate::normalize::{get_column_value, super_normalize};

const KW_ID: &[&str] = &["Mã khách hàng", "Ma khach hang", "Mã KH"];
const KW_CUSTOMER: &[&str] = &[
    "Tên phòng khám",
    "Ten phong kham",
    "Tên khách hàng",
    "Ten khach hang",
    "Khách hàng",
];
const KW_ADDRESS: &[&str] = &["Địa chỉ", "Dia chi", "Address"];
const KW_PHONE: &[&str] = &["Sđt", "SDT", "SĐT", "Phone", "Điện thoại"];
const KW_EXPIRY: &[&str] = &["Ngày hết hạn", "Ngay het han", "Het han"];
const KW_SIGNING: &[&str] = &["Ngày đăng ký", "Ngay dang ky", "Ngày bắt đầu", "Ngay bat dau"];
const KW_STATUS: &[&str] = &["Trạng thái", "Trang thai", "Status"];
const KW_EMAIL: &[&str] = &["Email"];

// Nguồn Home&Clinic: mỗi dòng đã là một bản ghi theo mã khách hàng, không có
// cột hạn lịch sử nên hạn-trước luôn bằng 0 và hai cờ gia hạn sớm/đúng hạn
// không bao giờ bật. Đây là giới hạn đã biết của nguồn, giữ nguyên.
pub fn process_home_clinic(
    rows: &[Map<String, Value>],
    categories: &[Map<String, Value>],
    target_site: &str,
) -> Vec<Map<String, Value>> {
    if rows.is_empty() {
        return Vec::new();
    }
    let now = Utc::now().timestamp_millis();
    let province_names = build_province_names(categories);
    let directory = build_area_directory(categories);

    rows.iter()
        .filter(|row| js_truthy(get_column_value(row, KW_ID)))
        .map(|row| {
            let raw_addr = value_to_string(get_column_value(row, KW_ADDRESS))
                .trim()
                .to_string();
            let best_match =
                map_address_to_area(&raw_addr, &directory, target_site, &province_names);
            let norm_tail = get_address_tail_for_mapping(&raw_addr, &province_names);
            let norm_tail_val = super_normalize(&norm_tail);
            let display_tail = get_address_tail_for_display(&raw_addr, &province_names);

            let latest_ts = parse_date(get_column_value(row, KW_EXPIRY));
            let prev_ts = 0;
            let signing_ts = parse_date(get_column_value(row, KW_SIGNING));
            let update_ts = if signing_ts > 0 { signing_ts } else { latest_ts };

            let phone_val = normalize_phone_value(get_column_value(row, KW_PHONE));
            let flags = compute_contract_flags(latest_ts, prev_ts, signing_ts, update_ts, now);
            let area = if best_match.area.is_empty() {
                UNCLASSIFIED_AREA.to_string()
            } else {
                best_match.area.clone()
            };

            let mut out = row.clone();
            out.insert(
                "_id".to_string(),
                json!(value_to_string(get_column_value(row, KW_ID)).trim()),
            );
            out.insert(
                "_customer".to_string(),
                json!(value_to_string(get_column_value(row, KW_CUSTOMER)).to_uppercase()),
            );
            out.insert("_taxId".to_string(), {
                match get_column_value(row, KW_EMAIL) {
                    Some(v) if js_truthy(Some(v)) => v.clone(),
                    _ => json!(PLACEHOLDER),
                }
            });
            out.insert("_subIdDhs".to_string(), json!(PLACEHOLDER));
            out.insert("_phone".to_string(), json!(phone_val));
            out.insert(
                "_status".to_string(),
                json!(value_to_string(get_column_value(row, KW_STATUS))),
            );
            out.insert("_signingDate".to_string(), json!(format_date_display(signing_ts)));
            out.insert("_signingTs".to_string(), json!(signing_ts));
            out.insert("_updateDate".to_string(), json!(format_date_display(update_ts)));
            out.insert("_updateTs".to_string(), json!(update_ts));
            out.insert("_expiryDate".to_string(), json!(format_date_display(latest_ts)));
            out.insert("_prevExpiryDate".to_string(), json!(format_date_display(prev_ts)));
            out.insert("_expiryTs".to_string(), json!(latest_ts));
            out.insert("_prevExpiryTs".to_string(), json!(prev_ts));
            out.insert("_address".to_string(), json!(raw_addr));
            out.insert(
                "_compareValue".to_string(),
                json!(if norm_tail_val.is_empty() {
                    PLACEHOLDER.to_string()
                } else {
                    norm_tail_val
                }),
            );
            out.insert(
                "_addressSearchValue".to_string(),
                json!(if display_tail.is_empty() {
                    PLACEHOLDER.to_string()
                } else {
                    display_tail.trim().to_string()
                }),
            );
            out.insert("_area".to_string(), json!(area.to_uppercase()));
            out.insert("_site".to_string(), json!(best_match.site));
            out.insert("_isExpiring2026".to_string(), json!(flags.is_expiring_2026));
            out.insert("_isPTM".to_string(), json!(flags.is_ptm));
            out.insert("_isActive".to_string(), json!(flags.is_active));
            out.insert("_isGiaHan2026".to_string(), json!(flags.is_gia_han_2026));
            // Nguồn này không có hạn cũ nên hai cờ dưới cố định false.
            out.insert("_isGiaHanSom2026".to_string(), json!(false));
            out.insert("_isGiaHanDungHan2026".to_string(), json!(false));
            out.insert("_isGiaHanTre2025".to_string(), json!(flags.is_gia_han_tre_2025));
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_parse::ymd_to_ts;

    fn row(pairs: &[(&str, Value)]) -> Map<String, Value> {
        let mut m = Map::new();
        for (k, v) in pairs {
            m.insert((*k).to_string(), v.clone());
        }
        m
    }

    fn categories() -> Vec<Map<String, Value>> {
        vec![row(&[
            ("Xã", json!("Xã Bình Thạnh")),
            ("Huyện", json!("Huyện Thủ Thừa")),
            ("Khu vực", json!("VNPT Khu vực Thủ Thừa")),
            ("Mã tỉnh", json!("LAN")),
            ("Tỉnh", json!("Long An")),
        ])]
    }

    #[test]
    fn one_record_per_row_rows_without_id_dropped() {
        let rows = vec![
            row(&[
                ("Mã khách hàng", json!("KH01")),
                ("Tên phòng khám", json!("Phòng khám An Bình")),
                ("Ngày hết hạn", json!("01/10/2026")),
            ]),
            row(&[("Tên phòng khám", json!("Không mã")), ("Ngày hết hạn", json!("01/10/2026"))]),
            row(&[("Mã khách hàng", json!("KH02")), ("Ngày hết hạn", json!("01/04/2025"))]),
        ];
        let out = process_home_clinic(&rows, &categories(), "LAN");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].get("_id"), Some(&json!("KH01")));
        assert_eq!(out[0].get("_customer"), Some(&json!("PHÒNG KHÁM AN BÌNH")));
    }

    #[test]
    fn previous_expiry_is_always_zero_and_timing_flags_stay_false() {
        let rows = vec![row(&[
            ("Mã khách hàng", json!("KH01")),
            ("Ngày đăng ký", json!("05/01/2026")),
            ("Ngày hết hạn", json!("05/01/2027")),
        ])];
        let out = process_home_clinic(&rows, &categories(), "LAN");
        let rec = &out[0];
        assert_eq!(rec.get("_prevExpiryTs"), Some(&json!(0)));
        assert_eq!(rec.get("_prevExpiryDate"), Some(&json!("---")));
        assert_eq!(rec.get("_isGiaHan2026"), Some(&json!(false)));
        assert_eq!(rec.get("_isGiaHanSom2026"), Some(&json!(false)));
        assert_eq!(rec.get("_isGiaHanDungHan2026"), Some(&json!(false)));
        assert_eq!(rec.get("_isGiaHanTre2025"), Some(&json!(false)));
        assert_eq!(rec.get("_isPTM"), Some(&json!(true)));
    }

    #[test]
    fn update_falls_back_from_signing_to_expiry() {
        let rows = vec![row(&[
            ("Mã khách hàng", json!("KH01")),
            ("Ngày hết hạn", json!("20/09/2026")),
        ])];
        let out = process_home_clinic(&rows, &categories(), "LAN");
        assert_eq!(out[0].get("_updateTs"), Some(&json!(ymd_to_ts(2026, 9, 20))));
        assert_eq!(out[0].get("_signingTs"), Some(&json!(0)));
    }

    #[test]
    fn email_column_backs_the_tax_id_slot() {
        let rows = vec![row(&[
            ("Mã khách hàng", json!("KH01")),
            ("Email", json!("pk@example.com")),
        ])];
        let out = process_home_clinic(&rows, &categories(), "LAN");
        assert_eq!(out[0].get("_taxId"), Some(&json!("pk@example.com")));
        assert_eq!(out[0].get("_subIdDhs"), Some(&json!("---")));
    }
}
