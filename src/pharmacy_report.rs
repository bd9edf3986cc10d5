use chrono::Utc;
use serde_json::{json, Map, Value};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::address::{get_address_tail_for_display, get_address_tail_for_mapping};
use crate::area_mapping::{
    build_area_directory, build_province_names, map_address_to_area, UNCLASSIFIED_AREA,
};
use crate::classify::{
    compute_contract_flags, js_truthy, normalize_phone_value, value_to_string, PLACEHOLDER,
};
use crate::date_parse::{format_date_display, parse_date};
use crate::normalize::{get_column_value, super_normalize};

pub const KW_CONTRACT: &[&str] = &["Mã hợp đồng", "Ma HD", "So hop dong", "Mã HĐ", "Contract ID"];
pub const KW_EXPIRY: &[&str] = &[
    "Ngày hết hạn",
    "Hạn dùng",
    "han dung",
    "ngay het han",
    "het han",
    "expiry",
    "exp date",
];
const KW_SIGNING: &[&str] = &["Ngày Ký Hợp đồng", "Ngày ký", "Ngay ky", "Signing Date"];
const KW_UPDATE: &[&str] = &["Ngày cập nhật", "Ngày sửa", "Update Date"];
const KW_GIA_HAN: &[&str] = &["Ngày gia hạn", "Ngay gia han", "Renewal Date"];
const KW_CUSTOMER: &[&str] = &["Tên khách hàng", "Khách hàng", "Don vi", "Customer Name"];
const KW_ADDRESS: &[&str] = &["Địa chỉ", "Dia chi", "Địa chỉ hệ thống", "Address"];
const KW_PHONE: &[&str] = &[
    "Số Điện thoại",
    "SDT",
    "SĐT",
    "Phone",
    "Di động",
    "Mobile",
    "Liên hệ",
];
const KW_TAX_ID: &[&str] = &["Mã số thuế", "MST"];
const KW_SUB_ID: &[&str] = &["Mã thuê bao", "Mã TB", "TB DHSXKD"];
const KW_STATUS: &[&str] = &["Trạng thái", "Status"];

// Nhóm tạm theo mã hợp đồng trong một lượt quét: dòng "tốt nhất" là dòng có
// hạn chính tắc muộn nhất tính tới thời điểm đó, kèm tập mọi mốc hết hạn đọc
// được từ bất kỳ cột nào tên giống cột hạn (kể cả cột lịch sử "hết hạn 2025").
struct ContractGroup {
    best_row: usize,
    all_expiries: Vec<i64>,
}

fn truthy_or_placeholder(val: Option<&Value>) -> Value {
    match val {
        Some(v) if js_truthy(Some(v)) => v.clone(),
        _ => json!(PLACEHOLDER),
    }
}

// Gộp dữ liệu hợp đồng theo mã, chọn dòng đại diện, map khu vực từ địa chỉ và
// tính các cờ phân loại. Mỗi mã hợp đồng cho đúng một bản ghi đầu ra, theo thứ
// tự lần đầu mã xuất hiện; dòng thiếu mã bị bỏ qua.
pub fn process_transactions(
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
    let norm_expiry_kws: Vec<String> = KW_EXPIRY.iter().map(|k| super_normalize(k)).collect();

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, ContractGroup> = HashMap::new();

    for (idx, row) in rows.iter().enumerate() {
        let c_id = value_to_string(get_column_value(row, KW_CONTRACT))
            .trim()
            .to_string();
        if c_id.is_empty() {
            continue;
        }
        let group = match groups.entry(c_id.clone()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(v) => {
                order.push(c_id.clone());
                v.insert(ContractGroup {
                    best_row: idx,
                    all_expiries: Vec::new(),
                })
            }
        };
        for (key, val) in row {
            let norm_key = super_normalize(key);
            if norm_expiry_kws.iter().any(|kw| norm_key.contains(kw.as_str())) {
                let ts = parse_date(Some(val));
                if ts > 0 {
                    group.all_expiries.push(ts);
                }
            }
        }
        let current_expiry = parse_date(get_column_value(row, KW_EXPIRY));
        let best_expiry = parse_date(get_column_value(&rows[group.best_row], KW_EXPIRY));
        // Chỉ đổi dòng đại diện khi muộn hơn hẳn; bằng nhau giữ dòng gặp trước.
        if current_expiry > best_expiry {
            group.best_row = idx;
        }
    }

    order
        .iter()
        .filter_map(|id| groups.get(id))
        .map(|group| {
            let row = &rows[group.best_row];

            let raw_addr_val = get_column_value(row, KW_ADDRESS)
                .filter(|v| js_truthy(Some(*v)))
                .cloned()
                .unwrap_or_else(|| json!(""));
            let raw_addr = value_to_string(Some(&raw_addr_val));
            let best_match =
                map_address_to_area(&raw_addr, &directory, target_site, &province_names);
            let norm_tail = get_address_tail_for_mapping(&raw_addr, &province_names);
            let norm_tail_val = super_normalize(&norm_tail);
            let display_tail = get_address_tail_for_display(&raw_addr, &province_names);

            let mut sorted_ex = group.all_expiries.clone();
            sorted_ex.sort_unstable_by(|a, b| b.cmp(a));
            sorted_ex.dedup();
            let latest_ts = sorted_ex.first().copied().unwrap_or(0);
            let prev_ts = sorted_ex.get(1).copied().unwrap_or(0);

            let signing_ts = parse_date(get_column_value(row, KW_SIGNING));
            let update_ts_raw = parse_date(get_column_value(row, KW_UPDATE));
            let gia_han_ts = parse_date(get_column_value(row, KW_GIA_HAN));
            let update_ts = if update_ts_raw > 0 { update_ts_raw } else { gia_han_ts };

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
                json!(value_to_string(get_column_value(row, KW_CONTRACT)).trim()),
            );
            out.insert(
                "_customer".to_string(),
                json!(value_to_string(get_column_value(row, KW_CUSTOMER)).to_uppercase()),
            );
            out.insert(
                "_taxId".to_string(),
                truthy_or_placeholder(get_column_value(row, KW_TAX_ID)),
            );
            out.insert(
                "_subIdDhs".to_string(),
                truthy_or_placeholder(get_column_value(row, KW_SUB_ID)),
            );
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
            out.insert("_address".to_string(), raw_addr_val);
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
            out.insert("_isGiaHanSom2026".to_string(), json!(flags.is_gia_han_som_2026));
            out.insert(
                "_isGiaHanDungHan2026".to_string(),
                json!(flags.is_gia_han_dung_han_2026),
            );
            out.insert("_isGiaHanTre2025".to_string(), json!(flags.is_gia_han_tre_2025));
            out
        })
        .collect()
}
