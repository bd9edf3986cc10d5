use serde_json::{json, Map, Value};

use crate::area_mapping::UNCLASSIFIED_AREA;

// Số thuê bao hết hạn 2026 còn phải gia hạn = hết hạn 2026 trừ đã gia hạn
// đúng hạn và gia hạn sớm, chặn dưới 0.
pub fn con_phai_gia_han_2026(
    expiring_2026: i64,
    gia_han_dung_han_2026: i64,
    gia_han_som_2026: i64,
) -> i64 {
    (expiring_2026 - gia_han_dung_han_2026 - gia_han_som_2026).max(0)
}

fn flag(rec: &Map<String, Value>, key: &str) -> bool {
    rec.get(key).and_then(Value::as_bool).unwrap_or(false)
}

// Tổng hợp sau khi chạy pipeline: tỷ lệ map được, đếm theo khu vực (giảm dần)
// và các tổng cờ phục vụ báo cáo gia hạn năm 2026.
pub fn summarize_area_report(records: &[Map<String, Value>]) -> Value {
    let total = records.len() as i64;
    let mut mapped = 0i64;
    let mut expiring_2026 = 0i64;
    let mut gia_han_2026 = 0i64;
    let mut gia_han_dung_han_2026 = 0i64;
    let mut gia_han_som_2026 = 0i64;
    let mut gia_han_tre_2025 = 0i64;
    let mut ptm_2026 = 0i64;
    let mut active = 0i64;
    let mut by_area: Vec<(String, i64)> = Vec::new();

    for rec in records {
        let area = rec
            .get("_area")
            .and_then(Value::as_str)
            .filter(|a| !a.is_empty())
            .unwrap_or(UNCLASSIFIED_AREA);
        if area != UNCLASSIFIED_AREA {
            mapped += 1;
        }
        match by_area.iter_mut().find(|(a, _)| a == area) {
            Some((_, count)) => *count += 1,
            None => by_area.push((area.to_string(), 1)),
        }
        if flag(rec, "_isExpiring2026") {
            expiring_2026 += 1;
        }
        if flag(rec, "_isGiaHan2026") {
            gia_han_2026 += 1;
        }
        if flag(rec, "_isGiaHanDungHan2026") {
            gia_han_dung_han_2026 += 1;
        }
        if flag(rec, "_isGiaHanSom2026") {
            gia_han_som_2026 += 1;
        }
        if flag(rec, "_isGiaHanTre2025") {
            gia_han_tre_2025 += 1;
        }
        if flag(rec, "_isPTM") {
            ptm_2026 += 1;
        }
        if flag(rec, "_isActive") {
            active += 1;
        }
    }

    by_area.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let mut by_area_obj = Map::new();
    for (area, count) in by_area {
        by_area_obj.insert(area, json!(count));
    }

    let unmapped = total - mapped;
    let mapped_rate = if total > 0 {
        format!("{:.2}%", mapped as f64 / total as f64 * 100.0)
    } else {
        "0.00%".to_string()
    };

    json!({
        "total": total,
        "mapped": mapped,
        "unmapped": unmapped,
        "mapped_rate": mapped_rate,
        "by_area": Value::Object(by_area_obj),
        "expiring_2026": expiring_2026,
        "gia_han_2026": gia_han_2026,
        "gia_han_dung_han_2026": gia_han_dung_han_2026,
        "gia_han_som_2026": gia_han_som_2026,
        "gia_han_tre_2025": gia_han_tre_2025,
        "ptm_2026": ptm_2026,
        "active": active,
        "con_phai_gia_han_2026": con_phai_gia_han_2026(
            expiring_2026,
            gia_han_dung_han_2026,
            gia_han_som_2026
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(area: &str, flags: &[(&str, bool)]) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("_area".to_string(), json!(area));
        for (k, v) in flags {
            m.insert((*k).to_string(), json!(v));
        }
        m
    }

    #[test]
    fn con_phai_gia_han_formula() {
        // 500 hết hạn, 20 đúng hạn, 4 sớm -> còn 476 phải gia hạn.
        assert_eq!(con_phai_gia_han_2026(500, 20, 4), 476);
        assert_eq!(con_phai_gia_han_2026(3, 2, 2), 0, "không âm");
    }

    #[test]
    fn summary_counts_mapped_and_flags() {
        let records = vec![
            record("VNPT KHU VỰC TÂN AN", &[("_isExpiring2026", true), ("_isGiaHanSom2026", true), ("_isGiaHan2026", true)]),
            record("VNPT KHU VỰC TÂN AN", &[("_isExpiring2026", true), ("_isGiaHanDungHan2026", true), ("_isGiaHan2026", true)]),
            record("CHƯA PHÂN LOẠI", &[("_isExpiring2026", true)]),
        ];
        let s = summarize_area_report(&records);
        assert_eq!(s["total"], json!(3));
        assert_eq!(s["mapped"], json!(2));
        assert_eq!(s["unmapped"], json!(1));
        assert_eq!(s["mapped_rate"], json!("66.67%"));
        assert_eq!(s["by_area"]["VNPT KHU VỰC TÂN AN"], json!(2));
        assert_eq!(s["by_area"]["CHƯA PHÂN LOẠI"], json!(1));
        assert_eq!(s["expiring_2026"], json!(3));
        assert_eq!(s["con_phai_gia_han_2026"], json!(1));
    }

    #[test]
    fn summary_of_empty_input() {
        let s = summarize_area_report(&[]);
        assert_eq!(s["total"], json!(0));
        assert_eq!(s["mapped_rate"], json!("0.00%"));
        assert_eq!(s["con_phai_gia_han_2026"], json!(0));
    }
}
