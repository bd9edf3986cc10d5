use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::normalize::super_normalize;

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("invalid ws regex"))
}

fn comma_spacing_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*,\s*").expect("invalid comma spacing regex"))
}

fn trailing_punct_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.,;:\s]+$").expect("invalid trailing punct regex"))
}

fn segment_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\s*[,\u{FF0C}\u{3001};]+\s*|\s+-\s+").expect("invalid segment split regex")
    })
}

// Các đoạn cuối bị coi là tỉnh/quốc gia và bị cắt bỏ. Mẫu "^t\.?\s*" khớp mọi
// đoạn bắt đầu bằng "t" (kể cả "tp tân an"); fallback thành phố Tân An/Tây Ninh
// trong area_mapping bù lại cho các địa chỉ mất đoạn đó.
fn province_drop_res() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(?i)^tỉnh\s+",
            r"(?i)^t\.?\s*",
            r"(?i)^việt nam$",
            r"(?i)^viet nam$",
            r"(?i)^vn$",
            r"(?i)^quốc gia\s+",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("invalid province drop regex"))
        .collect()
    })
}

fn province_end_res() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(?i),?\s*tỉnh\s+long an\.?\s*$",
            r"(?i),?\s*tỉnh\s+tây ninh\.?\s*$",
            r"(?i),?\s*long an\.?\s*$",
            r"(?i),?\s*tây ninh\.?\s*$",
            r"(?i),?\s*việt nam\.?\s*$",
            r"(?i),?\s*viet nam\.?\s*$",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("invalid province end regex"))
        .collect()
    })
}

// Hỗ trợ cả "p."/"f." không có khoảng trắng phía sau (vd: p.Hiệp Ninh).
fn admin_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(huyện|huyen|xa|xã|phường|phuong|quận|quan|thị trấn|thi tran|thị xã|thi xa|tx|tt|tp|thanh pho|thành phố|ấp|ap|p\.?|f\.?)\s+",
        )
        .expect("invalid admin prefix regex")
    })
}

fn admin_prefix_p_dot_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(p\.|f\.)\s*").expect("invalid p-dot prefix regex"))
}

// Đoạn chi tiết địa chỉ (số nhà, đường, ấp, khu phố, tổ) - không bao giờ đem so
// với danh mục xã/huyện.
fn detail_segment_res() -> &'static Vec<Regex> {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"^\d+(/\d+)?\.?$",
            r"(?i)^số\s+nhà\s+",
            r"(?i)^số\s+\d+",
            r"(?i)^so\s+nha\s+",
            r"(?i)^đường\s+",
            r"(?i)^duong\s+",
            r"(?i)^đ\.\s*",
            r"(?i)^ấp\s+",
            r"(?i)^ap\s+",
            r"(?i)^khu\s+\d+",
            r"(?i)^kp\s+",
            r"(?i)^khu phố\s+",
            r"(?i)^khu pho\s+",
            r"(?i)^tổ\s+",
            r"(?i)^to\s+",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("invalid detail segment regex"))
        .collect()
    })
}

fn admin_unit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(phường|p|xã|thị trấn|tt|quận|huyện)\b")
            .expect("invalid admin unit regex")
    })
}

fn strip_trailing_punct(s: &str) -> String {
    trailing_punct_re().replace(s, "").to_string()
}

// Chuẩn hóa chuỗi địa chỉ: chữ thường, thống nhất mọi dấu phẩy (fullwidth,
// ideographic, chấm phẩy, gạch nối) về dấu phẩy ASCII, gọn khoảng trắng, bỏ dấu
// câu cuối. Nếu ô có dấu | thì chỉ lấy phần trước.
pub fn normalize_address_string(raw: &str) -> String {
    let mut s = raw.trim().to_string();
    if let Some(idx) = s.find('|') {
        s = s[..idx].trim().to_string();
    }
    let s: String = s
        .chars()
        .map(|c| match c {
            '\u{00A0}' => ' ',
            '\u{FF0C}' | '\u{3001}' | '\u{060C}' | '\u{201A}' | '\u{2022}' | ';' | '-' => ',',
            c => c,
        })
        .collect();
    let s = s.to_lowercase();
    let s = ws_re().replace_all(&s, " ");
    let s = comma_spacing_re().replace_all(&s, ", ");
    strip_trailing_punct(s.trim())
}

// Cắt phần tỉnh/quốc gia ở cuối địa chỉ: lặp lại việc bỏ đoạn cuối chừng nào nó
// còn mang tiền tố tỉnh/quốc gia hoặc (không tiền tố) trùng tên tỉnh trong danh
// mục đã chuẩn hóa.
pub fn strip_province_and_country(s: &str, province_names_normalized: &[String]) -> String {
    if s.is_empty() {
        return String::new();
    }
    let mut parts: Vec<String> = s
        .trim()
        .split(',')
        .map(|x| strip_trailing_punct(x.trim()))
        .filter(|x| !x.is_empty())
        .collect();
    while let Some(last) = parts.last() {
        let with_prefix = province_drop_res().iter().any(|re| re.is_match(last));
        let no_prefix_province = province_names_normalized.contains(&super_normalize(last));
        if with_prefix || no_prefix_province {
            parts.pop();
        } else {
            break;
        }
    }
    parts.join(", ")
}

// Bỏ tên tỉnh/quốc gia dính ở cuối một đoạn (vd: "phường 6 tp tân an long an"
// -> "phường 6 tp tân an"), kể cả khi dính không có dấu phẩy: cắt tiếp từng từ
// cuối trùng tên tỉnh.
pub fn strip_province_from_segment_end(segment: &str, province_names_normalized: &[String]) -> String {
    let mut s = strip_trailing_punct(segment.trim());
    for re in province_end_res() {
        s = re.replace(&s, "").trim().to_string();
    }
    if !province_names_normalized.is_empty() {
        let mut parts: Vec<&str> = s.split_whitespace().collect();
        while let Some(last) = parts.last() {
            let word = last.trim_end_matches(['.', ',']);
            if province_names_normalized.contains(&super_normalize(word)) {
                parts.pop();
            } else {
                break;
            }
        }
        s = parts.join(" ").trim().to_string();
    }
    s
}

pub fn remove_admin_prefix(segment: &str) -> String {
    let s = segment.trim();
    let s = admin_prefix_re().replace(s, "").trim().to_string();
    admin_prefix_p_dot_re().replace(&s, "").trim().to_string()
}

pub fn is_address_detail_segment(segment: &str) -> bool {
    let s = segment.trim().to_lowercase();
    detail_segment_res().iter().any(|re| re.is_match(&s))
}

pub fn split_address_segments(s: &str) -> Vec<String> {
    segment_split_re()
        .split(s)
        .map(|x| strip_trailing_punct(x.trim()))
        .filter(|x| !x.is_empty())
        .collect()
}

// Địa chỉ không có dấu phẩy: tổng hợp ứng viên từ 1-4 từ cuối (dài trước,
// ngắn sau), vẫn lọc đoạn chi tiết và bỏ tiền tố admin như nhánh có phẩy.
fn no_comma_candidates(s: &str, province_names_normalized: &[String]) -> Vec<String> {
    let stripped = strip_province_from_segment_end(s, province_names_normalized);
    let words: Vec<&str> = stripped.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    for n in 1..=words.len().min(4) {
        parts.push(words[words.len() - n..].join(" "));
    }
    let mut candidates = Vec::new();
    let mut seen = HashSet::new();
    for part in parts.iter().rev() {
        if is_address_detail_segment(part) {
            continue;
        }
        let cleaned = remove_admin_prefix(part);
        if cleaned.is_empty() {
            continue;
        }
        let norm = super_normalize(&cleaned);
        if seen.insert(norm) {
            candidates.push(cleaned);
        }
    }
    candidates
}

// Danh sách ứng viên so khớp, cụ thể trước:
// - Ứng viên 1 (huyện/thị xã): đoạn cuối sau dấu phẩy.
// - Ứng viên 2 (xã/phường): đoạn áp chót, chỉ thử khi ứng viên 1 không khớp.
// Số nhà, đường, ấp không bao giờ được đem so với danh mục.
pub fn get_address_tail_candidates(
    raw_address: &str,
    province_names_normalized: &[String],
) -> Vec<String> {
    let step1 = normalize_address_string(raw_address);
    let step2 = strip_province_and_country(&step1, province_names_normalized);
    if step2.is_empty() {
        return Vec::new();
    }
    if !step2.contains(',') && step2.trim().contains(' ') {
        return no_comma_candidates(&step2, province_names_normalized);
    }

    let mut segments = split_address_segments(&step2);
    if segments.is_empty() {
        return Vec::new();
    }
    if segments.len() > 1 {
        segments.remove(0);
    }
    let admin_segments: Vec<String> = segments
        .into_iter()
        .filter(|seg| !is_address_detail_segment(seg))
        .collect();
    if admin_segments.is_empty() {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    let mut seen = HashSet::new();

    let last_seg = strip_province_from_segment_end(
        admin_segments
            .last()
            .map(String::as_str)
            .unwrap_or_default(),
        province_names_normalized,
    );
    let for_huyen = remove_admin_prefix(&last_seg);
    if !for_huyen.is_empty() && seen.insert(super_normalize(&for_huyen)) {
        candidates.push(for_huyen);
    }

    if admin_segments.len() >= 2 {
        let second_last = strip_province_from_segment_end(
            &admin_segments[admin_segments.len() - 2],
            province_names_normalized,
        );
        let for_xa = remove_admin_prefix(&second_last);
        if !for_xa.is_empty() && seen.insert(super_normalize(&for_xa)) {
            candidates.push(for_xa);
        }
    }

    if candidates.is_empty() {
        let extracted = remove_admin_prefix(&last_seg);
        if !extracted.is_empty() {
            candidates.push(extracted);
        }
    }

    candidates
}

pub fn get_address_tail_for_mapping(
    raw_address: &str,
    province_names_normalized: &[String],
) -> String {
    get_address_tail_candidates(raw_address, province_names_normalized)
        .into_iter()
        .next()
        .unwrap_or_default()
}

// Giá trị hiển thị ưu tiên xã/phường (ứng viên 2 nếu có) thay vì huyện/thị xã.
pub fn get_address_tail_for_display(
    raw_address: &str,
    province_names_normalized: &[String],
) -> String {
    let mut candidates = get_address_tail_candidates(raw_address, province_names_normalized);
    if candidates.len() >= 2 {
        return candidates.swap_remove(1);
    }
    candidates.into_iter().next().unwrap_or_default()
}

// Tách địa chỉ thành các đoạn tra cứu/tìm kiếm: bỏ các đoạn thuần tên
// tỉnh/quốc gia trừ khi đoạn đó mang từ khóa đơn vị hành chính.
pub fn tokenize_address(
    address_raw: &str,
    p_keywords: &[&str],
    province_names_normalized: &[String],
) -> Vec<String> {
    if address_raw.trim().is_empty() {
        return Vec::new();
    }
    let s = normalize_address_string(address_raw);
    let s = strip_province_and_country(&s, province_names_normalized);
    let segments: Vec<String> = s
        .split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect();
    let mut junk: Vec<String> = [
        "long an", "tây ninh", "tay ninh", "việt nam", "viet nam", "vn", "v.n",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    junk.extend(p_keywords.iter().map(|s| s.to_string()));

    let filtered: Vec<String> = segments
        .iter()
        .filter(|seg| {
            let low = seg.trim_end_matches('.').trim().to_string();
            let is_admin_unit = admin_unit_re().is_match(&low);
            let is_province_name = junk
                .iter()
                .any(|j| low == *j || low.contains(&format!("tỉnh {j}")));
            !is_province_name || is_admin_unit
        })
        .cloned()
        .collect();

    if filtered.is_empty() && !segments.is_empty() {
        vec![segments[segments.len() - 1].clone()]
    } else {
        filtered
    }
}
