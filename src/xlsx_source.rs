use calamine::{open_workbook_auto, Data, Reader};
use serde_json::{json, Map, Value};
use std::path::Path;

// Giữ kiểu dữ liệu của ô: số vẫn là số (để còn bù số 0 đầu SĐT và đọc serial
// ngày), ô ngày về serial Excel, ô trống thành chuỗi rỗng.
fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => json!(""),
        Data::String(s) => json!(s.clone()),
        Data::Float(f) => json!(f),
        Data::Int(i) => json!(i),
        Data::Bool(b) => json!(b),
        Data::DateTime(dt) => json!(dt.as_f64()),
        Data::DateTimeIso(s) => json!(s.clone()),
        Data::DurationIso(s) => json!(s.clone()),
        Data::Error(_) => json!(""),
    }
}

fn is_blank(val: &Value) -> bool {
    matches!(val, Value::String(s) if s.trim().is_empty())
}

// Đọc sheet đầu tiên thành danh sách dòng, dòng đầu làm tên cột. Cột không có
// tên bị bỏ; dòng trống hoàn toàn bị bỏ.
pub fn read_sheet_rows(path: &Path) -> Result<Vec<Map<String, Value>>, String> {
    if !path.exists() {
        return Err(format!("Không tìm thấy file: {}", path.to_string_lossy()));
    }
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| format!("Không mở được file bảng tính ({}): {e}", path.to_string_lossy()))?;
    let sheet_names = workbook.sheet_names().to_owned();
    let first_sheet = sheet_names
        .first()
        .cloned()
        .ok_or_else(|| "File bảng tính không có sheet nào".to_string())?;
    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(|e| format!("Không đọc được sheet {first_sheet}: {e}"))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(header_row) => header_row
            .iter()
            .map(|c| c.to_string().trim().to_string())
            .collect(),
        None => return Ok(Vec::new()),
    };

    let mut out = Vec::new();
    for row in rows_iter {
        let mut record = Map::new();
        let mut has_any = false;
        for (idx, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let val = row.get(idx).map(cell_to_value).unwrap_or_else(|| json!(""));
            if !is_blank(&val) {
                has_any = true;
            }
            record.insert(header.clone(), val);
        }
        if has_any {
            out.push(record);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_types_are_preserved() {
        assert_eq!(cell_to_value(&Data::String("Tân An".to_string())), json!("Tân An"));
        assert_eq!(cell_to_value(&Data::Int(912345678)), json!(912345678));
        assert_eq!(cell_to_value(&Data::Float(46096.0)), json!(46096.0));
        assert_eq!(cell_to_value(&Data::Bool(true)), json!(true));
        assert_eq!(cell_to_value(&Data::Empty), json!(""));
    }

    #[test]
    fn blank_detection_ignores_whitespace() {
        assert!(is_blank(&json!("")));
        assert!(is_blank(&json!("   ")));
        assert!(!is_blank(&json!("x")));
        assert!(!is_blank(&json!(0)));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_sheet_rows(Path::new("/nonexistent/khong-co.xlsx")).unwrap_err();
        assert!(err.contains("Không tìm thấy file"), "{err}");
    }
}
