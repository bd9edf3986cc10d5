use khuvuc_report_lib::{
    process_home_clinic, process_transactions, read_sheet_rows, summarize_area_report,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::env;
use std::path::Path;

#[derive(Debug, Serialize)]
struct ReportErrorBody {
    category: String,
    message: String,
    #[serde(rename = "type")]
    error_type: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status")]
enum ReportResponse {
    #[serde(rename = "success")]
    Success { payload: Value },
    #[serde(rename = "error")]
    Error { error: ReportErrorBody },
}

fn classify_error_message(message: &str) -> String {
    let io_keywords = ["Không tìm thấy file", "Không mở được", "Không đọc được"];
    if io_keywords.iter().any(|k| message.contains(k)) {
        return "IO_ERROR".to_string();
    }
    let validation_keywords = ["thiếu tham số", "không có sheet"];
    if validation_keywords.iter().any(|k| message.contains(k)) {
        return "VALIDATION_ERROR".to_string();
    }
    "UNKNOWN_ERROR".to_string()
}

fn error_response(
    category: impl Into<String>,
    message: impl Into<String>,
    error_type: impl Into<String>,
) -> ReportResponse {
    ReportResponse::Error {
        error: ReportErrorBody {
            category: category.into(),
            message: message.into(),
            error_type: error_type.into(),
        },
    }
}

fn parse_bool_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}

fn dispatch(
    data_path: &str,
    dm_path: &str,
    site: &str,
    home_clinic: bool,
    include_records: bool,
    verbose: bool,
) -> Result<Value, String> {
    let rows = read_sheet_rows(Path::new(data_path))?;
    let categories = read_sheet_rows(Path::new(dm_path))?;
    if verbose {
        eprintln!("[khuvuc_report] rows={} categories={}", rows.len(), categories.len());
    }
    let records = if home_clinic {
        process_home_clinic(&rows, &categories, site)
    } else {
        process_transactions(&rows, &categories, site)
    };
    let mut payload = summarize_area_report(&records);
    if include_records {
        payload["records"] = json!(records);
    }
    Ok(payload)
}

fn main() {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let pretty = parse_bool_flag(&args, "--pretty");
    let verbose = parse_bool_flag(&args, "--verbose");
    let home_clinic = parse_bool_flag(&args, "--home-clinic");
    let include_records = parse_bool_flag(&args, "--records");
    let positional = args
        .iter()
        .filter(|a| !a.starts_with("--"))
        .cloned()
        .collect::<Vec<_>>();

    let resp = match positional.as_slice() {
        [data_path, dm_path, site] => {
            if verbose {
                eprintln!("[khuvuc_report] data={data_path}");
                eprintln!("[khuvuc_report] danh-muc={dm_path}");
                eprintln!("[khuvuc_report] site={site} home_clinic={home_clinic}");
            }
            match dispatch(data_path, dm_path, site, home_clinic, include_records, verbose) {
                Ok(payload) => ReportResponse::Success { payload },
                Err(message) => {
                    let category = classify_error_message(&message);
                    error_response(category, message, "ReportError")
                }
            }
        }
        _ => error_response(
            "VALIDATION_ERROR",
            "thiếu tham số: khuvuc_report <data.xlsx> <danh-muc-xa.xlsx> <SITE> [--home-clinic] [--records] [--pretty] [--verbose]",
            "UsageError",
        ),
    };

    let out = if pretty {
        serde_json::to_string_pretty(&resp)
    } else {
        serde_json::to_string(&resp)
    }
    .unwrap_or_else(|e| {
        json!({
            "status": "error",
            "error": {
                "category": "ADAPTER_PROTOCOL_ERROR",
                "message": format!("serialize response failed: {e}"),
                "type": "SerializeError",
            }
        })
        .to_string()
    });

    print!("{out}");
}
