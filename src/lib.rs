pub mod address;
pub mod area_mapping;
pub mod classify;
pub mod date_parse;
pub mod home_clinic_report;
pub mod normalize;
pub mod pharmacy_report;
pub mod report_summary;
pub mod xlsx_source;

pub use area_mapping::{
    build_area_directory, build_province_names, map_address_to_area, AreaEntry, AreaMatch,
    DEFAULT_AREA_LAN, DEFAULT_AREA_TNH, UNCLASSIFIED_AREA,
};
pub use home_clinic_report::process_home_clinic;
pub use pharmacy_report::process_transactions;
pub use report_summary::{con_phai_gia_han_2026, summarize_area_report};
pub use xlsx_source::read_sheet_rows;
