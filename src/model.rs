use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcPaths {
    pub input_path: String,
    pub db_path: String,
    pub qc_report_path: String,
    pub warning_report_path: String,
    pub delete_report_path: String,
    pub delete_sql_path: String,
    pub staging_bcp_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QcCounts {
    pub data_rows: usize,
    pub add_rows: usize,
    pub delete_rows: usize,
    pub staged_rows: usize,
    pub malformed_ids: usize,
    pub fatal_sections: usize,
    pub fatal_findings: usize,
    pub warning_sections: usize,
    pub warning_findings: usize,
    pub deletes_resolved: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QcRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub updated_at: String,
    pub input_sha256: String,
    pub outcome: String,
    pub exit_code: i32,
    pub staging_table: String,
    pub paths: QcPaths,
    pub counts: QcCounts,
    pub fatal_sections: Vec<String>,
    pub warning_sections: Vec<String>,
}
