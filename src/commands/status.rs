use std::fs;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::model::QcRunManifest;

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_path = args
        .run_manifest_path
        .clone()
        .unwrap_or_else(|| args.output_dir.join("fearqc_run.json"));

    info!(output_dir = %args.output_dir.display(), "status requested");

    if manifest_path.exists() {
        let raw = fs::read(&manifest_path)
            .with_context(|| format!("failed to read {}", manifest_path.display()))?;
        let manifest: QcRunManifest = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", manifest_path.display()))?;

        info!(
            run_id = %manifest.run_id,
            started_at = %manifest.started_at,
            updated_at = %manifest.updated_at,
            input = %manifest.paths.input_path,
            input_sha256 = %manifest.input_sha256,
            outcome = %manifest.outcome,
            exit_code = manifest.exit_code,
            data_rows = manifest.counts.data_rows,
            add_rows = manifest.counts.add_rows,
            delete_rows = manifest.counts.delete_rows,
            fatal_sections = manifest.counts.fatal_sections,
            warning_sections = manifest.counts.warning_sections,
            deletes_resolved = manifest.counts.deletes_resolved,
            qc_report = %manifest.paths.qc_report_path,
            "loaded QC run manifest"
        );
        for section in &manifest.fatal_sections {
            info!(section = %section, "fatal section");
        }
        for section in &manifest.warning_sections {
            info!(section = %section, "warning section");
        }
    } else {
        warn!(path = %manifest_path.display(), "QC run manifest missing");
    }

    let Some(db_path) = args.db_path.as_ref() else {
        return Ok(());
    };

    if db_path.exists() {
        let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        let relationships = query_count(&conn, "SELECT COUNT(*) FROM MGI_Relationship").unwrap_or(0);
        let categories =
            query_count(&conn, "SELECT COUNT(*) FROM MGI_Relationship_Category").unwrap_or(0);

        info!(
            path = %db_path.display(),
            relationships,
            categories,
            "reference database status"
        );
    } else {
        warn!(path = %db_path.display(), "reference database file missing");
    }

    Ok(())
}

fn query_count(conn: &Connection, sql: &str) -> Result<i64> {
    let count = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
