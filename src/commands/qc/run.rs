use super::*;

const MANIFEST_VERSION: u32 = 1;
const NO_HEADER_SECTION: &str = "No Header Line in File";

struct ResolvedPaths {
    input: PathBuf,
    db: PathBuf,
    qc_report: PathBuf,
    warning_report: PathBuf,
    delete_report: PathBuf,
    delete_sql: PathBuf,
    staging_bcp: PathBuf,
    manifest: PathBuf,
}

impl ResolvedPaths {
    fn from_args(args: &QcArgs) -> Self {
        let dir = &args.output_dir;
        Self {
            input: args.input.clone(),
            db: args.db_path.clone(),
            qc_report: args
                .qc_report_path
                .clone()
                .unwrap_or_else(|| dir.join("fearQC.rpt")),
            warning_report: args
                .warning_report_path
                .clone()
                .unwrap_or_else(|| dir.join("fearQC_warn.rpt")),
            delete_report: args
                .delete_report_path
                .clone()
                .unwrap_or_else(|| dir.join("fearQC_delete.rpt")),
            delete_sql: args
                .delete_sql_path
                .clone()
                .unwrap_or_else(|| dir.join("fearQC_delete.sql")),
            staging_bcp: args
                .staging_bcp_path
                .clone()
                .unwrap_or_else(|| dir.join("fearQC_mgiid.bcp")),
            manifest: args
                .run_manifest_path
                .clone()
                .unwrap_or_else(|| dir.join("fearqc_run.json")),
        }
    }

    fn manifest_paths(&self) -> QcPaths {
        QcPaths {
            input_path: self.input.display().to_string(),
            db_path: self.db.display().to_string(),
            qc_report_path: self.qc_report.display().to_string(),
            warning_report_path: self.warning_report.display().to_string(),
            delete_report_path: self.delete_report.display().to_string(),
            delete_sql_path: self.delete_sql.display().to_string(),
            staging_bcp_path: self.staging_bcp.display().to_string(),
        }
    }
}

pub fn run(args: QcArgs) -> Result<i32> {
    let started_at = now_utc_string();
    let run_id = format!("qc-{}", utc_compact_string(Utc::now()));
    let paths = ResolvedPaths::from_args(&args);
    let staging_table = StagingTable::new(&args.staging_table)?;

    let raw = fs::read_to_string(&paths.input)
        .with_context(|| format!("failed to read input file: {}", paths.input.display()))?;
    let input_sha256 = sha256_file(&paths.input)?;

    if !paths.db.is_file() {
        bail!("reference database not found: {}", paths.db.display());
    }
    let mut connection = Connection::open_with_flags(
        &paths.db,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open reference database: {}", paths.db.display()))?;

    let mut sinks = ReportSinks::create(
        &paths.qc_report,
        &paths.warning_report,
        &paths.delete_report,
        &paths.delete_sql,
    )?;

    info!(
        run_id = %run_id,
        input = %paths.input.display(),
        db = %paths.db.display(),
        "starting FeaR QC run"
    );

    let lookups = load_reference_lookups(&connection)?;

    let mut numbered = raw.lines().enumerate().map(|(index, line)| (index + 1, line));
    let header_line = numbered.next().map(|(_, line)| line).unwrap_or("");
    let data_rows = numbered
        .filter(|(_, line)| !line.trim().is_empty())
        .collect::<Vec<(usize, &str)>>();

    let mut findings = Findings::default();
    let mut counts = QcCounts::default();
    let mut plan = DeletePlan::default();

    let outcome = match parse_header(header_line, &lookups) {
        Err(HeaderError::Missing) => {
            warn!("input has no header line");
            sinks.write_qc(NO_HEADER_MESSAGE)?;
            QcOutcome::Fatal
        }
        Err(HeaderError::InvalidProperties(problems)) => {
            findings.extend(problems);
            write_reports(&mut sinks, &findings, &plan, &paths.delete_report)?;
            findings.outcome()
        }
        Ok(layout) => {
            plan = run_checks(
                &mut connection,
                &staging_table,
                &paths,
                &lookups,
                &layout,
                &data_rows,
                &mut findings,
                &mut counts,
            )?;
            write_reports(&mut sinks, &findings, &plan, &paths.delete_report)?;
            findings.outcome()
        }
    };
    sinks.finish()?;

    let (fatal_sections, fatal_findings) = findings.count(Severity::Fatal);
    let (warning_sections, warning_findings) = findings.count(Severity::Warning);
    counts.fatal_sections = fatal_sections;
    counts.fatal_findings = fatal_findings;
    counts.warning_sections = warning_sections;
    counts.warning_findings = warning_findings;
    counts.deletes_resolved = plan.deletes.len();

    let mut fatal_titles = findings
        .sections(Severity::Fatal)
        .map(|(section, _)| section.title())
        .collect::<Vec<String>>();
    if outcome == QcOutcome::Fatal && fatal_titles.is_empty() {
        counts.fatal_sections = 1;
        counts.fatal_findings = 1;
        fatal_titles.push(NO_HEADER_SECTION.to_string());
    }

    let manifest = QcRunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id,
        started_at,
        updated_at: now_utc_string(),
        input_sha256,
        outcome: outcome.as_str().to_string(),
        exit_code: outcome.exit_code(),
        staging_table: args.staging_table.clone(),
        paths: paths.manifest_paths(),
        counts,
        fatal_sections: fatal_titles,
        warning_sections: findings
            .sections(Severity::Warning)
            .map(|(section, _)| section.title())
            .collect(),
    };
    write_json_pretty(&paths.manifest, &manifest)?;

    info!(
        outcome = outcome.as_str(),
        fatal_sections = manifest.counts.fatal_sections,
        warning_sections = manifest.counts.warning_sections,
        deletes = manifest.counts.deletes_resolved,
        qc_report = %paths.qc_report.display(),
        manifest = %paths.manifest.display(),
        "FeaR QC run complete"
    );

    Ok(outcome.exit_code())
}

#[allow(clippy::too_many_arguments)]
fn run_checks(
    connection: &mut Connection,
    table: &StagingTable,
    paths: &ResolvedPaths,
    lookups: &ReferenceLookups,
    layout: &HeaderLayout,
    data_rows: &[(usize, &str)],
    findings: &mut Findings,
    counts: &mut QcCounts,
) -> Result<DeletePlan> {
    let parser = MgiIdParser::new()?;

    // Short lines are reported by the row scan and carry nothing to stage.
    let staging = materialize(
        data_rows
            .iter()
            .map(|&(_, line)| line)
            .filter(|line| InputRow::parse(line).is_some()),
        lookups,
        &parser,
    )?;
    write_side_file(&paths.staging_bcp, &staging)?;
    counts.staged_rows = bulk_load(connection, table, &paths.staging_bcp)?;
    findings.extend(staging.bad_id_findings());
    counts.malformed_ids = findings.lines(&Section::InvalidMgiIds).len();

    info!(
        staged_rows = counts.staged_rows,
        malformed_ids = counts.malformed_ids,
        table = %table,
        "staged organizer/participant ids"
    );

    findings.merge(validate_identities(connection, table, lookups)?);

    let ctx = RowContext { lookups, layout };
    let scan = scan_rows(&ctx, data_rows.iter().copied());
    counts.data_rows = scan.data_rows;
    counts.add_rows = scan.add_rows;
    counts.delete_rows = scan.delete_rows;
    findings.merge(scan.findings);

    for name in empty_property_columns(layout, &scan.populated) {
        findings.push(Section::EmptyPropertyColumns, name);
    }

    resolve_deletes(connection, &scan.deletes, findings)
}
