use super::*;

pub const NO_HEADER_MESSAGE: &str = "!!!!No Header Line in File!!!!";
const DELETE_REPORT_TITLE: &str = "The following relationships will be deleted from the database";

/// The four output streams of a run, opened up front and flushed together.
pub struct ReportSinks {
    qc: BufWriter<File>,
    warning: BufWriter<File>,
    delete_report: BufWriter<File>,
    delete_sql: BufWriter<File>,
}

fn create_sink(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }
    let file = File::create(path)
        .with_context(|| format!("failed to create report file: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn write_sink(sink: &mut BufWriter<File>, text: &str, label: &str) -> Result<()> {
    sink.write_all(text.as_bytes())
        .with_context(|| format!("failed to write {label}"))
}

impl ReportSinks {
    pub fn create(
        qc_report: &Path,
        warning_report: &Path,
        delete_report: &Path,
        delete_sql: &Path,
    ) -> Result<Self> {
        Ok(Self {
            qc: create_sink(qc_report)?,
            warning: create_sink(warning_report)?,
            delete_report: create_sink(delete_report)?,
            delete_sql: create_sink(delete_sql)?,
        })
    }

    pub fn write_qc(&mut self, text: &str) -> Result<()> {
        write_sink(&mut self.qc, text, "QC report")
    }

    pub fn write_warning(&mut self, text: &str) -> Result<()> {
        write_sink(&mut self.warning, text, "warning report")
    }

    pub fn write_delete_report(&mut self, text: &str) -> Result<()> {
        write_sink(&mut self.delete_report, text, "delete report")
    }

    pub fn write_delete_sql(&mut self, text: &str) -> Result<()> {
        write_sink(&mut self.delete_sql, text, "delete SQL")
    }

    pub fn finish(mut self) -> Result<()> {
        self.qc.flush().context("failed to flush QC report")?;
        self.warning.flush().context("failed to flush warning report")?;
        self.delete_report
            .flush()
            .context("failed to flush delete report")?;
        self.delete_sql.flush().context("failed to flush delete SQL")?;
        Ok(())
    }
}

pub fn render_section(section: &Section, lines: &[String]) -> String {
    let layout = section.layout();

    if *section == Section::EmptyPropertyColumns {
        let mut out = format!("\n{}: \n", layout.title);
        for name in lines {
            out.push_str(&format!("    {name}\n"));
        }
        return out;
    }

    let dashes = layout
        .columns
        .iter()
        .map(|(_, width)| "-".repeat(*width))
        .collect::<Vec<String>>()
        .join("  ");

    let mut out = String::from("\n\n");
    out.push_str(&center(&layout.title, layout.center_width));
    out.push('\n');
    out.push_str(&format_columns(&layout.columns));
    out.push_str(layout.header_suffix);
    out.push('\n');
    out.push_str(&dashes);
    out.push('\n');
    out.push_str(&lines.join("\n"));
    if layout.trailing_newline {
        out.push('\n');
    }
    out
}

fn render_sections(findings: &Findings, severity: Severity) -> String {
    findings
        .sections(severity)
        .map(|(section, lines)| render_section(section, lines))
        .collect()
}

pub fn render_qc_report(findings: &Findings) -> String {
    render_sections(findings, Severity::Fatal)
}

/// Warning sections, plus the delete summary when the run is free of fatal
/// findings and at least one relationship would be deleted.
pub fn render_warning_report(findings: &Findings, plan: &DeletePlan, delete_report_path: &Path) -> String {
    let mut out = render_sections(findings, Severity::Warning);
    if deletes_enabled(findings, plan) {
        out.push_str(&format!(
            "\nProcessing the specified input file will delete {} relationship records from the database. See {} for details \n",
            plan.deletes.len(),
            delete_report_path.display()
        ));
    }
    out
}

pub fn render_delete_report(findings: &Findings, plan: &DeletePlan) -> String {
    if !deletes_enabled(findings, plan) {
        return String::new();
    }

    format!(
        "\n\n{}\n{}\n{}",
        center(DELETE_REPORT_TITLE, 60),
        "-".repeat(80),
        plan.preview().join("\n")
    )
}

pub fn render_delete_sql(findings: &Findings, plan: &DeletePlan) -> String {
    if !deletes_enabled(findings, plan) {
        return String::new();
    }

    plan.statements()
        .into_iter()
        .map(|statement| format!("{statement}\n"))
        .collect()
}

pub fn deletes_enabled(findings: &Findings, plan: &DeletePlan) -> bool {
    !plan.deletes.is_empty() && !findings.has_fatal()
}

pub fn write_reports(
    sinks: &mut ReportSinks,
    findings: &Findings,
    plan: &DeletePlan,
    delete_report_path: &Path,
) -> Result<()> {
    sinks.write_qc(&render_qc_report(findings))?;
    sinks.write_warning(&render_warning_report(findings, plan, delete_report_path))?;
    sinks.write_delete_report(&render_delete_report(findings, plan))?;
    sinks.write_delete_sql(&render_delete_sql(findings, plan))?;
    Ok(())
}
