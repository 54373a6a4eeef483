use super::*;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Action {
    Add,
    Delete,
}

impl Action {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "add" => Some(Self::Add),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// One data line split into its fixed columns. Symbol, name and note
/// columns are informational and not kept.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InputRow<'a> {
    pub action: &'a str,
    pub category: &'a str,
    pub organizer_id: &'a str,
    pub relationship_id: &'a str,
    pub participant_id: &'a str,
    pub qualifier: &'a str,
    pub evidence: &'a str,
    pub reference: &'a str,
    pub creator: &'a str,
    pub tail: Vec<&'a str>,
}

impl<'a> InputRow<'a> {
    /// `None` when the line is shorter than the fixed columns.
    pub fn parse(line: &'a str) -> Option<Self> {
        let fields = line.split(TAB).map(str::trim).collect::<Vec<&str>>();
        if fields.len() < NUM_NON_PROPERTY_COLUMNS {
            return None;
        }

        Some(Self {
            action: fields[0],
            category: fields[1],
            organizer_id: fields[2],
            relationship_id: fields[4],
            participant_id: fields[6],
            qualifier: fields[8],
            evidence: fields[9],
            reference: fields[10],
            creator: fields[11],
            tail: fields[NUM_NON_PROPERTY_COLUMNS..].to_vec(),
        })
    }

    pub fn property_value(&self, layout: &HeaderLayout, name: &str) -> &'a str {
        layout
            .property(name)
            .and_then(|column| self.tail.get(column.tail_index).copied())
            .unwrap_or("")
    }
}

/// Parses a `score` value. One leading sign is stripped before parsing and
/// re-applied afterwards; on failure the stripped text is returned.
pub fn parse_score(raw: &str) -> Result<f64, String> {
    let (sign, digits) = if let Some(rest) = raw.strip_prefix('+') {
        (1.0, rest)
    } else if let Some(rest) = raw.strip_prefix('-') {
        (-1.0, rest)
    } else {
        (1.0, raw)
    };

    digits
        .parse::<f64>()
        .map(|value| sign * value)
        .map_err(|_| digits.to_string())
}

/// Everything a delete row needs to find its relationships, with the
/// reference keys already resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct DeleteRequest {
    pub line_number: usize,
    pub line: String,
    pub category: Category,
    pub organizer_id: String,
    pub participant_id: String,
    pub relationship: RelationshipTerm,
    pub qualifier: String,
    pub qualifier_key: i64,
    pub evidence: String,
    pub evidence_key: i64,
    pub reference: String,
    pub reference_key: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RowVerdict {
    Accepted,
    Rejected(Vec<Finding>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassifiedRow {
    pub action: Option<Action>,
    pub verdict: RowVerdict,
    pub warnings: Vec<Finding>,
    pub populated_properties: Vec<String>,
    pub delete: Option<DeleteRequest>,
}

impl ClassifiedRow {
    fn new() -> Self {
        Self {
            action: None,
            verdict: RowVerdict::Accepted,
            warnings: Vec::new(),
            populated_properties: Vec::new(),
            delete: None,
        }
    }

    fn finish(mut self, fatal: Vec<Finding>) -> Self {
        if !fatal.is_empty() {
            self.verdict = RowVerdict::Rejected(fatal);
        }
        self
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self.verdict, RowVerdict::Accepted)
    }
}

pub struct RowContext<'a> {
    pub lookups: &'a ReferenceLookups,
    pub layout: &'a HeaderLayout,
}

fn row_finding(section: Section, line_number: usize, value: &str) -> Finding {
    Finding::new(section, line_value_row(line_number, value))
}

fn expresses_component_finding(section: Section, line_number: usize, value: &str, reason: &str) -> Finding {
    Finding::new(
        section,
        format_columns(&[(line_number.to_string().as_str(), 12), (value, 20), (reason, 40)]),
    )
}

/// Classifies one data line against the in-memory lookups. Reported values
/// are the trimmed, lower-cased input text.
pub fn classify_row(ctx: &RowContext<'_>, line_number: usize, line: &str) -> ClassifiedRow {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut classified = ClassifiedRow::new();
    let mut fatal = Vec::new();

    let row = match InputRow::parse(line) {
        Some(row) if row.tail.len() + NUM_NON_PROPERTY_COLUMNS >= ctx.layout.column_count => row,
        _ => {
            fatal.push(row_finding(Section::MissingPropertyColumns, line_number, line));
            return classified.finish(fatal);
        }
    };

    classified.populated_properties = ctx
        .layout
        .properties
        .iter()
        .filter(|column| row.tail.get(column.tail_index).is_some_and(|value| !value.is_empty()))
        .map(|column| column.name.clone())
        .collect();

    let action = Action::parse(row.action);
    if action.is_none() {
        fatal.push(row_finding(Section::InvalidAction, line_number, &row.action.to_lowercase()));
    }
    classified.action = action;

    let Some(category) = ctx.lookups.category(row.category) else {
        fatal.push(row_finding(Section::InvalidCategory, line_number, &row.category.to_lowercase()));
        return classified.finish(fatal);
    };

    let qualifier = if row.qualifier.is_empty() {
        DEFAULT_QUALIFIER.to_string()
    } else {
        row.qualifier.to_lowercase()
    };
    let qualifier_key = ctx.lookups.qualifier_key(&qualifier);
    if qualifier_key.is_none() {
        fatal.push(row_finding(Section::InvalidQualifier, line_number, &qualifier));
    }

    let evidence = row.evidence.to_lowercase();
    let evidence_key = ctx.lookups.evidence_key(&evidence);
    if evidence_key.is_none() {
        fatal.push(row_finding(Section::InvalidEvidence, line_number, &evidence));
    }

    let reference = row.reference.to_lowercase();
    let reference_key = ctx.lookups.reference_key(&reference);
    if reference_key.is_none() {
        fatal.push(row_finding(Section::InvalidReference, line_number, &reference));
    }

    let creator = row.creator.to_lowercase();
    if ctx.lookups.user_key(&creator).is_none() {
        fatal.push(row_finding(Section::InvalidUser, line_number, &creator));
    }

    let relationship_id = row.relationship_id.to_lowercase();
    let relationship = ctx.lookups.relationship(&relationship_id);
    match relationship {
        None => fatal.push(row_finding(Section::InvalidRelationshipId, line_number, &relationship_id)),
        Some(term) => {
            if term.is_obsolete {
                fatal.push(row_finding(Section::ObsoleteRelationshipId, line_number, &relationship_id));
            }
            if term.vocab_key != category.relationship_vocab_key {
                fatal.push(row_finding(Section::RelationshipVocabMismatch, line_number, &relationship_id));
            }
            if term.dag_key != category.relationship_dag_key {
                fatal.push(row_finding(Section::RelationshipDagMismatch, line_number, &relationship_id));
            }
        }
    }

    match action {
        Some(Action::Add) => {
            check_score(ctx, &row, line_number, &mut fatal);
            if let Some(term) = relationship.filter(|_| category.is_expresses_component()) {
                let row_keys = ExpressesComponentRow {
                    row: &row,
                    line,
                    term,
                    qualifier: &qualifier,
                    evidence: &evidence,
                    line_number,
                };
                check_expresses_component(ctx, &row_keys, &mut fatal, &mut classified.warnings);
            }
        }
        Some(Action::Delete) if fatal.is_empty() => {
            if let (Some(term), Some(qualifier_key), Some(evidence_key), Some(reference_key)) =
                (relationship, qualifier_key, evidence_key, reference_key)
            {
                classified.delete = Some(DeleteRequest {
                    line_number,
                    line: line.trim().to_string(),
                    category: category.clone(),
                    organizer_id: row.organizer_id.to_string(),
                    participant_id: row.participant_id.to_string(),
                    relationship: term.clone(),
                    qualifier,
                    qualifier_key,
                    evidence,
                    evidence_key,
                    reference,
                    reference_key,
                });
            }
        }
        _ => {}
    }

    classified.finish(fatal)
}

fn check_score(ctx: &RowContext<'_>, row: &InputRow<'_>, line_number: usize, fatal: &mut Vec<Finding>) {
    for column in &ctx.layout.properties {
        if !column.name.eq_ignore_ascii_case(PROPERTY_SCORE) {
            continue;
        }
        let value = row.tail.get(column.tail_index).copied().unwrap_or("");
        if value.is_empty() {
            continue;
        }
        if let Err(stripped) = parse_score(value) {
            fatal.push(Finding::new(
                Section::InvalidPropertyValue,
                format!(
                    "{:<12}   {}",
                    line_number,
                    format_columns(&[(column.name.as_str(), 20), (stripped.as_str(), 20)])
                ),
            ));
        }
    }
}

struct ExpressesComponentRow<'r, 'a> {
    row: &'r InputRow<'a>,
    line: &'r str,
    term: &'r RelationshipTerm,
    qualifier: &'r str,
    evidence: &'r str,
    line_number: usize,
}

fn check_expresses_component(
    ctx: &RowContext<'_>,
    entry: &ExpressesComponentRow<'_, '_>,
    fatal: &mut Vec<Finding>,
    warnings: &mut Vec<Finding>,
) {
    let row = entry.row;
    let line_number = entry.line_number;
    let organism = row.property_value(ctx.layout, PROPERTY_NON_MOUSE_ORGANISM);
    let gene_symbol = row.property_value(ctx.layout, PROPERTY_NON_MOUSE_GENE_SYMBOL);
    let gene_id = row.property_value(ctx.layout, PROPERTY_NON_MOUSE_GENE_ID);

    let term = entry.term.term.trim().to_lowercase().replace(' ', "_");
    if term == TERM_EXPRESSES_ORTHOLOGOUS_GENE {
        for (name, value) in [
            (PROPERTY_NON_MOUSE_ORGANISM, organism),
            (PROPERTY_NON_MOUSE_GENE_SYMBOL, gene_symbol),
        ] {
            if value.is_empty() {
                fatal.push(expresses_component_finding(
                    Section::InvalidExpressesComponent,
                    line_number,
                    name,
                    "Required for expresses_an_orthologous_gene",
                ));
            }
        }
        if gene_id.is_empty() {
            warnings.push(expresses_component_finding(
                Section::ExpressesComponentWarning,
                line_number,
                PROPERTY_NON_MOUSE_GENE_ID,
                "Missing for expresses_an_orthologous_gene",
            ));
        }
    } else if term == TERM_EXPRESSES_MOUSE_GENE {
        for (name, value) in [
            (PROPERTY_NON_MOUSE_ORGANISM, organism),
            (PROPERTY_NON_MOUSE_GENE_SYMBOL, gene_symbol),
            (PROPERTY_NON_MOUSE_GENE_ID, gene_id),
        ] {
            if !value.is_empty() {
                fatal.push(expresses_component_finding(
                    Section::InvalidExpressesComponent,
                    line_number,
                    name,
                    "Must be empty for expresses_mouse_gene",
                ));
            }
        }
    }

    // Only cross-check the symbol on rows that are otherwise clean.
    if !gene_id.is_empty() && fatal.is_empty() && warnings.is_empty() {
        match ctx.lookups.external_symbol(gene_id) {
            None => warnings.push(expresses_component_finding(
                Section::ExpressesComponentWarning,
                line_number,
                gene_id,
                "NCBI gene ID not found",
            )),
            Some(symbol) if symbol != gene_symbol => warnings.push(expresses_component_finding(
                Section::ExpressesComponentWarning,
                line_number,
                gene_id,
                &format!("Symbol {gene_symbol} does not match {symbol}"),
            )),
            Some(_) => {}
        }
    }

    let key = ExpressesComponentKey::new(
        row.organizer_id,
        row.relationship_id,
        row.participant_id,
        entry.qualifier,
        entry.evidence,
        organism,
        gene_symbol,
        gene_id,
    );
    if ctx.lookups.expresses_component_keys.contains(&key) {
        fatal.push(Finding::new(
            Section::DuplicateExpressesComponent,
            format_columns(&[(line_number.to_string().as_str(), 12), (entry.line.trim(), 68)]),
        ));
    }
}

/// Per-run totals from classifying every data row.
#[derive(Debug, Default)]
pub struct RowScan {
    pub findings: Findings,
    pub deletes: Vec<DeleteRequest>,
    pub populated: HashSet<String>,
    pub data_rows: usize,
    pub add_rows: usize,
    pub delete_rows: usize,
    pub rejected_rows: usize,
}

pub fn scan_rows<'a, I>(ctx: &RowContext<'_>, rows: I) -> RowScan
where
    I: IntoIterator<Item = (usize, &'a str)>,
{
    let mut scan = RowScan::default();

    for (line_number, line) in rows {
        let classified = classify_row(ctx, line_number, line);
        let accepted = classified.is_accepted();
        scan.data_rows += 1;
        match classified.action {
            Some(Action::Add) => scan.add_rows += 1,
            Some(Action::Delete) => scan.delete_rows += 1,
            None => {}
        }

        scan.populated.extend(classified.populated_properties);
        scan.findings.extend(classified.warnings);
        if !accepted {
            scan.rejected_rows += 1;
        }
        if let RowVerdict::Rejected(fatal) = classified.verdict {
            scan.findings.extend(fatal);
        }
        if let Some(request) = classified.delete {
            scan.deletes.push(request);
        }
    }

    info!(
        rows = scan.data_rows,
        adds = scan.add_rows,
        deletes = scan.delete_rows,
        rejected = scan.rejected_rows,
        "classified data rows"
    );

    scan
}

/// Declared property columns that never held a value, in header order.
pub fn empty_property_columns(layout: &HeaderLayout, populated: &HashSet<String>) -> Vec<String> {
    layout
        .properties
        .iter()
        .filter(|column| !populated.contains(&column.name))
        .map(|column| column.name.clone())
        .collect()
}
