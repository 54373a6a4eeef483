use super::*;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Severity {
    Fatal,
    Warning,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum IdentityKind {
    Invalid,
    Secondary,
}

/// Report sections. Declaration order is report order.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Section {
    InvalidPropertyHeaders,
    InvalidMgiIds,
    Identity(String, IdentityKind),
    InvalidAction,
    InvalidCategory,
    InvalidQualifier,
    InvalidEvidence,
    InvalidReference,
    InvalidUser,
    InvalidRelationshipId,
    ObsoleteRelationshipId,
    RelationshipVocabMismatch,
    RelationshipDagMismatch,
    InvalidPropertyValue,
    MissingPropertyColumns,
    InvalidExpressesComponent,
    DeleteNotInDatabase,
    DuplicateExpressesComponent,
    ChromosomeMismatch(String),
    ExpressesComponentWarning,
    EmptyPropertyColumns,
}

pub struct SectionLayout {
    pub title: String,
    pub center_width: usize,
    pub columns: Vec<(&'static str, usize)>,
    /// Appended to the column header before its newline.
    pub header_suffix: &'static str,
    pub trailing_newline: bool,
}

const LINE_VALUE_COLUMNS: [(&str, usize); 2] = [("Line#", 12), ("", 20)];

impl Section {
    pub fn severity(&self) -> Severity {
        match self {
            Self::ChromosomeMismatch(_) | Self::ExpressesComponentWarning | Self::EmptyPropertyColumns => {
                Severity::Warning
            }
            _ => Severity::Fatal,
        }
    }

    pub fn title(&self) -> String {
        match self {
            Self::InvalidPropertyHeaders => "Invalid Properties".to_string(),
            Self::InvalidMgiIds => "Invalid MGI IDs".to_string(),
            Self::Identity(pair, IdentityKind::Invalid) => format!("Invalid {pair} Relationships"),
            Self::Identity(pair, IdentityKind::Secondary) => {
                format!("Secondary MGI IDs used in {pair} Relationships")
            }
            Self::InvalidAction => "Invalid Action Values".to_string(),
            Self::InvalidCategory => "Invalid Categories".to_string(),
            Self::InvalidQualifier => "Invalid Qualifiers".to_string(),
            Self::InvalidEvidence => "Invalid Evidence Codes".to_string(),
            Self::InvalidReference => "Invalid J Numbers".to_string(),
            Self::InvalidUser => "Invalid User Login".to_string(),
            Self::InvalidRelationshipId => "Invalid Relationship IDs".to_string(),
            Self::ObsoleteRelationshipId => "Obsolete Relationship IDs".to_string(),
            Self::RelationshipVocabMismatch => {
                "Relationship Vocab not the  same as Category Vocab".to_string()
            }
            Self::RelationshipDagMismatch => "Relationship DAG not the same as Category DAG".to_string(),
            Self::InvalidPropertyValue => "Invalid Property Values".to_string(),
            Self::MissingPropertyColumns => "Lines with Missing Property Columns".to_string(),
            Self::InvalidExpressesComponent => "Invalid expresses_component Properties".to_string(),
            Self::DeleteNotInDatabase => "Deletes not in Database".to_string(),
            Self::DuplicateExpressesComponent => {
                "Duplicate expresses_component Relationships".to_string()
            }
            Self::ChromosomeMismatch(pair) => format!("Mismatched chromosome in {pair} Relationships"),
            Self::ExpressesComponentWarning => "expresses_component Warnings".to_string(),
            Self::EmptyPropertyColumns => "Property Columns with no Data".to_string(),
        }
    }

    pub fn layout(&self) -> SectionLayout {
        let line_value = |label: &'static str| {
            let mut columns = LINE_VALUE_COLUMNS.to_vec();
            columns[1].0 = label;
            columns
        };

        let (center_width, columns, trailing_newline) = match self {
            Self::InvalidPropertyHeaders => (
                60,
                vec![("Line#", 12), ("Property Header", 20), ("Reason", 20)],
                false,
            ),
            Self::InvalidMgiIds => (
                40,
                vec![("MGI ID", 15), ("Organizer or Participant?", 25)],
                false,
            ),
            Self::Identity(_, IdentityKind::Invalid) => (
                80,
                vec![("MGI ID", 12), ("Object Type", 20), ("Status", 20), ("Reason", 30)],
                false,
            ),
            Self::Identity(_, IdentityKind::Secondary) => (
                80,
                vec![
                    ("2ndary MGI ID", 12),
                    ("Symbol", 20),
                    ("Primary MGI ID", 20),
                    ("Organizer or Participant?", 28),
                ],
                true,
            ),
            Self::InvalidAction => (60, line_value("Action"), false),
            Self::InvalidCategory => (60, line_value("Category"), false),
            Self::InvalidQualifier => (60, line_value("Qualifier"), false),
            Self::InvalidEvidence => (60, line_value("Evidence Code"), false),
            Self::InvalidReference => (60, line_value("J Number"), false),
            Self::InvalidUser => (60, line_value("User Login"), false),
            Self::InvalidRelationshipId
            | Self::ObsoleteRelationshipId
            | Self::RelationshipVocabMismatch
            | Self::RelationshipDagMismatch => (60, line_value("Relationship ID"), false),
            Self::InvalidPropertyValue => (
                60,
                vec![("Line#", 12), ("Property", 20), ("Value", 20)],
                false,
            ),
            Self::MissingPropertyColumns => (60, line_value("Line"), false),
            Self::InvalidExpressesComponent | Self::ExpressesComponentWarning => (
                60,
                vec![("Line#", 12), ("Value", 20), ("Reason", 40)],
                false,
            ),
            Self::DeleteNotInDatabase | Self::DuplicateExpressesComponent => {
                (60, vec![("Line#", 12), ("Line", 68)], false)
            }
            Self::ChromosomeMismatch(_) => (
                80,
                vec![
                    ("Organizer MGI ID", 20),
                    ("Organizer chromosome", 20),
                    ("Participant MGI ID", 20),
                    ("Participant chromosome", 20),
                ],
                true,
            ),
            Self::EmptyPropertyColumns => (0, Vec::new(), true),
        };

        let header_suffix = match self {
            Self::DeleteNotInDatabase => " ",
            _ => "",
        };

        SectionLayout {
            title: self.title(),
            center_width,
            columns,
            header_suffix,
            trailing_newline,
        }
    }
}

/// Left-justifies each value in its column width and joins with two spaces.
pub fn format_columns(values: &[(&str, usize)]) -> String {
    values
        .iter()
        .map(|&(value, width)| format!("{value:<width$}"))
        .collect::<Vec<String>>()
        .join("  ")
}

/// `Line#` plus one value, the shape most row-level sections use.
pub fn line_value_row(line_number: usize, value: &str) -> String {
    format_columns(&[(line_number.to_string().as_str(), 12), (value, 20)])
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Finding {
    pub section: Section,
    pub line: String,
}

impl Finding {
    pub fn new(section: Section, line: String) -> Self {
        Self { section, line }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum QcOutcome {
    Clean,
    Warnings,
    Fatal,
}

impl QcOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Warnings => "warnings",
            Self::Fatal => "fatal",
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            Self::Clean | Self::Warnings => 0,
            Self::Fatal => 2,
        }
    }
}

/// Everything a run found, keyed by report section. Each stage adds to one
/// instance and the report writer consumes it.
#[derive(Debug, Default, Clone)]
pub struct Findings {
    sections: BTreeMap<Section, Vec<String>>,
}

impl Findings {
    pub fn push(&mut self, section: Section, line: String) {
        self.sections.entry(section).or_default().push(line);
    }

    pub fn add(&mut self, finding: Finding) {
        self.push(finding.section, finding.line);
    }

    pub fn extend<I>(&mut self, findings: I)
    where
        I: IntoIterator<Item = Finding>,
    {
        for finding in findings {
            self.add(finding);
        }
    }

    pub fn merge(&mut self, other: Findings) {
        for (section, lines) in other.sections {
            self.sections.entry(section).or_default().extend(lines);
        }
    }

    pub fn lines(&self, section: &Section) -> &[String] {
        self.sections.get(section).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn sections(&self, severity: Severity) -> impl Iterator<Item = (&Section, &Vec<String>)> {
        self.sections
            .iter()
            .filter(move |(section, lines)| section.severity() == severity && !lines.is_empty())
    }

    pub fn has_fatal(&self) -> bool {
        self.sections(Severity::Fatal).next().is_some()
    }

    pub fn has_warnings(&self) -> bool {
        self.sections(Severity::Warning).next().is_some()
    }

    pub fn count(&self, severity: Severity) -> (usize, usize) {
        self.sections(severity)
            .fold((0, 0), |(sections, lines), (_, found)| (sections + 1, lines + found.len()))
    }

    pub fn outcome(&self) -> QcOutcome {
        if self.has_fatal() {
            QcOutcome::Fatal
        } else if self.has_warnings() {
            QcOutcome::Warnings
        } else {
            QcOutcome::Clean
        }
    }
}
