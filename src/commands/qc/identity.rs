use super::*;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum IssueKind {
    DoesNotExist,
    WrongType,
    InvalidStatus,
}

/// One failed organizer/participant identity check. Field order drives
/// report order: failure kind, role, then numeric id.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct IdentityIssue {
    pub kind: IssueKind,
    pub role: Role,
    pub numeric_id: i64,
    pub object_type: String,
    pub status: String,
    pub expected_type: String,
}

impl IdentityIssue {
    pub fn reason(&self) -> String {
        let role = self.role.as_str();
        let expected = self.expected_type.to_lowercase();
        match self.kind {
            IssueKind::DoesNotExist => format!("{role} does not exist"),
            IssueKind::WrongType => format!("{role} exists for non-{expected}"),
            IssueKind::InvalidStatus => format!("{role} {expected} status is invalid"),
        }
    }

    pub fn report_line(&self) -> String {
        format_columns(&[
            (format!("MGI:{}", self.numeric_id).as_str(), 12),
            (self.object_type.as_str(), 20),
            (self.status.as_str(), 20),
            (self.reason().as_str(), 30),
        ])
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct SecondaryId {
    pub role: Role,
    pub numeric_id: i64,
    pub symbol: String,
    pub primary_id: String,
}

impl SecondaryId {
    pub fn report_line(&self) -> String {
        format_columns(&[
            (format!("MGI:{}", self.numeric_id).as_str(), 12),
            (self.symbol.as_str(), 20),
            (self.primary_id.as_str(), 20),
            (self.role.as_str(), 28),
        ])
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct ChromosomeMismatch {
    pub organizer_id: i64,
    pub participant_id: i64,
    pub organizer_chromosome: String,
    pub participant_chromosome: String,
}

impl ChromosomeMismatch {
    pub fn report_line(&self) -> String {
        format_columns(&[
            (format!("MGI:{}", self.organizer_id).as_str(), 20),
            (self.organizer_chromosome.as_str(), 20),
            (format!("MGI:{}", self.participant_id).as_str(), 20),
            (self.participant_chromosome.as_str(), 20),
        ])
    }
}

pub struct ObjectTable {
    pub table: &'static str,
    pub key_column: &'static str,
}

pub fn object_table(type_key: i64) -> Option<ObjectTable> {
    match type_key {
        MGI_TYPE_ALLELE => Some(ObjectTable {
            table: "ALL_Allele",
            key_column: "_Allele_key",
        }),
        MGI_TYPE_MARKER => Some(ObjectTable {
            table: "MRK_Marker",
            key_column: "_Marker_key",
        }),
        _ => None,
    }
}

/// X pairs with XY and Y pairs with XY, in either direction.
pub fn chromosomes_compatible(organizer: &str, participant: &str) -> bool {
    let organizer = organizer.trim().to_uppercase();
    let participant = participant.trim().to_uppercase();
    organizer == participant
        || matches!(
            (organizer.as_str(), participant.as_str()),
            ("X", "XY") | ("XY", "X") | ("Y", "XY") | ("XY", "Y")
        )
}

/// Runs the set-based identity, status, secondary-id and chromosome checks
/// against the staged table for every category type pair.
pub fn validate_identities(
    connection: &Connection,
    table: &StagingTable,
    lookups: &ReferenceLookups,
) -> Result<Findings> {
    let table = table.as_str();
    let mut findings = Findings::default();

    for pair in lookups.entity_pairs() {
        let label = pair.label();

        let mut issues = BTreeSet::new();
        let mut secondary = BTreeSet::new();
        for role in [Role::Organizer, Role::Participant] {
            let scope = RoleScope::new(table, &pair, role, lookups);
            issues.extend(query_missing(connection, &scope)?);
            issues.extend(query_wrong_type(connection, &scope)?);
            issues.extend(query_invalid_status(connection, &scope)?);
            secondary.extend(query_secondary(connection, &scope)?);
        }

        info!(
            pair = %label,
            invalid = issues.len(),
            secondary = secondary.len(),
            "identity checks complete"
        );

        for issue in &issues {
            findings.push(
                Section::Identity(label.clone(), IdentityKind::Invalid),
                issue.report_line(),
            );
        }
        for entry in &secondary {
            findings.push(
                Section::Identity(label.clone(), IdentityKind::Secondary),
                entry.report_line(),
            );
        }

        if pair.is_allele_marker() {
            let mismatches = query_chromosome_mismatches(connection, table, &pair)?;
            if !mismatches.is_empty() {
                warn!(pair = %label, count = mismatches.len(), "chromosome mismatches found");
            }
            for mismatch in &mismatches {
                findings.push(Section::ChromosomeMismatch(label.clone()), mismatch.report_line());
            }
        }
    }

    Ok(findings)
}

struct RoleScope<'a> {
    table: &'a str,
    role: Role,
    id_column: &'static str,
    organizer_type_key: i64,
    participant_type_key: i64,
    expected_type_key: i64,
    expected_type: String,
}

impl<'a> RoleScope<'a> {
    fn new(table: &'a str, pair: &EntityPair, role: Role, lookups: &ReferenceLookups) -> Self {
        let (id_column, expected_type_key) = match role {
            Role::Organizer => ("mgiID1", pair.organizer_type_key),
            Role::Participant => ("mgiID2", pair.participant_type_key),
        };
        Self {
            table,
            role,
            id_column,
            organizer_type_key: pair.organizer_type_key,
            participant_type_key: pair.participant_type_key,
            expected_type_key,
            expected_type: lookups.entity_type_name(expected_type_key),
        }
    }

    fn issue(&self, kind: IssueKind, numeric_id: i64, object_type: String, status: String) -> IdentityIssue {
        IdentityIssue {
            kind,
            role: self.role,
            numeric_id,
            object_type,
            status,
            expected_type: self.expected_type.clone(),
        }
    }
}

fn query_missing(connection: &Connection, scope: &RoleScope<'_>) -> Result<Vec<IdentityIssue>> {
    let sql = format!(
        "
        SELECT DISTINCT tmp.{id}
        FROM {table} tmp
        WHERE tmp.mgiID1TypeKey = ?1
          AND tmp.mgiID2TypeKey = ?2
          AND tmp.{id} > 0
          AND NOT EXISTS (
            SELECT 1 FROM ACC_Accession a
            WHERE a.numericPart = tmp.{id}
              AND a.prefixPart = 'MGI:'
          )
        ORDER BY tmp.{id}
        ",
        id = scope.id_column,
        table = scope.table,
    );

    let mut statement = connection.prepare(&sql)?;
    let mut rows = statement.query(params![scope.organizer_type_key, scope.participant_type_key])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(scope.issue(IssueKind::DoesNotExist, row.get(0)?, String::new(), String::new()));
    }

    Ok(out)
}

fn query_wrong_type(connection: &Connection, scope: &RoleScope<'_>) -> Result<Vec<IdentityIssue>> {
    let sql = format!(
        "
        SELECT DISTINCT tmp.{id}, t.name
        FROM {table} tmp
        JOIN ACC_Accession a1 ON a1.numericPart = tmp.{id}
          AND a1.prefixPart = 'MGI:'
          AND a1._LogicalDB_key = ?4
          AND a1._MGIType_key != ?3
        JOIN ACC_MGIType t ON t._MGIType_key = a1._MGIType_key
        WHERE tmp.mgiID1TypeKey = ?1
          AND tmp.mgiID2TypeKey = ?2
          AND tmp.{id} > 0
          AND NOT EXISTS (
            SELECT 1 FROM ACC_Accession a2
            WHERE a2.numericPart = tmp.{id}
              AND a2.prefixPart = 'MGI:'
              AND a2._LogicalDB_key = ?4
              AND a2._MGIType_key = ?3
          )
        ORDER BY tmp.{id}
        ",
        id = scope.id_column,
        table = scope.table,
    );

    let mut statement = connection.prepare(&sql)?;
    let mut rows = statement.query(params![
        scope.organizer_type_key,
        scope.participant_type_key,
        scope.expected_type_key,
        LOGICAL_DB_MGI,
    ])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(scope.issue(IssueKind::WrongType, row.get(0)?, row.get(1)?, String::new()));
    }

    Ok(out)
}

fn query_invalid_status(connection: &Connection, scope: &RoleScope<'_>) -> Result<Vec<IdentityIssue>> {
    let status_join = match scope.expected_type_key {
        MGI_TYPE_ALLELE => {
            let accepted = ALLELE_ACCEPTED_STATUS_KEYS
                .iter()
                .map(i64::to_string)
                .collect::<Vec<String>>()
                .join(",");
            format!(
                "
                JOIN ALL_Allele o ON o._Allele_key = a._Object_key
                JOIN VOC_Term s ON s._Term_key = o._Allele_Status_key
                WHERE o._Allele_Status_key NOT IN ({accepted})
                "
            )
        }
        MGI_TYPE_MARKER => format!(
            "
            JOIN MRK_Marker o ON o._Marker_key = a._Object_key
            JOIN MRK_Status s ON s._Marker_Status_key = o._Marker_Status_key
            WHERE o._Marker_Status_key != {MARKER_STATUS_OFFICIAL}
            "
        ),
        _ => return Ok(Vec::new()),
    };
    let status_column = if scope.expected_type_key == MGI_TYPE_ALLELE {
        "s.term"
    } else {
        "s.status"
    };

    let sql = format!(
        "
        SELECT DISTINCT tmp.{id}, t.name, {status_column}
        FROM {table} tmp
        JOIN ACC_Accession a ON a.numericPart = tmp.{id}
          AND a.prefixPart = 'MGI:'
          AND a._LogicalDB_key = ?4
          AND a._MGIType_key = ?3
        JOIN ACC_MGIType t ON t._MGIType_key = a._MGIType_key
        {status_join}
          AND tmp.mgiID1TypeKey = ?1
          AND tmp.mgiID2TypeKey = ?2
          AND tmp.{id} > 0
        ORDER BY tmp.{id}
        ",
        id = scope.id_column,
        table = scope.table,
    );

    let mut statement = connection.prepare(&sql)?;
    let mut rows = statement.query(params![
        scope.organizer_type_key,
        scope.participant_type_key,
        scope.expected_type_key,
        LOGICAL_DB_MGI,
    ])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(scope.issue(IssueKind::InvalidStatus, row.get(0)?, row.get(1)?, row.get(2)?));
    }

    Ok(out)
}

fn query_secondary(connection: &Connection, scope: &RoleScope<'_>) -> Result<Vec<SecondaryId>> {
    let (symbol_column, symbol_join) = match object_table(scope.expected_type_key) {
        Some(object) => (
            "o.symbol",
            format!(
                "JOIN {table} o ON o.{key} = a2._Object_key",
                table = object.table,
                key = object.key_column
            ),
        ),
        None => ("''", String::new()),
    };

    let sql = format!(
        "
        SELECT DISTINCT tmp.{id}, {symbol_column}, a2.accID
        FROM {table} tmp
        JOIN ACC_Accession a1 ON a1.numericPart = tmp.{id}
          AND a1.prefixPart = 'MGI:'
          AND a1._MGIType_key = ?3
          AND a1._LogicalDB_key = ?4
          AND a1.preferred = 0
        JOIN ACC_Accession a2 ON a2._Object_key = a1._Object_key
          AND a2.prefixPart = 'MGI:'
          AND a2._MGIType_key = ?3
          AND a2._LogicalDB_key = ?4
          AND a2.preferred = 1
        {symbol_join}
        WHERE tmp.mgiID1TypeKey = ?1
          AND tmp.mgiID2TypeKey = ?2
          AND tmp.{id} > 0
        ORDER BY tmp.{id}
        ",
        id = scope.id_column,
        table = scope.table,
    );

    let mut statement = connection.prepare(&sql)?;
    let mut rows = statement.query(params![
        scope.organizer_type_key,
        scope.participant_type_key,
        scope.expected_type_key,
        LOGICAL_DB_MGI,
    ])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(SecondaryId {
            role: scope.role,
            numeric_id: row.get(0)?,
            symbol: row.get(1)?,
            primary_id: row.get(2)?,
        });
    }

    Ok(out)
}

/// Allele gene vs participant marker chromosome, skipping
/// expresses_component rows and the exempt relationship term.
fn query_chromosome_mismatches(
    connection: &Connection,
    table: &str,
    pair: &EntityPair,
) -> Result<Vec<ChromosomeMismatch>> {
    let sql = format!(
        "
        SELECT DISTINCT tmp.mgiID1, tmp.mgiID2, mo.chromosome, mp.chromosome
        FROM {table} tmp
        JOIN ACC_Accession ao ON ao.numericPart = tmp.mgiID1
          AND ao.prefixPart = 'MGI:'
          AND ao._MGIType_key = ?1
          AND ao.preferred = 1
        JOIN ALL_Allele a ON a._Allele_key = ao._Object_key
        JOIN MRK_Marker mo ON mo._Marker_key = a._Marker_key
        JOIN ACC_Accession ap ON ap.numericPart = tmp.mgiID2
          AND ap.prefixPart = 'MGI:'
          AND ap._MGIType_key = ?2
          AND ap.preferred = 1
        JOIN MRK_Marker mp ON mp._Marker_key = ap._Object_key
        WHERE tmp.mgiID1TypeKey = ?1
          AND tmp.mgiID2TypeKey = ?2
          AND tmp.mgiID1 > 0
          AND tmp.mgiID2 > 0
          AND lower(tmp.category) != ?3
          AND upper(tmp.relID) != ?4
          AND mo.chromosome != mp.chromosome
        ORDER BY tmp.mgiID1, tmp.mgiID2
        "
    );

    let mut statement = connection.prepare(&sql)?;
    let mut rows = statement.query(params![
        pair.organizer_type_key,
        pair.participant_type_key,
        CATEGORY_EXPRESSES_COMPONENT,
        CHROMOSOME_EXEMPT_RELATIONSHIP_ID,
    ])?;

    let mut out = BTreeSet::new();
    while let Some(row) = rows.next()? {
        let mismatch = ChromosomeMismatch {
            organizer_id: row.get(0)?,
            participant_id: row.get(1)?,
            organizer_chromosome: row.get(2)?,
            participant_chromosome: row.get(3)?,
        };
        if !chromosomes_compatible(&mismatch.organizer_chromosome, &mismatch.participant_chromosome) {
            out.insert(mismatch);
        }
    }

    Ok(out.into_iter().collect())
}
