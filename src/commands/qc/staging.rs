use super::*;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Role {
    Organizer,
    Participant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Organizer => "Organizer",
            Self::Participant => "Participant",
        }
    }
}

/// An organizer/participant identifier as read from the input. Malformed ids
/// only become the `0` sentinel when written to the staging table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MgiId {
    Valid(i64),
    Malformed(String),
}

impl MgiId {
    pub fn staging_value(&self) -> i64 {
        match self {
            Self::Valid(numeric) => *numeric,
            Self::Malformed(_) => 0,
        }
    }
}

pub struct MgiIdParser {
    pattern: Regex,
}

impl MgiIdParser {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(r"^MGI:(\d+)$").context("failed to compile MGI id regex")?;
        Ok(Self { pattern })
    }

    /// `MGI:<digits>` with a positive suffix that fits the staging column;
    /// the prefix is case-sensitive.
    pub fn parse(&self, raw: &str) -> MgiId {
        let trimmed = raw.trim();
        self.pattern
            .captures(trimmed)
            .and_then(|captures| captures.get(1))
            .and_then(|suffix| suffix.as_str().parse::<i64>().ok())
            .filter(|numeric| *numeric > 0)
            .map(MgiId::Valid)
            .unwrap_or_else(|| MgiId::Malformed(trimmed.to_string()))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StagedIdentifier {
    pub organizer: MgiId,
    pub organizer_type_key: i64,
    pub participant: MgiId,
    pub participant_type_key: i64,
    pub relationship_id: String,
    pub category: String,
}

impl StagedIdentifier {
    pub fn to_bcp_line(&self) -> String {
        format!(
            "{}{TAB}{}{TAB}{}{TAB}{}{TAB}{}{TAB}{}",
            self.organizer.staging_value(),
            self.organizer_type_key,
            self.participant.staging_value(),
            self.participant_type_key,
            self.relationship_id,
            self.category,
        )
    }
}

#[derive(Debug, Default)]
pub struct StagingSet {
    pub rows: Vec<StagedIdentifier>,
    /// Malformed id -> role it was first seen in.
    pub bad_ids: BTreeMap<String, Role>,
}

impl StagingSet {
    pub fn bad_id_findings(&self) -> Vec<Finding> {
        self.bad_ids
            .iter()
            .map(|(id, role)| {
                Finding::new(
                    Section::InvalidMgiIds,
                    format_columns(&[(id.as_str(), 12), (role.as_str(), 20)]),
                )
            })
            .collect()
    }
}

/// Builds the staged identifier set from the data lines (header excluded).
/// An unknown category aborts the run since every type check depends on it.
pub fn materialize<'a, I>(lines: I, lookups: &ReferenceLookups, parser: &MgiIdParser) -> Result<StagingSet>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut staging = StagingSet::default();

    for line in lines {
        let fields = line.split(TAB).map(str::trim).collect::<Vec<&str>>();
        let field = |index: usize| fields.get(index).copied().unwrap_or("");

        let category_name = field(1);
        let Some(category) = lookups.category(category_name) else {
            bail!("FATAL ERROR Category: {category_name} does not exist");
        };

        let organizer = parser.parse(field(2));
        let participant = parser.parse(field(6));

        for (id, role) in [(&organizer, Role::Organizer), (&participant, Role::Participant)] {
            if let MgiId::Malformed(raw) = id {
                staging.bad_ids.entry(raw.clone()).or_insert(role);
            }
        }

        staging.rows.push(StagedIdentifier {
            organizer,
            organizer_type_key: category.organizer_type_key,
            participant,
            participant_type_key: category.participant_type_key,
            relationship_id: field(4).to_string(),
            category: category.name.clone(),
        });
    }

    Ok(staging)
}

pub fn write_side_file(path: &Path, staging: &StagingSet) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let file = File::create(path)
        .with_context(|| format!("failed to create staging bcp file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for row in &staging.rows {
        writeln!(writer, "{}", row.to_bcp_line())
            .with_context(|| format!("failed to write staging bcp file: {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush staging bcp file: {}", path.display()))?;

    Ok(())
}

/// Staging table name, checked once to be a plain SQL identifier so it can
/// be spliced into statements.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StagingTable(String);

impl StagingTable {
    pub fn new(name: &str) -> Result<Self> {
        let pattern =
            Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").context("failed to compile table name regex")?;
        if !pattern.is_match(name) {
            bail!("staging table name is not a plain identifier: {name}");
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StagingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Loads the side file into a TEMP table on `connection`, replacing any
/// previous copy. Committed before returning so later queries see every row.
pub fn bulk_load(connection: &mut Connection, table: &StagingTable, bcp_path: &Path) -> Result<usize> {
    let raw = fs::read_to_string(bcp_path)
        .with_context(|| format!("failed to read staging bcp file: {}", bcp_path.display()))?;

    let transaction = connection
        .transaction()
        .context("failed to start staging load transaction")?;

    transaction
        .execute_batch(&format!(
            "
            DROP TABLE IF EXISTS temp.{table};
            CREATE TEMP TABLE {table} (
              mgiID1 INTEGER NOT NULL,
              mgiID1TypeKey INTEGER NOT NULL,
              mgiID2 INTEGER NOT NULL,
              mgiID2TypeKey INTEGER NOT NULL,
              relID TEXT NOT NULL,
              category TEXT NOT NULL
            );
            CREATE INDEX temp.idx_{table}_id1 ON {table}(mgiID1);
            CREATE INDEX temp.idx_{table}_id2 ON {table}(mgiID2);
            "
        ))
        .with_context(|| format!("failed to create staging table {table}"))?;

    let mut loaded = 0_usize;
    {
        let mut insert = transaction.prepare(&format!(
            "INSERT INTO {table}(mgiID1, mgiID1TypeKey, mgiID2, mgiID2TypeKey, relID, category)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6)"
        ))?;

        for (index, line) in raw.lines().enumerate() {
            let fields = line.split(TAB).collect::<Vec<&str>>();
            if fields.len() != 6 {
                bail!(
                    "staging bcp line {} has {} fields, expected 6",
                    index + 1,
                    fields.len()
                );
            }

            let numeric = |position: usize| -> Result<i64> {
                fields[position].parse::<i64>().with_context(|| {
                    format!(
                        "staging bcp line {} column {} is not numeric: {}",
                        index + 1,
                        position + 1,
                        fields[position]
                    )
                })
            };

            insert.execute(params![
                numeric(0)?,
                numeric(1)?,
                numeric(2)?,
                numeric(3)?,
                fields[4],
                fields[5],
            ])?;
            loaded += 1;
        }
    }

    transaction
        .commit()
        .context("failed to commit staging load transaction")?;

    Ok(loaded)
}
