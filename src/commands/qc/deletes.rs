use super::*;

/// Columns that identify one stored relationship.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DeleteKey {
    pub category_key: i64,
    pub organizer_key: i64,
    pub relationship_term_key: i64,
    pub participant_key: i64,
    pub qualifier_key: i64,
    pub evidence_key: i64,
    pub reference_key: i64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedObject {
    pub key: i64,
    pub accession: String,
    pub symbol: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlannedDelete {
    pub relationship_key: i64,
    pub preview: String,
}

impl PlannedDelete {
    pub fn statement(&self) -> String {
        format!(
            "delete from MGI_Relationship where _Relationship_key = {};",
            self.relationship_key
        )
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeleteResolution {
    NotFound(Finding),
    Found(Vec<PlannedDelete>),
}

#[derive(Debug, Default)]
pub struct DeletePlan {
    pub deletes: Vec<PlannedDelete>,
}

impl DeletePlan {
    pub fn statements(&self) -> Vec<String> {
        self.deletes.iter().map(PlannedDelete::statement).collect()
    }

    pub fn preview(&self) -> Vec<&str> {
        self.deletes
            .iter()
            .map(|planned| planned.preview.as_str())
            .collect()
    }
}

/// Preferred MGI accession of the given entity type, with its symbol.
pub fn resolve_object(
    connection: &Connection,
    accession: &str,
    type_key: i64,
) -> Result<Option<ResolvedObject>> {
    let Some(object) = object_table(type_key) else {
        return Ok(None);
    };

    let sql = format!(
        "
        SELECT a._Object_key, a.accID, o.symbol
        FROM ACC_Accession a
        JOIN {table} o ON o.{key} = a._Object_key
        WHERE lower(a.accID) = lower(?1)
          AND a._MGIType_key = ?2
          AND a._LogicalDB_key = ?3
          AND a.preferred = 1
        ORDER BY a._Object_key
        LIMIT 1
        ",
        table = object.table,
        key = object.key_column,
    );

    connection
        .query_row(&sql, params![accession.trim(), type_key, LOGICAL_DB_MGI], |row| {
            Ok(ResolvedObject {
                key: row.get(0)?,
                accession: row.get(1)?,
                symbol: row.get(2)?,
            })
        })
        .optional()
        .with_context(|| format!("failed to resolve {accession} as MGI type {type_key}"))
}

pub fn resolve_delete(connection: &Connection, request: &DeleteRequest) -> Result<DeleteResolution> {
    let not_found = || {
        DeleteResolution::NotFound(Finding::new(
            Section::DeleteNotInDatabase,
            format!("{:<12}   {:<68}", request.line_number, request.line.trim()),
        ))
    };

    let organizer = resolve_object(
        connection,
        &request.organizer_id,
        request.category.organizer_type_key,
    )?;
    let participant = resolve_object(
        connection,
        &request.participant_id,
        request.category.participant_type_key,
    )?;
    let (Some(organizer), Some(participant)) = (organizer, participant) else {
        return Ok(not_found());
    };

    let key = DeleteKey {
        category_key: request.category.key,
        organizer_key: organizer.key,
        relationship_term_key: request.relationship.term_key,
        participant_key: participant.key,
        qualifier_key: request.qualifier_key,
        evidence_key: request.evidence_key,
        reference_key: request.reference_key,
    };

    let matches = query_relationships(connection, &key)?;
    if matches.is_empty() {
        return Ok(not_found());
    }

    let planned = matches
        .into_iter()
        .map(|(relationship_key, attached)| PlannedDelete {
            relationship_key,
            preview: [
                request.category.name.as_str(),
                organizer.accession.as_str(),
                organizer.symbol.as_str(),
                request.relationship.accession.as_str(),
                request.relationship.term.as_str(),
                participant.accession.as_str(),
                participant.symbol.as_str(),
                request.qualifier.as_str(),
                request.evidence.as_str(),
                request.reference.as_str(),
                attached.properties.join("\t").as_str(),
                attached.notes.concat().as_str(),
            ]
            .join("\t"),
        })
        .collect();

    Ok(DeleteResolution::Found(planned))
}

#[derive(Debug, Default)]
struct AttachedData {
    properties: Vec<String>,
    notes: Vec<String>,
}

fn query_relationships(connection: &Connection, key: &DeleteKey) -> Result<BTreeMap<i64, AttachedData>> {
    let mut statement = connection.prepare(
        "
        SELECT r._Relationship_key, pt.term, rp.value, n.note
        FROM MGI_Relationship r
        LEFT JOIN MGI_Relationship_Property rp ON rp._Relationship_key = r._Relationship_key
        LEFT JOIN VOC_Term pt ON pt._Term_key = rp._PropertyName_key
        LEFT JOIN MGI_Note n ON n._Object_key = r._Relationship_key
          AND n._MGIType_key = ?8
        WHERE r._Category_key = ?1
          AND r._Object_key_1 = ?2
          AND r._RelationshipTerm_key = ?3
          AND r._Object_key_2 = ?4
          AND r._Qualifier_key = ?5
          AND r._Evidence_key = ?6
          AND r._Refs_key = ?7
        ORDER BY r._Relationship_key, rp._PropertyName_key, rp.value, n.note
        ",
    )?;

    let mut rows = statement.query(params![
        key.category_key,
        key.organizer_key,
        key.relationship_term_key,
        key.participant_key,
        key.qualifier_key,
        key.evidence_key,
        key.reference_key,
        MGI_TYPE_RELATIONSHIP,
    ])?;

    let mut out: BTreeMap<i64, AttachedData> = BTreeMap::new();
    while let Some(row) = rows.next()? {
        let relationship_key: i64 = row.get(0)?;
        let property_name: Option<String> = row.get(1)?;
        let property_value: Option<String> = row.get(2)?;
        let note: Option<String> = row.get(3)?;

        let attached = out.entry(relationship_key).or_default();
        if let Some(name) = property_name {
            let property = format!("{name}:\"{}\"", property_value.unwrap_or_default());
            if !attached.properties.contains(&property) {
                attached.properties.push(property);
            }
        }
        if let Some(note) = note {
            let note = note.trim().to_string();
            if !attached.notes.contains(&note) {
                attached.notes.push(note);
            }
        }
    }

    Ok(out)
}

/// Resolves every eligible delete row. Rows that match nothing become
/// "Deletes not in Database" findings; a relationship matched by several
/// rows is planned once.
pub fn resolve_deletes(
    connection: &Connection,
    requests: &[DeleteRequest],
    findings: &mut Findings,
) -> Result<DeletePlan> {
    let mut plan = DeletePlan::default();
    let mut planned_keys = BTreeSet::new();
    let mut missing = 0_usize;
    let mut repeated = 0_usize;

    for request in requests {
        match resolve_delete(connection, request)
            .with_context(|| format!("failed to resolve delete on line {}", request.line_number))?
        {
            DeleteResolution::NotFound(finding) => {
                missing += 1;
                findings.add(finding);
            }
            DeleteResolution::Found(planned) => {
                for delete in planned {
                    if planned_keys.insert(delete.relationship_key) {
                        plan.deletes.push(delete);
                    } else {
                        repeated += 1;
                    }
                }
            }
        }
    }

    info!(
        requests = requests.len(),
        resolved = plan.deletes.len(),
        not_found = missing,
        repeated,
        "resolved delete rows"
    );

    Ok(plan)
}
