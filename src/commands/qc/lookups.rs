use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub key: i64,
    pub name: String,
    pub relationship_vocab_key: i64,
    pub relationship_dag_key: i64,
    pub organizer_type_key: i64,
    pub participant_type_key: i64,
}

impl Category {
    pub fn is_expresses_component(&self) -> bool {
        self.name.eq_ignore_ascii_case(CATEGORY_EXPRESSES_COMPONENT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipTerm {
    pub accession: String,
    pub term_key: i64,
    pub term: String,
    pub is_obsolete: bool,
    pub dag_key: i64,
    pub vocab_key: i64,
}

/// Organizer/participant entity types declared together by at least one category.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityPair {
    pub organizer_type_key: i64,
    pub participant_type_key: i64,
    pub organizer_name: String,
    pub participant_name: String,
}

impl EntityPair {
    pub fn label(&self) -> String {
        format!("{}/{}", self.organizer_name, self.participant_name)
    }

    pub fn is_allele_marker(&self) -> bool {
        self.organizer_type_key == MGI_TYPE_ALLELE && self.participant_type_key == MGI_TYPE_MARKER
    }
}

/// Identity of an expresses_component relationship as curators see it; two
/// rows with equal keys describe the same relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpressesComponentKey {
    pub organizer_id: String,
    pub relationship_id: String,
    pub participant_id: String,
    pub qualifier: String,
    pub evidence: String,
    pub organism: String,
    pub gene_symbol: String,
    pub gene_id: String,
}

impl ExpressesComponentKey {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        organizer_id: &str,
        relationship_id: &str,
        participant_id: &str,
        qualifier: &str,
        evidence: &str,
        organism: &str,
        gene_symbol: &str,
        gene_id: &str,
    ) -> Self {
        let norm = |value: &str| value.trim().to_lowercase();
        Self {
            organizer_id: norm(organizer_id),
            relationship_id: norm(relationship_id),
            participant_id: norm(participant_id),
            qualifier: norm(qualifier),
            evidence: norm(evidence),
            organism: norm(organism),
            gene_symbol: norm(gene_symbol),
            gene_id: norm(gene_id),
        }
    }
}

/// Read-only snapshot of the reference data one QC run needs. String keys
/// are lower-cased except for external gene ids.
#[derive(Debug, Default)]
pub struct ReferenceLookups {
    pub categories: HashMap<String, Category>,
    pub relationships: HashMap<String, RelationshipTerm>,
    pub qualifiers: HashMap<String, i64>,
    pub evidence: HashMap<String, i64>,
    pub references: HashMap<String, i64>,
    pub users: HashMap<String, i64>,
    pub properties: HashMap<String, i64>,
    pub external_symbols: HashMap<String, String>,
    pub entity_types: HashMap<i64, String>,
    pub expresses_component_keys: HashSet<ExpressesComponentKey>,
}

impl ReferenceLookups {
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.get(&name.trim().to_lowercase())
    }

    pub fn relationship(&self, accession: &str) -> Option<&RelationshipTerm> {
        self.relationships.get(&accession.trim().to_lowercase())
    }

    pub fn qualifier_key(&self, term: &str) -> Option<i64> {
        self.qualifiers.get(&term.trim().to_lowercase()).copied()
    }

    pub fn evidence_key(&self, abbreviation: &str) -> Option<i64> {
        self.evidence.get(&abbreviation.trim().to_lowercase()).copied()
    }

    pub fn reference_key(&self, jnum: &str) -> Option<i64> {
        self.references.get(&jnum.trim().to_lowercase()).copied()
    }

    pub fn user_key(&self, login: &str) -> Option<i64> {
        self.users.get(&login.trim().to_lowercase()).copied()
    }

    pub fn property_key(&self, name: &str) -> Option<i64> {
        self.properties.get(&name.trim().to_lowercase()).copied()
    }

    pub fn external_symbol(&self, gene_id: &str) -> Option<&str> {
        self.external_symbols.get(gene_id.trim()).map(String::as_str)
    }

    pub fn entity_type_name(&self, type_key: i64) -> String {
        self.entity_types
            .get(&type_key)
            .cloned()
            .unwrap_or_else(|| format!("MGIType {type_key}"))
    }

    /// Distinct category type pairs, ordered by label for stable reports.
    pub fn entity_pairs(&self) -> Vec<EntityPair> {
        let keys = self
            .categories
            .values()
            .map(|category| (category.organizer_type_key, category.participant_type_key))
            .collect::<BTreeSet<(i64, i64)>>();

        let mut pairs = keys
            .into_iter()
            .map(|(organizer, participant)| EntityPair {
                organizer_type_key: organizer,
                participant_type_key: participant,
                organizer_name: self.entity_type_name(organizer),
                participant_name: self.entity_type_name(participant),
            })
            .collect::<Vec<EntityPair>>();
        pairs.sort_by(|a, b| {
            a.label()
                .cmp(&b.label())
                .then(a.organizer_type_key.cmp(&b.organizer_type_key))
        });
        pairs
    }
}

pub fn load_reference_lookups(connection: &Connection) -> Result<ReferenceLookups> {
    let lookups = ReferenceLookups {
        categories: load_categories(connection).context("failed to load category lookup")?,
        relationships: load_relationship_terms(connection)
            .context("failed to load relationship vocabulary lookup")?,
        qualifiers: load_term_keys(connection, VOCAB_QUALIFIER, "term")
            .context("failed to load qualifier lookup")?,
        evidence: load_term_keys(connection, VOCAB_EVIDENCE, "abbreviation")
            .context("failed to load evidence lookup")?,
        references: load_references(connection).context("failed to load J:number lookup")?,
        users: load_users(connection).context("failed to load user lookup")?,
        properties: load_property_names(connection)
            .context("failed to load property name lookup")?,
        external_symbols: load_external_symbols(connection)
            .context("failed to load NCBI gene symbol lookup")?,
        entity_types: load_entity_types(connection).context("failed to load MGI type lookup")?,
        expresses_component_keys: load_expresses_component_keys(connection)
            .context("failed to load existing expresses_component relationships")?,
    };

    info!(
        categories = lookups.categories.len(),
        relationship_terms = lookups.relationships.len(),
        qualifiers = lookups.qualifiers.len(),
        evidence_codes = lookups.evidence.len(),
        references = lookups.references.len(),
        users = lookups.users.len(),
        properties = lookups.properties.len(),
        external_symbols = lookups.external_symbols.len(),
        expresses_component_keys = lookups.expresses_component_keys.len(),
        "loaded reference lookups"
    );

    Ok(lookups)
}

fn load_categories(connection: &Connection) -> Result<HashMap<String, Category>> {
    let mut statement = connection.prepare(
        "
        SELECT name, _Category_key, _RelationshipVocab_key, _RelationshipDAG_key,
               _MGIType_key_1, _MGIType_key_2
        FROM MGI_Relationship_Category
        ORDER BY _Category_key
        ",
    )?;

    let mut rows = statement.query([])?;
    let mut out = HashMap::new();
    while let Some(row) = rows.next()? {
        let category = Category {
            name: row.get(0)?,
            key: row.get(1)?,
            relationship_vocab_key: row.get(2)?,
            relationship_dag_key: row.get(3)?,
            organizer_type_key: row.get(4)?,
            participant_type_key: row.get(5)?,
        };
        out.insert(category.name.to_lowercase(), category);
    }

    Ok(out)
}

fn load_relationship_terms(connection: &Connection) -> Result<HashMap<String, RelationshipTerm>> {
    let dag_keys = RELATIONSHIP_DAG_KEYS
        .iter()
        .map(i64::to_string)
        .collect::<Vec<String>>()
        .join(",");
    let sql = format!(
        "
        SELECT a.accID, a._Object_key, t.term, t.isObsolete, dn._DAG_key, vd._Vocab_key
        FROM ACC_Accession a
        JOIN VOC_Term t ON t._Term_key = a._Object_key
        JOIN DAG_Node dn ON dn._Object_key = t._Term_key
        JOIN VOC_VocabDAG vd ON vd._DAG_key = dn._DAG_key
        WHERE a._MGIType_key = ?1
          AND a._LogicalDB_key = ?2
          AND a.preferred = 1
          AND a.private = 0
          AND dn._DAG_key IN ({dag_keys})
        ORDER BY a.accID, dn._DAG_key
        "
    );

    let mut statement = connection.prepare(&sql)?;
    let mut rows = statement.query(params![MGI_TYPE_VOCAB_TERM, LOGICAL_DB_FEAR_RELATIONSHIP])?;
    let mut out = HashMap::new();
    while let Some(row) = rows.next()? {
        let term = RelationshipTerm {
            accession: row.get(0)?,
            term_key: row.get(1)?,
            term: row.get(2)?,
            is_obsolete: row.get::<_, i64>(3)? != 0,
            dag_key: row.get(4)?,
            vocab_key: row.get(5)?,
        };
        out.insert(term.accession.to_lowercase(), term);
    }

    Ok(out)
}

fn load_term_keys(connection: &Connection, vocab_key: i64, column: &str) -> Result<HashMap<String, i64>> {
    let sql = format!(
        "
        SELECT _Term_key, {column}
        FROM VOC_Term
        WHERE _Vocab_key = ?1
          AND isObsolete = 0
          AND {column} IS NOT NULL
        "
    );

    let mut statement = connection.prepare(&sql)?;
    let mut rows = statement.query([vocab_key])?;
    let mut out = HashMap::new();
    while let Some(row) = rows.next()? {
        let key: i64 = row.get(0)?;
        let name: String = row.get(1)?;
        out.insert(name.to_lowercase(), key);
    }

    Ok(out)
}

fn load_references(connection: &Connection) -> Result<HashMap<String, i64>> {
    let mut statement = connection.prepare(
        "
        SELECT accID, _Object_key
        FROM ACC_Accession
        WHERE _MGIType_key = ?1
          AND _LogicalDB_key = ?2
          AND preferred = 1
          AND private = 0
          AND prefixPart = 'J:'
        ",
    )?;

    let mut rows = statement.query(params![MGI_TYPE_REFERENCE, LOGICAL_DB_MGI])?;
    let mut out = HashMap::new();
    while let Some(row) = rows.next()? {
        let accession: String = row.get(0)?;
        out.insert(accession.to_lowercase(), row.get(1)?);
    }

    Ok(out)
}

fn load_users(connection: &Connection) -> Result<HashMap<String, i64>> {
    let mut statement = connection.prepare(
        "
        SELECT login, _User_key
        FROM MGI_User
        WHERE _UserStatus_key = ?1
        ",
    )?;

    let mut rows = statement.query([USER_STATUS_ACTIVE])?;
    let mut out = HashMap::new();
    while let Some(row) = rows.next()? {
        let login: String = row.get(0)?;
        out.insert(login.to_lowercase(), row.get(1)?);
    }

    Ok(out)
}

fn load_property_names(connection: &Connection) -> Result<HashMap<String, i64>> {
    let mut statement = connection.prepare(
        "
        SELECT _Term_key, term
        FROM VOC_Term
        WHERE _Vocab_key = ?1
        ",
    )?;

    let mut rows = statement.query([VOCAB_PROPERTY])?;
    let mut out = HashMap::new();
    while let Some(row) = rows.next()? {
        let key: i64 = row.get(0)?;
        let term: String = row.get(1)?;
        out.insert(term.to_lowercase(), key);
    }

    Ok(out)
}

fn load_external_symbols(connection: &Connection) -> Result<HashMap<String, String>> {
    let mut statement = connection.prepare(
        "
        SELECT a.accID, m.symbol
        FROM ACC_Accession a
        JOIN MRK_Marker m ON m._Marker_key = a._Object_key
        WHERE a._LogicalDB_key = ?1
          AND a._MGIType_key = ?2
          AND a.preferred = 1
          AND m._Organism_key != ?3
        ",
    )?;

    let mut rows = statement.query(params![LOGICAL_DB_ENTREZ_GENE, MGI_TYPE_MARKER, ORGANISM_MOUSE])?;
    let mut out = HashMap::new();
    while let Some(row) = rows.next()? {
        let gene_id: String = row.get(0)?;
        out.insert(gene_id, row.get(1)?);
    }

    Ok(out)
}

fn load_entity_types(connection: &Connection) -> Result<HashMap<i64, String>> {
    let mut statement = connection.prepare("SELECT _MGIType_key, name FROM ACC_MGIType")?;
    let mut rows = statement.query([])?;
    let mut out = HashMap::new();
    while let Some(row) = rows.next()? {
        out.insert(row.get(0)?, row.get(1)?);
    }

    Ok(out)
}

fn load_expresses_component_keys(connection: &Connection) -> Result<HashSet<ExpressesComponentKey>> {
    let mut statement = connection.prepare(
        "
        SELECT a1.accID, ar.accID, a2.accID, q.term, e.abbreviation,
          (SELECT rp.value
             FROM MGI_Relationship_Property rp
             JOIN VOC_Term pt ON pt._Term_key = rp._PropertyName_key
            WHERE rp._Relationship_key = r._Relationship_key
              AND lower(pt.term) = ?2
            LIMIT 1),
          (SELECT rp.value
             FROM MGI_Relationship_Property rp
             JOIN VOC_Term pt ON pt._Term_key = rp._PropertyName_key
            WHERE rp._Relationship_key = r._Relationship_key
              AND lower(pt.term) = ?3
            LIMIT 1),
          (SELECT rp.value
             FROM MGI_Relationship_Property rp
             JOIN VOC_Term pt ON pt._Term_key = rp._PropertyName_key
            WHERE rp._Relationship_key = r._Relationship_key
              AND lower(pt.term) = ?4
            LIMIT 1)
        FROM MGI_Relationship r
        JOIN MGI_Relationship_Category c ON c._Category_key = r._Category_key
        JOIN ACC_Accession a1 ON a1._Object_key = r._Object_key_1
          AND a1._MGIType_key = c._MGIType_key_1
          AND a1._LogicalDB_key = ?5
          AND a1.prefixPart = 'MGI:'
          AND a1.preferred = 1
        JOIN ACC_Accession a2 ON a2._Object_key = r._Object_key_2
          AND a2._MGIType_key = c._MGIType_key_2
          AND a2._LogicalDB_key = ?5
          AND a2.prefixPart = 'MGI:'
          AND a2.preferred = 1
        JOIN ACC_Accession ar ON ar._Object_key = r._RelationshipTerm_key
          AND ar._MGIType_key = ?6
          AND ar._LogicalDB_key = ?7
          AND ar.preferred = 1
        JOIN VOC_Term q ON q._Term_key = r._Qualifier_key
        JOIN VOC_Term e ON e._Term_key = r._Evidence_key
        WHERE lower(c.name) = ?1
        ",
    )?;

    let mut rows = statement.query(params![
        CATEGORY_EXPRESSES_COMPONENT,
        PROPERTY_NON_MOUSE_ORGANISM,
        PROPERTY_NON_MOUSE_GENE_SYMBOL,
        PROPERTY_NON_MOUSE_GENE_ID,
        LOGICAL_DB_MGI,
        MGI_TYPE_VOCAB_TERM,
        LOGICAL_DB_FEAR_RELATIONSHIP,
    ])?;

    let mut out = HashSet::new();
    while let Some(row) = rows.next()? {
        let organism: Option<String> = row.get(5)?;
        let gene_symbol: Option<String> = row.get(6)?;
        let gene_id: Option<String> = row.get(7)?;
        out.insert(ExpressesComponentKey::new(
            &row.get::<_, String>(0)?,
            &row.get::<_, String>(1)?,
            &row.get::<_, String>(2)?,
            &row.get::<_, String>(3)?,
            &row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            &organism.unwrap_or_default(),
            &gene_symbol.unwrap_or_default(),
            &gene_id.unwrap_or_default(),
        ));
    }

    Ok(out)
}
