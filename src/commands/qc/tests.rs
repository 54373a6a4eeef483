use super::*;

const TABLE: &str = "fear_mgi_id_staging";

const HEADER: &str = "action\tcategory\torganizer\torganizer symbol\trelationship id\trelationship name\tparticipant\tparticipant symbol\tqualifier\tevidence\tjnum\tcreator\tnotes\tProperty:score\tProperty:non-mouse_organism\tProperty:non-mouse_gene_symbol\tProperty:non-mouse_ncbi_gene_id\tProperty:data_source";

const NO_PROPERTIES: [&str; 5] = ["", "", "", "", ""];

const FIXTURE_SQL: &str = "
CREATE TABLE ACC_MGIType (_MGIType_key INTEGER PRIMARY KEY, name TEXT NOT NULL);
CREATE TABLE ACC_Accession (
  accID TEXT NOT NULL,
  prefixPart TEXT,
  numericPart INTEGER,
  _LogicalDB_key INTEGER NOT NULL,
  _Object_key INTEGER NOT NULL,
  _MGIType_key INTEGER NOT NULL,
  private INTEGER NOT NULL,
  preferred INTEGER NOT NULL
);
CREATE TABLE VOC_Term (
  _Term_key INTEGER PRIMARY KEY,
  _Vocab_key INTEGER NOT NULL,
  term TEXT NOT NULL,
  abbreviation TEXT,
  isObsolete INTEGER NOT NULL
);
CREATE TABLE DAG_Node (_DAG_key INTEGER NOT NULL, _Object_key INTEGER NOT NULL);
CREATE TABLE VOC_VocabDAG (_Vocab_key INTEGER NOT NULL, _DAG_key INTEGER NOT NULL);
CREATE TABLE MGI_Relationship_Category (
  _Category_key INTEGER PRIMARY KEY,
  name TEXT NOT NULL,
  _RelationshipVocab_key INTEGER NOT NULL,
  _RelationshipDAG_key INTEGER NOT NULL,
  _MGIType_key_1 INTEGER NOT NULL,
  _MGIType_key_2 INTEGER NOT NULL
);
CREATE TABLE MRK_Status (_Marker_Status_key INTEGER PRIMARY KEY, status TEXT NOT NULL);
CREATE TABLE MRK_Marker (
  _Marker_key INTEGER PRIMARY KEY,
  _Organism_key INTEGER NOT NULL,
  _Marker_Status_key INTEGER NOT NULL,
  symbol TEXT NOT NULL,
  chromosome TEXT NOT NULL
);
CREATE TABLE ALL_Allele (
  _Allele_key INTEGER PRIMARY KEY,
  _Marker_key INTEGER,
  _Allele_Status_key INTEGER NOT NULL,
  symbol TEXT NOT NULL
);
CREATE TABLE MGI_User (_User_key INTEGER PRIMARY KEY, login TEXT NOT NULL, _UserStatus_key INTEGER NOT NULL);
CREATE TABLE MGI_Relationship (
  _Relationship_key INTEGER PRIMARY KEY,
  _Category_key INTEGER NOT NULL,
  _Object_key_1 INTEGER NOT NULL,
  _Object_key_2 INTEGER NOT NULL,
  _RelationshipTerm_key INTEGER NOT NULL,
  _Qualifier_key INTEGER NOT NULL,
  _Evidence_key INTEGER NOT NULL,
  _Refs_key INTEGER NOT NULL
);
CREATE TABLE MGI_Relationship_Property (
  _Relationship_key INTEGER NOT NULL,
  _PropertyName_key INTEGER NOT NULL,
  value TEXT
);
CREATE TABLE MGI_Note (_Object_key INTEGER NOT NULL, _MGIType_key INTEGER NOT NULL, note TEXT);

INSERT INTO ACC_MGIType VALUES
  (1, 'Reference'), (2, 'Marker'), (11, 'Allele'), (13, 'Vocabulary Term'), (40, 'Relationship');

INSERT INTO MGI_Relationship_Category VALUES
  (1001, 'interacts_with', 96, 44, 2, 2),
  (1003, 'mutation_involves', 96, 45, 11, 2),
  (1004, 'expresses_component', 96, 46, 11, 2),
  (1005, 'legacy_involves', 99, 45, 11, 2);

INSERT INTO VOC_VocabDAG VALUES (96, 44), (96, 45), (96, 46), (96, 47);

INSERT INTO VOC_Term VALUES
  (100, 96, 'interacts_with', NULL, 0),
  (101, 96, 'deletion_involves', NULL, 0),
  (102, 96, 'retired_relationship', NULL, 1),
  (103, 96, 'decreased_translational_product_level', NULL, 0),
  (104, 96, 'expresses_an_orthologous_gene', NULL, 0),
  (105, 96, 'expresses_mouse_gene', NULL, 0),
  (106, 96, 'regulates_expression', NULL, 0),
  (200, 94, 'Not Specified', NULL, 0),
  (201, 94, 'NOT', NULL, 0),
  (210, 95, 'inferred from direct assay', 'IDA', 0),
  (211, 95, 'traceable author statement', 'TAS', 0),
  (220, 97, 'score', NULL, 0),
  (221, 97, 'non-mouse_organism', NULL, 0),
  (222, 97, 'non-mouse_gene_symbol', NULL, 0),
  (223, 97, 'non-mouse_ncbi_gene_id', NULL, 0),
  (224, 97, 'data_source', NULL, 0),
  (847114, 37, 'Approved', NULL, 0),
  (3983021, 37, 'Autoload', NULL, 0),
  (847112, 37, 'Deleted', NULL, 0);

INSERT INTO DAG_Node VALUES
  (44, 100), (45, 101), (45, 102), (45, 103), (46, 104), (46, 105), (47, 106);

INSERT INTO MGI_User VALUES (1000, 'jdoe', 316350), (1001, 'retired', 316351);

INSERT INTO MRK_Status VALUES (1, 'official'), (2, 'withdrawn');

INSERT INTO MRK_Marker VALUES
  (10, 1, 1, 'Gata1', 'X'),
  (11, 1, 1, 'Shh', '5'),
  (12, 1, 2, 'Old1', '1'),
  (13, 1, 1, 'Kit', '5'),
  (14, 1, 1, 'Sts', 'XY'),
  (15, 2, 1, 'GATA1', 'X');

INSERT INTO ALL_Allele VALUES
  (20, 11, 847114, 'Shh<tm1>'),
  (21, 10, 847114, 'Gata1<tm1>'),
  (22, 11, 847112, 'Shh<tm2>'),
  (23, 13, 3983021, 'Kit<tm1>');

INSERT INTO ACC_Accession VALUES
  ('RV:0000001', 'RV:', 1, 171, 100, 13, 0, 1),
  ('RV:0000002', 'RV:', 2, 171, 101, 13, 0, 1),
  ('RV:0000003', 'RV:', 3, 171, 102, 13, 0, 1),
  ('RV:0001555', 'RV:', 1555, 171, 103, 13, 0, 1),
  ('RV:0000004', 'RV:', 4, 171, 104, 13, 0, 1),
  ('RV:0000005', 'RV:', 5, 171, 105, 13, 0, 1),
  ('RV:0000006', 'RV:', 6, 171, 106, 13, 0, 1),
  ('J:1000', 'J:', 1000, 1, 500, 1, 0, 1),
  ('MGI:300', 'MGI:', 300, 1, 500, 1, 0, 1),
  ('MGI:101', 'MGI:', 101, 1, 10, 2, 0, 1),
  ('MGI:102', 'MGI:', 102, 1, 11, 2, 0, 1),
  ('MGI:103', 'MGI:', 103, 1, 12, 2, 0, 1),
  ('MGI:104', 'MGI:', 104, 1, 13, 2, 0, 1),
  ('MGI:105', 'MGI:', 105, 1, 14, 2, 0, 1),
  ('MGI:199', 'MGI:', 199, 1, 11, 2, 0, 0),
  ('MGI:201', 'MGI:', 201, 1, 20, 11, 0, 1),
  ('MGI:202', 'MGI:', 202, 1, 21, 11, 0, 1),
  ('MGI:203', 'MGI:', 203, 1, 22, 11, 0, 1),
  ('MGI:204', 'MGI:', 204, 1, 23, 11, 0, 1),
  ('2623', '', 2623, 55, 15, 2, 0, 1);

INSERT INTO MGI_Relationship VALUES
  (900, 1003, 20, 11, 101, 200, 211, 500),
  (901, 1004, 23, 10, 104, 200, 210, 500);

INSERT INTO MGI_Relationship_Property VALUES
  (900, 220, '1.0'),
  (901, 221, 'human'),
  (901, 222, 'GATA1'),
  (901, 223, '2623');

INSERT INTO MGI_Note VALUES (900, 40, 'curated '), (900, 40, 'curated');
";

fn fixture_connection() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    conn.execute_batch(FIXTURE_SQL).expect("seed fixture");
    conn
}

fn fixture_lookups(conn: &Connection) -> ReferenceLookups {
    load_reference_lookups(conn).expect("load lookups")
}

fn header_layout(lookups: &ReferenceLookups) -> HeaderLayout {
    parse_header(HEADER, lookups).expect("valid header")
}

/// `fields` is action, category, organizer, relationship id, participant,
/// qualifier, evidence.
fn data_line(fields: [&str; 7], properties: [&str; 5]) -> String {
    let [action, category, organizer, relationship, participant, qualifier, evidence] = fields;
    let mut columns = vec![
        action,
        category,
        organizer,
        "",
        relationship,
        "",
        participant,
        "",
        qualifier,
        evidence,
        "J:1000",
        "jdoe",
        "",
    ];
    columns.extend(properties);
    columns.join("\t")
}

fn classify(lookups: &ReferenceLookups, line: &str) -> ClassifiedRow {
    let layout = header_layout(lookups);
    let ctx = RowContext {
        lookups,
        layout: &layout,
    };
    classify_row(&ctx, 2, line)
}

fn rejected(row: &ClassifiedRow) -> Vec<Finding> {
    match &row.verdict {
        RowVerdict::Rejected(findings) => findings.clone(),
        RowVerdict::Accepted => Vec::new(),
    }
}

fn staging_table() -> StagingTable {
    StagingTable::new(TABLE).expect("staging table name")
}

fn stage(conn: &mut Connection, lookups: &ReferenceLookups, lines: &[String]) -> StagingSet {
    let parser = MgiIdParser::new().expect("id parser");
    let staging = materialize(lines.iter().map(String::as_str), lookups, &parser).expect("materialize");
    let dir = tempfile::tempdir().expect("tempdir");
    let bcp = dir.path().join("ids.bcp");
    write_side_file(&bcp, &staging).expect("write side file");
    bulk_load(conn, &staging_table(), &bcp).expect("bulk load");
    staging
}

#[test]
fn load_reference_lookups_keys_maps_case_insensitively() {
    let conn = fixture_connection();
    let lookups = fixture_lookups(&conn);

    let category = lookups.category("Mutation_Involves").expect("category");
    assert_eq!(category.key, 1003);
    assert_eq!(category.organizer_type_key, 11);
    assert_eq!(category.participant_type_key, 2);

    let term = lookups.relationship("rv:0000002").expect("relationship term");
    assert_eq!(term.term_key, 101);
    assert_eq!(term.dag_key, 45);
    assert_eq!(term.vocab_key, 96);
    assert!(lookups.relationship("RV:0000003").expect("obsolete term").is_obsolete);

    assert_eq!(lookups.qualifier_key("NOT SPECIFIED"), Some(200));
    assert_eq!(lookups.evidence_key("ida"), Some(210));
    assert_eq!(lookups.reference_key("j:1000"), Some(500));
    assert_eq!(lookups.user_key("JDOE"), Some(1000));
    assert_eq!(lookups.user_key("retired"), None);
    assert_eq!(lookups.property_key("Score"), Some(220));
    assert_eq!(lookups.external_symbol("2623"), Some("GATA1"));
    assert_eq!(lookups.expresses_component_keys.len(), 1);

    let labels = lookups
        .entity_pairs()
        .iter()
        .map(EntityPair::label)
        .collect::<Vec<String>>();
    assert_eq!(labels, vec!["Allele/Marker", "Marker/Marker"]);
}

#[test]
fn mgi_id_parser_requires_prefix_and_positive_suffix() {
    let parser = MgiIdParser::new().expect("id parser");

    assert_eq!(parser.parse("MGI:123"), MgiId::Valid(123));
    assert_eq!(parser.parse(" MGI:5 "), MgiId::Valid(5));
    assert_eq!(parser.parse("mgi:123"), MgiId::Malformed("mgi:123".to_string()));
    assert_eq!(parser.parse("MGI:0"), MgiId::Malformed("MGI:0".to_string()));
    assert_eq!(parser.parse("MGI:"), MgiId::Malformed("MGI:".to_string()));
    assert_eq!(parser.parse("123"), MgiId::Malformed("123".to_string()));
    assert_eq!(parser.parse("MGI:12a").staging_value(), 0);
    assert_eq!(
        parser.parse("MGI:18446744073709551615"),
        MgiId::Malformed("MGI:18446744073709551615".to_string())
    );
}

#[test]
fn materialize_records_each_malformed_id_once_with_first_role() {
    let conn = fixture_connection();
    let lookups = fixture_lookups(&conn);
    let parser = MgiIdParser::new().expect("id parser");
    let lines = [
        data_line(["add", "mutation_involves", "bad1", "RV:0000002", "MGI:102", "", "IDA"], NO_PROPERTIES),
        data_line(["add", "mutation_involves", "MGI:201", "RV:0000002", "bad1", "", "IDA"], NO_PROPERTIES),
        data_line(["add", "Mutation_Involves", "MGI:201", "RV:0000002", "bad2", "", "IDA"], NO_PROPERTIES),
    ];

    let staging = materialize(lines.iter().map(String::as_str), &lookups, &parser).expect("materialize");

    assert_eq!(staging.rows.len(), 3);
    assert_eq!(staging.bad_ids.len(), 2);
    assert_eq!(staging.bad_ids.get("bad1"), Some(&Role::Organizer));
    assert_eq!(staging.bad_ids.get("bad2"), Some(&Role::Participant));
    assert_eq!(
        staging.rows[0].to_bcp_line(),
        "0\t11\t102\t2\tRV:0000002\tmutation_involves"
    );
    assert_eq!(staging.rows[2].category, "mutation_involves");

    let findings = staging.bad_id_findings();
    assert_eq!(
        findings[0].line,
        format!("{:<12}  {:<20}", "bad1", "Organizer")
    );
}

#[test]
fn qc_run_reports_oversized_mgi_id_instead_of_aborting() {
    let input = [
        HEADER.to_string(),
        data_line(
            ["add", "mutation_involves", "MGI:18446744073709551615", "RV:0000002", "MGI:102", "", "IDA"],
            NO_PROPERTIES,
        ),
    ]
    .join("\n");
    let fixture = RunFixture::new(&input);

    assert_eq!(run(fixture.args.clone()).expect("qc run"), 2);
    let qc_report = fixture.output("fearQC.rpt");
    assert!(qc_report.contains("Invalid MGI IDs"));
    assert!(qc_report.contains(&format_columns(&[("MGI:18446744073709551615", 12), ("Organizer", 20)])));
    assert_eq!(
        fixture.output("fearQC_mgiid.bcp"),
        "0\t11\t102\t2\tRV:0000002\tmutation_involves\n"
    );

    let manifest: QcRunManifest =
        serde_json::from_str(&fixture.output("fearqc_run.json")).expect("parse manifest");
    assert_eq!(manifest.counts.malformed_ids, 1);
    assert_eq!(manifest.counts.staged_rows, 1);
}

#[test]
fn materialize_aborts_on_unknown_category() {
    let conn = fixture_connection();
    let lookups = fixture_lookups(&conn);
    let parser = MgiIdParser::new().expect("id parser");
    let line = data_line(["add", "no_such_category", "MGI:201", "RV:0000002", "MGI:102", "", "IDA"], NO_PROPERTIES);

    let err = materialize([line.as_str()], &lookups, &parser).expect_err("unknown category must abort");
    assert_eq!(err.to_string(), "FATAL ERROR Category: no_such_category does not exist");
}

#[test]
fn bulk_load_replaces_previous_staging_rows() {
    let mut conn = fixture_connection();
    let lookups = fixture_lookups(&conn);
    let first = vec![
        data_line(["add", "mutation_involves", "MGI:201", "RV:0000002", "MGI:102", "", "IDA"], NO_PROPERTIES),
        data_line(["add", "mutation_involves", "MGI:202", "RV:0000002", "MGI:101", "", "IDA"], NO_PROPERTIES),
    ];
    stage(&mut conn, &lookups, &first);
    stage(&mut conn, &lookups, &first[..1]);

    let count: i64 = conn
        .query_row(&format!("SELECT COUNT(*) FROM {TABLE}"), [], |row| row.get(0))
        .expect("count staged rows");
    assert_eq!(count, 1);
    assert!(StagingTable::new("bad name; drop").is_err());
    assert_eq!(staging_table().to_string(), TABLE);
}

#[test]
fn parse_header_rejects_property_in_fixed_columns() {
    let conn = fixture_connection();
    let lookups = fixture_lookups(&conn);
    let header = "action\tcategory\torganizer\torganizer symbol\tProperty:score\trelationship name";

    let Err(HeaderError::InvalidProperties(problems)) = parse_header(header, &lookups) else {
        panic!("expected invalid property header");
    };
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].section, Section::InvalidPropertyHeaders);
    assert_eq!(
        problems[0].line,
        format!("{:<12}  {:<20}  {:<30}", 1, "property:score", "Property header in column 1-13")
    );
}

#[test]
fn parse_header_reports_unknown_and_malformed_property_headers() {
    let conn = fixture_connection();
    let lookups = fixture_lookups(&conn);
    let header = format!("{HEADER}\tProperty:colour\tProperty : a : b");

    let Err(HeaderError::InvalidProperties(problems)) = parse_header(&header, &lookups) else {
        panic!("expected invalid property headers");
    };
    let reasons = problems
        .iter()
        .map(|finding| finding.line.trim_end().to_string())
        .collect::<Vec<String>>();
    assert!(reasons[0].ends_with("Invalid property value"));
    assert!(reasons[1].ends_with("Property header with invalid format"));
}

#[test]
fn parse_header_maps_property_columns_and_requires_action() {
    let conn = fixture_connection();
    let lookups = fixture_lookups(&conn);

    let layout = header_layout(&lookups);
    assert_eq!(layout.column_count, 18);
    assert_eq!(layout.properties.len(), 5);
    assert_eq!(layout.properties[0].tail_index, 0);
    assert_eq!(layout.properties[0].name, "score");
    assert_eq!(layout.properties[4].name, "data_source");

    assert!(matches!(
        parse_header("add\tmutation_involves", &lookups),
        Err(HeaderError::Missing)
    ));
}

#[test]
fn parse_score_strips_and_reapplies_one_sign() {
    assert_eq!(parse_score("+2.5"), Ok(2.5));
    assert_eq!(parse_score("-1.2"), Ok(-1.2));
    assert_eq!(parse_score("3"), Ok(3.0));
    assert_eq!(parse_score("abc"), Err("abc".to_string()));
    assert_eq!(parse_score("-abc"), Err("abc".to_string()));
}

#[test]
fn classify_row_accepts_valid_add_with_default_qualifier() {
    let conn = fixture_connection();
    let lookups = fixture_lookups(&conn);
    let line = data_line(
        ["add", "mutation_involves", "MGI:201", "RV:0000002", "MGI:102", "", "IDA"],
        ["+2.5", "", "", "", ""],
    );

    let row = classify(&lookups, &line);
    assert!(row.is_accepted(), "unexpected findings: {:?}", rejected(&row));
    assert!(row.warnings.is_empty());
    assert_eq!(row.action, Some(Action::Add));
    assert_eq!(row.populated_properties, vec!["score".to_string()]);
    assert!(row.delete.is_none());
}

#[test]
fn classify_row_reports_invalid_score_with_stripped_text() {
    let conn = fixture_connection();
    let lookups = fixture_lookups(&conn);
    let line = data_line(
        ["add", "mutation_involves", "MGI:201", "RV:0000002", "MGI:102", "", "IDA"],
        ["-abc", "", "", "", ""],
    );

    let findings = rejected(&classify(&lookups, &line));
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].section, Section::InvalidPropertyValue);
    assert_eq!(
        findings[0].line,
        format!("{:<12}   {:<20}  {:<20}", 2, "score", "abc")
    );
}

#[test]
fn classify_row_flags_fixed_column_lookups() {
    let conn = fixture_connection();
    let lookups = fixture_lookups(&conn);
    let mut columns = data_line(
        ["Insert", "mutation_involves", "MGI:201", "RV:0000003", "MGI:102", "bogus", "XYZ"],
        NO_PROPERTIES,
    )
    .split('\t')
    .map(str::to_string)
    .collect::<Vec<String>>();
    columns[10] = "J:9".to_string();
    columns[11] = "Retired".to_string();

    let findings = rejected(&classify(&lookups, &columns.join("\t")));
    let sections = findings
        .iter()
        .map(|finding| finding.section.clone())
        .collect::<Vec<Section>>();
    assert_eq!(
        sections,
        vec![
            Section::InvalidAction,
            Section::InvalidQualifier,
            Section::InvalidEvidence,
            Section::InvalidReference,
            Section::InvalidUser,
            Section::ObsoleteRelationshipId,
        ]
    );
    assert_eq!(findings[0].line, line_value_row(2, "insert"));
    assert_eq!(findings[1].line, line_value_row(2, "bogus"));
    assert_eq!(findings[4].line, line_value_row(2, "retired"));
}

#[test]
fn classify_row_stops_at_unknown_category() {
    let conn = fixture_connection();
    let lookups = fixture_lookups(&conn);
    let line = data_line(["add", "Unknown_Cat", "MGI:201", "RV:9", "MGI:102", "bogus", "IDA"], NO_PROPERTIES);

    let findings = rejected(&classify(&lookups, &line));
    assert_eq!(findings, vec![Finding::new(Section::InvalidCategory, line_value_row(2, "unknown_cat"))]);
}

#[test]
fn classify_row_checks_relationship_vocab_and_dag() {
    let conn = fixture_connection();
    let lookups = fixture_lookups(&conn);

    let dag = data_line(["add", "mutation_involves", "MGI:201", "RV:0000006", "MGI:102", "", "IDA"], NO_PROPERTIES);
    let findings = rejected(&classify(&lookups, &dag));
    assert_eq!(findings, vec![Finding::new(Section::RelationshipDagMismatch, line_value_row(2, "rv:0000006"))]);

    let vocab = data_line(["add", "legacy_involves", "MGI:201", "RV:0000002", "MGI:102", "", "IDA"], NO_PROPERTIES);
    let findings = rejected(&classify(&lookups, &vocab));
    assert_eq!(findings, vec![Finding::new(Section::RelationshipVocabMismatch, line_value_row(2, "rv:0000002"))]);

    let unknown = data_line(["add", "mutation_involves", "MGI:201", "RV:7777777", "MGI:102", "", "IDA"], NO_PROPERTIES);
    let findings = rejected(&classify(&lookups, &unknown));
    assert_eq!(findings, vec![Finding::new(Section::InvalidRelationshipId, line_value_row(2, "rv:7777777"))]);
}

#[test]
fn classify_row_rejects_lines_missing_property_columns() {
    let conn = fixture_connection();
    let lookups = fixture_lookups(&conn);
    let line = data_line(["add", "mutation_involves", "MGI:201", "RV:0000002", "MGI:102", "", "IDA"], NO_PROPERTIES);
    let short = line.split('\t').take(15).collect::<Vec<&str>>().join("\t");

    let row = classify(&lookups, &short);
    assert_eq!(
        rejected(&row),
        vec![Finding::new(Section::MissingPropertyColumns, line_value_row(2, &short))]
    );
    assert_eq!(row.action, None);
}

#[test]
fn classify_row_only_requests_deletes_for_clean_rows() {
    let conn = fixture_connection();
    let lookups = fixture_lookups(&conn);

    let clean = data_line(["delete", "mutation_involves", "MGI:201", "RV:0000002", "MGI:102", "", "TAS"], NO_PROPERTIES);
    let request = classify(&lookups, &clean).delete.expect("delete request");
    assert_eq!(request.category.key, 1003);
    assert_eq!(request.relationship.term_key, 101);
    assert_eq!(request.qualifier, "not specified");
    assert_eq!(request.qualifier_key, 200);
    assert_eq!(request.evidence_key, 211);
    assert_eq!(request.reference_key, 500);

    let dirty = data_line(["delete", "mutation_involves", "MGI:201", "RV:0000002", "MGI:102", "", "XYZ"], NO_PROPERTIES);
    let row = classify(&lookups, &dirty);
    assert!(row.delete.is_none());
    assert!(!row.is_accepted());
}

#[test]
fn classify_row_enforces_expresses_component_properties() {
    let conn = fixture_connection();
    let lookups = fixture_lookups(&conn);
    let ec_finding = |section: Section, value: &str, reason: &str| {
        Finding::new(section, format!("{:<12}  {:<20}  {:<40}", 2, value, reason))
    };

    let missing_organism = data_line(
        ["add", "expresses_component", "MGI:202", "RV:0000004", "MGI:101", "", "IDA"],
        ["", "", "GATA1", "2623", ""],
    );
    assert_eq!(
        rejected(&classify(&lookups, &missing_organism)),
        vec![ec_finding(
            Section::InvalidExpressesComponent,
            "non-mouse_organism",
            "Required for expresses_an_orthologous_gene"
        )]
    );

    let missing_gene_id = data_line(
        ["add", "expresses_component", "MGI:202", "RV:0000004", "MGI:101", "", "IDA"],
        ["", "human", "GATA1", "", ""],
    );
    let row = classify(&lookups, &missing_gene_id);
    assert!(row.is_accepted());
    assert_eq!(
        row.warnings,
        vec![ec_finding(
            Section::ExpressesComponentWarning,
            "non-mouse_ncbi_gene_id",
            "Missing for expresses_an_orthologous_gene"
        )]
    );

    let mouse_gene = data_line(
        ["add", "expresses_component", "MGI:202", "RV:0000005", "MGI:101", "", "IDA"],
        ["", "", "Gata1", "", ""],
    );
    assert_eq!(
        rejected(&classify(&lookups, &mouse_gene)),
        vec![ec_finding(
            Section::InvalidExpressesComponent,
            "non-mouse_gene_symbol",
            "Must be empty for expresses_mouse_gene"
        )]
    );
}

#[test]
fn classify_row_cross_checks_external_gene_symbols() {
    let conn = fixture_connection();
    let lookups = fixture_lookups(&conn);

    let mismatch = data_line(
        ["add", "expresses_component", "MGI:202", "RV:0000004", "MGI:101", "", "IDA"],
        ["", "human", "Gata1", "2623", ""],
    );
    let row = classify(&lookups, &mismatch);
    assert!(row.is_accepted());
    assert_eq!(row.warnings.len(), 1);
    assert!(row.warnings[0].line.contains("Symbol Gata1 does not match GATA1"));

    let unknown = data_line(
        ["add", "expresses_component", "MGI:202", "RV:0000004", "MGI:101", "", "IDA"],
        ["", "human", "FOO", "9999", ""],
    );
    let row = classify(&lookups, &unknown);
    assert!(row.warnings[0].line.contains("NCBI gene ID not found"));

    let suppressed = data_line(
        ["add", "expresses_component", "MGI:202", "RV:0000004", "MGI:101", "bogus", "IDA"],
        ["", "human", "FOO", "9999", ""],
    );
    let row = classify(&lookups, &suppressed);
    assert!(row.warnings.is_empty());
    assert!(!row.is_accepted());
}

#[test]
fn classify_row_rejects_existing_expresses_component_relationship() {
    let conn = fixture_connection();
    let lookups = fixture_lookups(&conn);
    let line = data_line(
        ["add", "expresses_component", "MGI:204", "RV:0000004", "mgi:101", "", "ida"],
        ["", "Human", "GATA1", "2623", ""],
    );

    let findings = rejected(&classify(&lookups, &line));
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].section, Section::DuplicateExpressesComponent);
    assert!(findings[0].line.starts_with(&format!("{:<12}  add", 2)));
}

#[test]
fn validate_identities_reports_missing_wrong_type_and_status() {
    let mut conn = fixture_connection();
    let lookups = fixture_lookups(&conn);
    let lines = vec![
        data_line(["add", "mutation_involves", "MGI:999", "RV:0000002", "MGI:102", "", "IDA"], NO_PROPERTIES),
        data_line(["add", "mutation_involves", "MGI:101", "RV:0000002", "MGI:102", "", "IDA"], NO_PROPERTIES),
        data_line(["add", "mutation_involves", "MGI:203", "RV:0000002", "MGI:103", "", "IDA"], NO_PROPERTIES),
        data_line(["add", "mutation_involves", "MGI:203", "RV:0000002", "MGI:103", "", "IDA"], NO_PROPERTIES),
    ];
    stage(&mut conn, &lookups, &lines);

    let findings = validate_identities(&conn, &staging_table(), &lookups).expect("identity checks");
    let section = Section::Identity("Allele/Marker".to_string(), IdentityKind::Invalid);
    assert_eq!(
        findings.lines(&section),
        &[
            format_columns(&[("MGI:999", 12), ("", 20), ("", 20), ("Organizer does not exist", 30)]),
            format_columns(&[
                ("MGI:101", 12),
                ("Marker", 20),
                ("", 20),
                ("Organizer exists for non-allele", 30)
            ]),
            format_columns(&[
                ("MGI:203", 12),
                ("Allele", 20),
                ("Deleted", 20),
                ("Organizer allele status is invalid", 30)
            ]),
            format_columns(&[
                ("MGI:103", 12),
                ("Marker", 20),
                ("withdrawn", 20),
                ("Participant marker status is invalid", 30)
            ]),
        ]
    );
    assert!(findings.has_fatal());
}

#[test]
fn validate_identities_reports_secondary_ids() {
    let mut conn = fixture_connection();
    let lookups = fixture_lookups(&conn);
    let lines = vec![data_line(
        ["add", "mutation_involves", "MGI:201", "RV:0000002", "MGI:199", "", "IDA"],
        NO_PROPERTIES,
    )];
    stage(&mut conn, &lookups, &lines);

    let findings = validate_identities(&conn, &staging_table(), &lookups).expect("identity checks");
    let section = Section::Identity("Allele/Marker".to_string(), IdentityKind::Secondary);
    assert_eq!(
        findings.lines(&section),
        &[format_columns(&[
            ("MGI:199", 12),
            ("Shh", 20),
            ("MGI:102", 20),
            ("Participant", 28)
        ])]
    );
    assert!(findings.lines(&Section::Identity("Allele/Marker".to_string(), IdentityKind::Invalid)).is_empty());
}

#[test]
fn chromosome_mismatches_are_warnings_with_exemptions() {
    let mut conn = fixture_connection();
    let lookups = fixture_lookups(&conn);
    let lines = vec![
        data_line(["add", "mutation_involves", "MGI:202", "RV:0000002", "MGI:102", "", "IDA"], NO_PROPERTIES),
        data_line(["add", "mutation_involves", "MGI:202", "rv:0001555", "MGI:102", "", "IDA"], NO_PROPERTIES),
        data_line(["add", "expresses_component", "MGI:202", "RV:0000004", "MGI:102", "", "IDA"], NO_PROPERTIES),
        data_line(["add", "mutation_involves", "MGI:202", "RV:0000002", "MGI:105", "", "IDA"], NO_PROPERTIES),
    ];
    stage(&mut conn, &lookups, &lines);

    let findings = validate_identities(&conn, &staging_table(), &lookups).expect("identity checks");
    let section = Section::ChromosomeMismatch("Allele/Marker".to_string());
    assert_eq!(
        findings.lines(&section),
        &[format_columns(&[("MGI:202", 20), ("X", 20), ("MGI:102", 20), ("5", 20)])]
    );
    assert!(!findings.has_fatal());
    assert_eq!(findings.outcome(), QcOutcome::Warnings);
}

#[test]
fn chromosomes_compatible_accepts_pseudoautosomal_pairs() {
    assert!(chromosomes_compatible("X", "XY"));
    assert!(chromosomes_compatible("XY", "Y"));
    assert!(chromosomes_compatible("5", "5"));
    assert!(!chromosomes_compatible("X", "Y"));
    assert!(!chromosomes_compatible("1", "5"));
}

#[test]
fn resolve_delete_builds_statement_and_preview() {
    let conn = fixture_connection();
    let lookups = fixture_lookups(&conn);
    let line = data_line(["delete", "mutation_involves", "MGI:201", "RV:0000002", "MGI:102", "", "TAS"], NO_PROPERTIES);
    let request = classify(&lookups, &line).delete.expect("delete request");

    let DeleteResolution::Found(planned) = resolve_delete(&conn, &request).expect("resolve delete") else {
        panic!("expected relationship 900 to resolve");
    };
    assert_eq!(planned.len(), 1);
    assert_eq!(
        planned[0].statement(),
        "delete from MGI_Relationship where _Relationship_key = 900;"
    );
    assert_eq!(
        planned[0].preview,
        "mutation_involves\tMGI:201\tShh<tm1>\tRV:0000002\tdeletion_involves\tMGI:102\tShh\tnot specified\ttas\tj:1000\tscore:\"1.0\"\tcurated"
    );
}

#[test]
fn resolve_deletes_reports_rows_not_in_database() {
    let conn = fixture_connection();
    let lookups = fixture_lookups(&conn);
    let line = data_line(["delete", "mutation_involves", "MGI:201", "RV:0000002", "MGI:102", "", "IDA"], NO_PROPERTIES);
    let request = classify(&lookups, &line).delete.expect("delete request");

    let mut findings = Findings::default();
    let plan = resolve_deletes(&conn, &[request], &mut findings).expect("resolve deletes");
    assert!(plan.deletes.is_empty());
    assert_eq!(
        findings.lines(&Section::DeleteNotInDatabase),
        &[format!("{:<12}   {:<68}", 2, line.trim())]
    );
}

#[test]
fn resolve_deletes_plans_each_relationship_once() {
    let conn = fixture_connection();
    let lookups = fixture_lookups(&conn);
    let line = data_line(["delete", "mutation_involves", "MGI:201", "RV:0000002", "MGI:102", "", "TAS"], NO_PROPERTIES);
    let request = classify(&lookups, &line).delete.expect("delete request");
    let mut repeat = request.clone();
    repeat.line_number = 3;

    let mut findings = Findings::default();
    let plan = resolve_deletes(&conn, &[request, repeat], &mut findings).expect("resolve deletes");
    assert_eq!(
        plan.statements(),
        vec!["delete from MGI_Relationship where _Relationship_key = 900;".to_string()]
    );
    assert!(findings.lines(&Section::DeleteNotInDatabase).is_empty());

    let path = Path::new("out/fearQC_delete.rpt");
    assert!(
        render_warning_report(&findings, &plan, path)
            .contains("will delete 1 relationship records from the database")
    );
}

#[test]
fn render_section_matches_fixed_width_layout() {
    let line = line_value_row(7, "insert");
    let rendered = render_section(&Section::InvalidAction, std::slice::from_ref(&line));
    assert_eq!(
        rendered,
        format!(
            "\n\n{}\n{:<12}  {:<20}\n{}  {}\n{}",
            center("Invalid Action Values", 60),
            "Line#",
            "Action",
            "-".repeat(12),
            "-".repeat(20),
            line
        )
    );

    let deletes = render_section(&Section::DeleteNotInDatabase, &["x".to_string()]);
    assert!(deletes.contains(&format!("{:<12}  {:<68} \n", "Line#", "Line")));

    let empty = render_section(&Section::EmptyPropertyColumns, &["data_source".to_string()]);
    assert_eq!(empty, "\nProperty Columns with no Data: \n    data_source\n");
}

#[test]
fn delete_outputs_require_a_run_without_fatal_findings() {
    let plan = DeletePlan {
        deletes: vec![PlannedDelete {
            relationship_key: 900,
            preview: "preview".to_string(),
        }],
    };
    let path = Path::new("out/fearQC_delete.rpt");

    let clean = Findings::default();
    assert_eq!(
        render_delete_sql(&clean, &plan),
        "delete from MGI_Relationship where _Relationship_key = 900;\n"
    );
    assert_eq!(
        render_warning_report(&clean, &plan, path),
        "\nProcessing the specified input file will delete 1 relationship records from the database. See out/fearQC_delete.rpt for details \n"
    );
    assert!(render_delete_report(&clean, &plan).ends_with(&format!("{}\npreview", "-".repeat(80))));

    let mut fatal = Findings::default();
    fatal.push(Section::InvalidAction, line_value_row(2, "insert"));
    assert_eq!(render_delete_sql(&fatal, &plan), "");
    assert_eq!(render_delete_report(&fatal, &plan), "");
    assert_eq!(render_warning_report(&fatal, &plan, path), "");
}

struct RunFixture {
    _dir: tempfile::TempDir,
    args: QcArgs,
}

impl RunFixture {
    fn new(input: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("mgd.sqlite");
        let conn = Connection::open(&db_path).expect("create fixture db");
        conn.execute_batch(FIXTURE_SQL).expect("seed fixture");
        drop(conn);

        let input_path = dir.path().join("fear_input.txt");
        fs::write(&input_path, input).expect("write input");

        let args = QcArgs {
            input: input_path,
            db_path,
            output_dir: dir.path().join("reports"),
            qc_report_path: None,
            warning_report_path: None,
            delete_report_path: None,
            delete_sql_path: None,
            staging_bcp_path: None,
            staging_table: TABLE.to_string(),
            run_manifest_path: None,
        };
        Self { _dir: dir, args }
    }

    fn output(&self, name: &str) -> String {
        fs::read_to_string(self.args.output_dir.join(name)).expect("read output")
    }
}

#[test]
fn qc_run_with_clean_input_writes_delete_outputs() {
    let input = [
        HEADER.to_string(),
        data_line(
            ["add", "mutation_involves", "MGI:201", "RV:0000002", "MGI:102", "", "IDA"],
            ["+2.5", "", "", "", ""],
        ),
        String::new(),
        data_line(["delete", "mutation_involves", "MGI:201", "RV:0000002", "MGI:102", "", "TAS"], NO_PROPERTIES),
    ]
    .join("\n");
    let fixture = RunFixture::new(&input);

    let code = run(fixture.args.clone()).expect("qc run");
    assert_eq!(code, 0);

    let delete_report_path = fixture.args.output_dir.join("fearQC_delete.rpt");
    assert_eq!(fixture.output("fearQC.rpt"), "");
    assert_eq!(
        fixture.output("fearQC_warn.rpt"),
        format!(
            "\nProperty Columns with no Data: \n    non-mouse_organism\n    non-mouse_gene_symbol\n    non-mouse_ncbi_gene_id\n    data_source\n\nProcessing the specified input file will delete 1 relationship records from the database. See {} for details \n",
            delete_report_path.display()
        )
    );
    assert_eq!(
        fixture.output("fearQC_delete.sql"),
        "delete from MGI_Relationship where _Relationship_key = 900;\n"
    );
    assert!(fixture.output("fearQC_delete.rpt").contains("deletion_involves"));
    assert_eq!(
        fixture.output("fearQC_mgiid.bcp"),
        "201\t11\t102\t2\tRV:0000002\tmutation_involves\n201\t11\t102\t2\tRV:0000002\tmutation_involves\n"
    );

    let manifest: QcRunManifest =
        serde_json::from_str(&fixture.output("fearqc_run.json")).expect("parse manifest");
    assert_eq!(manifest.outcome, "warnings");
    assert_eq!(manifest.exit_code, 0);
    assert_eq!(manifest.counts.data_rows, 2);
    assert_eq!(manifest.counts.add_rows, 1);
    assert_eq!(manifest.counts.delete_rows, 1);
    assert_eq!(manifest.counts.staged_rows, 2);
    assert_eq!(manifest.counts.deletes_resolved, 1);
    assert_eq!(manifest.input_sha256.len(), 64);
    assert_eq!(manifest.warning_sections, vec!["Property Columns with no Data"]);
}

#[test]
fn qc_run_reports_are_identical_across_repeated_runs() {
    let input = [
        HEADER.to_string(),
        data_line(["add", "mutation_involves", "bad1", "RV:0000003", "MGI:103", "", "IDA"], ["abc", "", "", "", ""]),
        data_line(["add", "mutation_involves", "MGI:202", "RV:0000002", "MGI:102", "", "IDA"], NO_PROPERTIES),
    ]
    .join("\n");
    let fixture = RunFixture::new(&input);
    let names = ["fearQC.rpt", "fearQC_warn.rpt", "fearQC_delete.rpt", "fearQC_delete.sql"];

    assert_eq!(run(fixture.args.clone()).expect("first run"), 2);
    let first = names.map(|name| fixture.output(name));
    assert_eq!(run(fixture.args.clone()).expect("second run"), 2);
    let second = names.map(|name| fixture.output(name));
    assert_eq!(first, second);

    let qc_report = &first[0];
    let order = [
        "Invalid MGI IDs",
        "Invalid Allele/Marker Relationships",
        "Obsolete Relationship IDs",
        "Invalid Property Values",
    ];
    let positions = order
        .iter()
        .map(|title| qc_report.find(title).expect("section present"))
        .collect::<Vec<usize>>();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(first[1].contains("Mismatched chromosome in Allele/Marker Relationships"));
}

#[test]
fn qc_run_with_fatal_rows_suppresses_delete_outputs() {
    let input = [
        HEADER.to_string(),
        data_line(
            ["add", "mutation_involves", "MGI:201", "RV:0000002", "MGI:102", "", "IDA"],
            ["abc", "", "", "", ""],
        ),
        data_line(["delete", "mutation_involves", "MGI:201", "RV:0000002", "MGI:102", "", "TAS"], NO_PROPERTIES),
    ]
    .join("\n");
    let fixture = RunFixture::new(&input);

    assert_eq!(run(fixture.args.clone()).expect("qc run"), 2);
    assert!(fixture.output("fearQC.rpt").contains("Invalid Property Values"));
    assert_eq!(fixture.output("fearQC_delete.sql"), "");
    assert_eq!(fixture.output("fearQC_delete.rpt"), "");
    assert!(!fixture.output("fearQC_warn.rpt").contains("Processing the specified input file"));
}

#[test]
fn qc_run_without_header_writes_marker_and_exits_two() {
    let input = data_line(["add", "mutation_involves", "MGI:201", "RV:0000002", "MGI:102", "", "IDA"], NO_PROPERTIES);
    let fixture = RunFixture::new(&input);

    assert_eq!(run(fixture.args.clone()).expect("qc run"), 2);
    assert_eq!(fixture.output("fearQC.rpt"), "!!!!No Header Line in File!!!!");

    let manifest: QcRunManifest =
        serde_json::from_str(&fixture.output("fearqc_run.json")).expect("parse manifest");
    assert_eq!(manifest.outcome, "fatal");
    assert_eq!(manifest.fatal_sections, vec!["No Header Line in File"]);
}

#[test]
fn qc_run_with_bad_property_header_writes_only_that_section() {
    let header = HEADER.replacen("relationship id", "Property:score", 1);
    let input = [
        header,
        data_line(["add", "no_such_category", "MGI:201", "RV:0000002", "MGI:102", "", "IDA"], NO_PROPERTIES),
    ]
    .join("\n");
    let fixture = RunFixture::new(&input);

    assert_eq!(run(fixture.args.clone()).expect("qc run"), 2);
    let qc_report = fixture.output("fearQC.rpt");
    assert!(qc_report.starts_with(&format!("\n\n{}\n", center("Invalid Properties", 60))));
    assert!(qc_report.contains("Property header in column 1-13"));
    assert_eq!(qc_report.matches("\n\n").count(), 1);
}

#[test]
fn qc_run_aborts_on_unknown_category() {
    let input = [
        HEADER.to_string(),
        data_line(["add", "no_such_category", "MGI:201", "RV:0000002", "MGI:102", "", "IDA"], NO_PROPERTIES),
    ]
    .join("\n");
    let fixture = RunFixture::new(&input);

    let err = run(fixture.args.clone()).expect_err("unknown category aborts");
    assert!(format!("{err:#}").contains("FATAL ERROR Category: no_such_category does not exist"));
}
