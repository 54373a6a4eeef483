use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use regex::Regex;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{info, warn};

use crate::cli::QcArgs;
use crate::model::{QcCounts, QcPaths, QcRunManifest};
use crate::util::{center, ensure_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

mod deletes;
mod findings;
mod header;
mod identity;
mod lookups;
mod report;
mod rows;
mod run;
mod staging;
#[cfg(test)]
mod tests;

pub use run::run;

use deletes::*;
use findings::*;
use header::*;
use identity::*;
use lookups::*;
use report::*;
use rows::*;
use staging::*;

const TAB: char = '\t';

/// Columns 1-13 are fixed; property and curator-note columns follow.
const NUM_NON_PROPERTY_COLUMNS: usize = 13;

const MGI_TYPE_REFERENCE: i64 = 1;
const MGI_TYPE_MARKER: i64 = 2;
const MGI_TYPE_ALLELE: i64 = 11;
const MGI_TYPE_VOCAB_TERM: i64 = 13;
const MGI_TYPE_RELATIONSHIP: i64 = 40;

const LOGICAL_DB_MGI: i64 = 1;
const LOGICAL_DB_ENTREZ_GENE: i64 = 55;
const LOGICAL_DB_FEAR_RELATIONSHIP: i64 = 171;

const VOCAB_QUALIFIER: i64 = 94;
const VOCAB_EVIDENCE: i64 = 95;
const VOCAB_PROPERTY: i64 = 97;

/// DAGs of the FeaR relationship vocabulary.
const RELATIONSHIP_DAG_KEYS: [i64; 5] = [44, 45, 46, 47, 54];

const USER_STATUS_ACTIVE: i64 = 316350;
const ORGANISM_MOUSE: i64 = 1;

/// Approved and autoload allele statuses; every other allele status is rejected.
const ALLELE_ACCEPTED_STATUS_KEYS: [i64; 2] = [847114, 3983021];
const MARKER_STATUS_OFFICIAL: i64 = 1;

const DEFAULT_QUALIFIER: &str = "not specified";

const CATEGORY_EXPRESSES_COMPONENT: &str = "expresses_component";
const TERM_EXPRESSES_ORTHOLOGOUS_GENE: &str = "expresses_an_orthologous_gene";
const TERM_EXPRESSES_MOUSE_GENE: &str = "expresses_mouse_gene";

/// decreased_translational_product_level does not imply co-location.
const CHROMOSOME_EXEMPT_RELATIONSHIP_ID: &str = "RV:0001555";

const PROPERTY_SCORE: &str = "score";
const PROPERTY_NON_MOUSE_ORGANISM: &str = "non-mouse_organism";
const PROPERTY_NON_MOUSE_GENE_SYMBOL: &str = "non-mouse_gene_symbol";
const PROPERTY_NON_MOUSE_GENE_ID: &str = "non-mouse_ncbi_gene_id";
