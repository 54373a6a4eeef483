use super::*;

const HEADER_LINE_NUMBER: usize = 1;
const PROPERTY_PREFIX: &str = "property";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PropertyColumn {
    /// Offset into the columns that follow the fixed ones.
    pub tail_index: usize,
    pub name: String,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HeaderLayout {
    pub column_count: usize,
    pub properties: Vec<PropertyColumn>,
}

impl HeaderLayout {
    pub fn property(&self, name: &str) -> Option<&PropertyColumn> {
        self.properties
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug)]
pub enum HeaderError {
    Missing,
    InvalidProperties(Vec<Finding>),
}

/// Parses the header line. Property columns are `Property:<name>` cells,
/// matched case-insensitively with whitespace around the colon ignored.
pub fn parse_header(line: &str, lookups: &ReferenceLookups) -> Result<HeaderLayout, HeaderError> {
    let lowered = line.trim_end_matches(['\r', '\n']).to_lowercase();
    let cells = lowered.split(TAB).collect::<Vec<&str>>();

    if cells.first().map(|cell| cell.trim()) != Some("action") {
        return Err(HeaderError::Missing);
    }

    let mut layout = HeaderLayout {
        column_count: cells.len(),
        properties: Vec::new(),
    };
    let mut problems = Vec::new();

    for (index, cell) in cells.iter().enumerate() {
        let column = index + 1;
        let tokens = cell.split(':').map(str::trim).collect::<Vec<&str>>();
        if tokens.first() != Some(&PROPERTY_PREFIX) {
            continue;
        }

        let reason = if tokens.len() != 2 {
            Some("Property header with invalid format")
        } else if column <= NUM_NON_PROPERTY_COLUMNS {
            Some("Property header in column 1-13")
        } else if lookups.property_key(tokens[1]).is_none() {
            Some("Invalid property value")
        } else {
            None
        };

        match reason {
            Some(reason) => problems.push(Finding::new(
                Section::InvalidPropertyHeaders,
                format_columns(&[
                    (HEADER_LINE_NUMBER.to_string().as_str(), 12),
                    (cell.trim(), 20),
                    (reason, 30),
                ]),
            )),
            None => layout.properties.push(PropertyColumn {
                tail_index: column - NUM_NON_PROPERTY_COLUMNS - 1,
                name: tokens[1].to_string(),
            }),
        }
    }

    if !problems.is_empty() {
        warn!(problems = problems.len(), "invalid property headers");
        return Err(HeaderError::InvalidProperties(problems));
    }

    info!(
        columns = layout.column_count,
        properties = layout.properties.len(),
        "parsed header"
    );

    Ok(layout)
}
