mod error;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use snafu::{OptionExt, ResultExt, ensure};

pub use error::{CatalogError, CatalogResult};
use error::{
    DuplicateKeySnafu, MalformedRowSnafu, MissingHeaderSnafu, ReadCatalogSnafu, UnknownColumnSnafu,
};

/// Maximum number of hint columns a catalog row may carry.
pub const MAX_HINTS: usize = 4;

const EXPECTED_COLUMNS: [&str; 7] = [
    "room",
    "puzzle_name",
    "description",
    "hint1",
    "hint2",
    "hint3",
    "hint4",
];

/// Identity of a puzzle: exact, case-sensitive `(room, puzzle_name)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PuzzleKey {
    pub room: String,
    pub puzzle_name: String,
}

impl PuzzleKey {
    pub fn new(room: impl Into<String>, puzzle_name: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            puzzle_name: puzzle_name.into(),
        }
    }
}

impl fmt::Display for PuzzleKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} in {}", self.puzzle_name, self.room)
    }
}

/// One catalog row. Immutable after load; hints keep their column order with
/// empty cells already excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuzzleRecord {
    key: PuzzleKey,
    description: Option<String>,
    hints: Vec<String>,
}

impl PuzzleRecord {
    pub fn new(key: PuzzleKey, description: Option<String>, hints: Vec<String>) -> Self {
        Self {
            key,
            description,
            hints,
        }
    }

    pub fn key(&self) -> &PuzzleKey {
        &self.key
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn hints(&self) -> &[String] {
        &self.hints
    }
}

/// Read-only set of puzzle records, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<PuzzleRecord>,
    index: HashMap<PuzzleKey, usize>,
}

impl Catalog {
    /// Loads the catalog from a TSV file with a fixed header row.
    ///
    /// A missing file, unknown header, malformed row, or duplicate
    /// `(room, puzzle_name)` pair fails the whole load; there is no partial
    /// catalog.
    pub fn load(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).context(ReadCatalogSnafu {
            stage: "read-catalog-file",
            path: display_path(path),
        })?;

        let catalog = Self::parse(&text, &display_path(path))?;

        let room_count = catalog
            .records
            .iter()
            .map(|record| record.key.room.as_str())
            .collect::<std::collections::HashSet<_>>()
            .len();
        tracing::info!(
            puzzle_count = catalog.records.len(),
            room_count,
            path = %path.display(),
            "loaded puzzle catalog"
        );

        Ok(catalog)
    }

    /// Builds a catalog from already-constructed records, rejecting duplicate
    /// keys the same way a file load would.
    pub fn from_records(records: Vec<PuzzleRecord>) -> CatalogResult<Self> {
        let mut index = HashMap::new();
        for (position, record) in records.iter().enumerate() {
            ensure!(
                !index.contains_key(&record.key),
                DuplicateKeySnafu {
                    stage: "index-catalog-record",
                    line_number: position + 1,
                    room: record.key.room.clone(),
                    puzzle_name: record.key.puzzle_name.clone(),
                }
            );
            index.insert(record.key.clone(), position);
        }

        Ok(Self { records, index })
    }

    fn parse(text: &str, path: &str) -> CatalogResult<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header) = lines.next().context(MissingHeaderSnafu {
            stage: "read-catalog-header",
            path: path.to_string(),
        })?;
        validate_header(header)?;

        let mut records = Vec::new();
        let mut index = HashMap::new();

        for (line_index, line) in lines {
            let record = parse_row(line, line_index + 1)?;
            ensure!(
                !index.contains_key(&record.key),
                DuplicateKeySnafu {
                    stage: "index-catalog-row",
                    line_number: line_index + 1,
                    room: record.key.room.clone(),
                    puzzle_name: record.key.puzzle_name.clone(),
                }
            );
            index.insert(record.key.clone(), records.len());
            records.push(record);
        }

        Ok(Self { records, index })
    }

    /// Exact, case-sensitive lookup on both key fields. Fuzzy resolution is
    /// the query matcher's job, never this layer's.
    pub fn lookup(&self, key: &PuzzleKey) -> Option<&PuzzleRecord> {
        self.index.get(key).map(|position| &self.records[*position])
    }

    pub fn records(&self) -> impl Iterator<Item = &PuzzleRecord> {
        self.records.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &PuzzleKey> {
        self.records.iter().map(PuzzleRecord::key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn validate_header(header: &str) -> CatalogResult<()> {
    let columns = header.split('\t').map(str::trim).collect::<Vec<_>>();

    for (position, found) in columns.iter().enumerate() {
        let expected = EXPECTED_COLUMNS.get(position).copied().unwrap_or("");
        ensure!(
            *found == expected,
            UnknownColumnSnafu {
                stage: "validate-catalog-header",
                position,
                found: found.to_string(),
                expected,
            }
        );
    }
    ensure!(
        columns.len() == EXPECTED_COLUMNS.len(),
        UnknownColumnSnafu {
            stage: "validate-catalog-header",
            position: columns.len(),
            found: String::new(),
            expected: EXPECTED_COLUMNS[columns.len().min(EXPECTED_COLUMNS.len() - 1)],
        }
    );

    Ok(())
}

fn parse_row(line: &str, line_number: usize) -> CatalogResult<PuzzleRecord> {
    let cells = line.split('\t').map(decode_cell).collect::<Vec<_>>();

    ensure!(
        cells.len() >= 2 && cells.len() <= EXPECTED_COLUMNS.len(),
        MalformedRowSnafu {
            stage: "split-catalog-row",
            line_number,
            line: line.to_string(),
        }
    );

    let room = cells[0].trim();
    let puzzle_name = cells[1].trim();
    ensure!(
        !room.is_empty() && !puzzle_name.is_empty(),
        MalformedRowSnafu {
            stage: "read-catalog-key",
            line_number,
            line: line.to_string(),
        }
    );

    let description = cells
        .get(2)
        .map(|cell| cell.trim())
        .filter(|cell| !cell.is_empty())
        .map(str::to_string);

    // Blank hint cells are dropped here so downstream code only ever sees the
    // populated, ordered sequence.
    let hints = cells
        .iter()
        .skip(3)
        .take(MAX_HINTS)
        .map(|cell| cell.trim())
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect();

    Ok(PuzzleRecord::new(
        PuzzleKey::new(room, puzzle_name),
        description,
        hints,
    ))
}

fn decode_cell(encoded: &str) -> String {
    let mut decoded = String::with_capacity(encoded.len());
    let mut characters = encoded.chars();

    while let Some(character) = characters.next() {
        if character != '\\' {
            decoded.push(character);
            continue;
        }

        match characters.next() {
            Some('n') => decoded.push('\n'),
            Some('t') => decoded.push('\t'),
            Some('r') => decoded.push('\r'),
            Some('\\') => decoded.push('\\'),
            Some(other) => {
                decoded.push('\\');
                decoded.push(other);
            }
            None => decoded.push('\\'),
        }
    }

    decoded
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
