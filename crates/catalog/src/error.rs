use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CatalogError {
    #[snafu(display("failed to read puzzle catalog from {path}"))]
    ReadCatalog {
        stage: &'static str,
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("puzzle catalog at {path} is empty (missing header row)"))]
    MissingHeader {
        stage: &'static str,
        path: String,
    },
    #[snafu(display("puzzle catalog header column {position} is '{found}', expected '{expected}'"))]
    UnknownColumn {
        stage: &'static str,
        position: usize,
        found: String,
        expected: &'static str,
    },
    #[snafu(display("failed to parse puzzle catalog line {line_number}: {line}"))]
    MalformedRow {
        stage: &'static str,
        line_number: usize,
        line: String,
    },
    #[snafu(display("duplicate puzzle '{puzzle_name}' in '{room}' at line {line_number}"))]
    DuplicateKey {
        stage: &'static str,
        line_number: usize,
        room: String,
        puzzle_name: String,
    },
}

pub type CatalogResult<T> = Result<T, CatalogError>;
