use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AppError {
    #[snafu(display("failed to load puzzle catalog"))]
    LoadCatalog {
        stage: &'static str,
        source: hintline_catalog::CatalogError,
    },
    #[snafu(display("no API key configured; set HINTLINE_API_KEY or edit the settings file"))]
    MissingApiKey { stage: &'static str },
    #[snafu(display("failed to construct completion provider"))]
    CreateProvider {
        stage: &'static str,
        source: hintline_llm::ProviderError,
    },
    #[snafu(display("failed to build tokio runtime"))]
    BuildRuntime {
        stage: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("failed to read user input"))]
    ReadInput {
        stage: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("failed to write to stdout"))]
    WriteOutput {
        stage: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("failed to bind chat endpoint on {address}: {message}"))]
    BindServer {
        stage: &'static str,
        address: String,
        message: String,
    },
}

pub type AppResult<T> = Result<T, AppError>;
