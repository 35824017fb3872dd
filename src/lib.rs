pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod logger;
pub mod manifest;
pub mod models;
pub mod prompt;
pub mod sdapi;
pub mod source;
pub mod writer;

pub use config::{Config, GenerationConfig};
pub use driver::{BatchDriver, Pacer, TokioPacer};
pub use error::{FailureKind, GenerationError, Result, SourceError, TrendgenError, WriteError};
pub use logger::{LogReporter, Reporter};
pub use manifest::Manifest;
pub use models::*;
pub use prompt::RequestBuilder;
pub use sdapi::{ImageClient, ImageGenerator};
pub use source::SourceReader;
pub use writer::OutputWriter;
