//! RDFa extraction from HTML, producing RDF quads in the default graph.
//!
//! ```no_run
//! let dataset = rdfa2quads::parse("page.html")?;
//! for quad in &dataset {
//!     println!("{quad}");
//! }
//! # Ok::<(), rdfa2quads::Error>(())
//! ```

use std::path::PathBuf;

use oxiri::Iri;

pub mod dataset;
pub mod dom;
pub mod extract;
pub mod input;
pub mod map;
pub mod normalize;
pub mod registry;
pub mod vocab;

pub use dataset::{Dataset, Quad};
pub use dom::{Document, MarkupSerializer, NodeList, SerializeError};
pub use extract::{ExtractError, Extractor, RdfaProcessor, initial_context_prefixes};
pub use input::Input;
pub use map::{ObjectPayload, PredicateMap, RdfaObject, SubjectMap};
pub use normalize::normalize;
pub use registry::{HtmlRdfaParser, ParserRegistry, RdfParser};

/// Used when neither the input nor the options provide a base IRI.
pub const DEFAULT_BASE: &str = "http://localhost/";

#[derive(derive_more::Error, derive_more::Display, Debug)]
pub enum Error {
    #[display("data must be a file path, HTML string, URL or a DOM element")]
    UnsupportedInput,

    #[display("failed to fetch <{url}>")]
    Fetch { source: reqwest::Error, url: String },

    #[display("no such file: {}", path.display())]
    NotFound {
        source: std::io::Error,
        path: PathBuf,
    },

    #[display("failed to read {}", path.display())]
    Read {
        source: std::io::Error,
        path: PathBuf,
    },

    #[display("malformed markup: {}", errors.join("; "))]
    MalformedMarkup { errors: Vec<String> },

    #[display("not a local file URL: <{url}>")]
    InvalidFileUrl { url: String },

    #[display("IRI parse error: `{iri}`")]
    IriParseError {
        source: oxiri::IriParseError,
        iri: String,
    },

    #[display("RDFa extraction failed: {_0}")]
    Extraction(ExtractError),

    #[display("failed to serialize literal: {_0}")]
    Serialization(SerializeError),

    #[display("no parser registered for format `{format}`")]
    UnknownFormat { format: String },
}

impl From<ExtractError> for Error {
    fn from(value: ExtractError) -> Self {
        Error::Extraction(value)
    }
}

impl From<SerializeError> for Error {
    fn from(value: SerializeError) -> Self {
        Error::Serialization(value)
    }
}

/// Knobs for [`parse_with_options`].
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Base IRI to use instead of the one the input implies.
    /// A `<base href>` in the document still takes precedence.
    pub base: Option<Iri<String>>,
    /// Base IRI when nothing else provides one.
    pub default_base: Iri<String>,
    /// Fail on HTML parse errors instead of logging them.
    pub strict_markup: bool,
    /// Apply `rdfa:copy` property copying after extraction.
    pub property_copying: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            base: None,
            default_base: Iri::parse_unchecked(DEFAULT_BASE.to_string()),
            strict_markup: false,
            property_copying: true,
        }
    }
}

impl ParseOptions {
    pub fn with_base(self, base: Iri<String>) -> Self {
        Self {
            base: Some(base),
            ..self
        }
    }

    pub fn with_default_base(self, default_base: Iri<String>) -> Self {
        Self {
            default_base,
            ..self
        }
    }

    pub fn with_strict_markup(self, strict_markup: bool) -> Self {
        Self {
            strict_markup,
            ..self
        }
    }

    pub fn with_property_copying(self, property_copying: bool) -> Self {
        Self {
            property_copying,
            ..self
        }
    }
}

/// Parses a file path, URL, HTML string or DOM with the default options.
pub fn parse(input: impl Into<Input>) -> Result<Dataset, Error> {
    parse_with_options(input, &ParseOptions::default())
}

pub fn parse_with_options(
    input: impl Into<Input>,
    options: &ParseOptions,
) -> Result<Dataset, Error> {
    let document = input::resolve(input.into(), options)?;
    let processor = RdfaProcessor::new().with_property_copying(options.property_copying);
    parse_document(&document, &processor)
}

/// Callback flavour of [`parse`]: `callback` receives the dataset or the first error.
pub fn parse_with<F>(input: impl Into<Input>, callback: F)
where
    F: FnOnce(Result<Dataset, Error>),
{
    callback(parse(input))
}

/// Runs extraction and normalization over an already-resolved document.
pub fn parse_document(document: &Document, extractor: &impl Extractor) -> Result<Dataset, Error> {
    let map = extractor.extract(document)?;
    tracing::debug!(
        "extracted {} subjects with {} objects",
        map.len(),
        map.object_count()
    );
    Ok(normalize(&map, document)?)
}
