//! Format-keyed parser registry, for hosts that pick a parser by content type.
//!
//! ```
//! use rdfa2quads::{ParserRegistry, registry::HTML_FORMAT};
//!
//! let registry = ParserRegistry::with_html();
//! let html = r#"<p about="http://example.com/" property="http://purl.org/dc/terms/title">Hi</p>"#;
//! let dataset = registry.parse(HTML_FORMAT, &html)?;
//! assert_eq!(dataset.len(), 1);
//! # Ok::<(), rdfa2quads::Error>(())
//! ```

use std::any::Any;
use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use crate::input::Input;
use crate::{Dataset, Error, ParseOptions, parse_with_options};

/// The format identifier [`ParserRegistry::with_html`] registers under.
pub const HTML_FORMAT: &str = "text/html";

/// A parser that accepts type-erased input, as handed over by a host that
/// does not know the concrete input types.
pub trait RdfParser {
    fn parse(&self, input: &dyn Any) -> Result<Dataset, Error>;
}

impl<F> RdfParser for F
where
    F: Fn(&dyn Any) -> Result<Dataset, Error>,
{
    fn parse(&self, input: &dyn Any) -> Result<Dataset, Error> {
        self(input)
    }
}

/// HTML+RDFa as an [`RdfParser`]. Accepts everything [`Input::from_any`] does.
#[derive(Debug, Clone, Default)]
pub struct HtmlRdfaParser {
    options: ParseOptions,
}

impl HtmlRdfaParser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }
}

impl RdfParser for HtmlRdfaParser {
    fn parse(&self, input: &dyn Any) -> Result<Dataset, Error> {
        parse_with_options(Input::from_any(input)?, &self.options)
    }
}

#[derive(Default)]
pub struct ParserRegistry {
    parsers: IndexMap<String, Box<dyn RdfParser>>,
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.parsers.keys()).finish()
    }
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with [`HtmlRdfaParser`] registered for `text/html`.
    pub fn with_html() -> Self {
        let mut registry = Self::new();
        registry.register(HTML_FORMAT, HtmlRdfaParser::default());
        registry
    }

    /// Registers `parser` for `format`, returning the parser it replaces.
    pub fn register(
        &mut self,
        format: impl Into<String>,
        parser: impl RdfParser + 'static,
    ) -> Option<Box<dyn RdfParser>> {
        let format = format.into();
        debug!("registering parser for {format}");
        self.parsers.insert(format, Box::new(parser))
    }

    pub fn unregister(&mut self, format: &str) -> Option<Box<dyn RdfParser>> {
        debug!("unregistering parser for {format}");
        self.parsers.shift_remove(format)
    }

    pub fn get(&self, format: &str) -> Option<&dyn RdfParser> {
        self.parsers.get(format).map(|parser| &**parser)
    }

    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.parsers.keys().map(String::as_str)
    }

    pub fn parse(&self, format: &str, input: &dyn Any) -> Result<Dataset, Error> {
        let parser = self.get(format).ok_or_else(|| Error::UnknownFormat {
            format: format.to_string(),
        })?;
        parser.parse(input)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn register_and_unregister() {
        let mut registry = ParserRegistry::with_html();
        assert_eq!(registry.formats().collect::<Vec<_>>(), [HTML_FORMAT]);

        let previous = registry.register("application/xhtml+xml", |_: &dyn Any| {
            Ok::<_, Error>(Dataset::new())
        });
        assert!(previous.is_none());
        assert!(registry.get("application/xhtml+xml").is_some());

        assert!(registry.unregister(HTML_FORMAT).is_some());
        assert!(registry.unregister(HTML_FORMAT).is_none());
        assert_eq!(registry.formats().collect::<Vec<_>>(), ["application/xhtml+xml"]);
    }

    #[test]
    fn unknown_format_is_an_error() {
        let registry = ParserRegistry::new();
        let err = registry.parse(HTML_FORMAT, &"<p>x</p>").unwrap_err();
        assert!(matches!(err, Error::UnknownFormat { format } if format == HTML_FORMAT));
    }

    #[test]
    fn documents_parse_the_same_as_directly() {
        let options = ParseOptions::default()
            .with_base(oxiri::Iri::parse("http://a.example/x/".to_string()).unwrap());
        let html = r#"<html><head><base href="sub/"></head>
            <body><p about="" property="dc:title">t</p></body></html>"#;
        let document = crate::input::resolve(Input::classify(html), &options).unwrap();

        let direct = crate::parse_document(&document, &crate::RdfaProcessor::new()).unwrap();
        let registered = ParserRegistry::with_html()
            .parse(HTML_FORMAT, &document)
            .unwrap();

        assert_eq!(registered, direct);
        assert_eq!(
            registered.to_string().trim_end(),
            r#"<http://a.example/x/sub/> <http://purl.org/dc/terms/title> "t" ."#
        );
    }

    #[test]
    fn html_parser_rejects_unsupported_input() {
        let registry = ParserRegistry::with_html();
        let err = registry.parse(HTML_FORMAT, &1.5_f64).unwrap_err();
        assert!(matches!(err, Error::UnsupportedInput));
    }
}
