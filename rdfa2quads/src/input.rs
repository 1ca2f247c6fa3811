//! Turning the various accepted inputs into a [`Document`].

use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use ego_tree::NodeId;
use oxiri::Iri;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::dom::Document;
use crate::{Error, ParseOptions};

static BASE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("html>head>base").expect("valid selector"));

/// Base IRIs that mean "no base".
const PLACEHOLDER_BASES: &[&str] = &["", "about:blank"];

/// Something that can be parsed for RDFa.
#[derive(Debug, Clone)]
pub enum Input {
    /// Fetched over HTTP(S), or read from disk for `file:` URLs.
    Url(Url),
    /// HTML markup given inline.
    Markup(String),
    /// Path of an HTML file.
    File(PathBuf),
    /// A document whose base has already been settled. Used as is.
    Document(Document),
    /// An already-parsed document, processed from `root` (or the document element).
    Dom {
        html: Html,
        root: Option<NodeId>,
        base: Option<String>,
    },
}

impl Input {
    /// Sniffs a string: URLs first, then anything containing a tag,
    /// and otherwise a file path.
    pub fn classify(data: impl Into<String>) -> Self {
        let data = data.into();
        if let Some(url) = as_url(&data) {
            debug!("input looks like a URL: {url}");
            Input::Url(url)
        } else if looks_like_markup(&data) {
            debug!("input looks like HTML markup");
            Input::Markup(data)
        } else {
            debug!("input is assumed to be a file path: {data}");
            Input::File(PathBuf::from(data))
        }
    }

    /// A parsed document, processed from the given element.
    pub fn node(html: Html, root: NodeId) -> Self {
        Input::Dom {
            html,
            root: Some(root),
            base: None,
        }
    }

    /// Accepts the value types a host may hand over without knowing
    /// about this crate: strings, paths, URLs, parsed HTML, or an
    /// [`Input`] / [`Document`] itself.
    pub fn from_any(value: &dyn Any) -> Result<Self, Error> {
        if let Some(input) = value.downcast_ref::<Input>() {
            Ok(input.clone())
        } else if let Some(document) = value.downcast_ref::<Document>() {
            Ok(Input::Document(document.clone()))
        } else if let Some(html) = value.downcast_ref::<Html>() {
            Ok(Input::from(html.clone()))
        } else if let Some(s) = value.downcast_ref::<String>() {
            Ok(Input::classify(s.as_str()))
        } else if let Some(s) = value.downcast_ref::<&'static str>() {
            Ok(Input::classify(*s))
        } else if let Some(url) = value.downcast_ref::<Url>() {
            Ok(Input::Url(url.clone()))
        } else if let Some(path) = value.downcast_ref::<PathBuf>() {
            Ok(Input::File(path.clone()))
        } else {
            Err(Error::UnsupportedInput)
        }
    }
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        Input::classify(value)
    }
}

impl From<String> for Input {
    fn from(value: String) -> Self {
        Input::classify(value)
    }
}

impl From<&Path> for Input {
    fn from(value: &Path) -> Self {
        Input::File(value.to_path_buf())
    }
}

impl From<PathBuf> for Input {
    fn from(value: PathBuf) -> Self {
        Input::File(value)
    }
}

impl From<Url> for Input {
    fn from(value: Url) -> Self {
        Input::Url(value)
    }
}

impl From<Document> for Input {
    fn from(document: Document) -> Self {
        Input::Document(document)
    }
}

impl From<Html> for Input {
    fn from(html: Html) -> Self {
        Input::Dom {
            html,
            root: None,
            base: None,
        }
    }
}

/// Equivalent of the `is-url` check: a `file:` URL, or an absolute URL
/// with a host that is `localhost`, an IP address, or a dotted domain.
fn as_url(data: &str) -> Option<Url> {
    if data.is_empty() || data.contains(char::is_whitespace) {
        return None;
    }

    let url = Url::parse(data).ok()?;
    if url.scheme() == "file" {
        return Some(url);
    }

    let accepted = match url.host()? {
        url::Host::Domain(domain) => domain == "localhost" || domain.contains('.'),
        url::Host::Ipv4(_) | url::Host::Ipv6(_) => true,
    };

    accepted.then_some(url)
}

/// Matches `<[a-z][\s\S]*>`, case-insensitively.
fn looks_like_markup(data: &str) -> bool {
    data.match_indices('<').any(|(at, _)| {
        let rest = &data[at + 1..];
        rest.starts_with(|c: char| c.is_ascii_alphabetic()) && rest.contains('>')
    })
}

/// Loads and parses the input, then settles on the base IRI.
pub fn resolve(input: Input, options: &ParseOptions) -> Result<Document, Error> {
    let (html, root, source_base) = match input {
        Input::Url(url) if url.scheme() == "file" => {
            let path = url
                .to_file_path()
                .map_err(|()| Error::InvalidFileUrl {
                    url: url.to_string(),
                })?;
            let html = parse_markup(&read_file(&path)?, options)?;
            (html, None, Some(url.to_string()))
        }
        Input::Url(url) => {
            let (content, final_url) = fetch(url)?;
            let html = parse_markup(&content, options)?;
            (html, None, Some(final_url.to_string()))
        }
        Input::Markup(markup) => (parse_markup(&markup, options)?, None, None),
        Input::File(path) => {
            let html = parse_markup(&read_file(&path)?, options)?;
            let base = std::path::absolute(&path)
                .ok()
                .and_then(|p| Url::from_file_path(p).ok())
                .map(String::from);
            (html, None, base)
        }
        Input::Document(document) => return Ok(document),
        Input::Dom { html, root, base } => (html, root, base),
    };

    let base = choose_base(&html, source_base.as_deref(), options)?;
    debug!("base IRI: {base}");

    match root {
        Some(root) => Document::with_root(html, root, base).ok_or(Error::UnsupportedInput),
        None => Ok(Document::new(html, base)),
    }
}

/// `<base href>` wins over everything, resolved against whatever else we know.
/// Otherwise the explicit option, the source location, and finally the default.
fn choose_base(
    html: &Html,
    source_base: Option<&str>,
    options: &ParseOptions,
) -> Result<Iri<String>, Error> {
    let fallback = match (&options.base, source_base) {
        (Some(base), _) => base.clone(),
        (None, Some(source)) if !PLACEHOLDER_BASES.contains(&source) => parse_iri(source)?,
        (None, _) => options.default_base.clone(),
    };

    let base_href = html
        .select(&BASE_SELECTOR)
        .next()
        .and_then(|el| el.attr("href"));

    match base_href {
        Some(href) => {
            debug!("<base> found: {href}");
            fallback.resolve(href).map_err(|source| Error::IriParseError {
                source,
                iri: href.to_string(),
            })
        }
        None => Ok(fallback),
    }
}

fn parse_iri(iri: &str) -> Result<Iri<String>, Error> {
    Iri::parse(iri.to_string()).map_err(|source| Error::IriParseError {
        source,
        iri: iri.to_string(),
    })
}

fn fetch(url: Url) -> Result<(String, Url), Error> {
    debug!("fetching {url}");
    let to_error = |source| Error::Fetch {
        source,
        url: url.to_string(),
    };

    let response = reqwest::blocking::Client::new()
        .get(url.clone())
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(to_error)?;

    let final_url = response.url().clone();
    let content = response.text().map_err(to_error)?;
    Ok((content, final_url))
}

fn read_file(path: &Path) -> Result<String, Error> {
    debug!("reading {}", path.display());
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound {
            source,
            path: path.to_path_buf(),
        },
        _ => Error::Read {
            source,
            path: path.to_path_buf(),
        },
    })?;

    String::from_utf8(bytes).map_err(|e| Error::MalformedMarkup {
        errors: vec![format!("{}: {e}", path.display())],
    })
}

fn parse_markup(markup: &str, options: &ParseOptions) -> Result<Html, Error> {
    let html = Html::parse_document(markup);
    if !html.errors.is_empty() {
        if options.strict_markup {
            return Err(Error::MalformedMarkup {
                errors: html.errors.iter().map(|e| e.to_string()).collect(),
            });
        }

        for err in html.errors.iter() {
            debug!("HTML parse error: {err}");
        }
    }

    Ok(html)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn urls_are_recognised() {
        assert!(matches!(Input::classify("http://127.0.0.1:3000"), Input::Url(_)));
        assert!(matches!(Input::classify("https://example.com/a?b"), Input::Url(_)));
        assert!(matches!(Input::classify("http://localhost:8080/"), Input::Url(_)));
    }

    #[test]
    fn file_urls_are_urls() {
        assert!(matches!(
            Input::classify("file:///srv/pages/index.html"),
            Input::Url(url) if url.scheme() == "file"
        ));
    }

    #[test]
    fn settled_documents_keep_their_base() {
        let options = ParseOptions::default().with_base(Iri::parse("http://a.example/x/".to_string()).unwrap());
        let html = r#"<html><head><base href="sub/"></head><body></body></html>"#;
        let document = resolve(Input::classify(html), &options).unwrap();
        assert_eq!(document.base().as_str(), "http://a.example/x/sub/");

        let again = resolve(Input::from_any(&document).unwrap(), &options).unwrap();
        assert_eq!(again.base().as_str(), "http://a.example/x/sub/");
    }

    #[test]
    fn markup_is_recognised() {
        assert!(matches!(Input::classify("<p>hi</p>"), Input::Markup(_)));
        assert!(matches!(Input::classify("text <DIV\n>more"), Input::Markup(_)));
    }

    #[test]
    fn everything_else_is_a_path() {
        for path in ["test/fixtures/test.html", "a < b > c", "C:\\data\\x.html", "<>", "< p>"] {
            assert!(
                matches!(Input::classify(path), Input::File(_)),
                "{path} should be a path"
            );
        }
    }

    #[test]
    fn markup_without_base_uses_default() {
        let doc = resolve(Input::classify("<p>x</p>"), &ParseOptions::default()).unwrap();
        assert_eq!(doc.base().as_str(), "http://localhost/");
    }

    #[test]
    fn placeholder_base_uses_default() {
        let input = Input::Dom {
            html: Html::parse_document("<p>x</p>"),
            root: None,
            base: Some("about:blank".to_string()),
        };
        let doc = resolve(input, &ParseOptions::default()).unwrap();
        assert_eq!(doc.base().as_str(), "http://localhost/");
    }

    #[test]
    fn base_element_is_resolved_against_fallback() {
        let options = ParseOptions::default().with_base(Iri::parse("http://a.example/x/".to_string()).unwrap());
        let doc = resolve(
            Input::classify(r#"<html><head><base href="../y/"></head><body></body></html>"#),
            &options,
        )
        .unwrap();
        assert_eq!(doc.base().as_str(), "http://a.example/y/");
    }

    #[test]
    fn strict_mode_rejects_parse_errors() {
        let options = ParseOptions::default().with_strict_markup(true);
        let err = resolve(Input::classify("<p>no doctype</p>"), &options).unwrap_err();
        assert!(matches!(err, Error::MalformedMarkup { .. }));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve(
            Input::classify("does/not/exist.html"),
            &ParseOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn unsupported_values_are_rejected() {
        assert!(matches!(Input::from_any(&42_u32), Err(Error::UnsupportedInput)));
        assert!(matches!(Input::from_any(&"<p>x</p>"), Ok(Input::Markup(_))));
    }
}
