use std::fmt::Write;

use ego_tree::{NodeId, NodeRef};
use oxiri::Iri;
use scraper::{ElementRef, Html, Node};

use crate::vocab::XHTML_NAMESPACE;

/// A parsed HTML document, the element that processing starts from,
/// and the base IRI that relative references are resolved against.
#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
    root: NodeId,
    base: Iri<String>,
}

impl Document {
    /// Uses the document element (`<html>`) as the processing root.
    pub fn new(html: Html, base: Iri<String>) -> Self {
        let root = html.root_element().id();
        Self { html, root, base }
    }

    /// Uses the given element as the processing root.
    ///
    /// Returns [`None`] if the node does not exist in `html`
    /// or is not an element.
    pub fn with_root(html: Html, root: NodeId, base: Iri<String>) -> Option<Self> {
        let node = html.tree.get(root)?;
        ElementRef::wrap(node)?;
        Some(Self { html, root, base })
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn root_element(&self) -> ElementRef<'_> {
        self.html
            .tree
            .get(self.root)
            .and_then(ElementRef::wrap)
            .unwrap_or_else(|| self.html.root_element())
    }

    pub fn base(&self) -> &Iri<String> {
        &self.base
    }

    fn node(&self, id: NodeId) -> Result<NodeRef<'_, Node>, SerializeError> {
        self.html.tree.get(id).ok_or(SerializeError::DetachedNode(id))
    }
}

/// An ordered sequence of nodes owned by a [`Document`].
///
/// These are the payload of XML and HTML literals: the child nodes
/// of the element carrying the `@datatype`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodeList(Vec<NodeId>);

impl NodeList {
    pub fn iter(&self) -> impl ExactSizeIterator<Item = NodeId> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<NodeId>> for NodeList {
    fn from(value: Vec<NodeId>) -> Self {
        Self(value)
    }
}

impl FromIterator<NodeId> for NodeList {
    fn from_iter<T: IntoIterator<Item = NodeId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
pub enum SerializeError {
    #[display("node {_0:?} is not part of the document")]
    DetachedNode(#[error(not(source))] NodeId),
}

/// Renders DOM nodes as markup for XML and HTML literals.
pub trait MarkupSerializer {
    /// Appends the XML form of `node` to `out`.
    ///
    /// Elements are serialized as XML, text nodes contribute their
    /// character data unescaped. Other node types contribute nothing.
    fn write_xml(&self, node: NodeId, out: &mut String) -> Result<(), SerializeError>;

    /// Appends the inner HTML of a detached `<div>` holding a copy of `node`.
    fn write_html(&self, node: NodeId, out: &mut String) -> Result<(), SerializeError>;
}

impl MarkupSerializer for Document {
    fn write_xml(&self, node: NodeId, out: &mut String) -> Result<(), SerializeError> {
        let node = self.node(node)?;
        match node.value() {
            Node::Element(_) => xml::write_node(node, true, out),
            Node::Text(text) => out.push_str(text),
            _ => {}
        }
        Ok(())
    }

    fn write_html(&self, node: NodeId, out: &mut String) -> Result<(), SerializeError> {
        let node = self.node(node)?;
        match node.value() {
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(node) {
                    out.push_str(&element.html());
                }
            }
            // the text's new parent is a <div>, so it is always escaped
            Node::Text(text) => html::escape_text(text, out),
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            Node::ProcessingInstruction(pi) => {
                let _ = write!(out, "<?{} {}>", &*pi.target, &*pi.data);
            }
            Node::Doctype(doctype) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(doctype.name());
                out.push('>');
            }
            Node::Document | Node::Fragment => {
                for child in node.children() {
                    self.write_html(child.id(), out)?;
                }
            }
        }
        Ok(())
    }
}

mod xml {
    use super::*;

    pub(super) fn write_node(node: NodeRef<'_, Node>, top_level: bool, out: &mut String) {
        match node.value() {
            Node::Element(el) => {
                out.push('<');
                out.push_str(el.name());
                if top_level && &*el.name.ns == XHTML_NAMESPACE {
                    out.push_str(" xmlns=\"");
                    out.push_str(XHTML_NAMESPACE);
                    out.push('"');
                }

                for (name, value) in el.attrs() {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_attribute(value, out);
                    out.push('"');
                }

                if node.has_children() {
                    out.push('>');
                    for child in node.children() {
                        write_node(child, false, out);
                    }
                    out.push_str("</");
                    out.push_str(el.name());
                    out.push('>');
                } else {
                    out.push_str("/>");
                }
            }
            Node::Text(text) => escape_text(text, out),
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            Node::ProcessingInstruction(pi) => {
                let _ = write!(out, "<?{} {}?>", &*pi.target, &*pi.data);
            }
            Node::Document | Node::Fragment | Node::Doctype(_) => {}
        }
    }

    fn escape_text(text: &str, out: &mut String) {
        for c in text.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                c => out.push(c),
            }
        }
    }

    fn escape_attribute(text: &str, out: &mut String) {
        for c in text.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '"' => out.push_str("&quot;"),
                c => out.push(c),
            }
        }
    }
}

mod html {
    // HTML fragment serialization algorithm, "escaping a string" (not in attribute mode)
    pub(super) fn escape_text(text: &str, out: &mut String) {
        for c in text.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '\u{a0}' => out.push_str("&nbsp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                c => out.push(c),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fragment(markup: &str) -> (Document, NodeList) {
        let html = Html::parse_document(&format!("<html><body><p>{markup}</p></body></html>"));
        let base = Iri::parse("http://localhost/".to_string()).unwrap();
        let doc = Document::new(html, base);
        let p = doc
            .html()
            .select(&scraper::Selector::parse("p").unwrap())
            .next()
            .unwrap();
        let nodes = p.children().map(|c| c.id()).collect();
        (doc, nodes)
    }

    fn xml(doc: &Document, nodes: &NodeList) -> String {
        let mut out = String::new();
        for node in nodes.iter() {
            doc.write_xml(node, &mut out).unwrap();
        }
        out
    }

    fn html(doc: &Document, nodes: &NodeList) -> String {
        let mut out = String::new();
        for node in nodes.iter() {
            doc.write_html(node, &mut out).unwrap();
        }
        out
    }

    #[test]
    fn xml_declares_namespace_on_top_level_elements() {
        let (doc, nodes) = fragment("a <em>b <i>c</i></em><br>");
        assert_eq!(
            xml(&doc, &nodes),
            r#"a <em xmlns="http://www.w3.org/1999/xhtml">b <i>c</i></em><br xmlns="http://www.w3.org/1999/xhtml"/>"#
        );
    }

    #[test]
    fn xml_skips_comments_at_top_level() {
        let (doc, nodes) = fragment("x<!-- note --><b>y<!--z--></b>");
        assert_eq!(
            xml(&doc, &nodes),
            r#"x<b xmlns="http://www.w3.org/1999/xhtml">y<!--z--></b>"#
        );
    }

    #[test]
    fn xml_escapes_attributes() {
        let (doc, nodes) = fragment(r#"<a title="1 &amp; &quot;2&quot;">t</a>"#);
        assert_eq!(
            xml(&doc, &nodes),
            r#"<a xmlns="http://www.w3.org/1999/xhtml" title="1 &amp; &quot;2&quot;">t</a>"#
        );
    }

    #[test]
    fn html_keeps_markup_and_escapes_text() {
        let (doc, nodes) = fragment("De la <em>bombe</em> &lt;b&eacute;b&eacute;&gt;<!--c-->");
        assert_eq!(
            html(&doc, &nodes),
            "De la <em>bombe</em> &lt;bébé&gt;<!--c-->"
        );
    }

    #[test]
    fn unknown_node_is_an_error() {
        let (doc, _) = fragment("x");
        let other = Html::parse_document(
            "<html><body><div><div><div><div><div><div><div></div></div></div></div></div></div></div></body></html>",
        );
        let far_away = other.tree.nodes().last().unwrap().id();
        assert_eq!(
            doc.write_html(far_away, &mut String::new()),
            Err(SerializeError::DetachedNode(far_away))
        );
    }
}
