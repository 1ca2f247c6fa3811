//! Conversion of an extracted [`SubjectMap`] into a [`Dataset`].

use oxrdf::{BlankNode, Literal, NamedNode, NamedOrBlankNode, Term};

use crate::dataset::{Dataset, Quad};
use crate::dom::{MarkupSerializer, NodeList, SerializeError};
use crate::map::{BLANK_NODE_PREFIX, RdfaObject, SubjectMap};
use crate::vocab::{rdf, xsd};

/// Walks subjects, predicates and objects in order and emits one quad per object.
///
/// Nothing is deduplicated or reordered. XML and HTML literals are rendered
/// through `markup`; if that fails the whole conversion fails.
pub fn normalize(
    map: &SubjectMap,
    markup: &impl MarkupSerializer,
) -> Result<Dataset, SerializeError> {
    let mut dataset = Dataset::with_capacity(map.object_count());

    for (subject, predicates) in map.subjects() {
        let subject = resource(subject);
        for (predicate, objects) in predicates.iter() {
            let predicate = resource(predicate);
            for object in objects {
                let object = term(object, markup)?;
                dataset.push(Quad::new(subject.clone(), predicate.clone(), object));
            }
        }
    }

    tracing::debug!("normalized {} quads", dataset.len());
    Ok(dataset)
}

/// An identifier is a blank node if it has the `_:` prefix, an IRI otherwise.
/// IRIs are not validated.
fn resource(id: &str) -> NamedOrBlankNode {
    match id.strip_prefix(BLANK_NODE_PREFIX) {
        Some(label) => BlankNode::new_unchecked(label).into(),
        None => NamedNode::new_unchecked(id).into(),
    }
}

fn term(object: &RdfaObject, markup: &impl MarkupSerializer) -> Result<Term, SerializeError> {
    let term = match object {
        RdfaObject::XmlLiteral(nodes) => {
            let value = render(nodes, |node, out| markup.write_xml(node, out))?;
            Literal::new_typed_literal(value, rdf::XML_LITERAL).into()
        }
        RdfaObject::HtmlLiteral(nodes) => {
            let value = render(nodes, |node, out| markup.write_html(node, out))?;
            Literal::new_typed_literal(value, rdf::HTML).into()
        }
        RdfaObject::Resource(id) => resource(id).into(),
        // an empty language is the same as no language
        RdfaObject::PlainLiteral { value, language } => match language.as_deref() {
            Some(language) if !language.is_empty() => {
                Literal::new_language_tagged_literal_unchecked(value, language).into()
            }
            _ => Literal::new_typed_literal(value, xsd::STRING).into(),
        },
        RdfaObject::TypedLiteral { value, datatype } => {
            Literal::new_typed_literal(value, NamedNode::new_unchecked(datatype)).into()
        }
    };
    Ok(term)
}

fn render(
    nodes: &NodeList,
    mut write: impl FnMut(ego_tree::NodeId, &mut String) -> Result<(), SerializeError>,
) -> Result<String, SerializeError> {
    let mut value = String::new();
    for node in nodes.iter() {
        write(node, &mut value)?;
    }
    Ok(value)
}
