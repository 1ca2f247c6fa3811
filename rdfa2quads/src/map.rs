//! The subject → predicate → object map produced by RDFa extraction.
//!
//! All levels keep insertion order, which is the order the normalizer
//! emits quads in.

use indexmap::IndexMap;

use crate::dom::NodeList;
use crate::vocab::rdf;

/// Identifiers with this prefix denote blank nodes.
pub const BLANK_NODE_PREFIX: &str = "_:";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectMap {
    subjects: IndexMap<String, PredicateMap>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredicateMap {
    predicates: IndexMap<String, ObjectList>,
}

pub type ObjectList = Vec<RdfaObject>;

/// One object value, tagged by how it has to be turned into an RDF term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RdfaObject {
    /// An IRI or `_:`-prefixed blank node identifier.
    Resource(String),
    PlainLiteral {
        value: String,
        language: Option<String>,
    },
    XmlLiteral(NodeList),
    HtmlLiteral(NodeList),
    TypedLiteral {
        value: String,
        datatype: String,
    },
}

/// The raw value of an object before it has been tagged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectPayload {
    Text(String),
    Nodes(NodeList),
}

impl RdfaObject {
    pub fn resource(id: impl Into<String>) -> Self {
        Self::Resource(id.into())
    }

    pub fn plain(value: impl Into<String>, language: Option<String>) -> Self {
        Self::PlainLiteral {
            value: value.into(),
            language,
        }
    }

    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::TypedLiteral {
            value: value.into(),
            datatype: datatype.into(),
        }
    }

    /// Builds an object from the string type tag used by RDFa processors:
    /// `rdf:object`, `rdf:PlainLiteral`, `rdf:XMLLiteral`, `rdf:HTML`,
    /// or any other datatype IRI.
    ///
    /// Returns [`None`] if the payload does not fit the tag: node payloads
    /// are only valid for XML and HTML literals.
    pub fn from_type_tag(tag: &str, payload: ObjectPayload, language: Option<String>) -> Option<Self> {
        let object = match payload {
            ObjectPayload::Nodes(nodes) if tag == rdf::XML_LITERAL.as_str() => Self::XmlLiteral(nodes),
            ObjectPayload::Nodes(nodes) if tag == rdf::HTML.as_str() => Self::HtmlLiteral(nodes),
            ObjectPayload::Nodes(_) => return None,
            ObjectPayload::Text(value) if tag == rdf::OBJECT.as_str() => Self::Resource(value),
            ObjectPayload::Text(value) if tag == rdf::PLAIN_LITERAL.as_str() => {
                Self::PlainLiteral { value, language }
            }
            ObjectPayload::Text(value) => Self::TypedLiteral {
                value,
                datatype: tag.to_string(),
            },
        };
        Some(object)
    }

    /// The inverse of [`Self::from_type_tag`].
    pub fn type_tag(&self) -> &str {
        match self {
            RdfaObject::Resource(_) => rdf::OBJECT.as_str(),
            RdfaObject::PlainLiteral { .. } => rdf::PLAIN_LITERAL.as_str(),
            RdfaObject::XmlLiteral(_) => rdf::XML_LITERAL.as_str(),
            RdfaObject::HtmlLiteral(_) => rdf::HTML.as_str(),
            RdfaObject::TypedLiteral { datatype, .. } => datatype,
        }
    }
}

impl SubjectMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Number of subjects.
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    /// Total number of objects across all subjects and predicates.
    pub fn object_count(&self) -> usize {
        self.subjects
            .values()
            .flat_map(|p| p.predicates.values())
            .map(Vec::len)
            .sum()
    }

    pub fn subjects(&self) -> impl ExactSizeIterator<Item = (&str, &PredicateMap)> {
        self.subjects.iter().map(|(s, p)| (s.as_str(), p))
    }

    pub fn get(&self, subject: &str) -> Option<&PredicateMap> {
        self.subjects.get(subject)
    }

    /// Returns the predicates of `subject`, adding the subject if it is new.
    pub fn subject_mut(&mut self, subject: &str) -> &mut PredicateMap {
        if !self.subjects.contains_key(subject) {
            self.subjects.insert(subject.to_string(), PredicateMap::default());
        }
        &mut self.subjects[subject]
    }

    /// Appends an object, even if an equal object is already present.
    pub fn push(&mut self, subject: &str, predicate: &str, object: RdfaObject) {
        self.subject_mut(subject).objects_mut(predicate).push(object);
    }

    /// Appends an object unless an equal one is already recorded for the
    /// same subject and predicate. Returns whether it was added.
    pub fn insert(&mut self, subject: &str, predicate: &str, object: RdfaObject) -> bool {
        let objects = self.subject_mut(subject).objects_mut(predicate);
        if objects.contains(&object) {
            false
        } else {
            objects.push(object);
            true
        }
    }

    pub fn contains(&self, subject: &str, predicate: &str, object: &RdfaObject) -> bool {
        self.get(subject)
            .and_then(|p| p.get(predicate))
            .is_some_and(|objects| objects.contains(object))
    }

    /// Removes a subject, keeping the order of the remaining ones.
    pub fn remove_subject(&mut self, subject: &str) -> Option<PredicateMap> {
        self.subjects.shift_remove(subject)
    }
}

impl PredicateMap {
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &[RdfaObject])> {
        self.predicates.iter().map(|(p, o)| (p.as_str(), o.as_slice()))
    }

    pub fn get(&self, predicate: &str) -> Option<&[RdfaObject]> {
        self.predicates.get(predicate).map(Vec::as_slice)
    }

    /// Returns the objects of `predicate`, adding an empty list if it is new.
    pub fn objects_mut(&mut self, predicate: &str) -> &mut ObjectList {
        if !self.predicates.contains_key(predicate) {
            self.predicates
                .insert(predicate.to_string(), ObjectList::new());
        }
        &mut self.predicates[predicate]
    }

    /// Removes a predicate, keeping the order of the remaining ones.
    pub fn remove(&mut self, predicate: &str) -> Option<ObjectList> {
        self.predicates.shift_remove(predicate)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keeps_insertion_order() {
        let mut map = SubjectMap::new();
        map.push("http://b", "p2", RdfaObject::resource("x"));
        map.push("http://a", "p1", RdfaObject::resource("y"));
        map.push("http://b", "p1", RdfaObject::resource("z"));

        let subjects: Vec<_> = map.subjects().map(|(s, _)| s).collect();
        assert_eq!(subjects, ["http://b", "http://a"]);

        let predicates: Vec<_> = map.get("http://b").unwrap().iter().map(|(p, _)| p).collect();
        assert_eq!(predicates, ["p2", "p1"]);
        assert_eq!(map.object_count(), 3);
    }

    #[test]
    fn insert_skips_duplicates_but_push_does_not() {
        let mut map = SubjectMap::new();
        let obj = RdfaObject::plain("v", None);
        assert!(map.insert("s", "p", obj.clone()));
        assert!(!map.insert("s", "p", obj.clone()));
        map.push("s", "p", obj);
        assert_eq!(map.object_count(), 2);
    }

    #[test]
    fn type_tags_round_trip() {
        let cases = [
            RdfaObject::resource("_:b0"),
            RdfaObject::plain("x", Some("en".into())),
            RdfaObject::typed("1", "http://www.w3.org/2001/XMLSchema#integer"),
        ];
        for object in cases {
            let payload = match &object {
                RdfaObject::Resource(v)
                | RdfaObject::PlainLiteral { value: v, .. }
                | RdfaObject::TypedLiteral { value: v, .. } => ObjectPayload::Text(v.clone()),
                RdfaObject::XmlLiteral(_) | RdfaObject::HtmlLiteral(_) => unreachable!(),
            };
            let language = match &object {
                RdfaObject::PlainLiteral { language, .. } => language.clone(),
                _ => None,
            };
            let rebuilt = RdfaObject::from_type_tag(object.type_tag(), payload, language);
            assert_eq!(rebuilt, Some(object));
        }
    }

    #[test]
    fn nodes_only_fit_markup_literals() {
        let nodes = ObjectPayload::Nodes(NodeList::default());
        assert_eq!(
            RdfaObject::from_type_tag(rdf::HTML.as_str(), nodes.clone(), None),
            Some(RdfaObject::HtmlLiteral(NodeList::default()))
        );
        assert_eq!(RdfaObject::from_type_tag(rdf::OBJECT.as_str(), nodes, None), None);
    }
}
