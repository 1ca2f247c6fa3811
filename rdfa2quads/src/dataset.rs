use std::fmt;

use oxrdf::{NamedOrBlankNode, Term, TripleRef};

/// A statement. Output only ever uses the default graph, so none is stored.
///
/// Unlike [`oxrdf::Quad`] the predicate may be a blank node,
/// since RDFa extraction can produce generalized triples.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Quad {
    pub subject: NamedOrBlankNode,
    pub predicate: NamedOrBlankNode,
    pub object: Term,
}

impl Quad {
    pub fn new(
        subject: impl Into<NamedOrBlankNode>,
        predicate: impl Into<NamedOrBlankNode>,
        object: impl Into<Term>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// Returns [`None`] for generalized triples (blank node predicates).
    pub fn as_triple(&self) -> Option<TripleRef<'_>> {
        match &self.predicate {
            NamedOrBlankNode::NamedNode(predicate) => {
                Some(TripleRef::new(&self.subject, predicate, &self.object))
            }
            NamedOrBlankNode::BlankNode(_) => None,
        }
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// The ordered output of a single parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    quads: Vec<Quad>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            quads: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, quad: Quad) {
        self.quads.push(quad);
    }

    pub fn len(&self) -> usize {
        self.quads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Quad> {
        self.quads.iter()
    }

    pub fn as_slice(&self) -> &[Quad] {
        &self.quads
    }

    /// Collects the quads into an [`oxrdf::Graph`].
    ///
    /// Generalized triples cannot be represented and are left out.
    pub fn to_graph(&self) -> oxrdf::Graph {
        let mut graph = oxrdf::Graph::new();
        for quad in &self.quads {
            match quad.as_triple() {
                Some(triple) => {
                    graph.insert(triple);
                }
                None => tracing::warn!("dropping generalized triple: {quad}"),
            }
        }
        graph
    }
}

impl IntoIterator for Dataset {
    type Item = Quad;
    type IntoIter = std::vec::IntoIter<Quad>;

    fn into_iter(self) -> Self::IntoIter {
        self.quads.into_iter()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Quad;
    type IntoIter = std::slice::Iter<'a, Quad>;

    fn into_iter(self) -> Self::IntoIter {
        self.quads.iter()
    }
}

/// N-Triples, one statement per line.
impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for quad in &self.quads {
            writeln!(f, "{quad}")?;
        }
        Ok(())
    }
}
