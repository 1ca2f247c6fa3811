//! IRIs that are not provided by [`oxrdf::vocab`].

pub use oxrdf::vocab::xsd;

pub mod rdf {
    use oxrdf::NamedNodeRef;

    pub use oxrdf::vocab::rdf::*;

    /// Datatype for HTML literals (RDF 1.1 Concepts, appendix B).
    pub static HTML: NamedNodeRef =
        NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#HTML");

    /// Type tag used by RDFa processors for objects that are resources.
    pub static OBJECT: NamedNodeRef =
        NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#object");

    /// Type tag used by RDFa processors for untyped literals.
    pub static PLAIN_LITERAL: NamedNodeRef =
        NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#PlainLiteral");
}

pub mod rdfa {
    use oxrdf::NamedNodeRef;

    pub static COPY: NamedNodeRef = NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#copy");

    pub static PATTERN: NamedNodeRef =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#Pattern");

    pub static USES_VOCABULARY: NamedNodeRef =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdfa#usesVocabulary");
}

pub mod xhv {
    use oxrdf::NamedNodeRef;

    pub static VOCAB: &str = "http://www.w3.org/1999/xhtml/vocab#";

    pub static ROLE: NamedNodeRef =
        NamedNodeRef::new_unchecked("http://www.w3.org/1999/xhtml/vocab#role");
}

pub static XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
