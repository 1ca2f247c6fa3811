use std::collections::BTreeSet;

use itertools::Itertools;
use oxiri::Iri;
use oxrdf::Graph;
use rdfa2quads::{Dataset, ParseOptions};

pub const BASE: &str = "http://example.org/";

/// Canonical Turtle for a graph: blank nodes relabelled by `rdf-canon`,
/// triples sorted, prefixes from the initial context.
pub fn serialize_graph(graph: &Graph, base: &str) -> String {
    let idents = rdf_canon::issue_graph_with::<sha2::Sha256>(graph, &Default::default()).unwrap();
    let graph = rdf_canon::relabel_graph(graph, &idents).unwrap();

    let mut output = Vec::new();
    let mut ttl = oxttl::TurtleSerializer::new().with_base_iri(base).unwrap();

    let mut prefixes_to_use = BTreeSet::new();
    let mut add_prefix = |full_iri: &str| {
        if let Some((known_prefix, iri)) = rdfa2quads::initial_context_prefixes()
            .mappings()
            .find(|(prefix, iri)| !prefix.is_empty() && full_iri.starts_with(iri.as_str()))
        {
            prefixes_to_use.insert((known_prefix, iri));
        }
    };

    for triple in graph.iter() {
        if let oxrdf::SubjectRef::NamedNode(n) = triple.subject {
            add_prefix(n.as_str());
        }

        add_prefix(triple.predicate.as_str());

        match triple.object {
            oxrdf::TermRef::NamedNode(n) => add_prefix(n.as_str()),
            oxrdf::TermRef::Literal(l) if !l.is_plain() => add_prefix(l.datatype().as_str()),
            _ => {}
        }
    }

    for (prefix, iri) in prefixes_to_use {
        ttl = ttl.with_prefix(prefix, iri).unwrap();
    }

    let mut ttl = ttl.for_writer(&mut output);
    for triple in graph.iter().sorted_by_cached_key(|t| {
        (
            t.subject.to_string(),
            // rdf:type first
            (t.predicate != oxrdf::vocab::rdf::TYPE).then(|| t.predicate.to_string()),
            t.object.to_string(),
        )
    }) {
        ttl.serialize_triple(triple).unwrap();
    }

    ttl.finish().unwrap();

    String::from_utf8_lossy(&output).into_owned()
}

pub fn parse_turtle(ttl: &str, base: &str) -> Graph {
    let mut graph = Graph::new();
    let parser = oxttl::TurtleParser::new()
        .with_base_iri(base)
        .unwrap()
        .for_slice(ttl.as_bytes());
    for triple in parser {
        graph.insert(&triple.unwrap());
    }
    graph
}

/// Compares a dataset with Turtle, ignoring blank node labels and order.
#[allow(unused)]
pub fn assert_dataset(dataset: &Dataset, ttl: &str, base: &str) {
    let output = serialize_graph(&dataset.to_graph(), base);
    let expected = serialize_graph(&parse_turtle(ttl, base), base);

    pretty_assertions::assert_eq!(output, expected);
}

#[allow(unused)]
pub fn options() -> ParseOptions {
    ParseOptions::default().with_base(Iri::parse(BASE.to_string()).unwrap())
}

/// Parses `html` against [`BASE`] and compares the result with `ttl`.
#[allow(unused)]
pub fn assert_rdfa(html: &str, ttl: &str) {
    let dataset = rdfa2quads::parse_with_options(html, &options()).unwrap();
    assert_dataset(&dataset, ttl, BASE);
}
