//! Evaluation context, local scope and CURIE/IRI resolution ([rdfa-core] 7.4, 7.5).

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use curie::{Curie, ExpansionError, PrefixMapping};
use icu::locale::LanguageIdentifier;
use indexmap::IndexMap;
use oxiri::{Iri, IriParseError};
use oxrdf::{BlankNode, NamedNode, NamedOrBlankNode};
use tracing::{trace, warn};

use super::ExtractError;
use super::context::{initial_context_prefixes, initial_context_terms};
use crate::map::RdfaObject;

/// Hands out `b0`, `b1`, ... in the order they are asked for.
/// Labels written in the document (including the empty `[_:]`)
/// are mapped onto the same sequence, once per label.
#[derive(Debug, Default)]
pub(super) struct BlankNodes {
    next: usize,
    labelled: HashMap<String, BlankNode>,
}

impl BlankNodes {
    pub fn fresh(&mut self) -> BlankNode {
        let node = BlankNode::new_unchecked(format!("b{}", self.next));
        self.next += 1;
        node
    }

    pub fn labelled(&mut self, label: &str) -> BlankNode {
        if let Some(node) = self.labelled.get(label) {
            return node.clone();
        }

        let node = self.fresh();
        trace!("- _:{label} is now {node}");
        self.labelled.insert(label.to_string(), node.clone());
        node
    }
}

pub(super) type SharedList = Rc<RefCell<Vec<RdfaObject>>>;

#[derive(Default, Clone)]
pub(super) struct ListMapping {
    pub lists: IndexMap<NamedNode, SharedList>,
}

impl ListMapping {
    pub fn ensure_list(&mut self, predicate: &NamedNode) -> SharedList {
        self.lists
            .entry(predicate.clone())
            .or_insert_with(|| {
                trace!(" - new list for {predicate}");
                SharedList::default()
            })
            .clone()
    }

    pub fn insert_value(&mut self, predicate: &NamedNode, value: RdfaObject) {
        trace!(" - list item for {predicate}: {value:?}");
        self.ensure_list(predicate).borrow_mut().push(value);
    }
}

/// An attribute that is absent, present but resolving to nothing, or present with a value.
pub(super) enum Attr<T> {
    Missing,
    Empty,
    Value(T),
}

impl<T> Attr<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Attr<U> {
        match self {
            Attr::Missing => Attr::Missing,
            Attr::Empty => Attr::Empty,
            Attr::Value(v) => Attr::Value(f(v)),
        }
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, Attr::Missing)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Attr::Value(v) => Some(v),
            Attr::Missing | Attr::Empty => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Attr::Value(v) => Some(v),
            Attr::Missing | Attr::Empty => None,
        }
    }
}

pub(super) enum Relation {
    Forward(NamedNode),
    Reverse(NamedNode),
    List(NamedNode),
}

#[derive(Clone, Debug)]
pub(super) enum IncompleteTriple {
    List(SharedList),
    Forward(NamedNode),
    Reverse(NamedNode),
}

// “During processing, each rule is applied using information provided by an evaluation context.
#[derive(Clone)]
pub(super) struct EvaluationContext {
    /// Without fragment, so it doubles as the value of the empty CURIE.
    pub base: Iri<String>,
    pub parent_subject: Rc<NamedOrBlankNode>,
    // a subject really, since it is never a literal
    pub parent_object: Option<Rc<NamedOrBlankNode>>,
    pub iri_mappings: Rc<PrefixMapping>,
    pub incomplete_triples: Vec<IncompleteTriple>,
    pub list_mapping: Rc<RefCell<ListMapping>>,
    // “Note that there is no default language.
    pub language: Option<Rc<LanguageIdentifier>>,
    pub term_mappings: Rc<BTreeMap<String, NamedNode>>,
    pub default_vocab: Option<NamedNode>,
}

impl EvaluationContext {
    pub fn new(base: &Iri<String>) -> Result<Self, ExtractError> {
        let without_fragment = base.resolve("").map_err(|source| ExtractError::IriParseError {
            source,
            iri: base.to_string(),
        })?;

        Ok(Self {
            parent_subject: Rc::new(NamedNode::new_unchecked(base.as_str()).into()),
            base: without_fragment,
            parent_object: None,
            iri_mappings: Rc::new(initial_context_prefixes().clone()),
            incomplete_triples: Vec::new(),
            list_mapping: Default::default(),
            language: None,
            term_mappings: Rc::new(initial_context_terms().clone()),
            default_vocab: None,
        })
    }
}

// “During the course of processing a number of locally scoped values are needed, as follows:
#[derive(Clone)]
pub(super) struct LocalScope<'a> {
    pub eval_context: &'a EvaluationContext,
    pub bnodes: &'a RefCell<BlankNodes>,
    pub iri_mappings: Rc<PrefixMapping>,
    pub incomplete_triples: Vec<IncompleteTriple>,
    pub current_language: Option<Rc<LanguageIdentifier>>,
    // “Note that descendant elements will still be processed.
    pub skip_element: bool,
    pub new_subject: Option<Rc<NamedOrBlankNode>>,
    pub current_object_resource: Option<Rc<NamedOrBlankNode>>,
    pub typed_resource: Option<Rc<NamedOrBlankNode>>,
    pub term_mappings: Rc<BTreeMap<String, NamedNode>>,
    pub list_mappings: Rc<RefCell<ListMapping>>,
    pub default_vocab: Option<NamedNode>,
}

enum CurieError {
    Empty,
    InvalidIri(String),
    Expansion(ExpansionError),
}

pub(super) struct NotCurie;
pub(super) struct NotTerm;

impl<'a> LocalScope<'a> {
    // [rdfa-core] 7.5: 1.
    pub fn new(eval_context: &'a EvaluationContext, bnodes: &'a RefCell<BlankNodes>) -> Self {
        Self {
            eval_context,
            bnodes,
            skip_element: false,
            new_subject: None,
            current_object_resource: None,
            typed_resource: None,
            iri_mappings: eval_context.iri_mappings.clone(),
            incomplete_triples: Vec::new(),
            list_mappings: eval_context.list_mapping.clone(),
            current_language: eval_context.language.clone(),
            term_mappings: eval_context.term_mappings.clone(),
            default_vocab: eval_context.default_vocab.clone(),
        }
    }

    pub fn empty_curie(&self) -> Rc<NamedOrBlankNode> {
        Rc::new(NamedNode::new_unchecked(self.eval_context.base.as_str()).into())
    }

    pub fn fresh_bnode(&self) -> Rc<NamedOrBlankNode> {
        Rc::new(self.bnodes.borrow_mut().fresh().into())
    }

    /// `Ok(None)` means the value is a term but MUST be ignored.
    pub fn resolve_term(&self, term: &str) -> Result<Option<NamedNode>, NotTerm> {
        // [rdfa-core] 7.5.3
        //   term     ::=  NCNameStartChar termChar*
        //   termChar ::=  ( NameChar - ':' ) | '/'
        let is_term = !term.is_empty()
            && !term.starts_with('/')
            && term
                .split('/')
                .all(|s| s.is_empty() || rxml_validation::validate_ncname(s).is_ok());
        if !is_term {
            return Err(NotTerm);
        }

        // > If there is a local default vocabulary the IRI is obtained
        // > by concatenating that value and the term.
        if let Some(vocab) = &self.default_vocab {
            return match NamedNode::new(format!("{}{term}", vocab.as_str())) {
                Ok(iri) => Ok(Some(iri)),
                Err(e) => {
                    warn!(kind = "UnresolvedTerm", "term {term} gives an invalid IRI: {e}");
                    Ok(None)
                }
            };
        }

        // > First compare against the list case-sensitively,
        // > and if there is no match then compare case-insensitively.
        let mapped = self.term_mappings.get(term).or_else(|| {
            self.term_mappings
                .iter()
                .find_map(|(key, iri)| key.eq_ignore_ascii_case(term).then_some(iri))
        });

        if mapped.is_none() {
            warn!(kind = "UnresolvedTerm", "unresolved term: {term}");
        }

        Ok(mapped.cloned())
    }

    /// Resolves a (non-safe) CURIE to an IRI or bnode.
    fn resolve_curie(&self, value: &str) -> Result<NamedOrBlankNode, CurieError> {
        if value.is_empty() {
            return Err(CurieError::Empty);
        }

        // prefixes are matched case-insensitively
        let prefix;
        let curie = match value.split_once(':') {
            Some(("_", label)) => return Ok(self.bnodes.borrow_mut().labelled(label).into()),
            Some((p, reference)) => {
                prefix = p.to_ascii_lowercase();
                Curie::new(Some(&prefix), reference)
            }
            None => Curie::new(None, value),
        };

        let iri = self
            .iri_mappings
            .expand_curie(&curie)
            .map_err(CurieError::Expansion)?;

        // prefixes should be absolute, but a relative one is resolved all the same
        self.resolve_relative_iri(&iri)
            .map(NamedOrBlankNode::from)
            .map_err(|_| CurieError::InvalidIri(iri))
    }

    /// `Ok(None)` means a SafeCURIE that MUST be ignored.
    fn resolve_safecurie_or_curie(
        &self,
        value: &str,
    ) -> Result<Option<NamedOrBlankNode>, NotCurie> {
        let Some(safe) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) else {
            return self.resolve_curie(value).map(Some).map_err(|_| NotCurie);
        };

        match self.resolve_curie(safe) {
            Ok(resolved) => Ok(Some(resolved)),
            Err(CurieError::Empty | CurieError::Expansion(ExpansionError::MissingDefault)) => {
                Ok(None)
            }
            Err(CurieError::InvalidIri(iri)) => {
                warn!(kind = "UnresolvedCurie", "CURIE {value} expands to invalid IRI <{iri}>");
                Ok(None)
            }
            Err(CurieError::Expansion(ExpansionError::Invalid)) => {
                warn!(kind = "UnresolvedCurie", "CURIE {value} uses an undefined prefix");
                Ok(None)
            }
        }
    }

    /// Resolves an IRI-only attribute value (`@href`, `@src`).
    pub fn attribute_iri(&self, value: &str) -> Option<NamedNode> {
        self.resolve_relative_iri(value).ok()
    }

    pub fn resolve_relative_iri(&self, value: &str) -> Result<NamedNode, IriParseError> {
        let iri = self.eval_context.base.resolve(value)?;
        Ok(NamedNode::new_unchecked(iri.into_inner()))
    }

    pub fn safecurie_or_curie_or_iri(&self, value: &str) -> Option<NamedOrBlankNode> {
        match self.resolve_safecurie_or_curie(value) {
            Ok(resolved) => resolved,
            Err(NotCurie) => match self.resolve_relative_iri(value) {
                Ok(iri) => Some(iri.into()),
                Err(e) => {
                    report_invalid_iri(value, &e);
                    None
                }
            },
        }
    }

    fn curie_or_absiri(&self, value: &str) -> Option<NamedOrBlankNode> {
        if let Ok(resolved) = self.resolve_curie(value) {
            return Some(resolved);
        }

        match NamedNode::new(value) {
            Ok(iri) => Some(iri.into()),
            Err(e) => {
                report_invalid_iri(value, &e);
                None
            }
        }
    }

    pub fn term_or_curie_or_absiri(&self, value: &str) -> Option<NamedOrBlankNode> {
        match self.resolve_term(value) {
            Ok(resolved) => resolved.map(NamedOrBlankNode::from),
            Err(NotTerm) => self.curie_or_absiri(value),
        }
    }

    pub fn many_curie_or_absiri(&self, value: &str) -> Vec<NamedOrBlankNode> {
        value
            .split_ascii_whitespace()
            .filter_map(|v| self.curie_or_absiri(v))
            .collect()
    }

    pub fn many_term_or_curie_or_absiri(&self, value: &str) -> Vec<NamedOrBlankNode> {
        value
            .split_ascii_whitespace()
            .filter_map(|v| self.term_or_curie_or_absiri(v))
            .collect()
    }
}

fn report_invalid_iri(value: &str, error: &IriParseError) {
    warn!(kind = "Warning", "invalid IRI <{value}>: {error}");
}

#[cfg(test)]
mod test {
    use super::*;

    fn context() -> EvaluationContext {
        EvaluationContext::new(&Iri::parse("http://example.com/doc#frag".to_string()).unwrap())
            .unwrap()
    }

    #[test]
    fn base_loses_fragment_but_parent_subject_keeps_it() {
        let ctx = context();
        assert_eq!(ctx.base.as_str(), "http://example.com/doc");
        assert_eq!(ctx.parent_subject.to_string(), "<http://example.com/doc#frag>");
    }

    #[test]
    fn blank_node_labels_are_stable() {
        let mut bnodes = BlankNodes::default();
        assert_eq!(bnodes.labelled("x").as_str(), "b0");
        assert_eq!(bnodes.fresh().as_str(), "b1");
        assert_eq!(bnodes.labelled("x").as_str(), "b0");
        assert_eq!(bnodes.labelled("").as_str(), "b2");
    }

    #[test]
    fn curies_and_terms() {
        let ctx = context();
        let bnodes = RefCell::default();
        let local = LocalScope::new(&ctx, &bnodes);

        assert_eq!(
            local.term_or_curie_or_absiri("foaf:name").map(|n| n.to_string()),
            Some("<http://xmlns.com/foaf/0.1/name>".to_string())
        );
        assert_eq!(
            local.term_or_curie_or_absiri("License").map(|n| n.to_string()),
            Some("<http://www.w3.org/1999/xhtml/vocab#license>".to_string())
        );
        assert!(local.term_or_curie_or_absiri("unknown").is_none());
        assert_eq!(
            local.safecurie_or_curie_or_iri("[_:a]").map(|n| n.to_string()),
            Some("_:b0".to_string())
        );
        assert!(local.safecurie_or_curie_or_iri("[nope:x]").is_none());
        assert_eq!(
            local.safecurie_or_curie_or_iri("other").map(|n| n.to_string()),
            Some("<http://example.com/other>".to_string())
        );
    }

    #[test]
    fn vocab_applies_to_terms() {
        let ctx = context();
        let bnodes = RefCell::default();
        let mut local = LocalScope::new(&ctx, &bnodes);
        local.default_vocab = Some(NamedNode::new_unchecked("http://schema.org/"));

        assert_eq!(
            local.term_or_curie_or_absiri("name").map(|n| n.to_string()),
            Some("<http://schema.org/name>".to_string())
        );
    }
}
