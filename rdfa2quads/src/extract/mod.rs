//! RDFa 1.1 extraction from HTML ([rdfa-core], [html-rdfa]) into a [`SubjectMap`].

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

use icu::locale::LanguageIdentifier;
use itertools::Itertools;
use oxrdf::{NamedNode, NamedNodeRef, NamedOrBlankNode};
use scraper::ElementRef;
use tracing::{Level, trace, warn};
use vec1::{Size0Error, Vec1};

use crate::dom::{Document, NodeList};
use crate::map::{BLANK_NODE_PREFIX, ObjectPayload, RdfaObject, SubjectMap};
use crate::vocab::{rdf, rdfa, xhv, xsd};

mod context;
mod copy;
mod scope;

pub use context::{initial_context_prefixes, initial_context_terms};
use context::{HostLanguage, HtmlHost};
use scope::{
    Attr, BlankNodes, EvaluationContext, IncompleteTriple, ListMapping, LocalScope, Relation,
};

#[derive(derive_more::Error, derive_more::Display, derive_more::From, Debug)]
pub enum ExtractError {
    #[display("IRI parse error: `{iri}`")]
    IriParseError {
        source: oxiri::IriParseError,
        iri: String,
    },

    #[display("Invalid prefix: the prefix '_' is reserved.")]
    ReservedPrefixError(#[error(not(source))] curie::InvalidPrefixError),

    #[display("@prefix syntax error: prefix must end with ':'.")]
    NoColonPrefix,
}

/// Produces the subject map for a document.
pub trait Extractor {
    fn extract(&self, document: &Document) -> Result<SubjectMap, ExtractError>;
}

impl<F> Extractor for F
where
    F: Fn(&Document) -> Result<SubjectMap, ExtractError>,
{
    fn extract(&self, document: &Document) -> Result<SubjectMap, ExtractError> {
        self(document)
    }
}

/// The HTML+RDFa processor.
///
/// Processing warnings (unresolved CURIEs and terms, invalid IRIs and the
/// like) are reported through `tracing` at `WARN` level rather than
/// collected into a processor graph.
#[derive(Debug, Clone)]
pub struct RdfaProcessor {
    property_copying: bool,
}

impl Default for RdfaProcessor {
    fn default() -> Self {
        Self {
            property_copying: true,
        }
    }
}

impl RdfaProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property_copying(self, property_copying: bool) -> Self {
        Self { property_copying }
    }
}

impl Extractor for RdfaProcessor {
    fn extract(&self, document: &Document) -> Result<SubjectMap, ExtractError> {
        let run = Run {
            document,
            output: Default::default(),
            bnodes: Default::default(),
        };

        run.run(EvaluationContext::new(document.base())?)?;

        let mut map = run.output.into_inner();
        if self.property_copying {
            copy::copy_properties(&mut map);
        }

        Ok(map)
    }
}

/// State for a single pass over one document.
struct Run<'d> {
    document: &'d Document,
    output: RefCell<SubjectMap>,
    bnodes: RefCell<BlankNodes>,
}

fn id(node: &NamedOrBlankNode) -> String {
    match node {
        NamedOrBlankNode::NamedNode(n) => n.as_str().to_string(),
        NamedOrBlankNode::BlankNode(b) => format!("{BLANK_NODE_PREFIX}{}", b.as_str()),
    }
}

fn resource(node: &NamedOrBlankNode) -> RdfaObject {
    RdfaObject::Resource(id(node))
}

/// [html-rdfa] extension #9: the first XSD temporal type `value` is valid for.
fn temporal_datatype(value: &str) -> Option<NamedNodeRef<'static>> {
    if oxsdatatypes::Duration::from_str(value).is_ok() {
        Some(xsd::DURATION)
    } else if oxsdatatypes::DateTime::from_str(value).is_ok() {
        Some(xsd::DATE_TIME)
    } else if oxsdatatypes::Date::from_str(value).is_ok() {
        Some(xsd::DATE)
    } else if oxsdatatypes::Time::from_str(value).is_ok() {
        Some(xsd::TIME)
    } else if oxsdatatypes::GYearMonth::from_str(value).is_ok() {
        Some(xsd::G_YEAR_MONTH)
    } else if oxsdatatypes::GYear::from_str(value).is_ok() {
        Some(xsd::G_YEAR)
    } else {
        None
    }
}

impl Run<'_> {
    fn run(&self, eval_context: EvaluationContext) -> Result<(), ExtractError> {
        enum Step<'a> {
            Element(ElementRef<'a>, Rc<EvaluationContext>),
            // emitted once all children of an element have been processed
            OutputLists(Rc<NamedOrBlankNode>, Rc<RefCell<ListMapping>>),
        }

        let host = HtmlHost;
        let mut stack = vec![Step::Element(
            self.document.root_element(),
            Rc::new(eval_context),
        )];

        while let Some(step) = stack.pop() {
            match step {
                Step::Element(element, eval_context) => {
                    let new_ctx = Rc::new(self.process_element(&eval_context, element, &host)?);
                    stack.push(Step::OutputLists(
                        new_ctx.parent_subject.clone(),
                        new_ctx.list_mapping.clone(),
                    ));

                    for child in element.children().rev() {
                        if let Some(child) = ElementRef::wrap(child) {
                            stack.push(Step::Element(child, new_ctx.clone()));
                        }
                    }
                }
                // 14.
                // > For each IRI in the local list mapping, if the equivalent list does not
                // > exist in the evaluation context, indicating that the list was originally
                // > instantiated on the current element, use the list as follows:
                //
                // Only the element that created the mapping holds the last reference.
                Step::OutputLists(subject, list_mapping) => {
                    if let Ok(list_mapping) = Rc::try_unwrap(list_mapping) {
                        for (predicate, list) in list_mapping.into_inner().lists {
                            self.emit_list(&subject, &predicate, &list.borrow());
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn emit(&self, subject: &NamedOrBlankNode, predicate: NamedNodeRef, object: RdfaObject) {
        trace!("- emitting {subject} {predicate} {object:?}");
        self.output
            .borrow_mut()
            .insert(&id(subject), predicate.as_str(), object);
    }

    fn emit_list(&self, subject: &NamedOrBlankNode, predicate: &NamedNode, items: &[RdfaObject]) {
        let nodes: Vec<NamedOrBlankNode> = items
            .iter()
            .map(|_| self.bnodes.borrow_mut().fresh().into())
            .collect();

        let head = nodes
            .first()
            .map(resource)
            .unwrap_or_else(|| RdfaObject::resource(rdf::NIL.as_str()));
        self.emit(subject, predicate.as_ref(), head);

        for (i, (node, item)) in nodes.iter().zip(items).enumerate() {
            self.emit(node, rdf::FIRST, item.clone());
            let rest = nodes
                .get(i + 1)
                .map(resource)
                .unwrap_or_else(|| RdfaObject::resource(rdf::NIL.as_str()));
            self.emit(node, rdf::REST, rest);
        }
    }

    fn to_predicate(&self, attribute: &str, value: NamedOrBlankNode) -> Option<NamedNode> {
        match value {
            NamedOrBlankNode::NamedNode(n) => Some(n),
            NamedOrBlankNode::BlankNode(b) => {
                warn!(kind = "Warning", "@{attribute} cannot refer to a bnode: [{b}]");
                None
            }
        }
    }

    fn process_element(
        &self,
        eval_context: &EvaluationContext,
        element: ElementRef,
        host: &impl HostLanguage,
    ) -> Result<EvaluationContext, ExtractError> {
        let el = element.value();

        let attr_iri = |name, proj: &dyn Fn(&str) -> Option<NamedNode>| match el.attr(name) {
            None => Attr::Missing,
            Some(v) => proj(v).map_or(Attr::Empty, Attr::Value),
        };

        let attr1 = |name, proj: &dyn Fn(&str) -> Option<NamedOrBlankNode>| match el.attr(name) {
            None => Attr::Missing,
            Some(v) => proj(v).map_or(Attr::Empty, Attr::Value),
        };

        let attr_many = |name, proj: &dyn Fn(&str) -> Vec<NamedOrBlankNode>| match el.attr(name) {
            None => Attr::Missing,
            Some(v) => match Vec1::try_from_vec(proj(v)) {
                Err(Size0Error) => Attr::Empty,
                Ok(v) => Attr::Value(v),
            },
        };

        let attr_many_pred = |name, proj: &dyn Fn(&str) -> Vec<NamedOrBlankNode>| {
            let Some(v) = el.attr(name) else {
                return Attr::Missing;
            };

            let predicates = proj(v)
                .into_iter()
                .filter_map(|v| self.to_predicate(name, v))
                .collect();
            match Vec1::try_from_vec(predicates) {
                Err(Size0Error) => Attr::Empty,
                Ok(v) => Attr::Value(v),
            }
        };

        if tracing::enabled!(Level::TRACE) {
            let attrs = el.attrs().map(|(n, v)| format!("@{n}='{v}'")).join(" ");
            trace!("<{}> {attrs}", el.name());
        }

        let is_root_element = element.id() == self.document.root_element().id();
        debug_assert!(is_root_element == eval_context.parent_object.is_none());

        // 1.
        let mut local = LocalScope::new(eval_context, &self.bnodes);

        // 2.
        // > Next the current element is examined for any change to the default vocabulary via @vocab.
        if let Some(vocab) = el.attr("vocab") {
            if vocab.is_empty() {
                // > If the value is empty, then the local default vocabulary
                // > MUST be reset to the Host Language defined default (if any).
                trace!("- @vocab is empty, resetting default vocabulary");
                local.default_vocab = host.default_vocabulary();
            } else if let Ok(vocab) = local.resolve_relative_iri(vocab) {
                trace!("- default vocabulary is now: {vocab}");
                let base: NamedOrBlankNode = NamedNode::new_unchecked(eval_context.base.as_str()).into();
                self.emit(&base, rdfa::USES_VOCABULARY, RdfaObject::resource(vocab.as_str()));
                local.default_vocab = Some(vocab);
            }
        }

        // 3.
        // > Next, the current element is examined for IRI mappings and these are added
        // > to the local list of IRI mappings.
        let xmlns_prefixes = el
            .attrs()
            .filter_map(|(name, value)| Some((name.strip_prefix("xmlns:")?, value)))
            .collect::<Vec<_>>();

        let prefixes = el
            .attr("prefix")
            .map(|x| {
                x.split_ascii_whitespace()
                    .tuples()
                    .map(|(prefix, value)| match prefix.strip_suffix(':') {
                        Some(prefix) => Ok((prefix, value)),
                        None => Err(ExtractError::NoColonPrefix),
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        if !xmlns_prefixes.is_empty() || !prefixes.is_empty() {
            let mut mappings = Rc::unwrap_or_clone(local.iri_mappings);
            // xmlns: first, so that @prefix wins; never set_default, a
            // "no prefix" mapping is not allowed in RDFa
            for (prefix, iri) in xmlns_prefixes.into_iter().chain(prefixes) {
                trace!("- prefix {prefix}: <{iri}>");
                mappings.add_prefix(&prefix.to_ascii_lowercase(), iri)?;
            }

            local.iri_mappings = Rc::new(mappings);
        }

        // 4.
        // xml:lang takes precedence over lang
        if let Some(lang) = el.attr("xml:lang").or(el.attr("lang")) {
            if lang.is_empty() {
                local.current_language = None;
            } else {
                match LanguageIdentifier::from_str(lang) {
                    Ok(lang) => {
                        trace!("- current language is now: {lang}");
                        local.current_language = Some(Rc::new(lang));
                    }
                    Err(e) => {
                        warn!(kind = "Warning", "invalid language identifier ({lang}): {e}");
                    }
                }
            }
        }

        let property: Attr<Vec1<NamedNode>> =
            attr_many_pred("property", &|v| local.many_term_or_curie_or_absiri(v));

        let inlist = el.attr("inlist").is_some();
        let rel_dir = if inlist {
            Relation::List
        } else {
            Relation::Forward
        };

        // [html-rdfa] extension #7
        // > if the @property attribute and the @rel and/or @rev attribute exists
        // > on the same element, the non-CURIE and non-URI @rel and @rev values
        // > are ignored. If, after this, the value of @rel and/or @rev becomes empty,
        // > then the processor MUST act as if the respective attribute is not present.
        let (rel, rev) = if property.is_present() {
            let resolve = |name| match attr_many_pred(name, &|v| local.many_curie_or_absiri(v)) {
                Attr::Missing | Attr::Empty => None,
                Attr::Value(v) => Some(v.into_vec()),
            };
            (resolve("rel"), resolve("rev"))
        } else {
            let resolve =
                |name| match attr_many_pred(name, &|v| local.many_term_or_curie_or_absiri(v)) {
                    Attr::Missing => None,
                    Attr::Empty => Some(Vec::new()),
                    Attr::Value(v) => Some(v.into_vec()),
                };
            (resolve("rel"), resolve("rev"))
        };
        let rel = rel.map(|v| v.into_iter().map(rel_dir).collect_vec());
        let rev = rev.map(|v| v.into_iter().map(Relation::Reverse).collect_vec());

        let relations: Option<Vec<Relation>> = match (rel, rev) {
            (None, None) => None,
            (rel, rev) => Some(rel.into_iter().chain(rev).flatten().collect()),
        };

        // [role-attribute]
        if let Some(role) = el.attr("role") {
            // > If @id is present, it is used to supply the subject by concatenating
            // > the document's 'base', a fragment separator '#', and the value of @id.
            // > Otherwise the subject is a unique newly created bnode.
            let role_subject = el
                .attr("id")
                .and_then(|id| NamedNode::new(format!("{}#{id}", eval_context.base)).ok())
                .map(NamedOrBlankNode::from)
                .unwrap_or_else(|| self.bnodes.borrow_mut().fresh().into());

            // @role values are TERMorCURIEorAbsIRIs with an in-scope
            // vocabulary of http://www.w3.org/1999/xhtml/vocab#
            let role_local = LocalScope {
                default_vocab: Some(NamedNode::new_unchecked(xhv::VOCAB)),
                ..local.clone()
            };

            for role in role_local.many_term_or_curie_or_absiri(role) {
                self.emit(&role_subject, xhv::ROLE, resource(&role));
            }
        }

        let content = el.attr("content");

        let type_of: Attr<Vec1<NamedOrBlankNode>> =
            attr_many("typeof", &|v| local.many_term_or_curie_or_absiri(v));

        let about: Attr<Rc<NamedOrBlankNode>> =
            attr1("about", &|v| local.safecurie_or_curie_or_iri(v)).map(Rc::new);
        let resource_attr: Attr<Rc<NamedOrBlankNode>> =
            attr1("resource", &|v| local.safecurie_or_curie_or_iri(v)).map(Rc::new);

        let href: Attr<NamedNode> = attr_iri("href", &|v| local.attribute_iri(v));
        let src: Attr<NamedNode> = attr_iri("src", &|v| local.attribute_iri(v));

        let datatype: Attr<NamedOrBlankNode> =
            attr1("datatype", &|v| local.term_or_curie_or_absiri(v));

        // @resource, then @href, then @src
        let resource_present = resource_attr.is_present() || href.is_present() || src.is_present();
        let resource_value: Option<Rc<NamedOrBlankNode>> = resource_attr
            .value()
            .cloned()
            .or_else(|| Some(Rc::new(href.into_value()?.into())))
            .or_else(|| Some(Rc::new(src.into_value()?.into())));

        // 5.
        // > If the current element contains no @rel or @rev attribute,
        // > then the next step is to establish a value for new subject.
        if relations.is_none() {
            // 5.1
            if property.is_present() && content.is_none() && !datatype.is_present() {
                // > new subject is set to the resource obtained from the first match from the following rule:
                if let Some(about) = about.value() {
                    trace!("- using @about as new subject");
                    local.new_subject = Some(about.clone());
                } else if is_root_element {
                    trace!("- using empty @about as new subject");
                    local.new_subject = Some(local.empty_curie());
                } else if let Some(parent_object) = &eval_context.parent_object {
                    trace!("- using parent object as new subject: {parent_object}");
                    local.new_subject = Some(parent_object.clone());
                }

                if type_of.is_present() {
                    // > If @typeof is present then typed resource is set to the resource
                    // > obtained from the first match from the following rules:
                    if let Some(about) = about.value() {
                        local.typed_resource = Some(about.clone());
                    } else if is_root_element {
                        local.typed_resource = Some(local.empty_curie());
                    } else {
                        // @resource, @href, @src, or else a new bnode
                        let typed_resource = match &resource_value {
                            Some(resource) => resource.clone(),
                            None => {
                                trace!("- using new blank node as typed resource");
                                local.fresh_bnode()
                            }
                        };

                        // > The value of the current object resource is then set to the value of typed resource.
                        local.typed_resource = Some(typed_resource.clone());
                        local.current_object_resource = Some(typed_resource);
                    }
                }
            }
            // 5.2
            else {
                // > If the element contains an @about, @href, @src, or @resource attribute,
                // > new subject is set to the resource obtained as follows:
                if about.is_present() || resource_present {
                    if let Some(about) = about.value() {
                        trace!("- using @about as new subject");
                        local.new_subject = Some(about.clone())
                    } else if let Some(resource) = &resource_value {
                        trace!("- using @resource/@href/@src as new subject");
                        local.new_subject = Some(resource.clone());
                    }
                }

                // [html-rdfa] extension #8
                // > if no IRI is provided by a resource attribute, then first check to see
                // > if the element is the head or body element. If it is, then set new
                // > subject to parent object.
                let is_head_or_body = el.name() == "head" || el.name() == "body";
                if local.new_subject.is_none() && is_head_or_body {
                    trace!("- [head/body] using parent object as new subject");
                    local.new_subject = eval_context.parent_object.clone();
                }

                if local.new_subject.is_none() {
                    if is_root_element {
                        local.new_subject = Some(local.empty_curie());
                        trace!("- using empty CURIE as new subject (root element)");
                    } else if type_of.is_present() {
                        local.new_subject = Some(local.fresh_bnode());
                        trace!("- using blank node as new subject (@typeof present)");
                    } else if let Some(parent_object) = &eval_context.parent_object {
                        local.new_subject = Some(parent_object.clone());
                        trace!("- using parent object as new subject: {parent_object}");

                        // > Additionally, if @property is not present then the skip element flag is set to 'true'.
                        if !property.is_present() {
                            trace!("- skip element (no @property)");
                            local.skip_element = true;
                        }
                    }
                }

                // > Finally, if @typeof is present, set the typed resource to the value of new subject.
                if type_of.is_present() {
                    local.typed_resource = local.new_subject.clone();
                }
            }
        }
        // 6.
        // > If the current element does contain a @rel or @rev attribute,
        // > then the next step is to establish both a value for new subject
        // > and a value for current object resource:
        else {
            if let Some(about) = about.value() {
                trace!("- using @about as new subject: {about}");
                local.new_subject = Some(about.clone());
                if type_of.is_present() {
                    local.typed_resource = local.new_subject.clone();
                }
            }

            if local.new_subject.is_none() {
                if is_root_element {
                    local.new_subject = Some(local.empty_curie());
                    trace!("- using empty CURIE as new subject (root element)");
                } else {
                    local.new_subject = eval_context.parent_object.clone();
                    trace!("- using parent object as new subject");
                }
            }

            // > Then the current object resource is set to the resource obtained from the first match from the following rules:
            if let Some(resource) = &resource_value {
                local.current_object_resource = Some(resource.clone());
                trace!("- using @resource/@href/@src as current object resource: {resource}");
            } else if type_of.is_present() && !about.is_present() {
                local.current_object_resource = Some(local.fresh_bnode());
                trace!("- using blank node as current object resource (@typeof present)");
            }

            // > If @typeof is present and @about is not, set typed resource to current object resource.
            if type_of.is_present() && !about.is_present() {
                local.typed_resource = local.current_object_resource.clone();
            }
        }

        // 7.
        if let (Some(typed_resource), Some(type_of)) =
            (local.typed_resource.as_deref(), type_of.value())
        {
            for type_iri in type_of {
                self.emit(typed_resource, rdf::TYPE, resource(type_iri));
            }
        }

        // 8.
        // > If in any of the previous steps a new subject was set to a non-null value
        // > different from the parent object, the list mapping taken from the
        // > evaluation context is set to a new, empty mapping.
        if let Some(new_subject) = &local.new_subject {
            if Some(new_subject) != eval_context.parent_object.as_ref() {
                trace!("- new list mapping");
                local.list_mappings = Default::default();
            }
        }

        // 9.
        if let Some(current_object_resource) = local.current_object_resource.as_deref() {
            if let (Some(relations), Some(new_subject)) = (&relations, local.new_subject.as_deref()) {
                for relation in relations {
                    match relation {
                        Relation::List(predicate) => {
                            local
                                .list_mappings
                                .borrow_mut()
                                .insert_value(predicate, resource(current_object_resource));
                        }
                        Relation::Forward(predicate) => {
                            self.emit(
                                new_subject,
                                predicate.as_ref(),
                                resource(current_object_resource),
                            );
                        }
                        Relation::Reverse(predicate) => {
                            self.emit(
                                current_object_resource,
                                predicate.as_ref(),
                                resource(new_subject),
                            );
                        }
                    }
                }
            }
        }
        // 10.
        // > If however current object resource was set to null, but there are predicates present,
        // > then they must be stored as incomplete triples, pending the discovery of a subject
        // > that can be used as the object. Also, current object resource should be set to a
        // > newly created bnode.
        else if let Some(relations) = &relations {
            trace!("- no current object resource, storing incomplete triples");
            local.current_object_resource = Some(local.fresh_bnode());
            for relation in relations {
                let incomplete = match relation {
                    Relation::List(predicate) => {
                        IncompleteTriple::List(local.list_mappings.borrow_mut().ensure_list(predicate))
                    }
                    Relation::Forward(predicate) => IncompleteTriple::Forward(predicate.clone()),
                    Relation::Reverse(predicate) => IncompleteTriple::Reverse(predicate.clone()),
                };
                local.incomplete_triples.push(incomplete);
            }
        }

        // 11.
        // > The next step of the iteration is to establish any current property value;
        if let Some(properties) = property.into_value() {
            let lang = local.current_language.as_ref().map(|l| l.to_string());
            let plain = |value: &str| RdfaObject::plain(value, lang.clone());

            let mut sniffed_datatype = None;
            let content_val: Cow<str> = if let Some(content) = content {
                content.into()
            } else {
                // [html-rdfa] extension #9 & #10
                let datetime = el.attr("datetime").map(Cow::Borrowed).or_else(|| {
                    (el.name() == "time").then(|| Cow::Owned(element.text().join("")))
                });

                match datetime {
                    Some(value) => {
                        sniffed_datatype = temporal_datatype(&value);
                        value
                    }
                    None => Cow::Owned(element.text().join("")),
                }
            };

            let current_property_value = match &datatype {
                // > as a plain literal if @datatype is present but has an empty value
                Attr::Empty => plain(&content_val),
                // rdf:XMLLiteral and rdf:HTML take the child nodes, anything else the text
                Attr::Value(NamedOrBlankNode::NamedNode(datatype)) => RdfaObject::from_type_tag(
                    datatype.as_str(),
                    ObjectPayload::Nodes(child_nodes(element)),
                    None,
                )
                .unwrap_or_else(|| RdfaObject::typed(content_val.as_ref(), datatype.as_str())),
                Attr::Value(NamedOrBlankNode::BlankNode(b)) => {
                    warn!(kind = "Warning", "@datatype cannot refer to a bnode: [{b}]");
                    plain(&content_val)
                }
                Attr::Missing => {
                    if let Some(datatype) = sniffed_datatype {
                        RdfaObject::typed(content_val.as_ref(), datatype.as_str())
                    } else if let Some(content) = content {
                        plain(content)
                    }
                    // > otherwise, if the @rel, @rev, and @content attributes are not present,
                    // > as a resource obtained from @resource, @href or @src;
                    else if let (None, Some(resource_value)) = (&relations, &resource_value) {
                        resource(resource_value)
                    }
                    // > otherwise, if @typeof is present and @about is not, the value of typed resource.
                    else if let (true, false, Some(typed_resource)) = (
                        type_of.is_present(),
                        about.is_present(),
                        &local.typed_resource,
                    ) {
                        resource(typed_resource)
                    } else {
                        plain(&content_val)
                    }
                }
            };

            // > If the element also includes the @inlist attribute, the current property
            // > value is added to the local list mapping
            if inlist {
                let mut lists = local.list_mappings.borrow_mut();
                for property in properties {
                    lists.insert_value(&property, current_property_value.clone());
                }
            } else if let Some(new_subject) = local.new_subject.as_deref() {
                for property in properties {
                    self.emit(new_subject, property.as_ref(), current_property_value.clone());
                }
            }
        }

        // 12.
        // > If the skip element flag is 'false', and new subject was set to a non-null value,
        // > then any incomplete triples within the current context should be completed.
        //
        // These are the incomplete triples received in the evaluation context,
        // not the local ones.
        if let (false, Some(new_subject)) = (local.skip_element, &local.new_subject) {
            for incomplete in &eval_context.incomplete_triples {
                match incomplete {
                    IncompleteTriple::List(list) => list.borrow_mut().push(resource(new_subject)),
                    IncompleteTriple::Forward(predicate) => self.emit(
                        &eval_context.parent_subject,
                        predicate.as_ref(),
                        resource(new_subject),
                    ),
                    IncompleteTriple::Reverse(predicate) => self.emit(
                        new_subject,
                        predicate.as_ref(),
                        resource(&eval_context.parent_subject),
                    ),
                }
            }
        }

        // 13.
        // > If the skip element flag is 'true' then the new evaluation context is a copy of the current
        // > context that was passed in to this level of processing, with the language and list of IRI
        // > mappings values replaced with the local values;
        if local.skip_element {
            return Ok(EvaluationContext {
                language: local.current_language,
                iri_mappings: local.iri_mappings,
                // also carried over, though not listed
                default_vocab: local.default_vocab,
                ..eval_context.clone()
            });
        }

        Ok(EvaluationContext {
            base: eval_context.base.clone(),
            parent_subject: local
                .new_subject
                .clone()
                .unwrap_or_else(|| eval_context.parent_subject.clone()),
            parent_object: Some(
                local
                    .current_object_resource
                    .or(local.new_subject)
                    .unwrap_or_else(|| eval_context.parent_subject.clone()),
            ),
            iri_mappings: local.iri_mappings,
            incomplete_triples: local.incomplete_triples,
            list_mapping: local.list_mappings,
            language: local.current_language,
            default_vocab: local.default_vocab,
            term_mappings: local.term_mappings,
        })
    }
}

/// The children of an element, for XML and HTML literals.
fn child_nodes(element: ElementRef) -> NodeList {
    element.children().map(|child| child.id()).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn temporal_values_are_sniffed() {
        assert_eq!(temporal_datatype("P1Y2M"), Some(xsd::DURATION));
        assert_eq!(temporal_datatype("2012-03-18T09:30:00Z"), Some(xsd::DATE_TIME));
        assert_eq!(temporal_datatype("2012-03-18"), Some(xsd::DATE));
        assert_eq!(temporal_datatype("09:30:00"), Some(xsd::TIME));
        assert_eq!(temporal_datatype("2012-03"), Some(xsd::G_YEAR_MONTH));
        assert_eq!(temporal_datatype("2012"), Some(xsd::G_YEAR));
        assert_eq!(temporal_datatype("yesterday"), None);
    }
}
