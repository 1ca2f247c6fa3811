//! [html-rdfa] 3.5 property copying.

use tracing::{debug, warn};

use crate::map::{RdfaObject, SubjectMap};
use crate::vocab::{rdf, rdfa};

fn is_pattern(map: &SubjectMap, id: &str) -> bool {
    map.contains(
        id,
        rdf::TYPE.as_str(),
        &RdfaObject::resource(rdfa::PATTERN.as_str()),
    )
}

/// The patterns each subject copies from, as `(subject, pattern)` pairs.
fn copy_links(map: &SubjectMap) -> Vec<(String, String)> {
    let mut links = Vec::new();
    for (subject, predicates) in map.subjects() {
        for target in predicates.get(rdfa::COPY.as_str()).unwrap_or_default() {
            let RdfaObject::Resource(target) = target else {
                warn!(kind = "Warning", "rdfa:copy on <{subject}> does not name a resource");
                continue;
            };

            if is_pattern(map, target) {
                links.push((subject.to_string(), target.clone()));
            } else {
                warn!(kind = "Warning", "rdfa:copy target <{target}> is not an rdfa:Pattern");
            }
        }
    }

    links
}

/// Copies every pattern's properties onto the subjects referring to it with
/// `rdfa:copy`, until nothing new is added. Then the `rdfa:copy` links and the
/// patterns that were used are removed.
pub(super) fn copy_properties(map: &mut SubjectMap) {
    loop {
        let mut copies = Vec::new();
        for (subject, pattern) in copy_links(map) {
            let Some(properties) = map.get(&pattern) else {
                continue;
            };

            for (predicate, objects) in properties.iter() {
                for object in objects {
                    copies.push((subject.clone(), predicate.to_string(), object.clone()));
                }
            }
        }

        let mut added_any = false;
        for (subject, predicate, object) in copies {
            added_any |= map.insert(&subject, &predicate, object);
        }

        if !added_any {
            break;
        }
    }

    let links = copy_links(map);
    let pattern_type = RdfaObject::resource(rdfa::PATTERN.as_str());
    for (subject, _) in &links {
        let properties = map.subject_mut(subject);
        properties.remove(rdfa::COPY.as_str());

        if let Some(types) = properties.remove(rdf::TYPE.as_str()) {
            let types: Vec<_> = types.into_iter().filter(|t| *t != pattern_type).collect();
            if !types.is_empty() {
                *properties.objects_mut(rdf::TYPE.as_str()) = types;
            }
        }
    }

    for (_, pattern) in links {
        if map.remove_subject(&pattern).is_some() {
            debug!("removed pattern <{pattern}>");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn pattern_map() -> SubjectMap {
        let mut map = SubjectMap::new();
        map.push("http://x/a", rdfa::COPY.as_str(), RdfaObject::resource("_:p"));
        map.push("http://x/a", "http://x/name", RdfaObject::plain("a", None));
        map.push("_:p", rdf::TYPE.as_str(), RdfaObject::resource(rdfa::PATTERN.as_str()));
        map.push("_:p", "http://x/colour", RdfaObject::plain("red", None));
        map
    }

    #[test]
    fn pattern_properties_are_copied_and_pattern_removed() {
        let mut map = pattern_map();
        copy_properties(&mut map);

        let mut expected = SubjectMap::new();
        expected.push("http://x/a", "http://x/name", RdfaObject::plain("a", None));
        expected.push("http://x/a", "http://x/colour", RdfaObject::plain("red", None));
        assert_eq!(map, expected);
    }

    #[test]
    fn copy_of_a_non_pattern_is_left_alone() {
        let mut map = SubjectMap::new();
        map.push("http://x/a", rdfa::COPY.as_str(), RdfaObject::resource("http://x/b"));
        map.push("http://x/b", "http://x/colour", RdfaObject::plain("red", None));
        let before = map.clone();

        copy_properties(&mut map);
        assert_eq!(map, before);
    }

    #[test]
    fn copying_chains_through_patterns() {
        let mut map = pattern_map();
        map.push("_:p", rdfa::COPY.as_str(), RdfaObject::resource("_:q"));
        map.push("_:q", rdf::TYPE.as_str(), RdfaObject::resource(rdfa::PATTERN.as_str()));
        map.push("_:q", "http://x/size", RdfaObject::plain("big", None));

        copy_properties(&mut map);

        let a = map.get("http://x/a").unwrap();
        assert_eq!(a.get("http://x/size").unwrap(), [RdfaObject::plain("big", None)]);
        assert!(a.get(rdfa::COPY.as_str()).is_none());
        assert!(map.get("_:p").is_none());
        assert!(map.get("_:q").is_none());
    }
}
