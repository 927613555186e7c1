//! # Hypermedia Resources
//!
//! Every ingest API response is a JSON object that may carry a `_links` map of
//! `{relation: {href: URL}}`. A [`Resource`] is the immutable snapshot of such a
//! response: what the client can do next is discovered from its link relations
//! rather than hard-coded per entity.
//!
//! ```text
//! {
//!   "_links": {
//!     "self":      { "href": "http://api/submissionEnvelopes/1" },
//!     "processes": { "href": "http://api/submissionEnvelopes/1/processes" }
//!   },
//!   "content": { ... }
//! }
//! ```

use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while navigating a [`Resource`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResourceError {
    /// The resource does not expose the requested link relation.
    #[error("Link relation not found: {0}")]
    LinkNotFound(String),
}

/// Immutable snapshot of a server-returned hypermedia object.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    links: HashMap<String, String>,
    data: Value,
}

impl Resource {
    /// Builds a resource from a response body.
    ///
    /// Returns `None` when the body has no `_links` object or the object holds
    /// no usable `href`; callers treat that as "not ready yet" rather than as an
    /// error.
    pub fn from_json(source: Value) -> Option<Self> {
        let links: HashMap<String, String> = source
            .get("_links")?
            .as_object()?
            .iter()
            .filter_map(|(relation, link)| href(link).map(|url| (relation.clone(), url.to_string())))
            .collect();

        if links.is_empty() {
            return None;
        }

        Some(Self { links, data: source })
    }

    /// Resolves a link relation (e.g. `"self"`, `"processes"`) to its URL.
    pub fn get_link(&self, relation: &str) -> Result<&str, ResourceError> {
        self.links
            .get(relation)
            .map(String::as_str)
            .ok_or_else(|| ResourceError::LinkNotFound(relation.to_string()))
    }

    pub fn has_link(&self, relation: &str) -> bool {
        self.links.contains_key(relation)
    }

    pub fn links(&self) -> &HashMap<String, String> {
        &self.links
    }

    /// The full response body this resource was built from.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// The `content` payload, when the server returned one.
    pub fn content(&self) -> Option<&Value> {
        self.data.get("content")
    }
}

// HAL allows a relation to hold a single link object or an array of them.
fn href(link: &Value) -> Option<&str> {
    match link {
        Value::Array(entries) => entries.first().and_then(href),
        other => other.get("href")?.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_link_resolves_href() {
        let resource = Resource::from_json(json!({"_links": {"self": {"href": "X"}}})).unwrap();
        assert_eq!(resource.get_link("self"), Ok("X"));
        assert!(resource.has_link("self"));
    }

    #[test]
    fn test_missing_relation_is_lookup_error() {
        let resource = Resource::from_json(json!({"_links": {"self": {"href": "X"}}})).unwrap();
        assert_eq!(
            resource.get_link("processes"),
            Err(ResourceError::LinkNotFound("processes".to_string()))
        );
    }

    #[test]
    fn test_body_without_links_yields_no_resource() {
        assert!(Resource::from_json(json!({"content": {"name": "x"}})).is_none());
        assert!(Resource::from_json(json!({"_links": {}})).is_none());
        assert!(Resource::from_json(json!({"_links": "nope"})).is_none());
        assert!(Resource::from_json(Value::Null).is_none());
    }

    #[test]
    fn test_array_links_use_first_entry() {
        let body = json!({
            "_links": {
                "files": [{"href": "/files/1"}, {"href": "/files/2"}],
                "self": {"href": "/s1"}
            }
        });
        let resource = Resource::from_json(body).unwrap();
        assert_eq!(resource.get_link("files"), Ok("/files/1"));
        assert_eq!(resource.links().len(), 2);
    }

    #[test]
    fn test_content_and_data_are_kept() {
        let body = json!({
            "_links": {"self": {"href": "/p1"}},
            "content": {"process_core": {"process_id": "analysis_1"}}
        });
        let resource = Resource::from_json(body.clone()).unwrap();
        assert_eq!(resource.data(), &body);
        assert_eq!(
            resource.content().and_then(|c| c.pointer("/process_core/process_id")),
            Some(&json!("analysis_1"))
        );
    }
}
