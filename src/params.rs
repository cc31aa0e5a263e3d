//! Route parameters and query strings
//!
//! - [`RouteFields`] holds the values extracted from the path for a live route,
//!   one observable field per parameter of the pattern that created it.
//! - [`QueryParams`] holds the parsed query string of the current path.

use crate::events::{ObservableField, SubscriptionId};
use crate::matcher::ParamDescriptor;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::HashMap;

/// Characters left alone when encoding a query component.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

// ============================================================================
// Route Fields
// ============================================================================

/// Observable parameter values of a route instance.
///
/// Fields are declared once, from the pattern's parameter descriptors, and keep
/// declaration order. Updating a route in place sets these fields; watchers see
/// the new values while the route object itself stays the same.
#[derive(Debug)]
pub struct RouteFields {
    fields: Vec<(String, ObservableField<Option<String>>)>,
}

impl RouteFields {
    /// Bind `values` to `descriptors` positionally. Missing values are `None`.
    pub fn new(descriptors: &[ParamDescriptor], values: Vec<Option<String>>) -> Self {
        let mut values = values.into_iter();
        let fields = descriptors
            .iter()
            .map(|descriptor| {
                let value = values.next().flatten();
                (descriptor.name.clone(), ObservableField::new(value))
            })
            .collect();
        Self { fields }
    }

    /// Value of a parameter. `None` when absent or not declared.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.field(name)?.get().as_deref()
    }

    /// Parse a parameter as `T`.
    pub fn get_as<T>(&self, name: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.get(name)?.parse().ok()
    }

    /// Whether `name` is a declared parameter.
    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Set a declared parameter. Returns whether the value changed; undeclared
    /// names are ignored.
    pub fn set(&mut self, name: &str, value: Option<String>) -> bool {
        self.field_mut(name).is_some_and(|field| field.set(value))
    }

    /// Assign all values positionally, as produced by `PathMatcher::extract`.
    pub(crate) fn assign(&mut self, values: Vec<Option<String>>) {
        let mut values = values.into_iter();
        for (_, field) in &mut self.fields {
            field.set(values.next().flatten());
        }
    }

    /// Watch a parameter for changes.
    pub fn watch<F>(&mut self, name: &str, watcher: F) -> Option<SubscriptionId>
    where
        F: FnMut(&Option<String>) + 'static,
    {
        self.field_mut(name).map(|field| field.watch(watcher))
    }

    /// Stop watching a parameter.
    pub fn unwatch(&mut self, name: &str, id: SubscriptionId) -> bool {
        self.field_mut(name).is_some_and(|field| field.unwatch(id))
    }

    /// Drop all watchers of all fields.
    pub(crate) fn clear_watchers(&mut self) {
        for (_, field) in &mut self.fields {
            field.clear_watchers();
        }
    }

    /// Iterate `(name, value)` in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields
            .iter()
            .map(|(name, field)| (name.as_str(), field.get().as_deref()))
    }

    /// Snapshot of the present values.
    pub fn to_map(&self) -> HashMap<String, String> {
        self.iter()
            .filter_map(|(name, value)| Some((name.to_string(), value?.to_string())))
            .collect()
    }

    /// Number of declared parameters.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the pattern declared no parameters.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn field(&self, name: &str) -> Option<&ObservableField<Option<String>>> {
        self.fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, field)| field)
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut ObservableField<Option<String>>> {
        self.fields
            .iter_mut()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, field)| field)
    }
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Query parameters parsed from the part of a path after `?`
///
/// Supports multiple values for the same key.
///
/// # Example
///
/// ```
/// use history_router::QueryParams;
///
/// let query = QueryParams::from_query_string("page=1&sort=name&tag=rust&tag=web");
///
/// assert_eq!(query.get("page"), Some("1"));
/// assert_eq!(query.get_as::<i32>("page"), Some(1));
/// assert_eq!(query.get_all("tag").map(|tags| tags.len()), Some(2));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: HashMap<String, Vec<String>>,
}

impl QueryParams {
    /// Create new empty query params
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string (without the leading `?`).
    ///
    /// `+` decodes to a space. A key without `=` gets an empty value.
    pub fn from_query_string(query: &str) -> Self {
        let mut params: HashMap<String, Vec<String>> = HashMap::new();

        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params
                .entry(decode_query_component(key))
                .or_default()
                .push(decode_query_component(value));
        }

        Self { params }
    }

    /// Get first value for a parameter
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key)?.first().map(String::as_str)
    }

    /// Get all values for a parameter
    pub fn get_all(&self, key: &str) -> Option<&[String]> {
        self.params.get(key).map(Vec::as_slice)
    }

    /// Get the first value parsed as `T`
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.get(key)?.parse().ok()
    }

    /// Insert a parameter, appending if the key already exists
    pub fn insert(&mut self, key: String, value: String) {
        self.params.entry(key).or_default().push(value);
    }

    /// Check if parameter exists
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Encode back to a query string. Key order is unspecified.
    pub fn to_query_string(&self) -> String {
        let pairs: Vec<String> = self
            .params
            .iter()
            .flat_map(|(key, values)| {
                values.iter().map(move |value| {
                    format!(
                        "{}={}",
                        utf8_percent_encode(key, QUERY_COMPONENT),
                        utf8_percent_encode(value, QUERY_COMPONENT)
                    )
                })
            })
            .collect();

        pairs.join("&")
    }

    /// Check if parameters are empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Get number of unique parameter keys
    pub fn len(&self) -> usize {
        self.params.len()
    }
}

fn decode_query_component(s: &str) -> String {
    let spaced = s.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptors(names: &[&str]) -> Vec<ParamDescriptor> {
        names
            .iter()
            .map(|name| ParamDescriptor {
                name: (*name).to_string(),
                optional: false,
                wildcard: false,
            })
            .collect()
    }

    #[test]
    fn test_route_fields_positional_binding() {
        let fields = RouteFields::new(
            &descriptors(&["user", "post"]),
            vec![Some("42".to_string())],
        );

        assert_eq!(fields.get("user"), Some("42"));
        assert_eq!(fields.get("post"), None);
        assert!(fields.contains("post"));
        assert!(!fields.contains("missing"));
        assert_eq!(fields.get_as::<u32>("user"), Some(42));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_route_fields_assign_notifies_watchers() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut fields = RouteFields::new(&descriptors(&["id"]), vec![Some("1".to_string())]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        fields.watch("id", move |value| sink.borrow_mut().push(value.clone()));

        fields.assign(vec![Some("1".to_string())]);
        fields.assign(vec![Some("2".to_string())]);

        assert_eq!(*seen.borrow(), vec![Some("2".to_string())]);
        assert_eq!(fields.get("id"), Some("2"));
    }

    #[test]
    fn test_route_fields_set_ignores_undeclared() {
        let mut fields = RouteFields::new(&descriptors(&["id"]), Vec::new());
        assert!(!fields.set("other", Some("x".to_string())));
        assert!(fields.set("id", Some("x".to_string())));
        assert!(fields.watch("other", |_| {}).is_none());
        assert_eq!(fields.to_map().get("id").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_query_params_parse() {
        let query = QueryParams::from_query_string("page=1&sort=name");

        assert_eq!(query.get("page"), Some("1"));
        assert_eq!(query.get("sort"), Some("name"));
        assert_eq!(query.get_as::<i32>("page"), Some(1));
    }

    #[test]
    fn test_query_params_multiple_values() {
        let query = QueryParams::from_query_string("tag=rust&tag=web&tag=router");

        let tags = query.get_all("tag").unwrap();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0], "rust");
        assert_eq!(query.get("tag"), Some("rust"));
    }

    #[test]
    fn test_query_params_decoding() {
        let query = QueryParams::from_query_string("name=John%20Doe&q=a+b&flag");

        assert_eq!(query.get("name"), Some("John Doe"));
        assert_eq!(query.get("q"), Some("a b"));
        assert_eq!(query.get("flag"), Some(""));
    }

    #[test]
    fn test_query_params_empty() {
        let query = QueryParams::from_query_string("");
        assert!(query.is_empty());
        assert_eq!(query.len(), 0);
    }

    #[test]
    fn test_query_params_to_string() {
        let mut query = QueryParams::new();
        query.insert("name".to_string(), "John Doe".to_string());

        assert_eq!(query.to_query_string(), "name=John%20Doe");
        assert!(query.contains("name"));
    }
}
