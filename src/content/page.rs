//! Page object and request context.
//!
//! The request layer owns a [`RequestContext`] per in-flight request; the
//! repository injects companion-configuration properties into its [`Page`]
//! and content actions mutate it before rendering.

use std::collections::HashMap;

/// Key of a page property: a name, optionally qualified by a locale tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PropertyKey {
    name: String,
    locale: Option<String>,
}

/// The page being assembled for the current request.
#[derive(Debug, Default, Clone)]
pub struct Page {
    path: String,
    properties: HashMap<PropertyKey, String>,
}

impl Page {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            properties: HashMap::new(),
        }
    }

    /// Logical path this page is being built for.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Set a named, optionally locale-qualified property.
    pub fn set_property(&mut self, name: &str, locale: Option<&str>, value: impl Into<String>) {
        self.properties.insert(
            PropertyKey {
                name: name.to_string(),
                locale: locale.map(str::to_string),
            },
            value.into(),
        );
    }

    /// Unqualified property lookup.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.property_for_locale(name, None)
    }

    /// Locale-qualified lookup, falling back to the unqualified value.
    pub fn property_for_locale(&self, name: &str, locale: Option<&str>) -> Option<&str> {
        if let Some(locale) = locale {
            let qualified = PropertyKey {
                name: name.to_string(),
                locale: Some(locale.to_string()),
            };
            if let Some(value) = self.properties.get(&qualified) {
                return Some(value);
            }
        }
        let unqualified = PropertyKey {
            name: name.to_string(),
            locale: None,
        };
        self.properties.get(&unqualified).map(String::as_str)
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }
}

/// Mutable key-value environment threaded through one request.
#[derive(Debug, Default, Clone)]
pub struct RequestContext {
    page: Page,
    values: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            page: Page::new(path),
            values: HashMap::new(),
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }
}
