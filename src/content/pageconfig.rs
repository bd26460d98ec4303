//! Companion page configuration.
//!
//! Every content path may carry a configuration file under the repository's
//! config directory. It declares page properties to inject and content
//! actions to execute before rendering:
//!
//! ```xml
//! <page>
//!     <property name="title">Today's News</property>
//!     <property name="title" locale="it">Notizie di oggi</property>
//!     <content-action name="headlines">
//!         <source feed="local"/>
//!     </content-action>
//! </page>
//! ```

use thiserror::Error;

use super::xml::{self, Element, XmlError};

const PROPERTY_ELEMENT: &str = "property";
const ACTION_ELEMENT: &str = "content-action";

#[derive(Debug, Error)]
pub enum PageConfigError {
    #[error("configuration is not well-formed: {0}")]
    Malformed(#[from] XmlError),
    #[error("property element {position} has a blank or missing name")]
    UnnamedProperty { position: usize },
    #[error("content-action element {position} has a blank or missing name")]
    UnnamedAction { position: usize },
}

/// A declared page property: name, optional locale qualifier, value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageProperty {
    pub name: String,
    pub locale: Option<String>,
    pub value: String,
}

/// A declared content action: the name to dispatch plus its configuration
/// subtree, handed verbatim to the action implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentAction {
    pub name: String,
    pub config: Element,
}

/// Parsed companion configuration for one content path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageConfig {
    pub properties: Vec<PageProperty>,
    pub actions: Vec<ContentAction>,
}

impl PageConfig {
    /// Parse a configuration document.
    ///
    /// A blank or missing `name` on any property or content-action aborts the
    /// whole configuration; partial application would leave the page in a
    /// state no configuration describes.
    pub fn parse(source: &str) -> Result<Self, PageConfigError> {
        Self::from_element(&xml::parse(source)?)
    }

    pub fn from_element(root: &Element) -> Result<Self, PageConfigError> {
        let mut properties = Vec::new();
        for (position, element) in root.children_named(PROPERTY_ELEMENT).enumerate() {
            let name = element.attribute("name").unwrap_or("").trim();
            if name.is_empty() {
                return Err(PageConfigError::UnnamedProperty { position });
            }
            // An explicit value attribute wins over element text.
            let value = element
                .attribute("value")
                .map(str::to_string)
                .unwrap_or_else(|| element.text().to_string());
            properties.push(PageProperty {
                name: name.to_string(),
                locale: element.attribute("locale").map(str::to_string),
                value,
            });
        }

        let mut actions = Vec::new();
        for (position, element) in root.children_named(ACTION_ELEMENT).enumerate() {
            let name = element.attribute("name").unwrap_or("").trim();
            if name.is_empty() {
                return Err(PageConfigError::UnnamedAction { position });
            }
            actions.push(ContentAction {
                name: name.to_string(),
                config: element.clone(),
            });
        }

        Ok(Self {
            properties,
            actions,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.actions.is_empty()
    }
}
