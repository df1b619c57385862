//! XML response reader.
//!
//! Host responses look like:
//!
//! ```xml
//! <root status_code="200" status_message="OK">
//!   <PairStatus>1</PairStatus>
//!   <App><AppTitle>Steam</AppTitle><ID>1234</ID></App>
//! </root>
//! ```
//!
//! The root status is checked once, at parse time, so no field can be read
//! from a document reporting an error.

use crate::errors::ClientError;

const STATUS_OK: &str = "200";

#[derive(Debug, Clone)]
struct Element {
    name: String,
    text: String,
    children: Vec<(String, String)>,
}

/// A parsed, status-checked response body.
#[derive(Debug, Clone)]
pub struct XmlResponse {
    elements: Vec<Element>,
}

impl XmlResponse {
    /// Parse `body` and verify the root status.
    ///
    /// Malformed XML, a missing status, or a non-200 status all yield
    /// [`ClientError::Protocol`]; the latter carries the host's message.
    pub fn parse(body: &[u8]) -> Result<Self, ClientError> {
        let text = std::str::from_utf8(body)
            .map_err(|_| ClientError::Protocol("response is not UTF-8".into()))?;
        let doc = roxmltree::Document::parse(text)
            .map_err(|e| ClientError::Protocol(format!("malformed XML: {e}")))?;

        let root = doc.root_element();
        let status = root
            .attribute("status_code")
            .ok_or_else(|| ClientError::Protocol("response has no status_code".into()))?;
        if status.trim() != STATUS_OK {
            let message = root.attribute("status_message").unwrap_or("no message");
            return Err(ClientError::Protocol(format!(
                "host returned status {}: {}",
                status.trim(),
                message
            )));
        }

        let elements = root
            .descendants()
            .filter(|n| n.is_element())
            .map(|n| Element {
                name: n.tag_name().name().to_string(),
                text: n.text().unwrap_or("").trim().to_string(),
                children: n
                    .children()
                    .filter(|c| c.is_element())
                    .map(|c| {
                        (
                            c.tag_name().name().to_string(),
                            c.text().unwrap_or("").trim().to_string(),
                        )
                    })
                    .collect(),
            })
            .collect();

        Ok(Self { elements })
    }

    /// Text of the first element named `tag`, if present.
    pub fn text(&self, tag: &str) -> Option<&str> {
        self.elements
            .iter()
            .find(|e| e.name == tag)
            .map(|e| e.text.as_str())
    }

    /// Text of the first element named `tag`, or a protocol error.
    pub fn require(&self, tag: &str) -> Result<&str, ClientError> {
        self.text(tag)
            .ok_or_else(|| ClientError::Protocol(format!("missing element <{tag}>")))
    }

    /// Like [`require`](Self::require) but also rejects empty text.
    pub fn require_non_empty(&self, tag: &str) -> Result<&str, ClientError> {
        match self.require(tag)? {
            "" => Err(ClientError::Protocol(format!("empty element <{tag}>"))),
            value => Ok(value),
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.elements.iter().any(|e| e.name == tag)
    }

    /// Child elements of every element named `tag`, in document order.
    pub fn records(&self, tag: &str) -> Vec<Record<'_>> {
        self.elements
            .iter()
            .filter(|e| e.name == tag)
            .map(|e| Record { fields: &e.children })
            .collect()
    }
}

/// The direct children of one repeated element such as `<App>`.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    fields: &'a [(String, String)],
}

impl<'a> Record<'a> {
    pub fn get(&self, tag: &str) -> Option<&'a str> {
        self.fields
            .iter()
            .find(|(name, _)| name == tag)
            .map(|(_, text)| text.as_str())
    }

    /// Parse a numeric child, failing with a protocol error.
    pub fn number<T: std::str::FromStr>(&self, tag: &str) -> Result<T, ClientError> {
        self.get(tag)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| ClientError::Protocol(format!("missing or invalid <{tag}>")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_require() {
        let doc = XmlResponse::parse(
            br#"<?xml version="1.0" encoding="utf-8"?>
            <root status_code="200"><paired>1</paired><empty></empty></root>"#,
        )
        .unwrap();
        assert_eq!(doc.text("paired"), Some("1"));
        assert_eq!(doc.text("empty"), Some(""));
        assert!(doc.contains("empty"));
        assert!(doc.require("missing").is_err());
        assert!(doc.require_non_empty("empty").is_err());
    }

    #[test]
    fn test_error_status_carries_message() {
        let err = XmlResponse::parse(
            br#"<root status_code="401" status_message="The client is not authorized"/>"#,
        )
        .unwrap_err();
        match err {
            ClientError::Protocol(msg) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("The client is not authorized"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_status_is_protocol_error() {
        assert!(matches!(
            XmlResponse::parse(b"<root><a>1</a></root>"),
            Err(ClientError::Protocol(_))
        ));
    }

    #[test]
    fn test_malformed_is_protocol_error() {
        assert!(matches!(
            XmlResponse::parse(b"<root status_code=\"200\"><a>"),
            Err(ClientError::Protocol(_))
        ));
        assert!(matches!(
            XmlResponse::parse(&[0xff, 0xfe, 0x00]),
            Err(ClientError::Protocol(_))
        ));
    }

    #[test]
    fn test_records_preserve_order() {
        let doc = XmlResponse::parse(
            br#"<root status_code="200">
                <App><AppTitle>B</AppTitle><ID>2</ID></App>
                <App><AppTitle>A</AppTitle><ID>1</ID></App>
            </root>"#,
        )
        .unwrap();
        let apps = doc.records("App");
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].get("AppTitle"), Some("B"));
        assert_eq!(apps[1].number::<u32>("ID").unwrap(), 1);
        assert!(apps[0].number::<u32>("AppTitle").is_err());
    }
}
