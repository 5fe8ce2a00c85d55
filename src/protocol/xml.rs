//! XML frame parsing and serialization.
//!
//! Frames are handled as namespace-aware [`minidom::Element`] trees. Parsing
//! materializes CDATA sections as text; whitespace-only text nodes never
//! affect traversal because navigation walks child *elements* only.
//!
//! Schema validation is a separate, pluggable step behind the
//! [`SchemaValidator`] trait. The default [`AcceptAll`] validator treats
//! every well-formed document as valid; deployments with compiled XSDs can
//! install their own.

use minidom::Element;

/// The EPP base namespace carried by every frame's root `<epp>` element.
pub const EPP_NS: &str = "urn:ietf:params:xml:ns:epp-1.0";

/// XML declaration prepended to every outbound frame.
const XML_DECL: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// Parse a frame payload into an element tree.
///
/// Any well-formedness failure surfaces as `Err`; the dispatcher maps it to
/// result code 2001 ("XML parse error.").
pub fn parse(payload: &[u8]) -> Result<Element, minidom::Error> {
    Element::from_reader(payload)
}

/// Serialize a frame for the wire: XML declaration plus the document.
pub fn to_bytes(doc: &Element) -> Result<Vec<u8>, minidom::Error> {
    let mut buf = Vec::with_capacity(256);
    buf.extend_from_slice(XML_DECL);
    doc.write_to(&mut buf)?;
    Ok(buf)
}

/// First child element of `el`, in document order.
pub fn first_child(el: &Element) -> Option<&Element> {
    el.children().next()
}

/// Whether `doc` is an `<epp>` document in the EPP namespace.
pub fn is_epp_document(doc: &Element) -> bool {
    doc.is("epp", EPP_NS)
}

/// Pluggable schema validation seam.
///
/// Runs after well-formedness parsing and before dispatch. A rejection maps
/// to result code 2001 ("XML schema error.").
pub trait SchemaValidator: Send + Sync {
    /// Validate a parsed frame. `Err` carries a human-readable reason,
    /// which is logged but never sent to the peer.
    fn validate(&self, doc: &Element) -> Result<(), String>;
}

/// Validator that accepts every well-formed document.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl SchemaValidator for AcceptAll {
    fn validate(&self, _doc: &Element) -> Result<(), String> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_frame() {
        let doc = parse(br#"<epp xmlns="urn:ietf:params:xml:ns:epp-1.0"><hello/></epp>"#)
            .unwrap();

        assert!(is_epp_document(&doc));
        let hello = first_child(&doc).unwrap();
        assert_eq!(hello.name(), "hello");
        assert_eq!(hello.ns(), EPP_NS);
    }

    #[test]
    fn test_parse_rejects_malformed_xml() {
        assert!(parse(b"<epp><command").is_err());
        assert!(parse(b"").is_err());
        assert!(parse(b"not xml at all").is_err());
    }

    #[test]
    fn test_parse_materializes_cdata() {
        let doc = parse(
            br#"<epp xmlns="urn:ietf:params:xml:ns:epp-1.0"><command><clTRID><![CDATA[abc-001]]></clTRID></command></epp>"#,
        )
        .unwrap();

        let command = first_child(&doc).unwrap();
        let cl_trid = command.get_child("clTRID", EPP_NS).unwrap();
        assert_eq!(cl_trid.text(), "abc-001");
    }

    #[test]
    fn test_whitespace_between_elements_is_ignored_by_traversal() {
        let doc = parse(
            b"<epp xmlns=\"urn:ietf:params:xml:ns:epp-1.0\">\n  <hello/>\n</epp>",
        )
        .unwrap();

        assert_eq!(first_child(&doc).unwrap().name(), "hello");
        assert_eq!(doc.children().count(), 1);
    }

    #[test]
    fn test_to_bytes_prepends_declaration() {
        let doc: Element = Element::bare("epp", EPP_NS);
        let bytes = to_bytes(&doc).unwrap();

        assert!(bytes.starts_with(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        let reparsed = parse(&bytes).unwrap();
        assert!(is_epp_document(&reparsed));
    }

    #[test]
    fn test_accept_all_validator() {
        let doc = Element::bare("epp", EPP_NS);
        assert!(AcceptAll.validate(&doc).is_ok());
    }
}
