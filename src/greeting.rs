//! Greeting frame construction.
//!
//! The server advertises its identity and service repertoire in a
//! `<greeting>` frame, sent once at connection start and again for every
//! `<hello>`. The metadata (server ID, languages, object and extension
//! URIs) comes from the user's `hello` callback and is resolved once per
//! process; only `<svDate>` is recomputed at send time.

use chrono::Utc;
use minidom::Element;

use crate::protocol::xml::EPP_NS;

/// Server metadata returned by the `hello` callback.
#[derive(Debug, Clone, Default)]
pub struct HelloMeta {
    /// `<svID>` value. Defaults to the lowercased host name.
    pub sv_id: Option<String>,
    /// `<lang>` values. Defaults to `["en"]`.
    pub langs: Vec<String>,
    /// `<objURI>` values, the object services this server offers.
    pub objects: Vec<String>,
    /// `<extURI>` values, optional extension services.
    pub extensions: Vec<String>,
}

impl HelloMeta {
    /// Metadata with the given object URIs and all defaults otherwise.
    pub fn with_objects<I, S>(objects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            objects: objects.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    fn resolved_sv_id(&self) -> String {
        self.sv_id.clone().unwrap_or_else(default_sv_id)
    }

    fn resolved_langs(&self) -> Vec<String> {
        if self.langs.is_empty() {
            vec!["en".to_string()]
        } else {
            self.langs.clone()
        }
    }
}

/// Lowercased host name, used when the callback leaves `<svID>` unset.
fn default_sv_id() -> String {
    gethostname::gethostname().to_string_lossy().to_lowercase()
}

/// Current UTC instant in the `YYYY-MM-DDTHH:MM:SS.0Z` shape.
pub fn sv_date_now() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S.0Z").to_string()
}

/// Build a `<greeting>` frame with a fresh `<svDate>`.
pub fn build_greeting(meta: &HelloMeta) -> Element {
    let mut svc_menu = Element::builder("svcMenu", EPP_NS)
        .append(Element::builder("version", EPP_NS).append("1.0").build())
        .build();

    for lang in meta.resolved_langs() {
        svc_menu.append_child(Element::builder("lang", EPP_NS).append(lang).build());
    }
    for uri in &meta.objects {
        svc_menu.append_child(Element::builder("objURI", EPP_NS).append(uri.clone()).build());
    }
    if !meta.extensions.is_empty() {
        let mut svc_ext = Element::builder("svcExtension", EPP_NS).build();
        for uri in &meta.extensions {
            svc_ext.append_child(Element::builder("extURI", EPP_NS).append(uri.clone()).build());
        }
        svc_menu.append_child(svc_ext);
    }

    let dcp = Element::builder("dcp", EPP_NS)
        .append(
            Element::builder("access", EPP_NS)
                .append(Element::bare("all", EPP_NS))
                .build(),
        )
        .append(
            Element::builder("statement", EPP_NS)
                .append(
                    Element::builder("purpose", EPP_NS)
                        .append(Element::bare("prov", EPP_NS))
                        .build(),
                )
                .append(
                    Element::builder("recipient", EPP_NS)
                        .append(Element::bare("public", EPP_NS))
                        .build(),
                )
                .append(
                    Element::builder("retention", EPP_NS)
                        .append(Element::bare("legal", EPP_NS))
                        .build(),
                )
                .build(),
        )
        .build();

    let greeting = Element::builder("greeting", EPP_NS)
        .append(Element::builder("svID", EPP_NS).append(meta.resolved_sv_id()).build())
        .append(Element::builder("svDate", EPP_NS).append(sv_date_now()).build())
        .append(svc_menu)
        .append(dcp)
        .build();

    Element::builder("epp", EPP_NS).append(greeting).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    const DOMAIN_NS: &str = "urn:ietf:params:xml:ns:domain-1.0";
    const SECDNS_NS: &str = "urn:ietf:params:xml:ns:secDNS-1.1";

    fn meta() -> HelloMeta {
        HelloMeta {
            sv_id: Some("epp.example.com".to_string()),
            langs: vec![],
            objects: vec![DOMAIN_NS.to_string()],
            extensions: vec![SECDNS_NS.to_string()],
        }
    }

    fn greeting_of(doc: &Element) -> &Element {
        doc.get_child("greeting", EPP_NS).unwrap()
    }

    #[test]
    fn test_greeting_child_order() {
        let doc = build_greeting(&meta());
        let names: Vec<&str> = greeting_of(&doc).children().map(|c| c.name()).collect();
        assert_eq!(names, ["svID", "svDate", "svcMenu", "dcp"]);
    }

    #[test]
    fn test_svc_menu_contents() {
        let doc = build_greeting(&meta());
        let menu = greeting_of(&doc).get_child("svcMenu", EPP_NS).unwrap();

        assert_eq!(menu.get_child("version", EPP_NS).unwrap().text(), "1.0");
        assert_eq!(menu.get_child("lang", EPP_NS).unwrap().text(), "en");
        assert_eq!(menu.get_child("objURI", EPP_NS).unwrap().text(), DOMAIN_NS);

        let ext = menu.get_child("svcExtension", EPP_NS).unwrap();
        assert_eq!(ext.get_child("extURI", EPP_NS).unwrap().text(), SECDNS_NS);
    }

    #[test]
    fn test_no_svc_extension_without_ext_uris() {
        let mut m = meta();
        m.extensions.clear();

        let doc = build_greeting(&m);
        let menu = greeting_of(&doc).get_child("svcMenu", EPP_NS).unwrap();
        assert!(menu.get_child("svcExtension", EPP_NS).is_none());
    }

    #[test]
    fn test_sv_date_is_iso8601_utc() {
        let doc = build_greeting(&meta());
        let sv_date = greeting_of(&doc).get_child("svDate", EPP_NS).unwrap().text();

        assert!(sv_date.ends_with(".0Z"), "got {sv_date}");
        DateTime::parse_from_rfc3339(&sv_date).unwrap();
    }

    #[test]
    fn test_dcp_block() {
        let doc = build_greeting(&meta());
        let dcp = greeting_of(&doc).get_child("dcp", EPP_NS).unwrap();

        let access = dcp.get_child("access", EPP_NS).unwrap();
        assert!(access.has_child("all", EPP_NS));

        let statement = dcp.get_child("statement", EPP_NS).unwrap();
        assert!(statement.get_child("purpose", EPP_NS).unwrap().has_child("prov", EPP_NS));
        assert!(statement
            .get_child("recipient", EPP_NS)
            .unwrap()
            .has_child("public", EPP_NS));
        assert!(statement
            .get_child("retention", EPP_NS)
            .unwrap()
            .has_child("legal", EPP_NS));
    }

    #[test]
    fn test_greetings_identical_apart_from_sv_date() {
        let m = meta();
        let a = build_greeting(&m);
        let b = build_greeting(&m);

        // Everything but the timestamp must match structurally.
        for name in ["svID", "svcMenu", "dcp"] {
            assert_eq!(
                greeting_of(&a).get_child(name, EPP_NS),
                greeting_of(&b).get_child(name, EPP_NS),
                "mismatch in <{name}>"
            );
        }
    }

    #[test]
    fn test_default_langs_and_sv_id() {
        let doc = build_greeting(&HelloMeta::with_objects([DOMAIN_NS]));
        let greeting = greeting_of(&doc);

        let sv_id = greeting.get_child("svID", EPP_NS).unwrap().text();
        assert!(!sv_id.is_empty());
        assert_eq!(sv_id, sv_id.to_lowercase());

        let menu = greeting.get_child("svcMenu", EPP_NS).unwrap();
        assert_eq!(menu.get_child("lang", EPP_NS).unwrap().text(), "en");
    }
}
