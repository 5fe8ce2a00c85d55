//! Inbound frame classification and command descriptors.
//!
//! Once a frame is well-formed, the dispatcher needs four facts about it:
//! which command it carries, the client transaction ID, the namespace of the
//! object payload (for object commands), and any extension namespaces. This
//! module extracts them with namespace-aware traversal; tag-name string
//! matching alone is never sufficient because object payloads are recognized
//! purely by their namespace URI.

use minidom::Element;

use super::xml::{first_child, is_epp_document, EPP_NS};

/// Command name used for the extension-only (`<epp><extension>`) path.
pub const OTHER_COMMAND: &str = "other";

/// Commands that carry an object payload subject to the service repertoire.
pub const OBJECT_COMMANDS: [&str; 7] = [
    "check", "info", "create", "delete", "renew", "transfer", "update",
];

/// Whether `name` is gated by the object-service repertoire check.
pub fn is_object_command(name: &str) -> bool {
    OBJECT_COMMANDS.contains(&name)
}

/// A frame whose top-level structure violates the EPP schema.
///
/// The message is descriptive and is sent to the peer in a 2001 response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureError(pub String);

impl std::fmt::Display for StructureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classified inbound frame.
#[derive(Debug, Clone)]
pub enum InboundFrame {
    /// `<hello>`, answered with a greeting, bypassing all gating.
    Hello,
    /// `<command>` or top-level `<extension>`, dispatched to a handler.
    Command(CommandDescriptor),
}

/// Facts the dispatcher needs about one command frame.
#[derive(Debug, Clone)]
pub struct CommandDescriptor {
    /// Local name of the command element, or [`OTHER_COMMAND`] for the
    /// extension-only path.
    pub name: String,
    /// Text of `<clTRID>`, if the element was present (possibly empty).
    pub cl_trid: Option<String>,
    /// Namespace URI of the object payload (first child of the command
    /// element), when one exists.
    pub object_uri: Option<String>,
    /// Namespace URIs of the children of the `<extension>` element.
    pub extension_uris: Vec<String>,
    /// False on the extension-only path, whose extension URIs are
    /// dispatched without a repertoire check.
    pub gate_extensions: bool,
}

impl CommandDescriptor {
    /// The `<clTRID>` value to echo: present iff the input carried a
    /// non-empty one.
    pub fn echoed_cl_trid(&self) -> Option<&str> {
        self.cl_trid.as_deref().filter(|s| !s.is_empty())
    }
}

/// Classify a parsed frame.
pub fn classify(doc: &Element) -> Result<InboundFrame, StructureError> {
    if !is_epp_document(doc) {
        return Err(StructureError(
            "Root element is not <epp>.".to_string(),
        ));
    }

    let Some(top) = first_child(doc) else {
        return Err(StructureError(
            "First child element of <epp> is not <command> or <extension>.".to_string(),
        ));
    };

    if top.is("hello", EPP_NS) {
        return Ok(InboundFrame::Hello);
    }

    if top.is("command", EPP_NS) {
        return classify_command(top).map(InboundFrame::Command);
    }

    if top.is("extension", EPP_NS) {
        // Extension-only command. Its URIs reach the handler unchecked.
        return Ok(InboundFrame::Command(CommandDescriptor {
            name: OTHER_COMMAND.to_string(),
            cl_trid: None,
            object_uri: None,
            extension_uris: top.children().map(|c| c.ns()).collect(),
            gate_extensions: false,
        }));
    }

    Err(StructureError(
        "First child element of <epp> is not <command> or <extension>.".to_string(),
    ))
}

fn classify_command(command: &Element) -> Result<CommandDescriptor, StructureError> {
    // <command> children: the command element itself, then optional
    // <extension> and <clTRID> in the EPP namespace.
    let cmd_el = command
        .children()
        .find(|c| !(c.is("extension", EPP_NS) || c.is("clTRID", EPP_NS)))
        .ok_or_else(|| {
            StructureError("The <command> element contains no command.".to_string())
        })?;

    let cl_trid = command.get_child("clTRID", EPP_NS).map(|e| e.text());

    let object_uri = first_child(cmd_el).map(|payload| payload.ns());

    let extension_uris = command
        .get_child("extension", EPP_NS)
        .map(|ext| ext.children().map(|c| c.ns()).collect())
        .unwrap_or_default();

    Ok(CommandDescriptor {
        name: cmd_el.name().to_string(),
        cl_trid,
        object_uri,
        extension_uris,
        gate_extensions: true,
    })
}
