//! Command dispatch: the per-frame protocol engine.
//!
//! [`Engine::dispatch`] takes one inbound payload and a session and always
//! produces exactly one outbound frame. The gating order is contractual:
//!
//! 1. XML parse (2001 "XML parse error.")
//! 2. schema validation (2001 "XML schema error.")
//! 3. `<hello>` short-circuits to a greeting
//! 4. `frame_received` hook (errors swallowed)
//! 5. structural classification (2001 with a descriptive message)
//! 6. authentication gate (2200)
//! 7. `logout` short-circuit (1500, handled by the engine itself)
//! 8. handler lookup (2101)
//! 9. object-service repertoire (2307)
//! 10. extension repertoire (2103)
//! 11. handler invocation (failures become 2400)
//! 12. return-value normalization
//! 13. login commit on success
//! 14. `response_prepared` hook
//!
//! Authentication precedes the repertoire checks, and the object-service
//! check precedes the extension check.

use std::sync::OnceLock;

use minidom::Element;

use crate::greeting::{build_greeting, HelloMeta};
use crate::handler::registry::{CommandContext, HandlerRegistry};
use crate::handler::reply::CommandReply;
use crate::protocol::command::{classify, is_object_command, CommandDescriptor, InboundFrame};
use crate::protocol::result_code::ResultCode;
use crate::protocol::xml::{self, AcceptAll, SchemaValidator, EPP_NS};
use crate::response::{response_code, ResponseBuilder};
use crate::session::{Credentials, Session};
use crate::trid::TridGenerator;

/// One outbound frame plus the result code that drives loop termination.
#[derive(Debug, Clone)]
pub struct Reply {
    /// The `<epp>` document to write.
    pub frame: Element,
    /// Result code; greetings count as 1000.
    pub code: ResultCode,
}

impl Reply {
    /// Whether the connection loop must exit after sending this frame.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.code.is_terminal()
    }
}

/// The shared protocol engine: registry, schema seam, transaction IDs, and
/// the memoized greeting metadata. One `Engine` serves every connection;
/// all of its state is read-only after startup except the atomic
/// transaction counter.
pub struct Engine {
    registry: HandlerRegistry,
    validator: Box<dyn SchemaValidator>,
    trids: TridGenerator,
    hello_meta: OnceLock<HelloMeta>,
}

impl Engine {
    /// Create an engine over a finished registry, accepting every
    /// well-formed frame as schema-valid.
    pub fn new(registry: HandlerRegistry) -> Self {
        Self::from_boxed(registry, Box::new(AcceptAll))
    }

    /// Create an engine with a custom schema validator.
    pub fn with_validator<V>(registry: HandlerRegistry, validator: V) -> Self
    where
        V: SchemaValidator + 'static,
    {
        Self::from_boxed(registry, Box::new(validator))
    }

    pub(crate) fn from_boxed(registry: HandlerRegistry, validator: Box<dyn SchemaValidator>) -> Self {
        Self {
            registry,
            validator,
            trids: TridGenerator::new(),
            hello_meta: OnceLock::new(),
        }
    }

    /// Mint a session for a freshly accepted connection.
    pub fn new_session(&self) -> Session {
        Session::new(self.trids.generate())
    }

    /// Build a greeting with a fresh `<svDate>`.
    ///
    /// The metadata record is resolved from the `hello` callback on first
    /// use and reused for the life of the process, so repeated greetings
    /// differ only in their timestamp.
    pub fn greeting(&self) -> Element {
        let meta = self.hello_meta.get_or_init(|| self.registry.hello_meta());
        build_greeting(meta)
    }

    /// Process one inbound frame and produce the response frame.
    pub async fn dispatch(&self, payload: &[u8], session: &mut Session) -> Reply {
        let sv_trid = self.trids.generate();

        // 1. Well-formedness.
        let doc = match xml::parse(payload) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::debug!(session = session.id(), error = %e, "unparseable frame");
                return self.error_reply(ResultCode::SYNTAX_ERROR, "XML parse error.", None, &sv_trid);
            }
        };

        // 2. Schema. The reason stays in the log; the peer sees a fixed text.
        if let Err(reason) = self.validator.validate(&doc) {
            tracing::debug!(session = session.id(), %reason, "schema validation failed");
            return self.error_reply(ResultCode::SYNTAX_ERROR, "XML schema error.", None, &sv_trid);
        }

        // 3. <hello> bypasses every remaining check.
        if xml::first_child(&doc).is_some_and(|c| c.is("hello", EPP_NS)) {
            return Reply {
                frame: self.greeting(),
                code: ResultCode::OK,
            };
        }

        // 4. frame_received hook.
        self.registry.fire_frame_received(&doc, &session.view());

        // 5. Structure and command facts.
        let desc = match classify(&doc) {
            Ok(InboundFrame::Command(desc)) => desc,
            Ok(InboundFrame::Hello) => unreachable!("hello handled above"),
            Err(e) => {
                return self.error_reply(ResultCode::SYNTAX_ERROR, &e.0, None, &sv_trid);
            }
        };
        let cl_trid = desc.echoed_cl_trid().map(str::to_string);

        // 6. Authentication gate.
        if !session.is_authenticated() && desc.name != "login" {
            return self.error_reply(
                ResultCode::AUTHENTICATION_ERROR,
                "You are not logged in.",
                cl_trid.as_deref(),
                &sv_trid,
            );
        }
        if session.is_authenticated() && desc.name == "login" {
            return self.error_reply(
                ResultCode::AUTHENTICATION_ERROR,
                "You are already logged in.",
                cl_trid.as_deref(),
                &sv_trid,
            );
        }

        // 7. logout is the engine's own command.
        if desc.name == "logout" {
            self.registry.fire_session_closed(&session.view());
            let frame = ResponseBuilder::new(ResultCode::OK_BYE)
                .msg("Command completed successfully; ending session.")
                .cl_trid_opt(cl_trid)
                .sv_trid(sv_trid.as_str())
                .build();
            let reply = Reply {
                frame,
                code: ResultCode::OK_BYE,
            };
            self.registry.fire_response_prepared(&reply.frame, &session.view());
            return reply;
        }

        // 8. Handler lookup.
        let Some(handler) = self.registry.get(&desc.name) else {
            let msg = format!("This server does not implement the <{}> command.", desc.name);
            return self.error_reply(
                ResultCode::UNIMPLEMENTED_COMMAND,
                &msg,
                cl_trid.as_deref(),
                &sv_trid,
            );
        };

        // 9. Object-service repertoire.
        if is_object_command(&desc.name) {
            if let Some(uri) = &desc.object_uri {
                if !session.has_object(uri) {
                    let msg = format!("This server does not support {uri} objects.");
                    return self.error_reply(
                        ResultCode::UNIMPLEMENTED_OBJECT_SERVICE,
                        &msg,
                        cl_trid.as_deref(),
                        &sv_trid,
                    );
                }
            }
        }

        // 10. Extension repertoire. Skipped for login (its repertoire is
        // being negotiated right now) and for the extension-only path.
        if desc.gate_extensions && desc.name != "login" {
            for uri in &desc.extension_uris {
                if !session.has_extension(uri) {
                    let msg = format!("This server does not support the {uri} extension.");
                    return self.error_reply(
                        ResultCode::UNIMPLEMENTED_EXTENSION,
                        &msg,
                        cl_trid.as_deref(),
                        &sv_trid,
                    );
                }
            }
        }

        // 11. Invoke the handler.
        let ctx = CommandContext {
            frame: doc.clone(),
            session: session.view(),
            command: desc.clone(),
            sv_trid: sv_trid.clone(),
        };
        let outcome = handler.call(ctx).await;

        // 12. Normalize the return value.
        let reply = match outcome {
            Ok(value) => self.normalize(value, &desc, cl_trid.as_deref(), &sv_trid),
            Err(e) => {
                tracing::error!(
                    session = session.id(),
                    command = %desc.name,
                    error = %e,
                    "handler failed"
                );
                self.error_reply(
                    ResultCode::COMMAND_FAILED,
                    "Command failed.",
                    cl_trid.as_deref(),
                    &sv_trid,
                )
            }
        };

        // 13. A successful login commits the credentials and repertoire.
        if desc.name == "login" && reply.code.is_success() {
            self.commit_login(&doc, session);
        }

        // 14. response_prepared hook.
        self.registry.fire_response_prepared(&reply.frame, &session.view());

        reply
    }

    /// Coerce a handler return value into a response frame.
    fn normalize(
        &self,
        value: CommandReply,
        desc: &CommandDescriptor,
        cl_trid: Option<&str>,
        sv_trid: &str,
    ) -> Reply {
        match value {
            CommandReply::Document(doc) => match response_code(&doc) {
                Some(code) => Reply { frame: doc, code },
                None => {
                    tracing::warn!(
                        command = %desc.name,
                        "handler returned a document that is not an <epp> response"
                    );
                    self.error_reply(
                        ResultCode::COMMAND_FAILED,
                        "Command failed.",
                        cl_trid,
                        sv_trid,
                    )
                }
            },
            CommandReply::Code(code) => {
                self.checked_reply(code, None, Vec::new(), desc, cl_trid, sv_trid)
            }
            CommandReply::CodeWithMessage(code, msg) => {
                self.checked_reply(code, Some(msg), Vec::new(), desc, cl_trid, sv_trid)
            }
            CommandReply::CodeWithElements(code, elements) => {
                self.checked_reply(code, None, elements, desc, cl_trid, sv_trid)
            }
        }
    }

    /// Build a response from code, optional message, and loose elements,
    /// rejecting out-of-range codes as handler misbehavior.
    fn checked_reply(
        &self,
        code: ResultCode,
        msg: Option<String>,
        elements: Vec<Element>,
        desc: &CommandDescriptor,
        cl_trid: Option<&str>,
        sv_trid: &str,
    ) -> Reply {
        if !code.in_protocol_range() {
            tracing::warn!(
                command = %desc.name,
                code = code.value(),
                "handler returned a result code outside [1000, 2502]"
            );
            return self.error_reply(ResultCode::COMMAND_FAILED, "Command failed.", cl_trid, sv_trid);
        }

        let mut builder = ResponseBuilder::new(code)
            .cl_trid_opt(cl_trid.map(str::to_string))
            .sv_trid(sv_trid);
        if let Some(msg) = msg {
            builder = builder.msg(msg);
        }

        // Slot the loose elements by local name. First one wins; strays
        // and duplicates are dropped with a warning.
        let mut res_data = None;
        let mut msg_q = None;
        let mut extension = None;
        for el in elements {
            let slot = match el.name() {
                "resData" => &mut res_data,
                "msgQ" => &mut msg_q,
                "extension" => &mut extension,
                other => {
                    tracing::warn!(
                        command = %desc.name,
                        element = other,
                        "handler returned an element that is not resData/msgQ/extension; skipped"
                    );
                    continue;
                }
            };
            if slot.is_some() {
                tracing::warn!(
                    command = %desc.name,
                    element = el.name(),
                    "handler returned a duplicate element; first wins"
                );
                continue;
            }
            *slot = Some(el);
        }
        if let Some(el) = res_data {
            builder = builder.res_data(el);
        }
        if let Some(el) = msg_q {
            builder = builder.msg_q(el);
        }
        if let Some(el) = extension {
            builder = builder.extension(el);
        }

        Reply {
            frame: builder.build(),
            code,
        }
    }

    fn error_reply(
        &self,
        code: ResultCode,
        msg: &str,
        cl_trid: Option<&str>,
        sv_trid: &str,
    ) -> Reply {
        let frame = ResponseBuilder::new(code)
            .msg(msg)
            .cl_trid_opt(cl_trid.map(str::to_string))
            .sv_trid(sv_trid)
            .build();
        Reply { frame, code }
    }

    /// Record the client's credentials and negotiated repertoire from a
    /// successful `<login>` frame.
    fn commit_login(&self, doc: &Element, session: &mut Session) {
        let Some(login) = doc
            .get_child("command", EPP_NS)
            .and_then(|c| c.get_child("login", EPP_NS))
        else {
            return;
        };

        let clid = login
            .get_child("clID", EPP_NS)
            .map(|e| e.text())
            .unwrap_or_default();
        if clid.is_empty() {
            tracing::warn!(
                session = session.id(),
                "login succeeded without a <clID>; session stays unauthenticated"
            );
            return;
        }

        let lang = login
            .get_child("options", EPP_NS)
            .and_then(|o| o.get_child("lang", EPP_NS))
            .map(|e| e.text())
            .unwrap_or_else(|| "en".to_string());

        let (objects, extensions) = match login.get_child("svcs", EPP_NS) {
            Some(svcs) => {
                let objects = svcs
                    .children()
                    .filter(|c| c.is("objURI", EPP_NS))
                    .map(|c| c.text())
                    .collect();
                let extensions = svcs
                    .get_child("svcExtension", EPP_NS)
                    .map(|ext| {
                        ext.children()
                            .filter(|c| c.is("extURI", EPP_NS))
                            .map(|c| c.text())
                            .collect()
                    })
                    .unwrap_or_default();
                (objects, extensions)
            }
            None => Default::default(),
        };

        tracing::debug!(session = session.id(), clid = %clid, "login committed");
        session.authenticate(Credentials {
            clid,
            lang,
            objects,
            extensions,
        });
    }
}
