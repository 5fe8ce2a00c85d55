//! Handler registry, user callbacks keyed by event name.
//!
//! The registry is built once at server start and shared read-only across
//! every connection. Three kinds of slots exist:
//!
//! - **Commands** (`login`, `poll`, `check`, `info`, `create`, `update`,
//!   `renew`, `delete`, `transfer`, `other`): async callbacks producing a
//!   [`CommandReply`](super::reply::CommandReply). A command frame with no
//!   registered handler is answered with 2101.
//! - **`hello`**: a plain callback returning the server metadata used in
//!   greetings.
//! - **Lifecycle hooks** (`frame_received`, `response_prepared`,
//!   `session_closed`): plain callbacks whose errors are logged and
//!   swallowed.
//!
//! `logout` is deliberately not a slot; the engine answers it itself, and
//! an attempt to register it is refused with a warning.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use minidom::Element;

use super::reply::{BoxError, HandlerResult};
use crate::greeting::HelloMeta;
use crate::protocol::command::CommandDescriptor;
use crate::session::SessionView;

/// Boxed future returned by command handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result type for lifecycle hooks. Errors are logged and swallowed.
pub type HookResult = std::result::Result<(), BoxError>;

/// The command event names the engine dispatches on.
pub const COMMAND_EVENTS: [&str; 10] = [
    "login", "poll", "check", "info", "create", "update", "renew", "delete", "transfer", "other",
];

/// Everything a command handler gets to see for one frame.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// The full parsed `<epp>` document.
    pub frame: Element,
    /// Read-only snapshot of the session.
    pub session: SessionView,
    /// The classified command (name, clTRID, object and extension URIs).
    pub command: CommandDescriptor,
    /// Server transaction ID minted for this command.
    pub sv_trid: String,
}

impl CommandContext {
    /// Client transaction ID from the frame, if present.
    pub fn cl_trid(&self) -> Option<&str> {
        self.command.cl_trid.as_deref()
    }
}

/// Trait for command handler callbacks.
///
/// Implemented for every `Fn(CommandContext) -> impl Future` closure, so
/// plain async closures register directly.
pub trait CommandHandler: Send + Sync {
    fn call(&self, ctx: CommandContext) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> CommandHandler for F
where
    F: Fn(CommandContext) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: CommandContext) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self)(ctx))
    }
}

type HelloFn = dyn Fn() -> HelloMeta + Send + Sync;
type FrameHook = dyn Fn(&Element, &SessionView) -> HookResult + Send + Sync;
type SessionHook = dyn Fn(&SessionView) -> HookResult + Send + Sync;

/// Immutable mapping from event names to callbacks.
#[derive(Default)]
pub struct HandlerRegistry {
    commands: HashMap<String, Arc<dyn CommandHandler>>,
    hello: Option<Arc<HelloFn>>,
    frame_received: Option<Arc<FrameHook>>,
    response_prepared: Option<Arc<FrameHook>>,
    session_closed: Option<Arc<SessionHook>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async closure as a command handler.
    ///
    /// `logout` is refused: the engine owns it. Names outside
    /// [`COMMAND_EVENTS`] are accepted (frames are dispatched by the
    /// command name they carry) but flagged, since no standard frame will
    /// ever reach them.
    pub fn register<F, Fut>(&mut self, name: &str, handler: F)
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register_handler(name, handler);
    }

    /// Register any [`CommandHandler`] implementation.
    pub fn register_handler<H>(&mut self, name: &str, handler: H)
    where
        H: CommandHandler + 'static,
    {
        if name == "logout" {
            tracing::warn!("ignoring handler for \"logout\": the engine answers logout itself");
            return;
        }
        if !COMMAND_EVENTS.contains(&name) {
            tracing::debug!(command = name, "registering handler for non-standard command");
        }
        self.commands.insert(name.to_string(), Arc::new(handler));
    }

    /// Set the `hello` callback supplying greeting metadata.
    pub fn hello<F>(&mut self, f: F)
    where
        F: Fn() -> HelloMeta + Send + Sync + 'static,
    {
        self.hello = Some(Arc::new(f));
    }

    /// Hook fired for every structurally valid non-`hello` frame.
    pub fn on_frame_received<F>(&mut self, f: F)
    where
        F: Fn(&Element, &SessionView) -> HookResult + Send + Sync + 'static,
    {
        self.frame_received = Some(Arc::new(f));
    }

    /// Hook fired with each response frame before it is written.
    pub fn on_response_prepared<F>(&mut self, f: F)
    where
        F: Fn(&Element, &SessionView) -> HookResult + Send + Sync + 'static,
    {
        self.response_prepared = Some(Arc::new(f));
    }

    /// Hook fired when the client logs out, before the 1500 response is
    /// sent.
    pub fn on_session_closed<F>(&mut self, f: F)
    where
        F: Fn(&SessionView) -> HookResult + Send + Sync + 'static,
    {
        self.session_closed = Some(Arc::new(f));
    }

    /// Look up a command handler by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.commands.get(name).cloned()
    }

    /// Greeting metadata from the `hello` callback, or defaults when none
    /// is registered.
    pub fn hello_meta(&self) -> HelloMeta {
        self.hello.as_ref().map(|f| f()).unwrap_or_default()
    }

    pub(crate) fn fire_frame_received(&self, frame: &Element, session: &SessionView) {
        if let Some(hook) = &self.frame_received {
            if let Err(e) = hook(frame, session) {
                tracing::warn!(error = %e, "frame_received hook failed");
            }
        }
    }

    pub(crate) fn fire_response_prepared(&self, frame: &Element, session: &SessionView) {
        if let Some(hook) = &self.response_prepared {
            if let Err(e) = hook(frame, session) {
                tracing::warn!(error = %e, "response_prepared hook failed");
            }
        }
    }

    pub(crate) fn fire_session_closed(&self, session: &SessionView) {
        if let Some(hook) = &self.session_closed {
            if let Err(e) = hook(session) {
                tracing::warn!(error = %e, "session_closed hook failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::reply::CommandReply;
    use crate::protocol::xml::EPP_NS;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_register_and_get() {
        let mut registry = HandlerRegistry::new();
        registry.register("login", |_ctx: CommandContext| async {
            Ok(CommandReply::ok())
        });

        assert!(registry.get("login").is_some());
        assert!(registry.get("check").is_none());
    }

    #[test]
    fn test_logout_registration_is_refused() {
        let mut registry = HandlerRegistry::new();
        registry.register("logout", |_ctx: CommandContext| async {
            Ok(CommandReply::ok())
        });

        assert!(registry.get("logout").is_none());
    }

    #[test]
    fn test_hello_meta_defaults_without_callback() {
        let registry = HandlerRegistry::new();
        let meta = registry.hello_meta();
        assert!(meta.sv_id.is_none());
        assert!(meta.objects.is_empty());
    }

    #[test]
    fn test_hello_meta_from_callback() {
        let mut registry = HandlerRegistry::new();
        registry.hello(|| HelloMeta::with_objects(["urn:ietf:params:xml:ns:domain-1.0"]));

        let meta = registry.hello_meta();
        assert_eq!(meta.objects, vec!["urn:ietf:params:xml:ns:domain-1.0"]);
    }

    #[test]
    fn test_hook_errors_are_swallowed() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let mut registry = HandlerRegistry::new();
        registry.on_frame_received(|_frame, _session| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Err("hook blew up".into())
        });

        let frame = Element::bare("epp", EPP_NS);
        let session = crate::session::Session::new("abc".to_string()).view();

        // Must not panic or propagate.
        registry.fire_frame_received(&frame, &session);
        registry.fire_frame_received(&frame, &session);
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }
}
