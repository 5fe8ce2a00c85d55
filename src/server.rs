//! Server builder and accept loop.
//!
//! [`ServerBuilder`] is the crate's front door: configure the binding,
//! register handlers, and run. The accept loop is deliberately thin: it
//! terminates TLS and hands each connection to
//! [`serve_connection`](crate::connection::serve_connection), which owns
//! all protocol behavior. Embedders with their own accept/concurrency
//! strategy can skip [`Server`] entirely and drive `serve_connection`
//! themselves.
//!
//! # Example
//!
//! ```no_run
//! use epp_server::greeting::HelloMeta;
//! use epp_server::handler::{CommandContext, CommandReply};
//! use epp_server::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> epp_server::error::Result<()> {
//!     Server::builder()
//!         .host("0.0.0.0")
//!         .port(700)
//!         .tls_files("/etc/epp/server.key", "/etc/epp/server.pem")
//!         .hello(|| HelloMeta::with_objects(["urn:ietf:params:xml:ns:domain-1.0"]))
//!         .handle("login", |_ctx: CommandContext| async { Ok(CommandReply::ok()) })
//!         .handle("check", |_ctx: CommandContext| async { Ok(CommandReply::ok()) })
//!         .build()
//!         .run()
//!         .await
//! }
//! ```

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use minidom::Element;
use tokio::net::TcpListener;

use crate::config::{Proto, ServerConfig};
use crate::connection::serve_connection;
use crate::dispatch::Engine;
use crate::error::Result;
use crate::greeting::HelloMeta;
use crate::handler::registry::{CommandContext, CommandHandler, HandlerRegistry, HookResult};
use crate::handler::reply::HandlerResult;
use crate::protocol::xml::SchemaValidator;
use crate::session::SessionView;
use crate::tls;

/// Fluent configuration for a [`Server`].
pub struct ServerBuilder {
    config: ServerConfig,
    registry: HandlerRegistry,
    validator: Option<Box<dyn SchemaValidator>>,
}

impl ServerBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            registry: HandlerRegistry::new(),
            validator: None,
        }
    }

    /// Replace the whole configuration (e.g. one deserialized from a file).
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Interface to bind.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Port to bind.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Transport protocol.
    pub fn proto(mut self, proto: Proto) -> Self {
        self.config.proto = proto;
        self
    }

    /// Server private key and certificate chain (PEM files).
    pub fn tls_files(mut self, key: impl Into<PathBuf>, cert: impl Into<PathBuf>) -> Self {
        self.config.ssl_key_file = Some(key.into());
        self.config.ssl_cert_file = Some(cert.into());
        self
    }

    /// Require client certificates, validated against this CA bundle.
    pub fn client_ca_file(mut self, ca: impl Into<PathBuf>) -> Self {
        self.config.client_ca_file = Some(ca.into());
        self
    }

    /// Idle timeout in seconds.
    pub fn timeout(mut self, secs: u64) -> Self {
        self.config.timeout = secs;
        self
    }

    /// Install a schema validator in place of the accept-everything
    /// default.
    pub fn validator<V>(mut self, validator: V) -> Self
    where
        V: SchemaValidator + 'static,
    {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Set the `hello` callback supplying greeting metadata.
    pub fn hello<F>(mut self, f: F) -> Self
    where
        F: Fn() -> HelloMeta + Send + Sync + 'static,
    {
        self.registry.hello(f);
        self
    }

    /// Register an async closure as a command handler (`login`, `check`,
    /// `create`, …, `other`).
    pub fn handle<F, Fut>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register(name, handler);
        self
    }

    /// Register any [`CommandHandler`] implementation for a command.
    pub fn handle_with<H>(mut self, name: &str, handler: H) -> Self
    where
        H: CommandHandler + 'static,
    {
        self.registry.register_handler(name, handler);
        self
    }

    /// Hook fired for every structurally valid non-`hello` frame.
    pub fn on_frame_received<F>(mut self, f: F) -> Self
    where
        F: Fn(&Element, &SessionView) -> HookResult + Send + Sync + 'static,
    {
        self.registry.on_frame_received(f);
        self
    }

    /// Hook fired with each response before it is written.
    pub fn on_response_prepared<F>(mut self, f: F) -> Self
    where
        F: Fn(&Element, &SessionView) -> HookResult + Send + Sync + 'static,
    {
        self.registry.on_response_prepared(f);
        self
    }

    /// Hook fired when a client logs out.
    pub fn on_session_closed<F>(mut self, f: F) -> Self
    where
        F: Fn(&SessionView) -> HookResult + Send + Sync + 'static,
    {
        self.registry.on_session_closed(f);
        self
    }

    /// Finish the builder.
    pub fn build(self) -> Server {
        let engine = match self.validator {
            Some(validator) => Engine::from_boxed(self.registry, validator),
            None => Engine::new(self.registry),
        };
        Server {
            config: self.config,
            engine: Arc::new(engine),
        }
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A configured EPP server.
pub struct Server {
    config: ServerConfig,
    engine: Arc<Engine>,
}

impl Server {
    /// Create a builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// The shared protocol engine, for embedders driving their own accept
    /// loop.
    pub fn engine(&self) -> Arc<Engine> {
        self.engine.clone()
    }

    /// The active configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address and serve until the listener fails.
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.addr()).await?;
        self.run_on(listener).await
    }

    /// Serve connections from an already bound listener. Useful for
    /// binding port 0 and announcing readiness before accepting.
    pub async fn run_on(self, listener: TcpListener) -> Result<()> {
        let acceptor = match self.config.proto {
            Proto::Ssl => Some(tls::build_acceptor(&self.config)?),
            Proto::Tcp => None,
        };

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, proto = ?self.config.proto, "EPP server listening");
        }

        loop {
            let (stream, peer) = listener.accept().await?;
            let engine = self.engine.clone();
            let idle_timeout = self.config.idle_timeout();
            let acceptor = acceptor.clone();

            tokio::spawn(async move {
                let served = match acceptor {
                    Some(acceptor) => match acceptor.accept(stream).await {
                        Ok(tls_stream) => serve_connection(engine, tls_stream, idle_timeout).await,
                        Err(e) => {
                            // Rejected before any EPP semantics apply.
                            tracing::warn!(%peer, error = %e, "TLS handshake failed");
                            return;
                        }
                    },
                    None => serve_connection(engine, stream, idle_timeout).await,
                };
                if let Err(e) = served {
                    tracing::warn!(%peer, error = %e, "connection failed");
                }
            });
        }
    }
}
