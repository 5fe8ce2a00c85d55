//! # epp-server
//!
//! Server framework for the Extensible Provisioning Protocol (EPP), the
//! registry provisioning protocol of RFC 5730, transported over TLS per
//! RFC 5734.
//!
//! The crate is the per-connection protocol engine: it frames and parses
//! XML messages, greets clients, walks them through the EPP session state
//! machine, gates every command on authentication and the negotiated
//! service repertoire, and shapes handler return values into response
//! frames. Business logic, what `check`, `create`, `transfer` and friends
//! actually *do*, is supplied by the user as async handler callbacks.
//!
//! ## Architecture
//!
//! - **Wire** ([`protocol::wire`]): 4-byte length-prefixed frames.
//! - **Frames** ([`protocol::xml`], [`protocol::command`]): namespace-aware
//!   parsing and command classification.
//! - **Engine** ([`dispatch::Engine`]): per-frame gating and dispatch.
//! - **Loop** ([`connection::serve_connection`]): greeting, then strict
//!   read/dispatch/write alternation until a session-ending code.
//! - **Runner** ([`server::Server`]): TCP accept loop and TLS termination.
//!
//! ## Example
//!
//! ```no_run
//! use epp_server::greeting::HelloMeta;
//! use epp_server::handler::{CommandContext, CommandReply};
//! use epp_server::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> epp_server::error::Result<()> {
//!     Server::builder()
//!         .port(700)
//!         .tls_files("server.key", "server.pem")
//!         .hello(|| HelloMeta::with_objects(["urn:ietf:params:xml:ns:domain-1.0"]))
//!         .handle("login", |ctx: CommandContext| async move {
//!             // Verify <clID>/<pw> against your own store here.
//!             let _ = &ctx.frame;
//!             Ok(CommandReply::ok())
//!         })
//!         .handle("check", |_ctx: CommandContext| async {
//!             Ok(CommandReply::ok())
//!         })
//!         .build()
//!         .run()
//!         .await
//! }
//! ```

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod greeting;
pub mod handler;
pub mod protocol;
pub mod response;
pub mod server;
pub mod session;
pub mod tls;
pub mod trid;

pub use config::{Proto, ServerConfig};
pub use connection::serve_connection;
pub use dispatch::{Engine, Reply};
pub use error::{EppError, Result};
pub use greeting::HelloMeta;
pub use handler::{CommandContext, CommandReply, HandlerRegistry};
pub use protocol::ResultCode;
pub use response::ResponseBuilder;
pub use server::{Server, ServerBuilder};
pub use session::{Session, SessionView};
