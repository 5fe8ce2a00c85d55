//! Handler module: user callbacks and their return contract.
//!
//! Provides:
//! - [`HandlerRegistry`]: maps event names to callbacks
//! - [`CommandContext`]: what a command handler gets to see
//! - [`CommandReply`]: the closed set of handler return shapes
//!
//! # Example
//!
//! ```
//! use epp_server::handler::{CommandContext, CommandReply, HandlerRegistry};
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register("check", |ctx: CommandContext| async move {
//!     let _ = ctx.command.object_uri;
//!     Ok(CommandReply::ok())
//! });
//! ```

pub mod registry;
pub mod reply;

pub use registry::{
    BoxFuture, CommandContext, CommandHandler, HandlerRegistry, HookResult, COMMAND_EVENTS,
};
pub use reply::{BoxError, CommandReply, HandlerResult};
