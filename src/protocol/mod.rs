//! Protocol module: wire framing, XML frames, result codes, command
//! classification.
//!
//! This layer is pure protocol: it moves length-prefixed frames, turns
//! payloads into element trees, and extracts the facts the dispatcher gates
//! on. It knows nothing about sessions or handlers.

pub mod command;
pub mod result_code;
pub mod wire;
pub mod xml;

pub use command::{
    classify, is_object_command, CommandDescriptor, InboundFrame, StructureError,
    OBJECT_COMMANDS, OTHER_COMMAND,
};
pub use result_code::ResultCode;
pub use wire::{read_frame, write_frame, FramingError, MAX_FRAME_LEN, MIN_FRAME_LEN};
pub use xml::{AcceptAll, SchemaValidator, EPP_NS};
