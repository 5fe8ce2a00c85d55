//! Handler return values.
//!
//! A command handler may answer in four shapes, mirrored by the closed
//! [`CommandReply`] variant set: a prebuilt response document, a bare result
//! code, a code with a message, or a code with response child elements. The
//! dispatcher's normalizer turns every shape into one response frame;
//! anything malformed inside a shape (a stray element name, an
//! out-of-range code) degrades to 2400.

use minidom::Element;

use crate::protocol::result_code::ResultCode;

/// Error type handlers may propagate. The dispatcher logs it and answers
/// 2400 on the wire.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What a command handler resolves to.
pub type HandlerResult = std::result::Result<CommandReply, BoxError>;

/// The four handler return shapes.
#[derive(Debug, Clone)]
pub enum CommandReply {
    /// A complete, prebuilt `<epp><response>` document, used verbatim.
    Document(Element),
    /// A result code; the response carries the code's default message.
    Code(ResultCode),
    /// A result code with an explicit `<msg>` text.
    CodeWithMessage(ResultCode, String),
    /// A result code plus up to three child elements whose local names are
    /// among `resData`, `msgQ`, `extension`, in any order. Duplicates are
    /// first-wins; other names are skipped. Both are logged.
    CodeWithElements(ResultCode, Vec<Element>),
}

impl CommandReply {
    /// `1000` with the default message.
    pub fn ok() -> Self {
        CommandReply::Code(ResultCode::OK)
    }

    /// A bare numeric code.
    pub fn code(code: impl Into<ResultCode>) -> Self {
        CommandReply::Code(code.into())
    }

    /// A code with an explicit message.
    pub fn with_message(code: impl Into<ResultCode>, msg: impl Into<String>) -> Self {
        CommandReply::CodeWithMessage(code.into(), msg.into())
    }

    /// `1000` carrying a `<resData>` element.
    pub fn ok_with_res_data(res_data: Element) -> Self {
        CommandReply::CodeWithElements(ResultCode::OK, vec![res_data])
    }
}

impl From<ResultCode> for CommandReply {
    fn from(code: ResultCode) -> Self {
        CommandReply::Code(code)
    }
}

impl From<u16> for CommandReply {
    fn from(code: u16) -> Self {
        CommandReply::Code(ResultCode(code))
    }
}
