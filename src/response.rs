//! Response frame construction.
//!
//! Builds `<epp><response>` documents with the child order RFC 5730
//! mandates: `<result>`, then `<msgQ>`, `<resData>`, `<extension>` (each
//! optional), then `<trID>`. Callers may hand children in any order; the
//! builder always emits the canonical sequence.
//!
//! # Example
//!
//! ```
//! use epp_server::response::ResponseBuilder;
//! use epp_server::protocol::ResultCode;
//!
//! let doc = ResponseBuilder::new(ResultCode::OK)
//!     .cl_trid("ABC-12345")
//!     .sv_trid("b5cfa1a0…")
//!     .build();
//! assert_eq!(doc.name(), "epp");
//! ```

use minidom::Element;

use crate::protocol::result_code::ResultCode;
use crate::protocol::xml::EPP_NS;

/// Builder for one `<response>` frame.
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    code: ResultCode,
    msg: Option<String>,
    cl_trid: Option<String>,
    sv_trid: Option<String>,
    res_data: Option<Element>,
    msg_q: Option<Element>,
    extension: Option<Element>,
}

impl ResponseBuilder {
    /// Start a response with the given result code.
    pub fn new(code: ResultCode) -> Self {
        Self {
            code,
            msg: None,
            cl_trid: None,
            sv_trid: None,
            res_data: None,
            msg_q: None,
            extension: None,
        }
    }

    /// Override the `<msg>` text. Without this, the code's band default is
    /// used ("Command completed successfully." / "Command failed.").
    pub fn msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    /// Echo the client transaction ID.
    pub fn cl_trid(mut self, cl_trid: impl Into<String>) -> Self {
        self.cl_trid = Some(cl_trid.into());
        self
    }

    /// Echo the client transaction ID when one is known.
    pub fn cl_trid_opt(mut self, cl_trid: Option<String>) -> Self {
        self.cl_trid = cl_trid;
        self
    }

    /// Set the server transaction ID.
    pub fn sv_trid(mut self, sv_trid: impl Into<String>) -> Self {
        self.sv_trid = Some(sv_trid.into());
        self
    }

    /// Attach a `<resData>` element.
    pub fn res_data(mut self, el: Element) -> Self {
        self.res_data = Some(el);
        self
    }

    /// Attach a `<msgQ>` element.
    pub fn msg_q(mut self, el: Element) -> Self {
        self.msg_q = Some(el);
        self
    }

    /// Attach an `<extension>` element.
    pub fn extension(mut self, el: Element) -> Self {
        self.extension = Some(el);
        self
    }

    /// Build the `<epp>` document.
    pub fn build(self) -> Element {
        let msg = self
            .msg
            .unwrap_or_else(|| self.code.default_message().to_string());

        let result = Element::builder("result", EPP_NS)
            .attr("code", self.code.to_string())
            .append(Element::builder("msg", EPP_NS).append(msg).build())
            .build();

        let mut response = Element::builder("response", EPP_NS)
            .append(result)
            .build();

        if let Some(msg_q) = self.msg_q {
            response.append_child(msg_q);
        }
        if let Some(res_data) = self.res_data {
            response.append_child(res_data);
        }
        if let Some(extension) = self.extension {
            response.append_child(extension);
        }

        if self.cl_trid.is_some() || self.sv_trid.is_some() {
            let mut tr_id = Element::builder("trID", EPP_NS).build();
            if let Some(cl) = self.cl_trid {
                tr_id.append_child(Element::builder("clTRID", EPP_NS).append(cl).build());
            }
            if let Some(sv) = self.sv_trid {
                tr_id.append_child(Element::builder("svTRID", EPP_NS).append(sv).build());
            }
            response.append_child(tr_id);
        }

        Element::builder("epp", EPP_NS).append(response).build()
    }
}

/// Result code carried by a prebuilt `<epp><response>` document, if the
/// document is shaped like one.
pub fn response_code(doc: &Element) -> Option<ResultCode> {
    if !doc.is("epp", EPP_NS) {
        return None;
    }
    let response = doc.get_child("response", EPP_NS)?;
    let result = response.get_child("result", EPP_NS)?;
    let code: u16 = result.attr("code")?.parse().ok()?;
    Some(ResultCode(code))
}
