//! TwiML reply rendering.
//!
//! Twilio reads the webhook response as TwiML, e.g.:
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?><Response><Message>Hello</Message></Response>
//! ```

use std::io;

use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

/// Content type Twilio expects for TwiML responses.
pub const TWIML_CONTENT_TYPE: &str = "text/xml";

/// Errors that can occur while rendering TwiML.
#[derive(Debug, Error)]
pub enum TwimlError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("rendered TwiML is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Render a `<Response>` containing a single `<Message>` with `text`.
pub fn message_reply(text: &str) -> Result<String, TwimlError> {
    let mut buf = Vec::with_capacity(128 + text.len());
    let mut writer = Writer::new(&mut buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    writer
        .create_element("Response")
        .write_inner_content(|w| {
            w.create_element("Message")
                .write_text_content(BytesText::new(text))?;
            Ok(())
        })?;

    Ok(String::from_utf8(buf)?)
}
