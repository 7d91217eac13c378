//! Tag 36: MIME messages, carried as their raw RFC 2822 text (headers, a
//! blank line, then body). No ecosystem MIME-parsing crate appears
//! anywhere in this corpus, so [`crate::value::MimeMessage`] stores the
//! source text and exposes `headers()`/`body()` as thin views over it
//! rather than a fully parsed object tree.

use crate::value::MimeMessage;

pub fn decode_mime(source: String) -> MimeMessage {
    MimeMessage::new(source)
}

pub fn encode_mime(value: &MimeMessage) -> &str {
    &value.source
}
