//! Call-control markup documents.
//!
//! Every attribute value and text node goes through [`escape`], so caller
//! speech and generated replies can be interpolated safely.

use std::borrow::Cow;
use std::fmt::Write;

pub const CONTENT_TYPE: &str = "text/xml";

/// Escape `& < > " '` for use in XML text or attribute values.
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// Speech capture posted back to `action`.
#[derive(Debug, Clone)]
pub struct Gather {
    pub action: String,
    pub timeout_secs: u32,
    pub hints: String,
}

impl Gather {
    pub fn speech(action: impl Into<String>, hints: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            timeout_secs: 5,
            hints: hints.into(),
        }
    }
}

/// Incrementally built `<Response>` document.
#[derive(Debug, Clone, Default)]
pub struct TwimlResponse {
    verbs: String,
}

impl TwimlResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, voice: &str, text: &str) -> Self {
        let _ = write!(
            self.verbs,
            r#"<Say voice="{}">{}</Say>"#,
            escape(voice),
            escape(text)
        );
        self
    }

    pub fn gather(mut self, gather: &Gather) -> Self {
        let _ = write!(
            self.verbs,
            r#"<Gather input="speech" action="{}" method="POST" speechTimeout="auto" timeout="{}" hints="{}" profanityFilter="false"></Gather>"#,
            escape(&gather.action),
            gather.timeout_secs,
            escape(&gather.hints)
        );
        self
    }

    pub fn redirect(mut self, url: &str) -> Self {
        let _ = write!(self.verbs, "<Redirect>{}</Redirect>", escape(url));
        self
    }

    pub fn pause(mut self, seconds: u32) -> Self {
        let _ = write!(self.verbs, r#"<Pause length="{seconds}"/>"#);
        self
    }

    pub fn hangup(mut self) -> Self {
        self.verbs.push_str("<Hangup/>");
        self
    }

    /// Connect the call to a bidirectional audio stream.
    pub fn connect_stream(self, url: &str, parameters: &[(&str, &str)]) -> Self {
        self.connect("Stream", &[("url", url)], parameters)
    }

    /// Connect the call to a text relay that does its own speech handling.
    pub fn connect_relay(
        self,
        url: &str,
        voice: Option<&str>,
        parameters: &[(&str, &str)],
    ) -> Self {
        let mut attributes = vec![("url", url)];
        if let Some(voice) = voice {
            attributes.push(("voice", voice));
        }
        self.connect("ConversationRelay", &attributes, parameters)
    }

    fn connect(
        mut self,
        noun: &str,
        attributes: &[(&str, &str)],
        parameters: &[(&str, &str)],
    ) -> Self {
        let _ = write!(self.verbs, "<Connect><{noun}");
        for (name, value) in attributes {
            let _ = write!(self.verbs, r#" {name}="{}""#, escape(value));
        }
        if parameters.is_empty() {
            self.verbs.push_str(" />");
        } else {
            self.verbs.push('>');
            for (name, value) in parameters {
                let _ = write!(
                    self.verbs,
                    r#"<Parameter name="{}" value="{}" />"#,
                    escape(name),
                    escape(value)
                );
            }
            let _ = write!(self.verbs, "</{noun}>");
        }
        self.verbs.push_str("</Connect>");
        self
    }

    pub fn build(self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Response>{}</Response>"#,
            self.verbs
        )
    }
}
