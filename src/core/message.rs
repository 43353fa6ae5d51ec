use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn is_system(self) -> bool {
        self == Role::System
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

/// A single typed entry of a multi-part message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Part {
    #[serde(rename = "input_text")]
    Text { text: String },
    /// Opaque image reference: a remote URL or an embedded `data:` URL.
    #[serde(rename = "input_image")]
    Image { image_url: String },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn image(image_url: impl Into<String>) -> Self {
        Part::Image {
            image_url: image_url.into(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            Part::Image { .. } => None,
        }
    }
}

/// Returned when a multi-part content would hold no parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyPartsError;

impl fmt::Display for EmptyPartsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("multi-part content requires at least one part")
    }
}

impl std::error::Error for EmptyPartsError {}

/// Non-empty ordered list of parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parts(Vec<Part>);

impl Parts {
    pub fn new(parts: Vec<Part>) -> Result<Self, EmptyPartsError> {
        if parts.is_empty() {
            Err(EmptyPartsError)
        } else {
            Ok(Self(parts))
        }
    }

    pub fn as_slice(&self) -> &[Part] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Part> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Parts {
    type Item = &'a Part;
    type IntoIter = std::slice::Iter<'a, Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Message content: a bare string on the wire, or an array of typed parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Parts(Parts),
}

impl Content {
    /// Flattened text used for budgeting and summaries. Text parts are joined
    /// with a single space; image parts contribute nothing.
    pub fn text_value(&self) -> Cow<'_, str> {
        match self {
            Content::Text(text) => Cow::Borrowed(text),
            Content::Parts(parts) => Cow::Owned(
                parts
                    .iter()
                    .filter_map(Part::as_text)
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        }
    }

    pub fn is_empty_text(&self) -> bool {
        matches!(self, Content::Text(text) if text.is_empty())
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Content::Text(value)
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Content::Text(value.to_string())
    }
}

impl From<Parts> for Content {
    fn from(value: Parts) -> Self {
        Content::Parts(value)
    }
}

impl Serialize for Content {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Content::Text(text) => serializer.serialize_str(text),
            Content::Parts(parts) => parts.as_slice().serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ContentVisitor)
    }
}

struct ContentVisitor;

impl<'de> Visitor<'de> for ContentVisitor {
    type Value = Content;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or a non-empty array of content parts")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Content, E> {
        Ok(Content::Text(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Content, E> {
        Ok(Content::Text(value))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Content, A::Error> {
        let mut parts = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(part) = seq.next_element::<Part>()? {
            parts.push(part);
        }
        Parts::new(parts)
            .map(Content::Parts)
            .map_err(de::Error::custom)
    }
}

/// Failure to decode a message from its JSON wire form.
#[derive(Debug)]
pub struct DecodeError(serde_json::Error);

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to decode message: {}", self.0)
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
}

impl Message {
    pub fn new(role: Role, content: impl Into<Content>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<Content>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<Content>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<Content>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Builds a multi-part message: the text part (skipped when empty)
    /// followed by the image reference.
    pub fn with_image(role: Role, text: Option<&str>, image_url: impl Into<String>) -> Self {
        let mut parts = Vec::with_capacity(2);
        if let Some(text) = text.filter(|text| !text.is_empty()) {
            parts.push(Part::text(text));
        }
        parts.push(Part::image(image_url));
        Self {
            role,
            content: Content::Parts(Parts(parts)),
        }
    }

    pub fn text(&self) -> Cow<'_, str> {
        self.content.text_value()
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(json: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(json).map_err(DecodeError)
    }
}

/// Turns instruction strings into a list of `system` messages.
pub fn system_context<I, S>(instructions: I) -> Vec<Message>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    instructions
        .into_iter()
        .map(|instruction| Message::system(instruction.into()))
        .collect()
}
