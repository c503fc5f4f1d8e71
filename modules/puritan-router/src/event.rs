//! The event value handed to `dispatch`.
//!
//! An event is a tag naming its handler, zero or more JSON arguments and a
//! set of metadata tags. Metadata is how an event asks the queue to pause
//! before it is handled (see [`crate::later`]).

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RouterError, RouterResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    tag: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    args: Vec<Value>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    meta: BTreeSet<String>,
}

impl Event {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            args: Vec::new(),
            meta: BTreeSet::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_meta(mut self, tag: impl Into<String>) -> Self {
        self.meta.insert(tag.into());
        self
    }

    /// Tag used to resolve the handler.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn meta(&self) -> &BTreeSet<String> {
        &self.meta
    }

    pub fn has_meta(&self, tag: &str) -> bool {
        self.meta.contains(tag)
    }

    /// An event with a blank tag carries nothing a handler could be
    /// resolved from.
    pub fn is_empty(&self) -> bool {
        self.tag.trim().is_empty()
    }

    pub fn validate(&self) -> RouterResult<()> {
        if self.is_empty() {
            return Err(RouterError::InvalidEvent(
                "you called dispatch without an event tag".into(),
            ));
        }
        Ok(())
    }

    /// Parse an event from JSON.
    ///
    /// Accepts the vector form `["tag", arg, ...]` or the object form
    /// `{"tag": .., "args": [..], "meta": [..]}`. `null` is rejected the
    /// same way an empty event is.
    pub fn from_value(value: Value) -> RouterResult<Self> {
        let event = match value {
            Value::Null => {
                return Err(RouterError::InvalidEvent(
                    "you called dispatch without an event".into(),
                ))
            }
            Value::Array(items) => {
                let mut items = items.into_iter();
                let tag = match items.next() {
                    Some(Value::String(tag)) => tag,
                    Some(other) => {
                        return Err(RouterError::InvalidEvent(format!(
                            "event tag must be a string, got {other}"
                        )))
                    }
                    None => {
                        return Err(RouterError::InvalidEvent("event vector is empty".into()))
                    }
                };
                Self {
                    tag,
                    args: items.collect(),
                    meta: BTreeSet::new(),
                }
            }
            Value::Object(_) => serde_json::from_value(value)
                .map_err(|e| RouterError::InvalidEvent(e.to_string()))?,
            other => {
                return Err(RouterError::InvalidEvent(format!(
                    "expected an event vector, got {other}"
                )))
            }
        };
        event.validate()?;
        Ok(event)
    }
}

impl TryFrom<Value> for Event {
    type Error = RouterError;

    fn try_from(value: Value) -> RouterResult<Self> {
        Self::from_value(value)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.tag)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_collects_args_and_meta() {
        let event = Event::new("save")
            .with_arg(42)
            .with_arg("draft")
            .with_meta("yield");

        assert_eq!(event.tag(), "save");
        assert_eq!(event.args(), &[json!(42), json!("draft")]);
        assert!(event.has_meta("yield"));
        assert!(!event.has_meta("flush-render"));
    }

    #[test]
    fn blank_tag_is_invalid() {
        assert!(Event::new("").validate().is_err());
        assert!(Event::new("   ").validate().is_err());
        assert!(Event::new("ok").validate().is_ok());
    }

    #[test]
    fn parses_vector_form() {
        let event = Event::from_value(json!(["set-name", "ada", 1])).unwrap();
        assert_eq!(event.tag(), "set-name");
        assert_eq!(event.args().len(), 2);
        assert!(event.meta().is_empty());
    }

    #[test]
    fn parses_object_form_with_meta() {
        let event: Event = json!({"tag": "render", "meta": ["flush-render"]})
            .try_into()
            .unwrap();
        assert_eq!(event.tag(), "render");
        assert!(event.has_meta("flush-render"));
    }

    #[test]
    fn rejects_null_and_empty_vectors() {
        for value in [json!(null), json!([]), json!([7, "x"]), json!("tag"), json!([""])] {
            let err = Event::from_value(value).unwrap_err();
            assert!(matches!(err, RouterError::InvalidEvent(_)), "got {err:?}");
        }
    }

    #[test]
    fn display_renders_vector_form() {
        let event = Event::new("inc").with_arg(2);
        assert_eq!(event.to_string(), "[inc 2]");
    }
}
