//! Input replaying recorded events from an XML export.
//!
//! Which streams an XML file produces, and what each event carries, is
//! decided by a *control string*.
//!
//! # Control strings
//!
//! A control string is a comma-separated list of stream descriptors. A
//! stream descriptor is a `/`-separated list of element descriptors. An
//! element descriptor is an optional leading `:`, an element tag, and zero
//! or more `:attr` attribute descriptors.
//!
//! ```text
//! patient:id/glucose_level/event:ts:value
//! ```
//!
//! Every element descriptor selects the descendants with its tag of each
//! element selected by the one before it. Every element selected by the last
//! descriptor becomes one event, and each group of those sharing a parent
//! selection becomes one stream.
//!
//! The first attribute of the last descriptor (`ts` above) names the
//! timestamp attribute. An event payload is the CSV line made of:
//!
//! 1. the timestamp, re-formatted as `%d-%m-%Y %H:%M:%S` after any time shift;
//! 2. for every enclosing descriptor, its tag if it has the leading `:`, then
//!    the value of each of its attributes;
//! 3. the value of each remaining attribute of the event element.
//!
//! Given
//!
//! ```xml
//! <patient id="0">
//!  <glucose_level>
//!   <event ts="12-01-2022  9:38:00" value="100"/>
//!   <event ts="12-01-2022  9:38:01" value="102"/>
//!  </glucose_level>
//! </patient>
//! ```
//!
//! the descriptor above yields one stream with the payloads
//! `12-01-2022 09:38:00,0,100` and `12-01-2022 09:38:01,0,102`.
//! Missing non-timestamp attributes contribute an empty value.

use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use roxmltree::{Document, Node, ParsingOptions};
use tracing::debug;
use turboevents_types::Event;

use super::{Input, InputError};
use crate::clock::{self, ClockError};
use crate::stream::{ContainerStream, EventStream, RunConfig};

const FIELD_SEPARATOR: char = ',';

/// Errors that can occur while reading XML inputs.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// The document is not well-formed XML.
    #[error("malformed XML: {0}")]
    Parse(#[from] roxmltree::Error),

    /// The control string contains no stream descriptors.
    #[error("control string is empty")]
    EmptyControl,

    /// A descriptor has an empty tag or attribute name.
    #[error("invalid descriptor '{descriptor}': {reason}")]
    InvalidDescriptor {
        /// The offending stream or element descriptor.
        descriptor: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An event element lacks the timestamp attribute.
    #[error("<{tag}> element without timestamp attribute '{attr}'")]
    MissingTimestamp {
        /// Tag of the event element.
        tag: String,
        /// Name of the missing attribute.
        attr: String,
    },

    /// A timestamp could not be interpreted.
    #[error(transparent)]
    Time(#[from] ClockError),
}

/// One `[:]tag[:attr]*` step of a stream descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDescriptor {
    /// Element tag to select.
    pub tag: String,
    /// Whether the tag itself is a payload field (leading `:`).
    pub tag_in_payload: bool,
    /// Attributes whose values are payload fields.
    pub attrs: Vec<String>,
}

/// A `/`-separated path of element descriptors producing streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    /// Enclosing element descriptors followed by the event descriptor.
    pub elements: Vec<ElementDescriptor>,
}

impl StreamDescriptor {
    /// Parse a single stream descriptor such as `patient:id/event:ts`.
    pub fn parse(descriptor: &str) -> Result<Self, XmlError> {
        let invalid = |reason: &str| XmlError::InvalidDescriptor {
            descriptor: descriptor.to_owned(),
            reason: reason.to_owned(),
        };

        let elements = descriptor
            .split('/')
            .map(|step| parse_element(step.trim()).ok_or_else(|| invalid("empty tag or attribute")))
            .collect::<Result<Vec<_>, _>>()?;

        match elements.last() {
            None => Err(invalid("no element descriptors")),
            Some(last) if last.attrs.is_empty() => {
                Err(invalid("last element needs a timestamp attribute"))
            }
            Some(_) => Ok(Self { elements }),
        }
    }
}

fn parse_element(step: &str) -> Option<ElementDescriptor> {
    let (tag_in_payload, rest) = match step.strip_prefix(':') {
        Some(rest) => (true, rest),
        None => (false, step),
    };
    let mut parts = rest.split(':');
    let tag = parts.next().filter(|tag| !tag.is_empty())?.to_owned();
    let attrs = parts
        .map(|attr| (!attr.is_empty()).then(|| attr.to_owned()))
        .collect::<Option<Vec<_>>>()?;
    Some(ElementDescriptor {
        tag,
        tag_in_payload,
        attrs,
    })
}

/// Parse a full control string into stream descriptors.
///
/// # Errors
///
/// Returns [`XmlError::EmptyControl`] if there are no descriptors, or
/// [`XmlError::InvalidDescriptor`] for a malformed one.
pub fn parse_control(control: &str) -> Result<Vec<StreamDescriptor>, XmlError> {
    let descriptors = control
        .split(',')
        .map(str::trim)
        .filter(|descriptor| !descriptor.is_empty())
        .map(StreamDescriptor::parse)
        .collect::<Result<Vec<_>, _>>()?;
    if descriptors.is_empty() {
        return Err(XmlError::EmptyControl);
    }
    Ok(descriptors)
}

/// Build the event lists of every stream an XML document yields.
///
/// The first event read (in descriptor order, then document order) fixes
/// the time shift for the whole document when `config.time_shift` is set.
///
/// # Errors
///
/// Returns [`XmlError`] if the document is malformed or an event element
/// lacks a valid timestamp.
pub fn streams_from_str(
    text: &str,
    descriptors: &[StreamDescriptor],
    config: &RunConfig,
) -> Result<Vec<Vec<Event>>, XmlError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(text, options)?;
    let mut walk = Walk {
        config,
        shift: None,
        streams: Vec::new(),
    };
    for descriptor in descriptors {
        walk.visit(doc.root(), &descriptor.elements, String::new())?;
    }
    Ok(walk.streams)
}

struct Walk<'a> {
    config: &'a RunConfig,
    shift: Option<TimeDelta>,
    streams: Vec<Vec<Event>>,
}

impl Walk<'_> {
    fn visit(
        &mut self,
        node: Node<'_, '_>,
        elements: &[ElementDescriptor],
        mut ctx: String,
    ) -> Result<(), XmlError> {
        let Some((head, rest)) = elements.split_first() else {
            return Ok(());
        };
        if head.tag_in_payload {
            ctx.push(FIELD_SEPARATOR);
            ctx.push_str(&head.tag);
        }
        let matches = node
            .descendants()
            .skip(1)
            .filter(|child| child.is_element() && child.tag_name().name() == head.tag);

        if !rest.is_empty() {
            for child in matches {
                let mut local = ctx.clone();
                for attr in &head.attrs {
                    local.push(FIELD_SEPARATOR);
                    local.push_str(child.attribute(attr.as_str()).unwrap_or_default());
                }
                self.visit(child, rest, local)?;
            }
            return Ok(());
        }

        // The first attribute names the timestamp; the rest are fields.
        let Some((ts_attr, fields)) = head.attrs.split_first() else {
            return Ok(());
        };
        let config = self.config;
        let mut events = Vec::new();
        for child in matches {
            let raw = child
                .attribute(ts_attr.as_str())
                .ok_or_else(|| XmlError::MissingTimestamp {
                    tag: head.tag.clone(),
                    attr: ts_attr.clone(),
                })?;
            let recorded = clock::parse_local_timestamp(raw)?;
            let shift = *self.shift.get_or_insert_with(|| {
                if config.time_shift {
                    clock::shift_to(config.start, recorded)
                } else {
                    TimeDelta::zero()
                }
            });
            let time = recorded.checked_add_signed(shift).ok_or(ClockError::Overflow)?;

            let mut csv = clock::format_local_timestamp(time);
            csv.push_str(&ctx);
            for attr in fields {
                csv.push(FIELD_SEPARATOR);
                csv.push_str(child.attribute(attr.as_str()).unwrap_or_default());
            }
            events.push(Event::new(time, csv));
        }
        if !events.is_empty() {
            self.streams.push(events);
        }
        Ok(())
    }
}

/// An input reading one XML file at the start of each run.
#[derive(Debug, Clone)]
pub struct XmlFileInput {
    path: PathBuf,
    descriptors: Vec<StreamDescriptor>,
    name: String,
}

impl XmlFileInput {
    /// Create an XML file input.
    ///
    /// The control string is validated immediately; the file itself is read
    /// when a run starts.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError`] if the control string is invalid.
    pub fn new(path: impl Into<PathBuf>, control: &str) -> Result<Self, XmlError> {
        let path = path.into();
        let descriptors = parse_control(control)?;
        let name = format!("xml({})", path.display());
        Ok(Self {
            path,
            descriptors,
            name,
        })
    }

    /// The file this input reads.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The parsed control string.
    pub fn descriptors(&self) -> &[StreamDescriptor] {
        &self.descriptors
    }
}

impl Input for XmlFileInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_streams(&mut self, config: &RunConfig) -> Result<Vec<Box<dyn EventStream>>, InputError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| InputError::Io {
            path: self.path.clone(),
            source,
        })?;
        let streams =
            streams_from_str(&text, &self.descriptors, config).map_err(|source| InputError::Xml {
                path: self.path.clone(),
                source,
            })?;
        debug!(
            path = %self.path.display(),
            streams = streams.len(),
            events = streams.iter().map(Vec::len).sum::<usize>(),
            "XML input loaded"
        );
        Ok(streams
            .into_iter()
            .map(|events| Box::new(ContainerStream::new(events)) as Box<dyn EventStream>)
            .collect())
    }
}
