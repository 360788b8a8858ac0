use crate::{
    text::Quoted,
    unknown::{self, UnknownFields},
    MarshalOptions, Result, UnmarshalOptions,
};
use bytes::{Buf, BufMut};
use prost::{
    encoding::{self, string, DecodeContext, WireType},
    DecodeError, Message,
};
use std::{collections::HashMap, fmt, sync::OnceLock};
use tracing::{debug, trace};

pub type Labels = HashMap<String, String>;

const TYPE_TAG: u32 = 1;
const LABELS_TAG: u32 = 2;
const LABEL_KEY_TAG: u32 = 1;
const LABEL_VALUE_TAG: u32 = 2;

/// Keys are `u32` varints.
const MAX_KEY_LEN: usize = 5;

/// Resource information.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resource {
    /// Type identifier for the resource.
    pub r#type: String,
    /// Set of labels that describe the resource.
    pub labels: Labels,
    unknown: UnknownFields,
}

/// Encodes a resource with its labels in key order.
#[derive(Debug)]
struct Sorted<'r>(&'r Resource);

// === impl Resource ===

impl Resource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, r#type: impl Into<String>) -> Self {
        self.r#type = r#type.into();
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn r#type(&self) -> &str {
        &self.r#type
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Returns the type of an optional resource, or an empty string when
    /// there is none.
    pub fn type_of(resource: Option<&Self>) -> &str {
        resource.map(|r| r.r#type.as_str()).unwrap_or_default()
    }

    /// Returns the labels of an optional resource, or an empty map when
    /// there is none.
    pub fn labels_of(resource: Option<&Self>) -> &Labels {
        static EMPTY: OnceLock<Labels> = OnceLock::new();
        match resource {
            Some(r) => &r.labels,
            None => EMPTY.get_or_init(Labels::new),
        }
    }

    /// Fields read from the wire that are not part of this schema.
    pub fn unknown_fields(&self) -> &UnknownFields {
        &self.unknown
    }

    /// Empties every field in place, retaining allocated capacity.
    pub fn reset(&mut self) {
        self.r#type.clear();
        self.labels.clear();
        self.unknown.clear();
    }

    /// Merges `other` into this resource.
    ///
    /// A non-empty type replaces ours; labels are added, replacing any with
    /// the same key; unknown fields are appended.
    pub fn merge_from(&mut self, other: &Self) {
        if !other.r#type.is_empty() {
            self.r#type.clone_from(&other.r#type);
        }
        self.labels.extend(
            other
                .labels
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        self.unknown.extend(&other.unknown);
    }

    /// Drops any unknown fields retained from a previous unmarshal.
    pub fn discard_unknown(&mut self) {
        if !self.unknown.is_empty() {
            debug!(
                bytes = self.unknown.encoded_len(),
                "Discarding unknown fields"
            );
        }
        self.unknown.clear();
    }

    pub fn marshal(&self, opts: MarshalOptions) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.marshal_into(&mut buf, opts)?;
        Ok(buf)
    }

    /// Writes the encoded resource into `buf`.
    ///
    /// Fails without writing anything if `buf` cannot hold the whole message.
    pub fn marshal_into<B: BufMut>(&self, buf: &mut B, opts: MarshalOptions) -> Result<()> {
        if opts.deterministic {
            Sorted(self).encode(buf)?;
        } else {
            self.encode(buf)?;
        }
        trace!(
            bytes = self.encoded_len(),
            deterministic = opts.deterministic,
            "Marshaled resource"
        );
        Ok(())
    }

    pub fn unmarshal<B: Buf>(buf: B, opts: UnmarshalOptions) -> Result<Self> {
        let mut resource = Self::default();
        resource.unmarshal_merge(buf, opts)?;
        Ok(resource)
    }

    /// Reads fields from `buf` into this resource, keeping fields already
    /// set unless the input replaces them.
    pub fn unmarshal_merge<B: Buf>(&mut self, buf: B, opts: UnmarshalOptions) -> Result<()> {
        let len = buf.remaining();
        self.merge_fields(buf, opts)?;
        trace!(
            bytes = len,
            unknown = self.unknown.encoded_len(),
            "Unmarshaled resource"
        );
        Ok(())
    }

    /// Reads each key with its original bytes so that unknown fields keep
    /// their exact encoding.
    fn merge_fields<B: Buf>(
        &mut self,
        mut buf: B,
        opts: UnmarshalOptions,
    ) -> Result<(), DecodeError> {
        let ctx = DecodeContext::default();
        let mut key = Vec::with_capacity(MAX_KEY_LEN);
        while buf.has_remaining() {
            key.clear();
            let (tag, wire_type) = unknown::read_key(&mut buf, &mut key)?;
            match tag {
                TYPE_TAG | LABELS_TAG => self.merge_known(tag, wire_type, &mut buf, ctx.clone())?,
                _ if opts.discard_unknown => {
                    encoding::skip_field(wire_type, tag, &mut buf, ctx.clone())?
                }
                _ => self.unknown.capture(&key, tag, wire_type, &mut buf)?,
            }
        }
        Ok(())
    }

    fn merge_known<B: Buf>(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut B,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        const STRUCT_NAME: &str = "Resource";
        match tag {
            TYPE_TAG => string::merge(wire_type, &mut self.r#type, buf, ctx).map_err(|mut error| {
                error.push(STRUCT_NAME, "r#type");
                error
            }),
            LABELS_TAG => encoding::check_wire_type(WireType::LengthDelimited, wire_type)
                .and_then(|()| {
                    encoding::hash_map::merge(
                        string::merge,
                        string::merge,
                        &mut self.labels,
                        buf,
                        ctx,
                    )
                })
                .map_err(|mut error| {
                    error.push(STRUCT_NAME, "labels");
                    error
                }),
            _ => self.unknown.capture_decoded(tag, wire_type, buf),
        }
    }

    fn encode_fields<B: BufMut>(&self, buf: &mut B, sorted: bool) {
        if !self.r#type.is_empty() {
            string::encode(TYPE_TAG, &self.r#type, buf);
        }
        if sorted {
            let mut labels = self.labels.iter().collect::<Vec<_>>();
            labels.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
            for (key, value) in labels {
                encode_label(key, value, buf);
            }
        } else {
            for (key, value) in &self.labels {
                encode_label(key, value, buf);
            }
        }
        self.unknown.encode(buf);
    }
}

impl Message for Resource {
    fn encode_raw<B>(&self, buf: &mut B)
    where
        B: BufMut,
        Self: Sized,
    {
        self.encode_fields(buf, false);
    }

    fn merge_field<B>(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut B,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError>
    where
        B: Buf,
        Self: Sized,
    {
        self.merge_known(tag, wire_type, buf, ctx)
    }

    fn merge<B>(&mut self, buf: B) -> Result<(), DecodeError>
    where
        B: Buf,
        Self: Sized,
    {
        self.merge_fields(buf, UnmarshalOptions::default())
    }

    fn encoded_len(&self) -> usize {
        let type_len = if self.r#type.is_empty() {
            0
        } else {
            string::encoded_len(TYPE_TAG, &self.r#type)
        };
        let labels_len = self
            .labels
            .iter()
            .map(|(key, value)| {
                let len = label_entry_len(key, value);
                encoding::key_len(LABELS_TAG) + encoding::encoded_len_varint(len as u64) + len
            })
            .sum::<usize>();
        type_len + labels_len + self.unknown.encoded_len()
    }

    fn clear(&mut self) {
        self.reset();
    }
}

impl prost::Name for Resource {
    const NAME: &'static str = "Resource";
    const PACKAGE: &'static str = crate::descriptor::PACKAGE;
}

/// Renders the resource in compact text form, with labels ordered by key.
impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        if !self.r#type.is_empty() {
            write!(f, "type:{}", Quoted(&self.r#type))?;
            sep = " ";
        }
        let mut labels = self.labels.iter().collect::<Vec<_>>();
        labels.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
        for (key, value) in labels {
            write!(
                f,
                "{sep}labels:<key:{} value:{} >",
                Quoted(key),
                Quoted(value)
            )?;
            sep = " ";
        }
        if !self.unknown.is_empty() {
            write!(f, "{sep}unknown:<{} bytes>", self.unknown.encoded_len())?;
        }
        Ok(())
    }
}

// === impl Sorted ===

impl Message for Sorted<'_> {
    fn encode_raw<B>(&self, buf: &mut B)
    where
        B: BufMut,
        Self: Sized,
    {
        self.0.encode_fields(buf, true);
    }

    /// The view is only ever encoded; input is skipped.
    fn merge_field<B>(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut B,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError>
    where
        B: Buf,
        Self: Sized,
    {
        encoding::skip_field(wire_type, tag, buf, ctx)
    }

    fn encoded_len(&self) -> usize {
        self.0.encoded_len()
    }

    fn clear(&mut self) {}
}

/// Map entries omit an empty key or value, matching prost's map codec.
fn label_entry_len(key: &String, value: &String) -> usize {
    let key_len = if key.is_empty() {
        0
    } else {
        string::encoded_len(LABEL_KEY_TAG, key)
    };
    let value_len = if value.is_empty() {
        0
    } else {
        string::encoded_len(LABEL_VALUE_TAG, value)
    };
    key_len + value_len
}

fn encode_label<B: BufMut>(key: &String, value: &String, buf: &mut B) {
    encoding::encode_key(LABELS_TAG, WireType::LengthDelimited, buf);
    encoding::encode_varint(label_entry_len(key, value) as u64, buf);
    if !key.is_empty() {
        string::encode(LABEL_KEY_TAG, key, buf);
    }
    if !value.is_empty() {
        string::encode(LABEL_VALUE_TAG, value, buf);
    }
}
