//! Event schema model.
//!
//! A schema file is a YAML list of groups, each carrying a list of events:
//!
//! ```yaml
//! - group: loop
//!   events:
//!     - name: loop_count
//!       id: 1
//!       params:
//!         - { name: producer, type: uint32_t }
//!         - { name: count, type: uint32_t }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracelet_core::config::EVENT_SIZE_MAX;

use crate::error::SchemaError;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

const RESERVED: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use",
    "where", "while", "async", "await", "dyn", "_",
];

/// Scalar parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
}

impl ParamType {
    pub const ALL: [ParamType; 8] = [
        ParamType::U8,
        ParamType::U16,
        ParamType::U32,
        ParamType::U64,
        ParamType::I8,
        ParamType::I16,
        ParamType::I32,
        ParamType::I64,
    ];

    pub fn from_c_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.c_name() == name)
    }

    /// Name used in schema files and CTF metadata.
    pub fn c_name(self) -> &'static str {
        match self {
            ParamType::U8 => "uint8_t",
            ParamType::U16 => "uint16_t",
            ParamType::U32 => "uint32_t",
            ParamType::U64 => "uint64_t",
            ParamType::I8 => "int8_t",
            ParamType::I16 => "int16_t",
            ParamType::I32 => "int32_t",
            ParamType::I64 => "int64_t",
        }
    }

    /// Little-endian, unaligned Rust field type.
    pub fn rust_type(self) -> &'static str {
        match self {
            ParamType::U8 => "u8",
            ParamType::U16 => "U16",
            ParamType::U32 => "U32",
            ParamType::U64 => "U64",
            ParamType::I8 => "i8",
            ParamType::I16 => "I16",
            ParamType::I32 => "I32",
            ParamType::I64 => "I64",
        }
    }

    pub fn size(self) -> usize {
        match self {
            ParamType::U8 | ParamType::I8 => 1,
            ParamType::U16 | ParamType::I16 => 2,
            ParamType::U32 | ParamType::I32 => 4,
            ParamType::U64 | ParamType::I64 => 8,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            ParamType::I8 | ParamType::I16 | ParamType::I32 | ParamType::I64
        )
    }

    /// Decodes a little-endian value. `bytes` must be exactly `size()` long.
    pub fn decode(self, bytes: &[u8]) -> FieldValue {
        debug_assert_eq!(bytes.len(), self.size());
        let mut buf = [0u8; 8];
        buf[..bytes.len()].copy_from_slice(bytes);
        let raw = u64::from_le_bytes(buf);
        if self.is_signed() {
            let shift = 64 - 8 * self.size() as u32;
            FieldValue::Signed(((raw << shift) as i64) >> shift)
        } else {
            FieldValue::Unsigned(raw)
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.c_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    Unsigned(u64),
    Signed(i64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Unsigned(v) => write!(f, "{v}"),
            FieldValue::Signed(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDef {
    pub name: String,
    pub ty: ParamType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDef {
    pub group: Option<String>,
    pub name: String,
    pub id: u32,
    pub params: Vec<ParamDef>,
}

/// A decoded parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    pub name: &'a str,
    pub value: FieldValue,
}

impl EventDef {
    /// Packed payload size in bytes.
    pub fn payload_len(&self) -> usize {
        self.params.iter().map(|p| p.ty.size()).sum()
    }

    /// Splits a payload into named values; `None` when the length does not
    /// match the definition.
    pub fn decode<'a>(&'a self, payload: &[u8]) -> Option<Vec<Field<'a>>> {
        if payload.len() != self.payload_len() {
            return None;
        }
        let mut offset = 0;
        let fields = self
            .params
            .iter()
            .map(|param| {
                let end = offset + param.ty.size();
                let value = param.ty.decode(&payload[offset..end]);
                offset = end;
                Field {
                    name: &param.name,
                    value,
                }
            })
            .collect();
        Some(fields)
    }
}

#[derive(Deserialize)]
struct RawGroup {
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Deserialize)]
struct RawEvent {
    name: String,
    id: u32,
    #[serde(default)]
    params: Vec<RawParam>,
}

#[derive(Deserialize)]
struct RawParam {
    name: String,
    #[serde(rename = "type")]
    ty: String,
}

/// A validated event schema.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    events: Vec<EventDef>,
    by_id: HashMap<u32, usize>,
}

impl Schema {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SchemaError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let schema = Self::from_yaml(&content)?;
        tracing::debug!(path = %path.display(), events = schema.len(), "schema loaded");
        Ok(schema)
    }

    pub fn from_yaml(content: &str) -> Result<Self, SchemaError> {
        let groups: Vec<RawGroup> = serde_yaml::from_str(content)?;
        let mut schema = Schema::default();
        for group in groups {
            for event in group.events {
                schema.push(group.group.clone(), event)?;
            }
        }
        Ok(schema)
    }

    fn push(&mut self, group: Option<String>, raw: RawEvent) -> Result<(), SchemaError> {
        check_identifier(&raw.name)?;
        if self.events.iter().any(|e| e.name == raw.name) {
            return Err(SchemaError::DuplicateName(raw.name));
        }
        if let Some(&index) = self.by_id.get(&raw.id) {
            return Err(SchemaError::DuplicateId {
                id: raw.id,
                first: self.events[index].name.clone(),
                second: raw.name,
            });
        }

        let mut params: Vec<ParamDef> = Vec::with_capacity(raw.params.len());
        for param in raw.params {
            check_identifier(&param.name)?;
            if params.iter().any(|p| p.name == param.name) {
                return Err(SchemaError::DuplicateParam {
                    event: raw.name,
                    param: param.name,
                });
            }
            let Some(ty) = ParamType::from_c_name(&param.ty) else {
                return Err(SchemaError::UnsupportedType {
                    event: raw.name,
                    param: param.name,
                    ty: param.ty,
                });
            };
            params.push(ParamDef {
                name: param.name,
                ty,
            });
        }

        let event = EventDef {
            group,
            name: raw.name,
            id: raw.id,
            params,
        };
        let size = event.payload_len();
        if size > EVENT_SIZE_MAX {
            return Err(SchemaError::PayloadTooLarge {
                event: event.name,
                size,
                max: EVENT_SIZE_MAX,
            });
        }

        self.by_id.insert(event.id, self.events.len());
        self.events.push(event);
        Ok(())
    }

    /// Events in declaration order.
    pub fn events(&self) -> &[EventDef] {
        &self.events
    }

    pub fn event(&self, id: u32) -> Option<&EventDef> {
        self.by_id.get(&id).map(|&index| &self.events[index])
    }

    /// Payload length lookup suitable for `PacketView::records`.
    pub fn payload_len(&self, id: u32) -> Option<usize> {
        self.event(id).map(EventDef::payload_len)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

fn check_identifier(name: &str) -> Result<(), SchemaError> {
    if IDENTIFIER.is_match(name) && !RESERVED.contains(&name) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}
