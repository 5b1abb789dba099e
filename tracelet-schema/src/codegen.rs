//! Rust payload types from a schema.
//!
//! Each event becomes a packed `#[repr(C)]` struct of little-endian zerocopy
//! integers, which has no padding and therefore satisfies `EventPayload`.

use std::fmt::Write;

use crate::schema::{EventDef, Schema};

/// `loop_count` -> `LoopCount`.
pub fn type_name(event: &str) -> String {
    event
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Renders a module with one payload type per event.
pub fn render_rust(schema: &Schema, stream_id: u32) -> String {
    let mut out = String::new();
    out.push_str("// Generated by `tracelet metadata --rust`. Do not edit.\n\n");
    out.push_str("#![allow(dead_code)]\n\n");
    out.push_str("use tracelet_core::event::EventPayload;\n");
    out.push_str("#[allow(unused_imports)]\n");
    out.push_str("use zerocopy::byteorder::little_endian::{I16, I32, I64, U16, U32, U64};\n");
    out.push_str("use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};\n\n");
    let _ = writeln!(out, "pub const STREAM_ID: u32 = {stream_id};");

    for event in schema.events() {
        render_event(&mut out, event);
    }
    out
}

fn render_event(out: &mut String, event: &EventDef) {
    let name = type_name(&event.name);
    out.push('\n');
    let _ = writeln!(
        out,
        "#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]"
    );
    out.push_str("#[repr(C)]\n");
    if event.params.is_empty() {
        let _ = writeln!(out, "pub struct {name};");
    } else {
        let _ = writeln!(out, "pub struct {name} {{");
        for param in &event.params {
            let _ = writeln!(out, "    pub {}: {},", param.name, param.ty.rust_type());
        }
        out.push_str("}\n");
    }
    let _ = write!(
        out,
        "\nimpl EventPayload for {name} {{\n    const ID: u32 = {};\n}}\n",
        event.id
    );
}
