//! CTF 1.8 metadata for packet streams.
//!
//! The layout described here matches `tracelet_core::packet`: a 4-byte
//! packet header carrying the stream id, a 16-byte packet context, and
//! events made of a 12-byte header followed by packed parameters. CTF
//! expects `packet_size` and `content_size` in bits, so streams meant for
//! babeltrace are produced with the `ctf-bit-sizes` feature of
//! `tracelet-core`.

use std::fmt::Write;

use crate::schema::{EventDef, ParamType, Schema};

const PREAMBLE: &str = "/* CTF 1.8 */\n\n";

const TRACE_AND_CLOCK: &str = r#"
trace {
    major = 1;
    minor = 8;
    byte_order = le;

    packet.header := struct {
        uint32_t stream_id;
    };
};

clock {
    name = monotonic;
    freq = 1000000000; /* ns */
};
"#;

/// Renders the metadata file for `schema` on `stream_id`.
pub fn render_metadata(schema: &Schema, stream_id: u32) -> String {
    let mut out = String::from(PREAMBLE);

    for ty in ParamType::ALL {
        let _ = writeln!(
            out,
            "typedef integer {{ size = {}; align = 8; signed = {}; }} {};",
            ty.size() * 8,
            ty.is_signed(),
            ty.c_name()
        );
    }

    out.push_str(TRACE_AND_CLOCK);

    let _ = write!(
        out,
        r#"
stream {{
    id = {stream_id};

    packet.context := struct {{
        uint32_t events_discarded;
        uint32_t packet_size;
        uint32_t content_size;
        uint32_t packet_seq_count;
    }};

    event.header := struct {{
        uint32_t id;
        uint64_t timestamp;
    }};
}};
"#
    );

    for event in schema.events() {
        render_event(&mut out, event, stream_id);
    }
    out
}

fn render_event(out: &mut String, event: &EventDef, stream_id: u32) {
    let _ = write!(
        out,
        "\nevent {{\n    name = {};\n    id = {};\n    stream_id = {};\n\n    fields := struct {{\n",
        event.name, event.id, stream_id
    );
    for param in &event.params {
        let _ = writeln!(out, "        {} {};", param.ty.c_name(), param.name);
    }
    out.push_str("    };\n};\n");
}
