//! # Function Trace Dumps
//!
//! Firmware built with `-finstrument-functions` records every function entry
//! and exit into a RAM ring buffer. A raw dump of that buffer is a sequence of
//! fixed-size records, laid out as the C struct
//!
//! ```text
//! offset  size  field
//!      0     4  meta       enter/exit and interrupt state bits
//!      4     4  (padding)  timestamp is 8-byte aligned
//!      8     8  timestamp  target clock ticks, often microseconds
//!     16     4  pc         address of the instrumented function
//!     20     4  lr         call site
//! ```
//!
//! little-endian, as written by a Cortex-M target. Each record yields two
//! addresses to resolve: `pc` names the function and `lr` the caller.
//!
//! Slots the target never wrote are all zero and are skipped. The dump does
//! not carry the ring's write position, so decoded events are ordered by
//! timestamp.

use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use crate::domain::TraceError;
use crate::resolver::{ResolverHandle, ResultRecord};

/// Size of one record, including alignment padding
pub const RECORD_SIZE: usize = 24;

const TIMESTAMP_OFFSET: u64 = 8;

const META_ENTER: u32 = 1 << 0;
const META_EXIT: u32 = 1 << 1;
const META_IRQ_ENABLED: u32 = 1 << 2;
const META_IRQ_CONTEXT: u32 = 1 << 3;
const META_KNOWN: u32 = META_ENTER | META_EXIT | META_IRQ_ENABLED | META_IRQ_CONTEXT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceKind {
    Enter,
    Exit,
}

/// One decoded ring-buffer record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TraceEvent {
    /// Position in the dump, in records
    pub slot: usize,
    pub kind: TraceKind,
    /// Interrupts were enabled when the record was written
    pub irq_enabled: bool,
    /// The record was written from an interrupt handler
    pub irq_context: bool,
    pub timestamp: u64,
    pub pc: u32,
    pub lr: u32,
}

impl TraceEvent {
    fn from_meta(
        slot: usize,
        meta: u32,
        timestamp: u64,
        pc: u32,
        lr: u32,
    ) -> Result<Self, TraceError> {
        let kind = match meta & (META_ENTER | META_EXIT) {
            META_ENTER => TraceKind::Enter,
            META_EXIT => TraceKind::Exit,
            _ => return Err(TraceError::InvalidMeta { slot, meta }),
        };
        if meta & !META_KNOWN != 0 {
            return Err(TraceError::InvalidMeta { slot, meta });
        }
        Ok(Self {
            slot,
            kind,
            irq_enabled: meta & META_IRQ_ENABLED != 0,
            irq_context: meta & META_IRQ_CONTEXT != 0,
            timestamp,
            pc,
            lr,
        })
    }

    /// Resolve the function and its call site, one query after the other
    #[must_use]
    pub fn resolve(&self, handle: &ResolverHandle) -> ResolvedEvent {
        ResolvedEvent {
            event: *self,
            function: handle.query(u64::from(self.pc)),
            call_site: handle.query(u64::from(self.lr)),
        }
    }
}

/// A trace event with its addresses resolved
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedEvent {
    #[serde(flatten)]
    pub event: TraceEvent,
    pub function: Option<ResultRecord>,
    pub call_site: Option<ResultRecord>,
}

impl ResolvedEvent {
    /// One line: timestamp, direction, function, interrupt state, caller
    #[must_use]
    pub fn format(&self) -> String {
        let arrow = match self.event.kind {
            TraceKind::Enter => "->",
            TraceKind::Exit => "<-",
        };
        let mut flags = String::new();
        if self.event.irq_context {
            flags.push_str(" [irq]");
        }
        if !self.event.irq_enabled {
            flags.push_str(" [irq off]");
        }
        format!(
            "{:>12} {arrow} {}{flags}  from {}",
            self.event.timestamp,
            describe(self.function.as_ref(), self.event.pc),
            describe(self.call_site.as_ref(), self.event.lr),
        )
    }
}

fn describe(record: Option<&ResultRecord>, addr: u32) -> String {
    match record {
        Some(record) if !record.is_unknown() => record.to_string(),
        _ => format!("0x{addr:08x}"),
    }
}

/// Decode a raw ring-buffer dump
///
/// # Errors
/// Returns [`TraceError::Truncated`] if the dump is not a whole number of
/// records and [`TraceError::InvalidMeta`] for a slot whose meta word is not
/// exactly one of enter/exit plus known interrupt bits.
pub fn decode_trace(bytes: &[u8]) -> Result<Vec<TraceEvent>, TraceError> {
    if bytes.len() % RECORD_SIZE != 0 {
        return Err(TraceError::Truncated { len: bytes.len(), record_size: RECORD_SIZE });
    }

    let mut events = Vec::with_capacity(bytes.len() / RECORD_SIZE);
    for (slot, chunk) in bytes.chunks_exact(RECORD_SIZE).enumerate() {
        let mut reader = Cursor::new(chunk);
        let meta = reader.read_u32::<LittleEndian>()?;
        reader.set_position(TIMESTAMP_OFFSET);
        let timestamp = reader.read_u64::<LittleEndian>()?;
        let pc = reader.read_u32::<LittleEndian>()?;
        let lr = reader.read_u32::<LittleEndian>()?;

        // Never written
        if meta == 0 && timestamp == 0 && pc == 0 && lr == 0 {
            continue;
        }
        events.push(TraceEvent::from_meta(slot, meta, timestamp, pc, lr)?);
    }

    events.sort_by_key(|event| event.timestamp);
    Ok(events)
}

/// Read and decode a dump file
///
/// # Errors
/// Returns [`TraceError::Io`] if the file cannot be read, otherwise as
/// [`decode_trace`]
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEvent>, TraceError> {
    decode_trace(&fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    fn record(meta: u32, timestamp: u64, pc: u32, lr: u32) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RECORD_SIZE);
        buf.write_u32::<LittleEndian>(meta).unwrap();
        // Padding the target leaves as garbage
        buf.extend_from_slice(&[0xAA; 4]);
        buf.write_u64::<LittleEndian>(timestamp).unwrap();
        buf.write_u32::<LittleEndian>(pc).unwrap();
        buf.write_u32::<LittleEndian>(lr).unwrap();
        buf
    }

    #[test]
    fn test_decode_enter_and_exit() {
        let mut dump = record(META_ENTER | META_IRQ_ENABLED, 100, 0x0800_02c4, 0x0800_0100);
        dump.extend(record(META_EXIT | META_IRQ_ENABLED, 130, 0x0800_02c4, 0x0800_0100));

        let events = decode_trace(&dump).unwrap();
        assert_eq!(events.len(), 2);

        assert_eq!(events[0].kind, TraceKind::Enter);
        assert_eq!(events[0].timestamp, 100);
        assert_eq!(events[0].pc, 0x0800_02c4);
        assert_eq!(events[0].lr, 0x0800_0100);
        assert!(events[0].irq_enabled);
        assert!(!events[0].irq_context);

        assert_eq!(events[1].kind, TraceKind::Exit);
        assert_eq!(events[1].slot, 1);
    }

    #[test]
    fn test_irq_context_bits() {
        let dump = record(META_ENTER | META_IRQ_CONTEXT, 7, 0x0800_1000, 0xFFFF_FFF9);
        let event = decode_trace(&dump).unwrap()[0];
        assert!(event.irq_context);
        assert!(!event.irq_enabled);
        assert_eq!(event.lr, 0xFFFF_FFF9);
    }

    #[test]
    fn test_unwritten_slots_skipped() {
        let mut dump = record(META_ENTER, 5, 0x10, 0x20);
        dump.extend(vec![0u8; RECORD_SIZE * 3]);
        let events = decode_trace(&dump).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_wrapped_ring_ordered_by_timestamp() {
        // Head wrapped: the newest record overwrote slot 0
        let mut dump = record(META_EXIT, 300, 0x30, 0x31);
        dump.extend(record(META_ENTER, 100, 0x10, 0x11));
        dump.extend(record(META_ENTER, 200, 0x20, 0x21));

        let events = decode_trace(&dump).unwrap();
        let order: Vec<(usize, u64)> = events.iter().map(|e| (e.slot, e.timestamp)).collect();
        assert_eq!(order, [(1, 100), (2, 200), (0, 300)]);
    }

    #[test]
    fn test_invalid_meta_rejected() {
        // Both enter and exit
        let dump = record(META_ENTER | META_EXIT, 1, 0x10, 0x20);
        assert!(matches!(
            decode_trace(&dump),
            Err(TraceError::InvalidMeta { slot: 0, meta: 3 })
        ));

        // Neither, but interrupt bits set
        let mut dump = record(META_ENTER, 1, 0x10, 0x20);
        dump.extend(record(META_IRQ_ENABLED, 2, 0x10, 0x20));
        assert!(matches!(decode_trace(&dump), Err(TraceError::InvalidMeta { slot: 1, .. })));

        // Unknown high bit
        let dump = record(META_ENTER | 0x100, 1, 0x10, 0x20);
        assert!(matches!(decode_trace(&dump), Err(TraceError::InvalidMeta { .. })));
    }

    #[test]
    fn test_partial_record_rejected() {
        let mut dump = record(META_ENTER, 1, 0x10, 0x20);
        dump.truncate(RECORD_SIZE - 4);
        assert!(matches!(
            decode_trace(&dump),
            Err(TraceError::Truncated { len: 20, record_size: RECORD_SIZE })
        ));
    }

    #[test]
    fn test_empty_dump() {
        assert!(decode_trace(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_format_unresolved_event() {
        let event =
            TraceEvent::from_meta(0, META_EXIT | META_IRQ_CONTEXT, 42, 0x0800_02c4, 0x10).unwrap();
        let resolved = ResolvedEvent {
            event,
            function: Some(ResultRecord::new("fw", "nanoprof_init", "nanoprof.c:150")),
            call_site: None,
        };
        assert_eq!(
            resolved.format(),
            "          42 <- nanoprof_init at nanoprof.c:150 [irq] [irq off]  from 0x00000010"
        );
    }

    #[test]
    fn test_serialize_flattens_event() {
        let event = TraceEvent::from_meta(2, META_ENTER | META_IRQ_ENABLED, 9, 0x40, 0x50).unwrap();
        let resolved = ResolvedEvent { event, function: None, call_site: None };
        let json = serde_json::to_value(&resolved).unwrap();
        assert_eq!(json["kind"], "enter");
        assert_eq!(json["slot"], 2);
        assert_eq!(json["pc"], 0x40);
        assert!(json["function"].is_null());
    }
}
