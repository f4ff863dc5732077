//! `ByteArray` entities: a cursor-addressed mutable byte buffer with
//! configurable endianness (spec §3.2/§6.4).
//!
//! Grounded on `original_source/libpika/PByteArray.cpp`'s `Read*`/`Write*`
//! family (byte/word/dword reads and writes, each endian-aware, each
//! advancing the cursor by the width read/written).

use crate::core::heap::{GcHeap, HeapObj};
use crate::core::value::{ByteArray, Endian, Handle};

pub fn create(heap: &mut GcHeap, endian: Endian) -> Handle {
    heap.alloc(HeapObj::ByteArray(ByteArray::new(endian)))
}

fn with_mut<'a>(heap: &'a mut GcHeap, h: Handle) -> &'a mut ByteArray {
    match heap.get_mut(h) {
        HeapObj::ByteArray(b) => b,
        _ => panic!("Handle does not refer to a ByteArray"),
    }
}

fn with_ref<'a>(heap: &'a GcHeap, h: Handle) -> &'a ByteArray {
    match heap.get(h) {
        HeapObj::ByteArray(b) => b,
        _ => panic!("Handle does not refer to a ByteArray"),
    }
}

/// Ensure at least `extra` bytes are writable past the cursor, growing if
/// `auto_grow` is set (spec §6.4); returns false if the array can't grow
/// and doesn't have room.
fn ensure_room(ba: &mut ByteArray, extra: usize) -> bool {
    let needed = ba.pos + extra;
    if needed > ba.bytes.len() {
        if !ba.auto_grow {
            return false;
        }
        ba.bytes.resize(needed, 0);
    }
    true
}

pub fn write_byte(heap: &mut GcHeap, h: Handle, byte: u8) -> bool {
    let ba = with_mut(heap, h);
    if !ensure_room(ba, 1) {
        return false;
    }
    ba.bytes[ba.pos] = byte;
    ba.pos += 1;
    true
}

pub fn read_byte(heap: &mut GcHeap, h: Handle) -> Option<u8> {
    let ba = with_mut(heap, h);
    let b = ba.bytes.get(ba.pos).copied()?;
    ba.pos += 1;
    Some(b)
}

pub fn write_u16(heap: &mut GcHeap, h: Handle, word: u16) -> bool {
    let ba = with_mut(heap, h);
    if !ensure_room(ba, 2) {
        return false;
    }
    let bytes = match ba.endian {
        Endian::Big => word.to_be_bytes(),
        Endian::Little => word.to_le_bytes(),
    };
    ba.bytes[ba.pos..ba.pos + 2].copy_from_slice(&bytes);
    ba.pos += 2;
    true
}

pub fn read_u16(heap: &mut GcHeap, h: Handle) -> Option<u16> {
    let ba = with_mut(heap, h);
    if ba.pos + 2 > ba.bytes.len() {
        return None;
    }
    let slice = &ba.bytes[ba.pos..ba.pos + 2];
    let word = match ba.endian {
        Endian::Big => u16::from_be_bytes([slice[0], slice[1]]),
        Endian::Little => u16::from_le_bytes([slice[0], slice[1]]),
    };
    ba.pos += 2;
    Some(word)
}

pub fn write_u32(heap: &mut GcHeap, h: Handle, dword: u32) -> bool {
    let ba = with_mut(heap, h);
    if !ensure_room(ba, 4) {
        return false;
    }
    let bytes = match ba.endian {
        Endian::Big => dword.to_be_bytes(),
        Endian::Little => dword.to_le_bytes(),
    };
    ba.bytes[ba.pos..ba.pos + 4].copy_from_slice(&bytes);
    ba.pos += 4;
    true
}

pub fn read_u32(heap: &mut GcHeap, h: Handle) -> Option<u32> {
    let ba = with_mut(heap, h);
    if ba.pos + 4 > ba.bytes.len() {
        return None;
    }
    let slice = &ba.bytes[ba.pos..ba.pos + 4];
    let dword = match ba.endian {
        Endian::Big => u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]),
        Endian::Little => u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]),
    };
    ba.pos += 4;
    Some(dword)
}

pub fn write_u64(heap: &mut GcHeap, h: Handle, qword: u64) -> bool {
    let ba = with_mut(heap, h);
    if !ensure_room(ba, 8) {
        return false;
    }
    let bytes = match ba.endian {
        Endian::Big => qword.to_be_bytes(),
        Endian::Little => qword.to_le_bytes(),
    };
    ba.bytes[ba.pos..ba.pos + 8].copy_from_slice(&bytes);
    ba.pos += 8;
    true
}

pub fn read_u64(heap: &mut GcHeap, h: Handle) -> Option<u64> {
    let ba = with_mut(heap, h);
    if ba.pos + 8 > ba.bytes.len() {
        return None;
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&ba.bytes[ba.pos..ba.pos + 8]);
    let qword = match ba.endian {
        Endian::Big => u64::from_be_bytes(raw),
        Endian::Little => u64::from_le_bytes(raw),
    };
    ba.pos += 8;
    Some(qword)
}

/// Signed reads/writes reuse the unsigned machinery (spec §6.4 "signed
/// integers in the configured platform width") — same bytes, different
/// sign interpretation.
pub fn write_i32(heap: &mut GcHeap, h: Handle, value: i32) -> bool {
    write_u32(heap, h, value as u32)
}

pub fn read_i32(heap: &mut GcHeap, h: Handle) -> Option<i32> {
    read_u32(heap, h).map(|v| v as i32)
}

pub fn write_i64(heap: &mut GcHeap, h: Handle, value: i64) -> bool {
    write_u64(heap, h, value as u64)
}

pub fn read_i64(heap: &mut GcHeap, h: Handle) -> Option<i64> {
    read_u64(heap, h).map(|v| v as i64)
}

pub fn write_f32(heap: &mut GcHeap, h: Handle, value: f32) -> bool {
    write_u32(heap, h, value.to_bits())
}

pub fn read_f32(heap: &mut GcHeap, h: Handle) -> Option<f32> {
    read_u32(heap, h).map(f32::from_bits)
}

pub fn write_f64(heap: &mut GcHeap, h: Handle, value: f64) -> bool {
    write_u64(heap, h, value.to_bits())
}

pub fn read_f64(heap: &mut GcHeap, h: Handle) -> Option<f64> {
    read_u64(heap, h).map(f64::from_bits)
}

/// Length-delimited string write/read: a `u32` byte count followed by the
/// raw bytes (spec §6.4 "length-delimited ... string reads").
pub fn write_string(heap: &mut GcHeap, h: Handle, bytes: &[u8]) -> bool {
    if !write_u32(heap, h, bytes.len() as u32) {
        return false;
    }
    let ba = with_mut(heap, h);
    if !ensure_room(ba, bytes.len()) {
        return false;
    }
    ba.bytes[ba.pos..ba.pos + bytes.len()].copy_from_slice(bytes);
    ba.pos += bytes.len();
    true
}

pub fn read_string(heap: &mut GcHeap, h: Handle) -> Option<Vec<u8>> {
    let count = read_u32(heap, h)? as usize;
    let ba = with_mut(heap, h);
    if ba.pos + count > ba.bytes.len() {
        return None;
    }
    let out = ba.bytes[ba.pos..ba.pos + count].to_vec();
    ba.pos += count;
    Some(out)
}

/// Read every byte from the cursor to the end, advancing the cursor there
/// (spec §6.4 "remaining-string reads").
pub fn read_remaining(heap: &mut GcHeap, h: Handle) -> Vec<u8> {
    let ba = with_mut(heap, h);
    let out = ba.bytes[ba.pos..].to_vec();
    ba.pos = ba.bytes.len();
    out
}

pub fn set_length(heap: &mut GcHeap, h: Handle, len: usize) {
    with_mut(heap, h).set_length(len);
}

pub fn len(heap: &GcHeap, h: Handle) -> usize {
    with_ref(heap, h).bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_byte_word_dword_roundtrip() {
        let mut heap = GcHeap::new();
        let ba = create(&mut heap, Endian::Big);
        write_byte(&mut heap, ba, 0xAB);
        write_u16(&mut heap, ba, 0x1234);
        write_u32(&mut heap, ba, 0xDEADBEEF);
        set_length(&mut heap, ba, len(&heap, ba));
        with_mut(&mut heap, ba).pos = 0;
        assert_eq!(read_byte(&mut heap, ba), Some(0xAB));
        assert_eq!(read_u16(&mut heap, ba), Some(0x1234));
        assert_eq!(read_u32(&mut heap, ba), Some(0xDEADBEEF));
    }

    #[test]
    fn qword_and_length_delimited_string_roundtrip() {
        let mut heap = GcHeap::new();
        let ba = create(&mut heap, Endian::Little);
        write_u64(&mut heap, ba, 0x0102030405060708);
        write_string(&mut heap, ba, b"hi");
        set_length(&mut heap, ba, len(&heap, ba));
        with_mut(&mut heap, ba).pos = 0;
        assert_eq!(read_u64(&mut heap, ba), Some(0x0102030405060708));
        assert_eq!(read_string(&mut heap, ba), Some(b"hi".to_vec()));
    }

    #[test]
    fn shrinking_length_clamps_cursor() {
        let mut heap = GcHeap::new();
        let ba = create(&mut heap, Endian::Little);
        write_u32(&mut heap, ba, 1);
        set_length(&mut heap, ba, 1);
        assert_eq!(with_ref(&heap, ba).pos, 1);
    }
}
