//! Bit-level extraction and insertion primitives
//!
//! Maps a signal's `(start_bit, length, byte_order)` to payload bit
//! positions and moves raw values in and out of the payload. Byte-aligned
//! spans take a whole-byte fast path through `byteorder`; everything else
//! walks bit by bit.
//!
//! Bit numbering: absolute bit `n` lives in byte `n / 8`; for little-endian
//! signals bit `n % 8 == 0` is the LSB of that byte. Big-endian start bits
//! use DBC sawtooth numbering (bit 7 is the MSB of byte 0) and traverse
//! MSB-to-LSB, continuing at the MSB of the following byte.

use crate::schema::{ByteOrder as SignalByteOrder, Signal};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Flattened MSB-first index of a big-endian start bit.
///
/// DBC numbers bits within a byte LSB-0, but a big-endian signal starts at
/// its MSB and grows toward the LSB. Flattening to `8*byte + (7 - bit)`
/// makes the signal occupy consecutive indices.
pub(crate) fn flatten_big_endian(start_bit: usize) -> usize {
    8 * (start_bit / 8) + (7 - start_bit % 8)
}

/// True when the signal's whole bit span lies within `payload_len` bytes.
pub(crate) fn fits(signal: &Signal, payload_len: usize) -> bool {
    let start = signal.start_bit as usize;
    let length = signal.length as usize;
    let end = match signal.byte_order {
        SignalByteOrder::LittleEndian => start + length,
        SignalByteOrder::BigEndian => flatten_big_endian(start) + length,
    };
    end <= 8 * payload_len
}

/// Absolute payload bit indices covered by this signal, LSB-0 numbering.
///
/// Used by the schema's overlap checks; order is unspecified.
pub(crate) fn bit_positions(signal: &Signal) -> Vec<usize> {
    let start = signal.start_bit as usize;
    let length = signal.length as usize;
    match signal.byte_order {
        SignalByteOrder::LittleEndian => (start..start + length).collect(),
        SignalByteOrder::BigEndian => {
            let first = flatten_big_endian(start);
            (first..first + length)
                .map(|pos| 8 * (pos / 8) + (7 - pos % 8))
                .collect()
        }
    }
}

/// Read `signal.length` bits from the payload as an unsigned integer.
///
/// The caller guarantees the span fits (`fits` or construction-time
/// validation).
pub(crate) fn extract_bits(payload: &[u8], signal: &Signal) -> u64 {
    let start = signal.start_bit as usize;
    let length = signal.length as usize;
    match signal.byte_order {
        SignalByteOrder::LittleEndian => extract_little_endian(payload, start, length),
        SignalByteOrder::BigEndian => extract_big_endian(payload, start, length),
    }
}

/// Write the low `signal.length` bits of `raw` into the payload without
/// disturbing any other bit. Exact inverse of `extract_bits`.
pub(crate) fn insert_bits(payload: &mut [u8], signal: &Signal, raw: u64) {
    let start = signal.start_bit as usize;
    let length = signal.length as usize;
    let raw = mask_to_width(raw, length);
    match signal.byte_order {
        SignalByteOrder::LittleEndian => insert_little_endian(payload, start, length, raw),
        SignalByteOrder::BigEndian => insert_big_endian(payload, start, length, raw),
    }
}

/// Sign-extend a `bit_length`-bit value to 64 bits
pub(crate) fn sign_extend(value: u64, bit_length: u16) -> i64 {
    if bit_length >= 64 {
        return value as i64;
    }
    let sign_bit = 1u64 << (bit_length - 1);
    if (value & sign_bit) != 0 {
        let mask = !0u64 << bit_length;
        (value | mask) as i64
    } else {
        value as i64
    }
}

/// Keep only the low `length` bits
pub(crate) fn mask_to_width(raw: u64, length: usize) -> u64 {
    if length >= 64 {
        raw
    } else {
        raw & ((1u64 << length) - 1)
    }
}

fn extract_little_endian(payload: &[u8], start: usize, length: usize) -> u64 {
    if start % 8 == 0 && length % 8 == 0 {
        let first = start / 8;
        return LittleEndian::read_uint(&payload[first..first + length / 8], length / 8);
    }
    let mut result: u64 = 0;
    for i in 0..length {
        let bit_pos = start + i;
        let bit = (payload[bit_pos / 8] >> (bit_pos % 8)) & 0x01;
        result |= (bit as u64) << i;
    }
    result
}

fn extract_big_endian(payload: &[u8], start: usize, length: usize) -> u64 {
    let first = flatten_big_endian(start);
    if first % 8 == 0 && length % 8 == 0 {
        let byte = first / 8;
        return BigEndian::read_uint(&payload[byte..byte + length / 8], length / 8);
    }
    let mut result: u64 = 0;
    for i in 0..length {
        let pos = first + i;
        let bit = (payload[pos / 8] >> (7 - pos % 8)) & 0x01;
        result |= (bit as u64) << (length - 1 - i);
    }
    result
}

fn insert_little_endian(payload: &mut [u8], start: usize, length: usize, raw: u64) {
    if start % 8 == 0 && length % 8 == 0 {
        let first = start / 8;
        LittleEndian::write_uint(&mut payload[first..first + length / 8], raw, length / 8);
        return;
    }
    for i in 0..length {
        let bit_pos = start + i;
        let byte = bit_pos / 8;
        let shift = bit_pos % 8;
        let bit = ((raw >> i) & 0x01) as u8;
        payload[byte] = (payload[byte] & !(1 << shift)) | (bit << shift);
    }
}

fn insert_big_endian(payload: &mut [u8], start: usize, length: usize, raw: u64) {
    let first = flatten_big_endian(start);
    if first % 8 == 0 && length % 8 == 0 {
        let byte = first / 8;
        BigEndian::write_uint(&mut payload[byte..byte + length / 8], raw, length / 8);
        return;
    }
    for i in 0..length {
        let pos = first + i;
        let byte = pos / 8;
        let shift = 7 - pos % 8;
        let bit = ((raw >> (length - 1 - i)) & 0x01) as u8;
        payload[byte] = (payload[byte] & !(1 << shift)) | (bit << shift);
    }
}
