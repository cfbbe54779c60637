// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::io::{self, Read, Seek, SeekFrom};

use protobuf::CodedInputStream;

use super::MapError;

/// Protobuf wire types used by the map format. Groups and fixed-width
/// fields do not appear in well-formed files.
pub(crate) const WIRE_VARINT: u32 = 0;
pub(crate) const WIRE_BYTES: u32 = 2;

#[inline]
pub(crate) fn field_number(tag: u32) -> u32 {
    tag >> 3
}

#[inline]
pub(crate) fn wire_type(tag: u32) -> u32 {
    tag & 0x7
}

/// Undoes the zigzag encoding of a signed varint.
#[inline]
pub(crate) fn zigzag64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

#[inline]
pub(crate) fn zigzag32(value: u64) -> i32 {
    zigzag64(value) as i32
}

/// Walks protobuf-wire fields directly over a seekable stream.
///
/// [CodedInputStream] has no notion of seeking, yet the spatial index
/// is read by jumping between file offsets and skipping the interior
/// of not-yet-needed nodes. The scanner therefore reads the framing
/// varints (tags and lengths) straight from the stream, tracks the
/// absolute position, and extracts bounded buffers which are then
/// parsed with [MessageReader]. The same split is used for OSM PBF
/// blobs: a hand-read size prefix framing protobuf-parsed payloads.
pub(crate) struct FileScanner<R> {
    reader: R,
    pos: u64,
}

impl<R: Read + Seek> FileScanner<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self { reader, pos: 0 }
    }

    /// Absolute offset of the next byte to be read.
    pub(crate) fn pos(&self) -> u64 {
        self.pos
    }

    pub(crate) fn seek_to(&mut self, offset: u64) -> Result<(), MapError> {
        self.reader.seek(SeekFrom::Start(offset))?;
        self.pos = offset;
        Ok(())
    }

    /// Reads a varint, treating EOF on the first byte as end-of-stream.
    pub(crate) fn read_varint_or_eof(&mut self) -> Result<Option<u64>, MapError> {
        let mut value: u64 = 0;
        let mut shift = 0u32;
        loop {
            let mut byte = [0u8; 1];
            match self.reader.read_exact(&mut byte) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && shift == 0 => {
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
            self.pos += 1;

            value |= u64::from(byte[0] & 0x7f) << shift;
            if byte[0] & 0x80 == 0 {
                return Ok(Some(value));
            }
            shift += 7;
            if shift >= 64 {
                return Err(MapError::Format("varint longer than 64 bits"));
            }
        }
    }

    pub(crate) fn read_varint(&mut self) -> Result<u64, MapError> {
        self.read_varint_or_eof()?
            .ok_or(MapError::Format("unexpected end of file"))
    }

    /// Reads the next field tag, or `None` once `end` is reached.
    pub(crate) fn read_tag_within(&mut self, end: u64) -> Result<Option<u32>, MapError> {
        if self.pos >= end {
            return Ok(None);
        }
        Ok(Some(self.read_varint()? as u32))
    }

    pub(crate) fn read_exact(&mut self, len: u64) -> Result<Vec<u8>, MapError> {
        let mut buf = vec![0u8; len as usize];
        self.reader.read_exact(&mut buf)?;
        self.pos += len;
        Ok(buf)
    }

    /// Skips over a field value of the given wire type.
    pub(crate) fn skip_value(&mut self, wire: u32) -> Result<(), MapError> {
        match wire {
            WIRE_VARINT => {
                self.read_varint()?;
                Ok(())
            }
            WIRE_BYTES => {
                let len = self.read_varint()?;
                self.seek_to(self.pos + len)
            }
            _ => Err(MapError::Format("unsupported wire type")),
        }
    }
}

/// Parses the fields of one extracted, length-bounded message buffer.
///
/// A thin veneer over [CodedInputStream] exposing tag iteration in
/// terms of (field number, wire type) pairs.
pub(crate) struct MessageReader<'a> {
    stream: CodedInputStream<'a>,
}

impl<'a> MessageReader<'a> {
    pub(crate) fn from_bytes(buf: &'a [u8]) -> Self {
        Self {
            stream: CodedInputStream::from_bytes(buf),
        }
    }

    /// Reads the next field tag, or `None` at the end of the buffer.
    pub(crate) fn next_tag(&mut self) -> Result<Option<(u32, u32)>, MapError> {
        if self.stream.eof()? {
            return Ok(None);
        }
        let tag = self.stream.read_raw_varint32()?;
        Ok(Some((field_number(tag), wire_type(tag))))
    }

    pub(crate) fn read_varint64(&mut self) -> Result<u64, MapError> {
        Ok(self.stream.read_raw_varint64()?)
    }

    pub(crate) fn read_varint32(&mut self) -> Result<u32, MapError> {
        Ok(self.stream.read_raw_varint32()?)
    }

    pub(crate) fn read_sint32(&mut self) -> Result<i32, MapError> {
        Ok(zigzag32(self.stream.read_raw_varint64()?))
    }

    pub(crate) fn read_sint64(&mut self) -> Result<i64, MapError> {
        Ok(zigzag64(self.stream.read_raw_varint64()?))
    }

    pub(crate) fn read_bytes(&mut self) -> Result<Vec<u8>, MapError> {
        Ok(self.stream.read_bytes()?)
    }

    pub(crate) fn read_string(&mut self) -> Result<String, MapError> {
        Ok(self.stream.read_string()?)
    }

    pub(crate) fn at_end(&mut self) -> Result<bool, MapError> {
        Ok(self.stream.eof()?)
    }

    pub(crate) fn skip_value(&mut self, wire: u32) -> Result<(), MapError> {
        match wire {
            WIRE_VARINT => {
                self.stream.read_raw_varint64()?;
                Ok(())
            }
            WIRE_BYTES => {
                self.stream.read_bytes()?;
                Ok(())
            }
            _ => Err(MapError::Format("unsupported wire type")),
        }
    }
}
