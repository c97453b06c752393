//! Binary form of a [`MetadataDelta`].
//!
//! ```text
//! magic "ENCD" | version u16 | generation u32
//! row count u32 | rows: table u8, row u32, payload
//! log count u32 | (token u32, function code u32)*
//! map count u32 | token u32*
//! ```
//!
//! Integers are little-endian; strings are a `u32` byte length followed by
//! UTF-8.

use crate::{MetadataDelta, MethodBody, RowData};

pub const MAGIC: [u8; 4] = *b"ENCD";
pub const FORMAT_VERSION: u16 = 1;

impl MetadataDelta {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::default();
        w.bytes(&MAGIC);
        w.u16(FORMAT_VERSION);
        w.u32(self.generation.ordinal());

        w.len(self.rows.len());
        for row in &self.rows {
            w.u8(row.table.code());
            w.u32(row.row);
            match &row.data {
                RowData::TypeDef {
                    namespace,
                    name,
                    kind,
                    extends,
                } => {
                    w.str(namespace);
                    w.str(name);
                    w.u8(match kind {
                        enc_ir::TypeKind::Class => 0,
                        enc_ir::TypeKind::Struct => 1,
                        enc_ir::TypeKind::Interface => 2,
                    });
                    match extends {
                        Some(base) => {
                            w.u8(1);
                            w.str(base);
                        }
                        None => w.u8(0),
                    }
                }
                RowData::Field {
                    name,
                    signature,
                    is_static,
                } => {
                    w.str(name);
                    w.str(signature);
                    w.u8(u8::from(*is_static));
                }
                RowData::MethodDef {
                    name,
                    signature,
                    is_static,
                    body,
                } => {
                    w.str(name);
                    w.str(signature);
                    w.u8(u8::from(*is_static));
                    match body {
                        MethodBody::None => w.u8(0),
                        MethodBody::Compiled(body) => {
                            w.u8(1);
                            w.u64(body.0);
                        }
                        MethodBody::Trap { code } => {
                            w.u8(2);
                            w.i32(*code);
                        }
                        MethodBody::ExceptionConstructor => w.u8(3),
                    }
                }
                RowData::Param { name, sequence } => {
                    w.str(name);
                    w.u16(*sequence);
                }
                RowData::NestedClass { nested, enclosing } => {
                    w.u32(*nested);
                    w.u32(*enclosing);
                }
            }
        }

        w.len(self.enc_log.len());
        for entry in &self.enc_log {
            w.u32(entry.token.raw());
            w.u32(entry.operation.code());
        }

        w.len(self.enc_map.len());
        for token in &self.enc_map {
            w.u32(token.raw());
        }

        w.buf
    }
}

#[derive(Default)]
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.bytes(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.bytes(&v.to_le_bytes());
    }

    fn i32(&mut self, v: i32) {
        self.bytes(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.bytes(&v.to_le_bytes());
    }

    fn len(&mut self, len: usize) {
        self.u32(u32::try_from(len).unwrap_or(u32::MAX));
    }

    fn str(&mut self, s: &str) {
        self.len(s.len());
        self.bytes(s.as_bytes());
    }
}
