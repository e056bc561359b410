//! decode.rs
//! Minimal conformant OSC 1.0 reader: messages and (nested) bundles with
//! `f`, `i` and `s` arguments. Used by `osc_dump` and to verify encoder output.

use crate::{
    bundle::{Bundle, Message, Value},
    codec::{encode::BUNDLE_TAG, padded_str_len, timetag::Timetag},
    error::DecodeError,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Message(Message),
    Bundle {
        timetag: Timetag,
        elements: Vec<Packet>,
    },
}

impl Packet {
    /// All messages in depth-first order.
    pub fn messages(&self) -> Vec<&Message> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Message>) {
        match self {
            Packet::Message(m) => out.push(m),
            Packet::Bundle { elements, .. } => elements.iter().for_each(|e| e.collect(out)),
        }
    }

    /// Rebuilds a flat `Bundle` (microsecond time resolution).
    pub fn into_bundle(self) -> Option<Bundle> {
        match self {
            Packet::Bundle { timetag, elements } => {
                let mut bundle = Bundle::new(timetag.to_system_time());
                for element in elements {
                    match element {
                        Packet::Message(m) => bundle.push(m),
                        Packet::Bundle { .. } => return None,
                    }
                }
                Some(bundle)
            }
            Packet::Message(_) => None,
        }
    }
}

pub fn decode_packet(bytes: &[u8]) -> Result<Packet, DecodeError> {
    let mut r = Reader { bytes, pos: 0 };
    r.packet(bytes.len())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos + len;
        if end > self.bytes.len() {
            return Err(DecodeError::Truncated { offset: self.pos });
        }
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn word(&mut self) -> Result<[u8; 4], DecodeError> {
        let b = self.take(4)?;
        Ok([b[0], b[1], b[2], b[3]])
    }

    fn string(&mut self) -> Result<&'a str, DecodeError> {
        let rest = &self.bytes[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(DecodeError::Truncated { offset: self.pos })?;
        let raw = self.take(padded_str_len(len))?;
        std::str::from_utf8(&raw[..len]).map_err(|_| DecodeError::InvalidUtf8)
    }

    fn packet(&mut self, end: usize) -> Result<Packet, DecodeError> {
        let rest = &self.bytes[self.pos..end];
        if rest.starts_with(BUNDLE_TAG) {
            self.bundle(end)
        } else if rest.first() == Some(&b'/') {
            self.message().map(Packet::Message)
        } else {
            Err(DecodeError::UnknownPacket)
        }
    }

    fn bundle(&mut self, end: usize) -> Result<Packet, DecodeError> {
        self.take(BUNDLE_TAG.len())?;
        let hi = u32::from_be_bytes(self.word()?);
        let lo = u32::from_be_bytes(self.word()?);
        let timetag = Timetag { seconds: hi, fraction: lo };

        let mut elements = Vec::new();
        while self.pos < end {
            let size = i32::from_be_bytes(self.word()?);
            if size < 0 || size % 4 != 0 || self.pos + size as usize > end {
                return Err(DecodeError::BadElementSize { size });
            }
            let element_end = self.pos + size as usize;
            elements.push(self.packet(element_end)?);
            if self.pos != element_end {
                return Err(DecodeError::BadElementSize { size });
            }
        }
        Ok(Packet::Bundle { timetag, elements })
    }

    fn message(&mut self) -> Result<Message, DecodeError> {
        let address = self.string()?.to_string();
        let tags = self.string()?;
        let tags = tags.strip_prefix(',').ok_or(DecodeError::MissingTypeTags)?;

        let mut args = Vec::with_capacity(tags.len());
        for tag in tags.chars() {
            let value = match tag {
                'f' => Value::Float(f32::from_be_bytes(self.word()?)),
                'i' => Value::Int(i32::from_be_bytes(self.word()?)),
                's' => Value::String(self.string()?.to_string()),
                other => return Err(DecodeError::UnsupportedTag(other)),
            };
            args.push(value);
        }
        Ok(Message { address, args })
    }
}
