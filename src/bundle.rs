//! bundle.rs
//! Data model handed from the real-time producer to the drain thread.
//! - `Value`: float32 / int32 / owned string argument
//! - `Message`: OSC address + ordered arguments
//! - `Bundle`: wall-clock timestamp + ordered messages (one datagram)

use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f32),
    Int(i32),
    String(String),
}

impl Value {
    /// OSC type tag character for this argument.
    pub fn tag(&self) -> u8 {
        match self {
            Value::Float(_) => b'f',
            Value::Int(_) => b'i',
            Value::String(_) => b's',
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        debug_assert_no_nul(&v);
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        debug_assert_no_nul(v);
        Value::String(v.to_string())
    }
}

// OSC strings are NUL-terminated; the encoder rejects these, debug builds catch them here.
#[inline]
fn debug_assert_no_nul(s: &str) {
    debug_assert!(!s.as_bytes().contains(&0), "OSC string contains NUL: {s:?}");
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Slash-delimited path, e.g. `/u_speed`. Empty addresses are the caller's problem.
    pub address: String,
    pub args: Vec<Value>,
}

impl Message {
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into();
        debug_assert_no_nul(&address);
        Self {
            address,
            args: Vec::new(),
        }
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn with_args(address: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    pub time: SystemTime,
    pub messages: Vec<Message>,
}

impl Bundle {
    pub fn new(time: SystemTime) -> Self {
        Self {
            time,
            messages: Vec::new(),
        }
    }

    /// Empty bundle stamped with the current wall-clock time.
    pub fn now() -> Self {
        Self::new(SystemTime::now())
    }

    pub fn with_capacity(time: SystemTime, messages: usize) -> Self {
        Self {
            time,
            messages: Vec::with_capacity(messages),
        }
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
