//! The runtime value representation and its printed form.
//!
//! `Value` is a `Copy` tagged sum: primitives are stored inline, while
//! reference-carrying variants hold a [`HeapId`] into the arena. Because
//! strings and symbols are interned, the derived `PartialEq` (handle
//! identity) is also content equality for those variants; for lists and
//! structs it is identity only, and the `=` builtin performs the structural
//! comparison through the heap.

use std::fmt::{self, Write};

use crate::{
    error::RunResult,
    heap::{Heap, HeapData, HeapId},
};

/// Signature of a native function registered into the interpreter.
///
/// Natives receive the VM (for allocation and re-entrant evaluation) and
/// their argument slice. The arguments also remain on the VM's data stack
/// for the duration of the call, which keeps them reachable across any
/// collection the native triggers.
pub type NativeFn = fn(&mut crate::Vm, &[Value]) -> RunResult<Value>;

/// A fizz runtime value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// An interned string.
    Str(HeapId),
    /// An interned symbol; shares the string pool, distinguished by tag.
    Symbol(HeapId),
    List(HeapId),
    Struct(HeapId),
    /// A compiled function object.
    ByteCode(HeapId),
    /// A host-provided native function; identity is the function address.
    NativeFn(NativeFn),
}

impl Value {
    /// The arena slot behind this value, if it carries one.
    pub(crate) fn heap_id(self) -> Option<HeapId> {
        match self {
            Self::Str(id) | Self::Symbol(id) | Self::List(id) | Self::Struct(id) | Self::ByteCode(id) => Some(id),
            _ => None,
        }
    }

    /// The user-facing name of this value's variant.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::List(_) => "list",
            Self::Struct(_) => "struct",
            Self::ByteCode(_) => "function",
            Self::NativeFn(_) => "native-function",
        }
    }

    /// Returns the integer payload, if this is an int.
    #[must_use]
    pub fn as_int(self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(i),
            _ => None,
        }
    }

    /// Returns the float payload, if this is a float.
    #[must_use]
    pub fn as_float(self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(f),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this is a boolean.
    #[must_use]
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Whether this value can be called.
    #[must_use]
    pub fn is_callable(self) -> bool {
        matches!(self, Self::ByteCode(_) | Self::NativeFn(_))
    }

    /// Writes the printed representation, resolving references through the
    /// heap.
    pub(crate) fn write_display(self, heap: &Heap, out: &mut impl Write) -> fmt::Result {
        match self {
            Self::None => out.write_str("none"),
            Self::Bool(true) => out.write_str("true"),
            Self::Bool(false) => out.write_str("false"),
            Self::Int(i) => write!(out, "{i}"),
            Self::Float(f) => {
                let mut buffer = ryu::Buffer::new();
                out.write_str(buffer.format(f))
            }
            Self::Str(id) => write_quoted(heap.str_content(id), out),
            Self::Symbol(id) => write!(out, "'{}", heap.str_content(id)),
            Self::List(id) => {
                out.write_char('(')?;
                for (i, element) in heap.list(id).iter().enumerate() {
                    if i > 0 {
                        out.write_char(' ')?;
                    }
                    element.write_display(heap, out)?;
                }
                out.write_char(')')
            }
            Self::Struct(id) => {
                let HeapData::Struct(fields) = heap.get(id) else {
                    unreachable!("struct value refers to a non-struct slot")
                };
                out.write_str("(struct")?;
                for (key, value) in fields {
                    write!(out, " '{} ", heap.str_content(*key))?;
                    value.write_display(heap, out)?;
                }
                out.write_char(')')
            }
            Self::ByteCode(id) => write!(out, "<function {}>", heap.code(id).name()),
            Self::NativeFn(f) => write!(out, "<function native0x{:x}>", f as usize),
        }
    }

    /// Renders the printed representation to a fresh string.
    pub(crate) fn display_string(self, heap: &Heap) -> String {
        let mut out = String::new();
        self.write_display(heap, &mut out)
            .expect("writing to a String cannot fail");
        out
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl TryFrom<Value> for i64 {
    type Error = crate::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value
            .as_int()
            .ok_or_else(|| crate::Error::type_error(format!("expected an int, got {}", value.type_name())))
    }
}

impl TryFrom<Value> for f64 {
    type Error = crate::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value
            .as_float()
            .ok_or_else(|| crate::Error::type_error(format!("expected a float, got {}", value.type_name())))
    }
}

impl TryFrom<Value> for bool {
    type Error = crate::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value
            .as_bool()
            .ok_or_else(|| crate::Error::type_error(format!("expected a boolean, got {}", value.type_name())))
    }
}

/// Writes a string body surrounded by quotes with escapes re-encoded.
fn write_quoted(content: &str, out: &mut impl Write) -> fmt::Result {
    out.write_char('"')?;
    for c in content.chars() {
        match c {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\t' => out.write_str("\\t")?,
            '\r' => out.write_str("\\r")?,
            _ => out.write_char(c)?,
        }
    }
    out.write_char('"')
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_primitive_display() {
        let heap = Heap::new();
        assert_eq!(Value::None.display_string(&heap), "none");
        assert_eq!(Value::Bool(true).display_string(&heap), "true");
        assert_eq!(Value::Int(-42).display_string(&heap), "-42");
        assert_eq!(Value::Float(0.5).display_string(&heap), "0.5");
        assert_eq!(Value::Float(10.0).display_string(&heap), "10.0");
    }

    #[test]
    fn test_string_display_is_quoted_and_escaped() {
        let mut heap = Heap::new();
        let id = heap.alloc_str("a\"b\\c\n").unwrap();
        assert_eq!(Value::Str(id).display_string(&heap), r#""a\"b\\c\n""#);
    }

    #[test]
    fn test_symbol_display() {
        let mut heap = Heap::new();
        let id = heap.alloc_str("name").unwrap();
        assert_eq!(Value::Symbol(id).display_string(&heap), "'name");
    }

    #[test]
    fn test_list_display() {
        let mut heap = Heap::new();
        let id = heap
            .alloc_list_from_slice(&[Value::Int(1), Value::Bool(false), Value::None])
            .unwrap();
        assert_eq!(Value::List(id).display_string(&heap), "(1 false none)");
    }

    #[test]
    fn test_struct_display_preserves_insertion_order() {
        let mut heap = Heap::new();
        let id_key = heap.alloc_str("id").unwrap();
        let text_key = heap.alloc_str("text").unwrap();
        let record = heap.alloc_struct().unwrap();
        let HeapData::Struct(fields) = heap.get_mut(record) else {
            panic!("expected struct");
        };
        fields.insert(id_key, Value::Int(7));
        fields.insert(text_key, Value::Bool(true));
        assert_eq!(Value::Struct(record).display_string(&heap), "(struct 'id 7 'text true)");
    }

    #[test]
    fn test_host_conversions() {
        assert_eq!(Value::from(7_i64), Value::Int(7));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(0.5), Value::Float(0.5));
        assert_eq!(i64::try_from(Value::Int(7)).unwrap(), 7);
        assert_eq!(f64::try_from(Value::Float(0.5)).unwrap(), 0.5);
        assert!(!bool::try_from(Value::Bool(false)).unwrap());
        assert!(i64::try_from(Value::None).is_err());
    }

    #[test]
    fn test_interned_strings_compare_equal_by_handle() {
        let mut heap = Heap::new();
        let a = heap.alloc_str("same").unwrap();
        let b = heap.alloc_str("same").unwrap();
        assert_eq!(Value::Str(a), Value::Str(b));
        assert_ne!(Value::Str(a), Value::Symbol(a));
    }
}
