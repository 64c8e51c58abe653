//! Word-stream reader and writer driven by [`FieldSpec`] layouts.

use game_core::{Address, Direction, HexCoord};

use super::DecodeError;
use super::schema::FieldSpec;
use crate::word::Word;

/// A decoded field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Felt(Word),
    Address(Address),
    U8(u8),
    U32(u32),
    U64(u64),
    Bool(bool),
    Signed(i64),
    Direction(Direction),
    Vec2(HexCoord),
    Option(Option<Box<FieldValue>>),
}

/// Forward-only reader over a slice of words.
pub struct WordCursor<'a> {
    words: &'a [Word],
    pos: usize,
}

impl<'a> WordCursor<'a> {
    pub fn new(words: &'a [Word]) -> Self {
        Self { words, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.words.len().saturating_sub(self.pos)
    }

    pub fn next_word(&mut self) -> Result<Word, DecodeError> {
        let word = self
            .words
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::Truncated { at: self.pos })?;
        self.pos += 1;
        Ok(word)
    }

    /// Reads a length prefix.
    pub fn next_len(&mut self) -> Result<usize, DecodeError> {
        let word = self.next_word()?;
        word.to_u32()
            .map(|n| n as usize)
            .ok_or(DecodeError::OutOfRange { what: "length", word })
    }

    /// Splits off the next `len` words as their own cursor.
    pub fn take(&mut self, len: usize) -> Result<WordCursor<'a>, DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.words.len())
            .ok_or(DecodeError::Truncated {
                at: self.words.len(),
            })?;
        let sub = WordCursor::new(&self.words[self.pos..end]);
        self.pos = end;
        Ok(sub)
    }

    pub fn read(&mut self, field: &FieldSpec) -> Result<FieldValue, DecodeError> {
        match field {
            FieldSpec::Felt => Ok(FieldValue::Felt(self.next_word()?)),
            FieldSpec::Address => Ok(FieldValue::Address(self.next_word()?.into())),
            FieldSpec::U8 => {
                let word = self.next_word()?;
                word.to_u8()
                    .map(FieldValue::U8)
                    .ok_or(DecodeError::OutOfRange { what: "u8", word })
            }
            FieldSpec::U32 => {
                let word = self.next_word()?;
                word.to_u32()
                    .map(FieldValue::U32)
                    .ok_or(DecodeError::OutOfRange { what: "u32", word })
            }
            FieldSpec::U64 => {
                let word = self.next_word()?;
                word.to_u64()
                    .map(FieldValue::U64)
                    .ok_or(DecodeError::OutOfRange { what: "u64", word })
            }
            FieldSpec::Bool => {
                let word = self.next_word()?;
                word.to_bool()
                    .map(FieldValue::Bool)
                    .ok_or(DecodeError::OutOfRange { what: "bool", word })
            }
            FieldSpec::Signed { bits } => {
                let word = self.next_word()?;
                word.to_signed(*bits)
                    .map(FieldValue::Signed)
                    .ok_or(DecodeError::OutOfRange {
                        what: "signed",
                        word,
                    })
            }
            FieldSpec::Direction => {
                let word = self.next_word()?;
                word.to_u64()
                    .and_then(|index| Direction::try_from(index).ok())
                    .map(FieldValue::Direction)
                    .ok_or(DecodeError::OutOfRange {
                        what: "direction",
                        word,
                    })
            }
            FieldSpec::Vec2 => {
                let q = self.read_i32()?;
                let r = self.read_i32()?;
                Ok(FieldValue::Vec2(HexCoord::new(q, r)))
            }
            FieldSpec::Option(inner) => {
                let word = self.next_word()?;
                match word.to_u64() {
                    Some(0) => {
                        let value = self.read(inner)?;
                        Ok(FieldValue::Option(Some(Box::new(value))))
                    }
                    Some(1) => Ok(FieldValue::Option(None)),
                    _ => Err(DecodeError::InvalidDiscriminant(word)),
                }
            }
        }
    }

    pub fn read_layout(&mut self, layout: &[FieldSpec]) -> Result<Vec<FieldValue>, DecodeError> {
        layout.iter().map(|field| self.read(field)).collect()
    }

    fn read_i32(&mut self) -> Result<i32, DecodeError> {
        let word = self.next_word()?;
        word.to_signed(32)
            .and_then(|v| i32::try_from(v).ok())
            .ok_or(DecodeError::OutOfRange { what: "i32", word })
    }
}

/// Typed, in-order access to decoded values.
pub struct Values {
    inner: std::vec::IntoIter<FieldValue>,
}

macro_rules! typed_getter {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&mut self) -> Result<$ty, DecodeError> {
            match self.inner.next() {
                Some(FieldValue::$variant(value)) => Ok(value),
                _ => Err(DecodeError::LayoutMismatch(stringify!($variant))),
            }
        }
    };
}

impl Values {
    pub fn new(values: Vec<FieldValue>) -> Self {
        Self {
            inner: values.into_iter(),
        }
    }

    typed_getter!(felt, Felt, Word);
    typed_getter!(address, Address, Address);
    typed_getter!(u8, U8, u8);
    typed_getter!(u32, U32, u32);
    typed_getter!(boolean, Bool, bool);
    typed_getter!(direction, Direction, Direction);
    typed_getter!(hex, Vec2, HexCoord);

    pub fn optional(&mut self) -> Result<Option<FieldValue>, DecodeError> {
        match self.inner.next() {
            Some(FieldValue::Option(value)) => Ok(value.map(|boxed| *boxed)),
            _ => Err(DecodeError::LayoutMismatch("Option")),
        }
    }
}

/// Appends the wire form of `value` to `out`.
pub fn write_value(out: &mut Vec<Word>, value: &FieldValue) {
    match value {
        FieldValue::Felt(word) => out.push(*word),
        FieldValue::Address(address) => out.push(Word::from(*address)),
        FieldValue::U8(v) => out.push(Word::from(*v)),
        FieldValue::U32(v) => out.push(Word::from(*v)),
        FieldValue::U64(v) => out.push(Word::from(*v)),
        FieldValue::Bool(v) => out.push(Word::from_bool(*v)),
        FieldValue::Signed(v) => out.push(Word::from_i64(*v)),
        FieldValue::Direction(direction) => out.push(Word::from(direction.index())),
        FieldValue::Vec2(hex) => {
            out.push(Word::from_i64(i64::from(hex.q)));
            out.push(Word::from_i64(i64::from(hex.r)));
        }
        FieldValue::Option(Some(inner)) => {
            out.push(Word::ZERO);
            write_value(out, inner);
        }
        FieldValue::Option(None) => out.push(Word::ONE),
    }
}
