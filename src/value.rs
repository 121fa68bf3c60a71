use std::fmt::{self, Write};

use crate::writer::{FormatContext, FormatWriter};

/// A bound scalar, positioned by render order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// String coercion used by the `*_strings` projections.
    ///
    /// `Null` coerces to `None`, bytes are decoded lossily.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(value) => Some(value.to_string()),
            Value::Int(value) => Some(value.to_string()),
            Value::UInt(value) => Some(value.to_string()),
            Value::Float(value) => Some(value.to_string()),
            Value::Text(value) => Some(value.clone()),
            Value::Bytes(value) => Some(String::from_utf8_lossy(value).into_owned()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            Value::UInt(value) => i64::try_from(*value).ok(),
            Value::Bool(value) => Some(i64::from(*value)),
            Value::Text(value) => value.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Writes the value as an inline SQL literal. Only DDL defaults use this path,
    /// everything else goes through placeholders.
    pub fn write_literal<W: Write>(&self, writer: &mut W) -> fmt::Result {
        match self {
            Value::Null => writer.write_str("null"),
            Value::Bool(true) => writer.write_char('1'),
            Value::Bool(false) => writer.write_char('0'),
            Value::Int(value) => write!(writer, "{value}"),
            Value::UInt(value) => write!(writer, "{value}"),
            Value::Float(value) => write!(writer, "{value}"),
            Value::Text(value) => {
                writer.write_char('\'')?;
                for char in value.chars() {
                    if char == '\'' {
                        writer.write_char('\'')?;
                    }
                    writer.write_char(char)?;
                }
                writer.write_char('\'')
            }
            Value::Bytes(bytes) => {
                writer.write_str("X'")?;
                for byte in bytes {
                    write!(writer, "{byte:02X}")?;
                }
                writer.write_char('\'')
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("null"),
        }
    }
}

impl FormatWriter for Value {
    fn format_writer<W: Write>(&self, context: &mut FormatContext<'_, W>) -> fmt::Result {
        context.write_value(self)
    }
}

pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for &Value {
    fn into_value(self) -> Value {
        self.clone()
    }
}

impl<T> IntoValue for Option<T>
where
    T: IntoValue,
{
    fn into_value(self) -> Value {
        if let Some(value) = self {
            value.into_value()
        } else {
            Value::Null
        }
    }
}

macro_rules! into_value {
    ($variant:ident as $target:ty => $($ty:ty),+ $(,)?) => {
        $(
            impl IntoValue for $ty {
                #[inline]
                fn into_value(self) -> Value {
                    Value::$variant(<$target>::from(self))
                }
            }

            impl From<$ty> for Value {
                #[inline]
                fn from(value: $ty) -> Self {
                    value.into_value()
                }
            }
        )+
    };
}

into_value!(Int as i64 => i8, i16, i32, i64);
into_value!(UInt as u64 => u8, u16, u32, u64);
into_value!(Float as f64 => f32, f64);
into_value!(Bool as bool => bool);
into_value!(Text as String => String, &str, &String, smol_str::SmolStr);
into_value!(Bytes as Vec<u8> => Vec<u8>, &[u8]);

impl IntoValue for usize {
    fn into_value(self) -> Value {
        Value::UInt(self as u64)
    }
}

#[cfg(feature = "chrono")]
impl IntoValue for chrono::NaiveDateTime {
    fn into_value(self) -> Value {
        Value::Text(self.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

#[cfg(feature = "chrono")]
impl IntoValue for chrono::NaiveDate {
    fn into_value(self) -> Value {
        Value::Text(self.format("%Y-%m-%d").to_string())
    }
}

#[cfg(feature = "chrono")]
impl<Tz: chrono::TimeZone> IntoValue for chrono::DateTime<Tz> {
    fn into_value(self) -> Value {
        self.naive_utc().into_value()
    }
}

#[cfg(feature = "uuid")]
impl IntoValue for uuid::Uuid {
    fn into_value(self) -> Value {
        Value::Text(self.hyphenated().to_string())
    }
}

#[cfg(feature = "json")]
impl TryFrom<serde_json::Value> for Value {
    type Error = serde_json::Value;

    /// Scalars convert, arrays and objects are handed back.
    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(value) => Ok(Value::Bool(value)),
            serde_json::Value::Number(number) => {
                if let Some(value) = number.as_i64() {
                    Ok(Value::Int(value))
                } else if let Some(value) = number.as_u64() {
                    Ok(Value::UInt(value))
                } else {
                    Ok(Value::Float(number.as_f64().unwrap_or(f64::NAN)))
                }
            }
            serde_json::Value::String(value) => Ok(Value::Text(value)),
            other => Err(other),
        }
    }
}
