use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::value::{TypeKey, Value};

/// Unsigned decimal: no sign, exponent or special values.
static UNSIGNED_DECIMAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]*\.?[0-9]+$").expect("unsigned decimal regex should be valid")
});

/// Why a string could not be converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// No converter is registered for the target type.
    NoConverter { type_name: &'static str },
    /// The input is not a valid representation of the target type.
    Invalid {
        type_name: &'static str,
        input: String,
        reason: String,
    },
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::NoConverter { type_name } => {
                write!(f, "no converter registered for {type_name}")
            }
            ConversionError::Invalid {
                type_name,
                input,
                reason,
            } => write!(f, "cannot convert '{input}' to {type_name}: {reason}"),
        }
    }
}

impl std::error::Error for ConversionError {}

/// String → value conversion, keyed by target type.
pub trait ConversionService: Send + Sync {
    /// Whether `target` can be converted to. Consulted at registration.
    fn supports(&self, target: &TypeKey) -> bool;

    /// Convert one string.
    ///
    /// # Errors
    ///
    /// [`ConversionError::NoConverter`] or [`ConversionError::Invalid`].
    fn convert(&self, target: &TypeKey, input: &str) -> Result<Value, ConversionError>;
}

/// Converts strings into one target type.
pub trait Converter: Send + Sync {
    fn target(&self) -> TypeKey;

    /// # Errors
    ///
    /// A human readable reason when `input` is not valid.
    fn convert(&self, input: &str) -> Result<Value, String>;
}

/// A [`Converter`] backed by a function.
pub struct FnConverter<T> {
    func: fn(&str) -> Result<T, String>,
}

impl<T> FnConverter<T> {
    #[must_use]
    pub fn new(func: fn(&str) -> Result<T, String>) -> Self {
        Self { func }
    }
}

impl<T: Any + Send + Sync> Converter for FnConverter<T> {
    fn target(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn convert(&self, input: &str) -> Result<Value, String> {
        (self.func)(input).map(Value::new)
    }
}

fn parse_trimmed<T>(input: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    input.trim().parse::<T>().map_err(|e| e.to_string())
}

/// `true`, `on`, `y`, `yes` (any case) and non-zero unsigned decimals are
/// true; anything else is false.
fn lenient_bool(input: &str) -> Result<bool, String> {
    let s = input.trim();
    if ["true", "on", "y", "yes"]
        .iter()
        .any(|t| s.eq_ignore_ascii_case(t))
    {
        return Ok(true);
    }
    if !UNSIGNED_DECIMAL.is_match(s) {
        return Ok(false);
    }
    Ok(s.parse::<f64>().map(|n| n != 0.0).unwrap_or(false))
}

fn single_char(input: &str) -> Result<char, String> {
    let mut chars = input.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err("expected exactly one character".to_string()),
    }
}

/// The stock [`ConversionService`].
#[derive(Clone)]
pub struct Conversions {
    converters: HashMap<TypeId, Arc<dyn Converter>>,
}

impl Conversions {
    /// An empty service with no converters at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Add or replace the converter for its target type.
    pub fn register<C: Converter + 'static>(&mut self, converter: C) -> &mut Self {
        self.converters
            .insert(converter.target().id(), Arc::new(converter));
        self
    }

    /// Register a plain function as the converter for `T`.
    pub fn register_fn<T: Any + Send + Sync>(
        &mut self,
        func: fn(&str) -> Result<T, String>,
    ) -> &mut Self {
        self.register(FnConverter::new(func))
    }

    fn with_defaults(mut self) -> Self {
        self.register_fn::<String>(|s| Ok(s.to_string()))
            .register_fn::<bool>(lenient_bool)
            .register_fn::<char>(single_char)
            .register_fn::<i8>(parse_trimmed)
            .register_fn::<i16>(parse_trimmed)
            .register_fn::<i32>(parse_trimmed)
            .register_fn::<i64>(parse_trimmed)
            .register_fn::<i128>(parse_trimmed)
            .register_fn::<isize>(parse_trimmed)
            .register_fn::<u8>(parse_trimmed)
            .register_fn::<u16>(parse_trimmed)
            .register_fn::<u32>(parse_trimmed)
            .register_fn::<u64>(parse_trimmed)
            .register_fn::<u128>(parse_trimmed)
            .register_fn::<usize>(parse_trimmed)
            .register_fn::<f32>(parse_trimmed)
            .register_fn::<f64>(parse_trimmed);
        self
    }
}

impl Default for Conversions {
    fn default() -> Self {
        Self::empty().with_defaults()
    }
}

impl ConversionService for Conversions {
    fn supports(&self, target: &TypeKey) -> bool {
        self.converters.contains_key(&target.id())
    }

    fn convert(&self, target: &TypeKey, input: &str) -> Result<Value, ConversionError> {
        let converter =
            self.converters
                .get(&target.id())
                .ok_or(ConversionError::NoConverter {
                    type_name: target.name(),
                })?;
        converter
            .convert(input)
            .map_err(|reason| ConversionError::Invalid {
                type_name: target.name(),
                input: input.to_string(),
                reason,
            })
    }
}

impl fmt::Debug for Conversions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.converters.values().map(|c| c.target().name()).collect();
        names.sort_unstable();
        f.debug_struct("Conversions").field("targets", &names).finish()
    }
}
