//! # Conversion Module
//!
//! Query parameters, path variables and headers arrive as strings. Before a
//! handler sees them they pass through a [`ConversionService`], which turns a
//! string into a [`crate::value::Value`] of the declared element type.
//!
//! [`Conversions`] is the stock service. It covers `String`, `bool`, `char`,
//! every integer width and both float widths; applications add their own
//! [`Converter`]s with [`Conversions::register`].
//!
//! A declared type with no converter is a configuration error caught while
//! handler classes are registered, never at request time.

mod core;

pub use core::{ConversionError, ConversionService, Conversions, Converter, FnConverter};
