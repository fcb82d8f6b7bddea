//! Style descriptors and the converters that parse them.
//!
//! A language definition names a style by property and gives its value as
//! a short text descriptor:
//!
//! | property     | descriptor                                    |
//! |--------------|-----------------------------------------------|
//! | `Foreground` | `solid(R,G,B)`, `solid(R,G,B,A)`              |
//! |              | `lingrad((R,G,B),(R,G,B))`                    |
//! | `FontWeight` | a weight name, `Thin` through `UltraBlack`    |
//!
//! Converters are looked up by property name in [`StyleConverters`], so a
//! host can register more properties without touching the loader.

use std::collections::HashMap;

use synergy_buffer::{Brush, Color, FontWeight, StyleProperty};

use crate::{SyntaxError, SyntaxResult};

/// Turns a descriptor into a style property.
pub type ConvertFn = fn(&str) -> SyntaxResult<StyleProperty>;

/// Property-name-keyed converter registry.
#[derive(Debug, Clone)]
pub struct StyleConverters {
    converters: HashMap<String, ConvertFn>,
}

impl StyleConverters {
    /// Creates a registry with the built-in `Foreground` and `FontWeight`
    /// converters (plus their `…Property` aliases).
    pub fn new() -> Self {
        let mut converters = Self {
            converters: HashMap::new(),
        };
        converters.register("Foreground", convert_foreground);
        converters.register("ForegroundProperty", convert_foreground);
        converters.register("FontWeight", convert_font_weight);
        converters.register("FontWeightProperty", convert_font_weight);
        converters
    }

    /// Registers (or replaces) the converter for a property name.
    pub fn register(&mut self, property_name: impl Into<String>, convert: ConvertFn) {
        self.converters.insert(property_name.into(), convert);
    }

    /// Parses a descriptor for the named property.
    pub fn convert(&self, property_name: &str, descriptor: &str) -> SyntaxResult<StyleProperty> {
        let convert = self.converters.get(property_name).ok_or_else(|| {
            SyntaxError::Validation(format!("Unknown style property: {property_name}"))
        })?;
        convert(descriptor)
    }
}

impl Default for StyleConverters {
    fn default() -> Self {
        Self::new()
    }
}

fn convert_foreground(descriptor: &str) -> SyntaxResult<StyleProperty> {
    parse_brush(descriptor).map(StyleProperty::Foreground)
}

fn convert_font_weight(descriptor: &str) -> SyntaxResult<StyleProperty> {
    parse_font_weight(descriptor).map(StyleProperty::FontWeight)
}

/// Parses `solid(R,G,B[,A])` or `lingrad((R,G,B),(R,G,B))`.
pub fn parse_brush(descriptor: &str) -> SyntaxResult<Brush> {
    let descriptor = descriptor.trim();
    let malformed = || SyntaxError::Validation(format!("Malformed color descriptor: {descriptor}"));

    if let Some(args) = call_args(descriptor, "solid") {
        let color = match parse_channels(args).ok_or_else(malformed)?[..] {
            [r, g, b] => Color::rgb(r, g, b),
            [r, g, b, a] => Color::rgba(r, g, b, a),
            _ => return Err(malformed()),
        };
        return Ok(Brush::Solid(color));
    }

    if let Some(args) = call_args(descriptor, "lingrad") {
        let (from, to) = split_tuples(args).ok_or_else(malformed)?;
        let from = parse_rgb(from).ok_or_else(malformed)?;
        let to = parse_rgb(to).ok_or_else(malformed)?;
        return Ok(Brush::gradient(from, to));
    }

    Err(malformed())
}

/// Parses a named weight, ignoring ASCII case.
pub fn parse_font_weight(descriptor: &str) -> SyntaxResult<FontWeight> {
    let weight = match descriptor.trim().to_ascii_lowercase().as_str() {
        "thin" => FontWeight::THIN,
        "extralight" | "ultralight" => FontWeight::EXTRA_LIGHT,
        "light" => FontWeight::LIGHT,
        "normal" | "regular" => FontWeight::NORMAL,
        "medium" => FontWeight::MEDIUM,
        "demibold" | "semibold" => FontWeight::SEMI_BOLD,
        "bold" => FontWeight::BOLD,
        "extrabold" | "ultrabold" => FontWeight::EXTRA_BOLD,
        "black" | "heavy" => FontWeight::BLACK,
        "extrablack" | "ultrablack" => FontWeight::EXTRA_BLACK,
        _ => {
            return Err(SyntaxError::Validation(format!(
                "Unknown font weight: {descriptor}"
            )));
        }
    };
    Ok(weight)
}

/// `name(args)` -> `args`, with the name matched case-insensitively.
fn call_args<'a>(descriptor: &'a str, name: &str) -> Option<&'a str> {
    let head = descriptor.get(..name.len())?;
    if !head.eq_ignore_ascii_case(name) {
        return None;
    }
    descriptor[name.len()..]
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

/// `(a,b,c),(d,e,f)` -> (`a,b,c`, `d,e,f`)
fn split_tuples(args: &str) -> Option<(&str, &str)> {
    let (first, rest) = args.trim().strip_prefix('(')?.split_once(')')?;
    let second = rest
        .trim_start()
        .strip_prefix(',')?
        .trim()
        .strip_prefix('(')?
        .strip_suffix(')')?;
    Some((first, second))
}

fn parse_channels(args: &str) -> Option<Vec<u8>> {
    args.split(',')
        .map(|channel| channel.trim().parse::<u8>().ok())
        .collect()
}

fn parse_rgb(args: &str) -> Option<Color> {
    match parse_channels(args)?[..] {
        [r, g, b] => Some(Color::rgb(r, g, b)),
        _ => None,
    }
}
