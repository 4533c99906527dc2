//! Style directive decoding and `rust_xlsxwriter` format derivation.
//!
//! Directives arrive doubly JSON-encoded with `"` standing in for quotes:
//! the cleaned text decodes to a JSON string, which decodes to the directive.

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, FormatPattern, FormatUnderline};
use serde_json::Value;

use crate::spec::{SpecCellFormat, SpecStyleDirective, StyleDirectiveError};

////////////////////////////////////////////////////////////////////////////////
// #region DirectiveCodec

/// Decode one serialized style directive.
pub fn decode_style_directive(raw: &str) -> Result<SpecStyleDirective, StyleDirectiveError> {
    if raw.trim().is_empty() {
        return Err(StyleDirectiveError::Empty);
    }

    let c_cleaned = raw.replace("\\u0022", "\"").replace("\\\\", "\\");
    match serde_json::from_str::<Value>(&c_cleaned)? {
        Value::String(c_inner) => Ok(serde_json::from_str(&c_inner)?),
        other => Err(StyleDirectiveError::NotEncodedString(other.to_string())),
    }
}

/// Encode a directive in the upstream wire form accepted by [`decode_style_directive`].
pub fn encode_style_directive(directive: &SpecStyleDirective) -> Result<String, serde_json::Error> {
    let c_inner = serde_json::to_string(directive)?;
    Ok(serde_json::to_string(&c_inner)?.replace("\\\"", "\\\\u0022"))
}

/// Non-empty cell comment carried by the directive.
pub fn derive_comment(directive: &SpecStyleDirective) -> Option<&str> {
    directive
        .font
        .comment
        .as_deref()
        .filter(|comment| !comment.is_empty())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FormatDerivation

/// Normalize `#RRGGBB`, `RRGGBB`, or `AARRGGBB` to bare uppercase `RRGGBB`.
pub fn derive_rgb_hex(argb: &str) -> Result<String, StyleDirectiveError> {
    let c_trimmed = argb.trim();
    let c_hex = c_trimmed.strip_prefix('#').unwrap_or(c_trimmed);
    if !c_hex.chars().all(|chr| chr.is_ascii_hexdigit()) {
        return Err(StyleDirectiveError::InvalidColor(argb.to_string()));
    }
    match c_hex.len() {
        6 => Ok(c_hex.to_ascii_uppercase()),
        8 => Ok(c_hex[2..].to_ascii_uppercase()),
        _ => Err(StyleDirectiveError::InvalidColor(argb.to_string())),
    }
}

/// Parse an upstream color string into an engine color.
pub fn derive_color(argb: &str) -> Result<Color, StyleDirectiveError> {
    let c_hex = derive_rgb_hex(argb)?;
    derive_color_from_hex(&c_hex).ok_or_else(|| StyleDirectiveError::InvalidColor(argb.to_string()))
}

/// Engine format for a header cell styled by `directive`.
pub fn derive_header_format(directive: &SpecStyleDirective) -> Result<Format, StyleDirectiveError> {
    Ok(derive_rust_xlsx_format(
        &derive_cell_format_from_style_directive(directive)?,
    ))
}

/// Convert a decoded directive into a header cell format.
///
/// Fill color is required; every other field is optional.
pub fn derive_cell_format_from_style_directive(
    directive: &SpecStyleDirective,
) -> Result<SpecCellFormat, StyleDirectiveError> {
    let font = &directive.font;

    let font_color = match &font.color {
        Some(color) => Some(derive_rgb_hex(&color.argb)?),
        None => None,
    };

    Ok(SpecCellFormat {
        font_name: font.name.clone(),
        font_size: font.size,
        bold: font.bold,
        italic: font.italic,
        underline: font.underline,
        align: font
            .alignment
            .as_ref()
            .and_then(|alignment| alignment.horizontal.clone()),
        border: font.border,
        bg_color: Some(derive_rgb_hex(&font.fill.fg_color.argb)?),
        font_color,
    })
}

/// Build a `rust_xlsxwriter` format from a cell format.
pub fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }
    if spec.underline.unwrap_or(false) {
        format = format.set_underline(FormatUnderline::Single);
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(color) = spec.bg_color.as_deref().and_then(derive_color_from_hex) {
        format = format
            .set_pattern(FormatPattern::Solid)
            .set_background_color(color);
    }
    if let Some(color) = spec.font_color.as_deref().and_then(derive_color_from_hex) {
        format = format.set_font_color(color);
    }

    if spec.border.unwrap_or(false) {
        format = format.set_border(FormatBorder::Thin);
    }

    format
}

fn derive_color_from_hex(rgb_hex: &str) -> Option<Color> {
    u32::from_str_radix(rgb_hex, 16).ok().map(Color::RGB)
}

/// Horizontal alignment by upstream name; unknown names are ignored.
pub fn derive_format_align(align: &str) -> Option<FormatAlign> {
    match align.trim() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "centerContinuous" | "center_across" => Some(FormatAlign::CenterAcross),
        "distributed" => Some(FormatAlign::Distributed),
        _ => None,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
