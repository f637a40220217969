//! Parsing garment attributes out of free-text model responses.
//!
//! Models are told to answer with bare JSON, but many wrap the object in
//! Markdown code fences anyway. The parser strips fences before handing
//! the payload to serde.

use crate::attributes::GarmentAttributes;

/// Strip Markdown code fences (with or without a language tag) from a
/// response, returning the inner payload.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line ("json", "JSON", or empty)
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse a model response into garment attributes, stamping the record with
/// the garment id.
pub fn parse_attribute_response(
    text: &str,
    id: &str,
) -> Result<GarmentAttributes, serde_json::Error> {
    let payload = strip_code_fences(text);
    let mut attrs: GarmentAttributes = serde_json::from_str(payload)?;
    attrs.id = id.to_string();
    Ok(attrs)
}
