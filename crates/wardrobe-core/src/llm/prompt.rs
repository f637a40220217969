//! The attribute-extraction prompt.
//!
//! Generated from the categorical tables so the allowed vocabulary in the
//! prompt can never drift from what the dataset encoder accepts. A custom
//! prompt file can replace it via the CLI.

use crate::attributes::tables;

/// Build the default extraction prompt from the categorical tables.
pub fn default_prompt() -> String {
    let mut prompt = String::from(
        "You are labeling a single garment photographed on a white background.\n\
         Respond with exactly one JSON object and nothing else — no prose,\n\
         no Markdown fences. The object must have these keys, each chosen\n\
         from its allowed values:\n\n",
    );

    for table in tables::ALL_TABLES {
        prompt.push_str(&format!(
            "  \"{}\": one of [{}]\n",
            table.column,
            table
                .values()
                .iter()
                .map(|v| format!("\"{v}\""))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    prompt.push_str(
        "\nUse \"none\" for color2 when the garment has a single color and\n\
         \"unknown\" for material when it cannot be determined from the photo.",
    );
    prompt
}

/// Load a prompt from a file, falling back to the generated default.
pub fn load_prompt(path: Option<&std::path::Path>) -> std::io::Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p),
        None => Ok(default_prompt()),
    }
}
