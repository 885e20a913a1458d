//! Output file names from the name template.

use crate::types::Colour;

pub const TOKEN_INPUT: &str = "%INPUTFILENAME%";
pub const TOKEN_COLOUR: &str = "%COLOR%";
pub const TOKEN_INDEX: &str = "%INDEX%";

/// Substitute the template tokens: source base name, hex colour without
/// `#`, and 1-based layer index.
pub fn expand_template(template: &str, input: &str, colour: Colour, index: usize) -> String {
    template
        .replace(TOKEN_INPUT, input)
        .replace(TOKEN_COLOUR, &colour.hex_digits())
        .replace(TOKEN_INDEX, &index.to_string())
}

/// SVG file name; `.svg` is added unless already present.
pub fn svg_name(template: &str, input: &str, colour: Colour, index: usize) -> String {
    let name = expand_template(template, input, colour, index);
    if name.to_lowercase().ends_with(".svg") {
        name
    } else {
        format!("{}.svg", name)
    }
}

/// STL file name; stencil solids get a `_stencil` suffix.
pub fn stl_name(template: &str, input: &str, colour: Colour, index: usize, stencil: bool) -> String {
    let name = expand_template(template, input, colour, index);
    let stem = name.strip_suffix(".stl").unwrap_or(&name);
    if stencil {
        format!("{}_stencil.stl", stem)
    } else {
        format!("{}.stl", stem)
    }
}
