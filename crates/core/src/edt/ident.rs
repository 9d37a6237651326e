//! C identifier helpers for devicetree paths.

/// Converts a devicetree name into a lower-case C token fragment.
///
/// Lower-cases the input and maps `-`, `,`, `.`, `@`, `/` and `+` to `_`.
pub fn str2ident(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '-' | ',' | '.' | '@' | '/' | '+' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Builds the path identifier used in devicetree macro names.
///
/// `/` becomes `N`; `/soc/uart@1000` becomes `N_S_soc_S_uart_1000`.
pub fn z_path_id(path: &str) -> String {
    let mut id = String::from("N");
    for component in path.split('/').filter(|c| !c.is_empty()) {
        id.push_str("_S_");
        id.push_str(&str2ident(component));
    }
    id
}

/// Returns true for a non-empty string made only of `[0-9a-zA-Z_]`.
pub fn is_c_identifier(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
