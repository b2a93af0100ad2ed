//! Identifier conversion from CDDL names to C++.

/// C++ keywords that cannot be used as identifiers.
const CPP_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "asm", "auto", "bool", "break", "case", "catch", "char",
    "class", "const", "constexpr", "continue", "default", "delete", "do", "double", "else",
    "enum", "explicit", "export", "extern", "false", "float", "for", "friend", "goto", "if",
    "inline", "int", "long", "mutable", "namespace", "new", "noexcept", "not", "nullptr",
    "operator", "or", "private", "protected", "public", "register", "return", "short",
    "signed", "sizeof", "static", "struct", "switch", "template", "this", "throw", "true",
    "try", "typedef", "typename", "union", "unsigned", "using", "virtual", "void", "volatile",
    "while", "xor",
];

fn is_separator(c: char) -> bool {
    matches!(c, '-' | '_' | '.' | '$' | '@')
}

/// Converts a CDDL name (usually kebab-case) to PascalCase.
#[must_use]
pub fn to_pascal_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = true;

    for c in s.chars() {
        if is_separator(c) {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    if result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    result
}

/// Converts a CDDL name to snake_case.
///
/// Separators become underscores and camelCase humps are split. Names that
/// collide with C++ keywords get a trailing underscore.
#[must_use]
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;

    for c in s.chars() {
        if is_separator(c) {
            if !result.ends_with('_') {
                result.push('_');
            }
            prev_lower = false;
        } else if c.is_ascii_uppercase() {
            if prev_lower {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else {
            result.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }

    if result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    if CPP_KEYWORDS.contains(&result.as_str()) {
        result.push('_');
    }
    result
}

/// Returns the enumerator name for an enum member (`kPascalCase`).
#[must_use]
pub fn enumerator_name(s: &str) -> String {
    format!("k{}", to_pascal_case(s).trim_start_matches('_'))
}

/// Derives an include guard from a header path.
#[must_use]
pub fn include_guard(path: &str) -> String {
    let mut guard: String = path
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    guard.push('_');
    if guard.starts_with(|c: char| c.is_ascii_digit()) {
        guard.insert(0, '_');
    }
    guard
}

/// Returns true if `s` is a valid C++ identifier that is not a keyword.
#[must_use]
pub fn is_cpp_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    valid_start
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !CPP_KEYWORDS.contains(&s)
}

/// Returns true if `s` is a namespace name, possibly nested with `::`.
#[must_use]
pub fn is_cpp_namespace(s: &str) -> bool {
    !s.is_empty() && s.split("::").all(is_cpp_identifier)
}
