//! GLSL Identifier Scanner
//!
//! A small lexer that walks identifiers in GLSL text while skipping numeric
//! literals and comments. It answers the questions the merger asks about an
//! effect's source (which functions, varyings and macros it declares) and
//! rewrites identifiers without touching member accesses such as `.rgb`.

use rustc_hash::FxHashMap;

/// Words that look like a function name in `if (x) {` style statements.
const CONTROL_KEYWORDS: [&str; 5] = ["if", "for", "while", "switch", "return"];

const PRECISION_QUALIFIERS: [&str; 3] = ["lowp", "mediump", "highp"];

/// An identifier occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub start: usize,
    /// Immediately preceded by `.` (struct field or swizzle).
    pub member: bool,
}

impl Token<'_> {
    #[inline]
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// A function definition found in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSignature<'a> {
    pub return_type: &'a str,
    pub name: &'a str,
    /// Raw text between the parentheses.
    pub params: &'a str,
}

/// Iterator over the identifiers of a GLSL string.
pub struct Identifiers<'a> {
    src: &'a str,
    pos: usize,
}

#[inline]
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

#[inline]
fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl<'a> Iterator for Identifiers<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let bytes = self.src.as_bytes();

        while self.pos < bytes.len() {
            let b = bytes[self.pos];
            let next = bytes.get(self.pos + 1).copied();

            if is_ident_start(b) {
                let start = self.pos;
                self.pos += 1;
                while self.pos < bytes.len() && is_ident_continue(bytes[self.pos]) {
                    self.pos += 1;
                }
                return Some(Token {
                    text: &self.src[start..self.pos],
                    start,
                    member: start > 0 && bytes[start - 1] == b'.',
                });
            }

            if b.is_ascii_digit() || (b == b'.' && next.is_some_and(|n| n.is_ascii_digit())) {
                // 1.0, 1e5, 0x1F, 2u
                self.pos += 1;
                while self.pos < bytes.len()
                    && (is_ident_continue(bytes[self.pos]) || bytes[self.pos] == b'.')
                {
                    self.pos += 1;
                }
                continue;
            }

            match (b, next) {
                (b'/', Some(b'/')) => {
                    self.pos = self.src[self.pos..]
                        .find('\n')
                        .map_or(bytes.len(), |i| self.pos + i);
                }
                (b'/', Some(b'*')) => {
                    self.pos = self.src[self.pos + 2..]
                        .find("*/")
                        .map_or(bytes.len(), |i| self.pos + 2 + i + 2);
                }
                _ => self.pos += 1,
            }
        }

        None
    }
}

/// Iterates the identifiers of `src`, skipping literals and comments.
#[must_use]
pub fn identifiers(src: &str) -> Identifiers<'_> {
    Identifiers { src, pos: 0 }
}

fn skip_whitespace(src: &str, pos: usize) -> usize {
    src[pos..]
        .find(|c: char| !c.is_whitespace())
        .map_or(src.len(), |i| pos + i)
}

/// Matches `(params) {` at `pos` and returns the params and the position
/// after the closing parenthesis. Params may only hold words, whitespace and
/// commas.
fn match_param_list(src: &str, pos: usize) -> Option<&str> {
    let open = skip_whitespace(src, pos);
    if src.as_bytes().get(open) != Some(&b'(') {
        return None;
    }
    let close = open + 1 + src[open + 1..].find(')')?;
    let params = &src[open + 1..close];
    if !params
        .bytes()
        .all(|b| is_ident_continue(b) || b.is_ascii_whitespace() || b == b',')
    {
        return None;
    }
    let brace = skip_whitespace(src, close + 1);
    (src.as_bytes().get(brace) == Some(&b'{')).then_some(params)
}

/// Every function definition (`type name(params) {`) in `src`.
#[must_use]
pub fn find_function_signatures(src: &str) -> Vec<FunctionSignature<'_>> {
    let mut found = Vec::new();
    let mut prev: Option<Token<'_>> = None;

    for token in identifiers(src) {
        if let Some(ty) = prev
            && !token.member
            && !CONTROL_KEYWORDS.contains(&token.text)
            && src[ty.end()..token.start].bytes().all(|b| b.is_ascii_whitespace())
            && ty.end() < token.start
            && let Some(params) = match_param_list(src, token.end())
        {
            found.push(FunctionSignature {
                return_type: ty.text,
                name: token.text,
                params,
            });
        }
        prev = Some(token);
    }

    found
}

/// Names of every function defined in `src`, in order of appearance.
#[must_use]
pub fn find_functions(src: &str) -> Vec<&str> {
    find_function_signatures(src)
        .into_iter()
        .map(|f| f.name)
        .collect()
}

/// Parameter text of the function `name`, if `src` defines it.
#[must_use]
pub fn function_params<'a>(src: &'a str, name: &str) -> Option<&'a str> {
    find_function_signatures(src)
        .into_iter()
        .find(|f| f.name == name)
        .map(|f| f.params)
}

/// Returns `true` if the parameter list names a parameter `param`.
#[must_use]
pub fn params_contain(params: &str, param: &str) -> bool {
    identifiers(params).any(|t| t.text == param)
}

/// Names declared as `varying [precision] type name;`.
#[must_use]
pub fn find_varyings(src: &str) -> Vec<&str> {
    let tokens: Vec<Token<'_>> = identifiers(src).collect();
    let mut found = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        if token.text != "varying" {
            continue;
        }
        let mut j = i + 1;
        if tokens
            .get(j)
            .is_some_and(|t| PRECISION_QUALIFIERS.contains(&t.text))
        {
            j += 1;
        }
        // type, then name
        let Some(name) = tokens.get(j + 1) else {
            continue;
        };
        let after = skip_whitespace(src, name.end());
        if src.as_bytes().get(after) == Some(&b';') {
            found.push(name.text);
        }
    }

    found
}

/// Names introduced by `#define NAME ...` lines.
#[must_use]
pub fn find_macro_definitions(src: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut after_define = false;

    for token in identifiers(src) {
        if after_define {
            found.push(token.text);
            after_define = false;
        } else if token.text == "define" && src[..token.start].trim_end().ends_with('#') {
            after_define = true;
        }
    }

    found
}

/// Replaces every non-member identifier found in `renames`.
#[must_use]
pub fn rename_symbols(src: &str, renames: &FxHashMap<String, String>) -> String {
    if renames.is_empty() {
        return src.to_string();
    }

    let mut out = String::with_capacity(src.len() + renames.len() * 4);
    let mut last = 0;

    for token in identifiers(src) {
        if token.member {
            continue;
        }
        if let Some(new_name) = renames.get(token.text) {
            out.push_str(&src[last..token.start]);
            out.push_str(new_name);
            last = token.end();
        }
    }

    out.push_str(&src[last..]);
    out
}

/// Replaces every non-member occurrence of the identifier `word`.
#[must_use]
pub fn replace_word(src: &str, word: &str, replacement: &str) -> String {
    let mut renames = FxHashMap::default();
    renames.insert(word.to_string(), replacement.to_string());
    rename_symbols(src, &renames)
}

/// `"mainImage"` becomes `"MainImage"`.
#[must_use]
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `prefixed("e0", "mainImage")` is `"e0MainImage"`.
#[must_use]
pub fn prefixed(prefix: &str, name: &str) -> String {
    format!("{prefix}{}", capitalize(name))
}
