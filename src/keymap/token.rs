//! Canonical token strings for keystrokes
//!
//! Every keystroke the engine understands has exactly one token and every
//! token names exactly one (normalized) keystroke:
//!
//! ```text
//! a  A  !  <lt>  <leader>  <c-a>  <a-A>  <c-a-x>  <up>  <s-tab>  <f5>
//! ```
//!
//! Tokens are what the tries are keyed on, so bindings are written in this
//! form (`"<leader>ff"`, `"<c-w><up>"`, `"gg"`).

use std::collections::HashMap;

use crate::error::KeymapError;

use super::types::{KeyCode, Keystroke, Modifiers};

/// Token produced by the leader key
pub const LEADER: &str = "<leader>";

const NAMED_KEYS: &[(KeyCode, &str)] = &[
    (KeyCode::Enter, "enter"),
    (KeyCode::Escape, "esc"),
    (KeyCode::Tab, "tab"),
    (KeyCode::Backspace, "bs"),
    (KeyCode::Delete, "del"),
    (KeyCode::Insert, "insert"),
    (KeyCode::Up, "up"),
    (KeyCode::Down, "down"),
    (KeyCode::Left, "left"),
    (KeyCode::Right, "right"),
    (KeyCode::Home, "home"),
    (KeyCode::End, "end"),
    (KeyCode::PageUp, "page-up"),
    (KeyCode::PageDown, "page-down"),
];

/// Bidirectional keystroke ↔ token lookup, built once at startup
#[derive(Debug, Clone)]
pub struct TokenTable {
    to_token: HashMap<Keystroke, String>,
    to_stroke: HashMap<String, Keystroke>,
    leader: char,
}

impl TokenTable {
    /// Table with space as the leader key
    pub fn new() -> Self {
        Self::with_leader(' ')
    }

    /// Table with a custom leader key
    pub fn with_leader(leader: char) -> Self {
        let mut table = Self {
            to_token: HashMap::new(),
            to_stroke: HashMap::new(),
            leader,
        };

        for byte in 32u8..127 {
            let c = byte as char;
            let name = char_name(c);
            let plain = if c == leader {
                LEADER.to_string()
            } else if name.len() > 1 {
                format!("<{}>", name)
            } else {
                name.clone()
            };
            table.insert(Keystroke::char(c), plain);
            table.insert(
                Keystroke::char_with_mods(c, Modifiers::CTRL),
                format!("<c-{}>", name),
            );
            table.insert(
                Keystroke::char_with_mods(c, Modifiers::ALT),
                format!("<a-{}>", name),
            );
            table.insert(
                Keystroke::char_with_mods(c, Modifiers::CTRL | Modifiers::ALT),
                format!("<c-a-{}>", name),
            );
        }

        // Leader outside printable ASCII
        if leader != ' ' && !table.to_token.contains_key(&Keystroke::char(leader)) {
            table.insert(Keystroke::char(leader), LEADER.to_string());
        }

        for &(code, name) in NAMED_KEYS {
            table.insert_named(code, name);
        }
        for n in 1..=12u8 {
            table.insert_named(KeyCode::F(n), &format!("f{}", n));
        }

        table
    }

    fn insert_named(&mut self, code: KeyCode, name: &str) {
        self.insert(Keystroke::key(code), format!("<{}>", name));
        self.insert(Keystroke::new(code, Modifiers::CTRL), format!("<c-{}>", name));
        self.insert(Keystroke::new(code, Modifiers::ALT), format!("<a-{}>", name));
        self.insert(Keystroke::new(code, Modifiers::SHIFT), format!("<s-{}>", name));
    }

    fn insert(&mut self, stroke: Keystroke, token: String) {
        debug_assert!(
            !self.to_stroke.contains_key(&token),
            "duplicate token {}",
            token
        );
        self.to_stroke.insert(token.clone(), stroke);
        self.to_token.insert(stroke, token);
    }

    /// The leader key this table was built with
    pub fn leader(&self) -> char {
        self.leader
    }

    /// Token for a keystroke (shift is folded in first)
    pub fn token(&self, stroke: &Keystroke) -> Option<&str> {
        self.to_token.get(&stroke.normalized()).map(String::as_str)
    }

    /// Keystroke for a single token
    pub fn keystroke(&self, token: &str) -> Option<Keystroke> {
        self.to_stroke.get(token).copied()
    }

    /// Whether `token` is a single known token
    pub fn contains(&self, token: &str) -> bool {
        self.to_stroke.contains_key(token)
    }

    /// Number of tokens in the table
    pub fn len(&self) -> usize {
        self.to_token.len()
    }

    /// Whether the table is empty (never true for a built table)
    pub fn is_empty(&self) -> bool {
        self.to_token.is_empty()
    }

    /// All (token, keystroke) pairs sorted by token
    pub fn entries(&self) -> Vec<(&str, Keystroke)> {
        let mut entries: Vec<_> = self
            .to_stroke
            .iter()
            .map(|(token, stroke)| (token.as_str(), *stroke))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Split a key string into tokens, rejecting anything the table doesn't know
    pub fn parse_keys(&self, keys: &str) -> Result<Vec<String>, KeymapError> {
        let tokens = split_tokens(keys);
        if tokens.is_empty() {
            return Err(KeymapError::EmptySequence);
        }
        for token in &tokens {
            if !self.contains(token) {
                return Err(KeymapError::InvalidKey(format!(
                    "unknown token {} in {}",
                    token, keys
                )));
            }
        }
        Ok(tokens)
    }
}

impl Default for TokenTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Name used for a character inside `<...>`
fn char_name(c: char) -> String {
    match c {
        '<' => "lt".to_string(),
        '>' => "gt".to_string(),
        ' ' => "space".to_string(),
        _ => c.to_string(),
    }
}

/// Split a key string into tokens without validating them.
///
/// `<...>` groups become one token, everything else is one token per
/// character. A `<` that doesn't open a well-formed group is taken literally.
///
/// A literal space comes out as `" "`, which is not a token (the space key
/// is `<leader>` or `<space>`), so resolving it finds no binding. Write
/// `<leader>` or `<space>` in expansions instead.
pub fn split_tokens(keys: &str) -> Vec<String> {
    let chars: Vec<char> = keys.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '<' {
            let close = chars[i + 1..]
                .iter()
                .position(|&c| c == '>' || c == '<')
                .map(|offset| i + 1 + offset);
            if let Some(end) = close {
                if chars[end] == '>' && end > i + 1 {
                    tokens.push(chars[i..=end].iter().collect());
                    i = end + 1;
                    continue;
                }
            }
        }
        tokens.push(chars[i].to_string());
        i += 1;
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_modified_chars() {
        let table = TokenTable::new();
        assert_eq!(table.token(&Keystroke::char('a')), Some("a"));
        assert_eq!(table.token(&Keystroke::char('A')), Some("A"));
        assert_eq!(
            table.token(&Keystroke::char_with_mods('w', Modifiers::CTRL)),
            Some("<c-w>")
        );
        assert_eq!(
            table.token(&Keystroke::char_with_mods('x', Modifiers::CTRL | Modifiers::ALT)),
            Some("<c-a-x>")
        );
    }

    #[test]
    fn test_shift_is_folded() {
        let table = TokenTable::new();
        let shifted = Keystroke::char_with_mods('g', Modifiers::SHIFT);
        assert_eq!(table.token(&shifted), Some("G"));
    }

    #[test]
    fn test_space_is_leader() {
        let table = TokenTable::new();
        assert_eq!(table.token(&Keystroke::char(' ')), Some(LEADER));
        assert_eq!(table.keystroke(LEADER), Some(Keystroke::char(' ')));
    }

    #[test]
    fn test_custom_leader_frees_space() {
        let table = TokenTable::with_leader(',');
        assert_eq!(table.token(&Keystroke::char(',')), Some(LEADER));
        assert_eq!(table.token(&Keystroke::char(' ')), Some("<space>"));
        assert_eq!(table.leader(), ',');
    }

    #[test]
    fn test_named_keys() {
        let table = TokenTable::new();
        assert_eq!(table.token(&Keystroke::key(KeyCode::Up)), Some("<up>"));
        assert_eq!(
            table.token(&Keystroke::new(KeyCode::Left, Modifiers::ALT)),
            Some("<a-left>")
        );
        assert_eq!(
            table.token(&Keystroke::new(KeyCode::Tab, Modifiers::SHIFT)),
            Some("<s-tab>")
        );
        assert_eq!(table.token(&Keystroke::key(KeyCode::F(5))), Some("<f5>"));
        assert_eq!(table.token(&Keystroke::key(KeyCode::PageDown)), Some("<page-down>"));
    }

    #[test]
    fn test_angle_brackets_are_escaped() {
        let table = TokenTable::new();
        assert_eq!(table.token(&Keystroke::char('<')), Some("<lt>"));
        assert_eq!(
            table.token(&Keystroke::char_with_mods('>', Modifiers::CTRL)),
            Some("<c-gt>")
        );
    }

    #[test]
    fn test_table_is_bijective() {
        let table = TokenTable::new();
        for (token, stroke) in table.entries() {
            assert_eq!(table.token(&stroke), Some(token), "round trip of {}", token);
        }
        assert_eq!(table.entries().len(), table.len());
    }

    #[test]
    fn test_split_tokens() {
        assert_eq!(split_tokens("gg"), vec!["g", "g"]);
        assert_eq!(split_tokens("<leader>bc"), vec!["<leader>", "b", "c"]);
        assert_eq!(split_tokens("<c-w><up>"), vec!["<c-w>", "<up>"]);
        assert_eq!(split_tokens(":e x<enter>"), vec![":", "e", " ", "x", "<enter>"]);
    }

    #[test]
    fn test_literal_space_is_not_a_token() {
        let table = TokenTable::new();
        assert_eq!(split_tokens("a b"), vec!["a", " ", "b"]);
        assert!(!table.contains(" "));
        assert!(table.parse_keys("a b").is_err());
        assert!(table.parse_keys("a<leader>b").is_ok());
    }

    #[test]
    fn test_split_tokens_literal_angle() {
        assert_eq!(split_tokens("<"), vec!["<"]);
        assert_eq!(split_tokens("<<leader>"), vec!["<", "<leader>"]);
        assert_eq!(split_tokens("<>"), vec!["<", ">"]);
    }

    #[test]
    fn test_parse_keys_rejects_unknown() {
        let table = TokenTable::new();
        assert!(table.parse_keys("<leader>ff").is_ok());
        assert!(matches!(
            table.parse_keys("<bogus>"),
            Err(KeymapError::InvalidKey(_))
        ));
        assert!(matches!(table.parse_keys(""), Err(KeymapError::EmptySequence)));
    }
}
