//! User-facing message templates.
//!
//! Templates use `%token%` placeholders and `&x` color codes. Operators can
//! override any template from the `messages` section of the configuration;
//! keys they do not override fall back to the built-in defaults.

use std::collections::BTreeMap;

/// Built-in templates, keyed by message name.
const DEFAULT_MESSAGES: &[(&str, &str)] = &[
    ("reload-success", "&a[XPStream] Config reloaded."),
    ("reload-failed", "&c[XPStream] Reload failed: %reason%"),
    ("no-permission", "&c[XPStream] You do not have permission."),
    ("stats-self", "&6[XPStream] &fTotal XP collected: &a%xp%"),
    ("stats-other", "&6[XPStream] &f%player%'s total XP: &a%xp%"),
    ("stats-player-not-found", "&c[XPStream] Player not found."),
    (
        "console-stats-denied",
        "&c[XPStream] Specify a player: /xpstats <player>",
    ),
    (
        "console-reset-denied",
        "&c[XPStream] Specify a player: /xpstats reset <player>",
    ),
    ("top-header", "&6[XPStream] &f--- Top %count% XP Collectors ---"),
    ("top-entry", "&6%rank%. &f%player% &7- &a%xp%"),
    ("reset-self", "&a[XPStream] Your XP stats have been reset."),
    ("reset-other", "&a[XPStream] Reset XP stats for %player%."),
    (
        "reset-no-permission",
        "&c[XPStream] You cannot reset other players' stats.",
    ),
    (
        "boost-granted",
        "&a[XPStream] %player% now has a x%multiplier% boost for %ticks% ticks.",
    ),
    ("boost-cleared", "&a[XPStream] Cleared the boost for %player%."),
    ("boost-none", "&7[XPStream] %player% has no active boost."),
    ("boost-invalid", "&c[XPStream] Invalid boost: %reason%"),
    (
        "usage",
        "&6Usage: /xpstats [reload|top|reset|boost|<player>]",
    ),
];

/// Formatting codes that may follow `&`.
const COLOR_CODES: &str = "0123456789abcdefklmnorABCDEFKLMNOR";

/// Section sign the host renders as a formatting prefix.
const SECTION_SIGN: char = '\u{00A7}';

/// The merged set of message templates for one configuration generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageCatalog {
    templates: BTreeMap<String, String>,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::with_overrides(&BTreeMap::new())
    }
}

impl MessageCatalog {
    /// Build a catalog from the defaults plus operator overrides.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut templates: BTreeMap<String, String> = DEFAULT_MESSAGES
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        for (key, value) in overrides {
            templates.insert(key.clone(), value.clone());
        }
        Self { templates }
    }

    /// Raw template for `key`, if one exists.
    pub fn template(&self, key: &str) -> Option<&str> {
        self.templates.get(key).map(String::as_str)
    }

    /// Render the template for `key` with `%token%` replacements applied
    /// and color codes translated.
    ///
    /// Tokens are given with their `%` delimiters, e.g. `("%xp%", "1,024")`.
    /// An unknown key renders as the key itself.
    pub fn format(&self, key: &str, replacements: &[(&str, &str)]) -> String {
        let template = self.template(key).unwrap_or(key);
        let substituted = if replacements.is_empty() {
            template.to_owned()
        } else {
            substitute_tokens(template, replacements)
        };
        translate_colors(&substituted)
    }
}

/// Single left-to-right pass over `template`, replacing known `%token%`
/// spans. Unknown spans are copied through and scanning resumes right after
/// their opening `%`.
fn substitute_tokens(template: &str, replacements: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('%') {
        let (before, from_open) = rest.split_at(open);
        out.push_str(before);

        let after_open = from_open.get(1..).unwrap_or("");
        let replaced = after_open.find('%').and_then(|close| {
            let token_len = close.saturating_add(2);
            let token = from_open.get(..token_len)?;
            replacements
                .iter()
                .find(|(name, _)| *name == token)
                .map(|(_, value)| (*value, token_len))
        });

        match replaced {
            Some((value, token_len)) => {
                out.push_str(value);
                rest = from_open.get(token_len..).unwrap_or("");
            }
            None => {
                out.push('%');
                rest = after_open;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Replace `&` with the section sign wherever it precedes a valid code.
fn translate_colors(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut chars = message.chars().peekable();
    while let Some(c) = chars.next() {
        let is_code = c == '&' && chars.peek().is_some_and(|next| COLOR_CODES.contains(*next));
        out.push(if is_code { SECTION_SIGN } else { c });
    }
    out
}

/// Render a count with `,` thousands separators, e.g. `1234567` as
/// `1,234,567`.
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len().saturating_add(digits.len() / 3));
    for (i, c) in digits.chars().enumerate() {
        let remaining = digits.len().saturating_sub(i);
        if i > 0 && remaining % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_known_tokens() {
        let catalog = MessageCatalog::default();
        let msg = catalog.format("stats-other", &[("%player%", "Steve"), ("%xp%", "1,024")]);
        assert_eq!(msg, "§6[XPStream] §fSteve's total XP: §a1,024");
    }

    #[test]
    fn unknown_tokens_are_left_alone() {
        let out = substitute_tokens("100% of %xp% and %other%", &[("%xp%", "5")]);
        assert_eq!(out, "100% of 5 and %other%");
    }

    #[test]
    fn replacement_values_are_not_rescanned() {
        let out = substitute_tokens("%a%", &[("%a%", "%b%"), ("%b%", "x")]);
        assert_eq!(out, "%b%");
    }

    #[test]
    fn only_valid_color_codes_translate() {
        assert_eq!(translate_colors("&aok &zno &"), "§aok &zno &");
        assert_eq!(translate_colors("&&r"), "&§r");
    }

    #[test]
    fn overrides_replace_defaults() {
        let mut overrides = BTreeMap::new();
        overrides.insert("reset-self".to_owned(), "done".to_owned());
        let catalog = MessageCatalog::with_overrides(&overrides);
        assert_eq!(catalog.format("reset-self", &[]), "done");
        assert!(catalog.template("usage").is_some());
    }

    #[test]
    fn unknown_key_renders_as_itself() {
        let catalog = MessageCatalog::default();
        assert_eq!(catalog.format("missing-key", &[]), "missing-key");
    }

    #[test]
    fn counts_get_thousands_separators() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(1_234_567), "1,234,567");
    }
}
