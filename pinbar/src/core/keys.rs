//! Textual and symbolic forms of global shortcuts.
//!
//! `cmd-shift-t` is the form accepted on the command line and shown by `list`;
//! `⇧⌘T` is the menu-style display string.

use bitflags::bitflags;

use super::HotKeySetting;

bitflags! {
    /// Carbon modifier masks, as passed to `RegisterEventHotKey`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u32 {
        const CMD = 0x0100;
        const SHIFT = 0x0200;
        const OPTION = 0x0800;
        const CONTROL = 0x1000;
    }
}

/// (name, virtual key code, display label)
const KEYS: &[(&str, u32, &str)] = &[
    ("a", 0x00, "A"),
    ("s", 0x01, "S"),
    ("d", 0x02, "D"),
    ("f", 0x03, "F"),
    ("h", 0x04, "H"),
    ("g", 0x05, "G"),
    ("z", 0x06, "Z"),
    ("x", 0x07, "X"),
    ("c", 0x08, "C"),
    ("v", 0x09, "V"),
    ("b", 0x0B, "B"),
    ("q", 0x0C, "Q"),
    ("w", 0x0D, "W"),
    ("e", 0x0E, "E"),
    ("r", 0x0F, "R"),
    ("y", 0x10, "Y"),
    ("t", 0x11, "T"),
    ("1", 0x12, "1"),
    ("2", 0x13, "2"),
    ("3", 0x14, "3"),
    ("4", 0x15, "4"),
    ("6", 0x16, "6"),
    ("5", 0x17, "5"),
    ("equal", 0x18, "="),
    ("9", 0x19, "9"),
    ("7", 0x1A, "7"),
    ("minus", 0x1B, "-"),
    ("8", 0x1C, "8"),
    ("0", 0x1D, "0"),
    ("rightbracket", 0x1E, "]"),
    ("o", 0x1F, "O"),
    ("u", 0x20, "U"),
    ("leftbracket", 0x21, "["),
    ("i", 0x22, "I"),
    ("p", 0x23, "P"),
    ("return", 0x24, "↩"),
    ("l", 0x25, "L"),
    ("j", 0x26, "J"),
    ("quote", 0x27, "'"),
    ("k", 0x28, "K"),
    ("semicolon", 0x29, ";"),
    ("backslash", 0x2A, "\\"),
    ("comma", 0x2B, ","),
    ("slash", 0x2C, "/"),
    ("n", 0x2D, "N"),
    ("m", 0x2E, "M"),
    ("period", 0x2F, "."),
    ("tab", 0x30, "⇥"),
    ("space", 0x31, "Space"),
    ("grave", 0x32, "`"),
    ("delete", 0x33, "⌫"),
    ("escape", 0x35, "⎋"),
    ("f5", 0x60, "F5"),
    ("f6", 0x61, "F6"),
    ("f7", 0x62, "F7"),
    ("f3", 0x63, "F3"),
    ("f8", 0x64, "F8"),
    ("f9", 0x65, "F9"),
    ("f11", 0x67, "F11"),
    ("f10", 0x6D, "F10"),
    ("f12", 0x6F, "F12"),
    ("f4", 0x76, "F4"),
    ("f2", 0x78, "F2"),
    ("f1", 0x7A, "F1"),
    ("left", 0x7B, "←"),
    ("right", 0x7C, "→"),
    ("down", 0x7D, "↓"),
    ("up", 0x7E, "↑"),
];

fn key_alias(name: &str) -> &str {
    match name {
        "enter" => "return",
        "backspace" => "delete",
        "esc" => "escape",
        other => other,
    }
}

fn key_code_from_name(name: &str) -> Option<u32> {
    let name = key_alias(name);
    KEYS.iter().find(|(n, _, _)| *n == name).map(|(_, c, _)| *c)
}

fn key_entry(code: u32) -> Option<&'static (&'static str, u32, &'static str)> {
    KEYS.iter().find(|(_, c, _)| *c == code)
}

/// Parse `cmd-shift-t` style text. Modifiers precede the key, separated by `-`.
pub fn parse_hotkey(key_str: &str) -> Result<HotKeySetting, String> {
    let parts: Vec<&str> = key_str.split('-').collect();
    let Some((key_part, modifier_parts)) = parts.split_last() else {
        return Err("Empty key string".to_string());
    };
    if key_part.is_empty() {
        return Err("Empty key string".to_string());
    }

    let mut modifiers = Modifiers::empty();
    for part in modifier_parts {
        match part.to_lowercase().as_str() {
            "cmd" | "super" | "command" => modifiers |= Modifiers::CMD,
            "alt" | "opt" | "option" => modifiers |= Modifiers::OPTION,
            "ctrl" | "control" => modifiers |= Modifiers::CONTROL,
            "shift" => modifiers |= Modifiers::SHIFT,
            _ => return Err(format!("Unknown modifier: {}", part)),
        }
    }

    let key_code = key_code_from_name(&key_part.to_lowercase())
        .ok_or_else(|| format!("Unknown key: {}", key_part))?;

    Ok(HotKeySetting::new(key_code, modifiers.bits()))
}

/// Inverse of [`parse_hotkey`].
pub fn format_hotkey(setting: &HotKeySetting) -> String {
    let modifiers = Modifiers::from_bits_truncate(setting.modifiers);
    let mut parts = Vec::new();
    if modifiers.contains(Modifiers::CMD) {
        parts.push("cmd");
    }
    if modifiers.contains(Modifiers::OPTION) {
        parts.push("alt");
    }
    if modifiers.contains(Modifiers::CONTROL) {
        parts.push("ctrl");
    }
    if modifiers.contains(Modifiers::SHIFT) {
        parts.push("shift");
    }
    parts.push(key_entry(setting.key_code).map_or("unknown", |(n, _, _)| n));
    parts.join("-")
}

/// Menu-style label in the conventional ⌃⌥⇧⌘ order.
pub fn hotkey_display_string(setting: &HotKeySetting) -> String {
    let modifiers = Modifiers::from_bits_truncate(setting.modifiers);
    let mut out = String::new();
    if modifiers.contains(Modifiers::CONTROL) {
        out.push('⌃');
    }
    if modifiers.contains(Modifiers::OPTION) {
        out.push('⌥');
    }
    if modifiers.contains(Modifiers::SHIFT) {
        out.push('⇧');
    }
    if modifiers.contains(Modifiers::CMD) {
        out.push('⌘');
    }
    match key_entry(setting.key_code) {
        Some((_, _, label)) => out.push_str(label),
        None => out.push_str(&format!("Key{}", setting.key_code)),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_key() {
        let hotkey = parse_hotkey("a").unwrap();
        assert_eq!(hotkey.key_code, 0x00);
        assert_eq!(hotkey.modifiers, 0);
    }

    #[test]
    fn test_parse_multiple_modifiers() {
        let hotkey = parse_hotkey("cmd-shift-t").unwrap();
        assert_eq!(hotkey.key_code, 0x11);
        assert_eq!(hotkey.modifiers, 0x0100 | 0x0200);
    }

    #[test]
    fn test_parse_modifier_aliases() {
        assert_eq!(parse_hotkey("super-a").unwrap().modifiers, 0x0100);
        assert_eq!(parse_hotkey("command-a").unwrap().modifiers, 0x0100);
        assert_eq!(parse_hotkey("opt-a").unwrap().modifiers, 0x0800);
        assert_eq!(parse_hotkey("option-a").unwrap().modifiers, 0x0800);
        assert_eq!(parse_hotkey("control-a").unwrap().modifiers, 0x1000);
    }

    #[test]
    fn test_parse_case_insensitive() {
        let hotkey = parse_hotkey("Ctrl-Alt-Return").unwrap();
        assert_eq!(hotkey.key_code, 0x24);
        assert_eq!(hotkey.modifiers, 0x1000 | 0x0800);
    }

    #[test]
    fn test_parse_key_aliases() {
        assert_eq!(parse_hotkey("enter").unwrap().key_code, 0x24);
        assert_eq!(parse_hotkey("esc").unwrap().key_code, 0x35);
        assert_eq!(parse_hotkey("backspace").unwrap().key_code, 0x33);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_hotkey("").is_err());
        assert!(parse_hotkey("cmd-").is_err());
        assert!(parse_hotkey("alt-unknown").is_err());
        assert!(parse_hotkey("meta-a").is_err());
    }

    #[test]
    fn test_format_hotkey() {
        let setting = HotKeySetting::new(0x31, (Modifiers::CMD | Modifiers::SHIFT).bits());
        assert_eq!(format_hotkey(&setting), "cmd-shift-space");
    }

    #[test]
    fn test_parse_format_roundtrip() {
        for input in ["a", "alt-1", "cmd-shift-a", "ctrl-f1", "cmd-alt-ctrl-shift-space"] {
            let hotkey = parse_hotkey(input).unwrap();
            assert_eq!(format_hotkey(&hotkey), input);
        }
    }

    #[test]
    fn test_display_string_order() {
        let setting = parse_hotkey("cmd-alt-ctrl-shift-t").unwrap();
        assert_eq!(hotkey_display_string(&setting), "⌃⌥⇧⌘T");
        let setting = parse_hotkey("cmd-space").unwrap();
        assert_eq!(hotkey_display_string(&setting), "⌘Space");
    }

    #[test]
    fn test_display_string_unknown_key() {
        let setting = HotKeySetting::new(0x7F, Modifiers::CMD.bits());
        assert_eq!(hotkey_display_string(&setting), "⌘Key127");
    }
}
