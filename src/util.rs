use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Shorten `s` to at most `max` terminal columns, ending in `...` when cut.
pub fn truncate(s: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if s.width() <= max {
        return s.to_string();
    }

    let (budget, ellipsis) = if max <= 3 { (max, "") } else { (max - 3, "...") };
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str(ellipsis);
    out
}

/// Split an editor setting like `"code --wait"` into program and arguments.
pub fn split_command(command: &str) -> Option<(String, Vec<String>)> {
    let mut parts = command.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some((program, parts.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_fits() {
        assert_eq!(truncate("spec/a_spec.rb:4", 40), "spec/a_spec.rb:4");
        assert_eq!(truncate("anything", 0), "");
    }

    #[test]
    fn test_truncate_adds_ellipsis() {
        assert_eq!(truncate("spec/models/user_spec.rb:42", 10), "spec/mo...");
        assert_eq!(truncate("abcdef", 3), "abc");
    }

    #[test]
    fn test_truncate_counts_wide_chars() {
        // Each CJK char is two columns wide.
        assert_eq!(truncate("日本語のテスト", 7), "日本...");
    }

    #[test]
    fn test_split_command() {
        assert_eq!(
            split_command("code --wait"),
            Some(("code".to_string(), vec!["--wait".to_string()]))
        );
        assert_eq!(split_command("vim"), Some(("vim".to_string(), vec![])));
        assert_eq!(split_command("   "), None);
    }
}
