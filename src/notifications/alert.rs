/// Counts of unhealthy zones, as produced by a monitoring pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertSummary {
    pub offline: usize,
    pub expired: usize,
    pub unpaired: usize,
}

impl AlertSummary {
    pub fn is_healthy(&self) -> bool {
        self.offline == 0 && self.expired == 0 && self.unpaired == 0
    }
}

/// Renders a status summary into a human-readable alert, truncated to the
/// channel's message limit. Deterministic, no I/O.
pub fn format_alert(entity_name: &str, summary: &AlertSummary, limit: usize) -> String {
    let text = if summary.is_healthy() {
        format!("Status for {entity_name}: all zones healthy")
    } else {
        let mut parts = Vec::new();
        if summary.offline > 0 {
            parts.push(format!("{} {} offline", summary.offline, plural(summary.offline, "zone", "zones")));
        }
        if summary.expired > 0 {
            parts.push(format!(
                "{} {} expired",
                summary.expired,
                plural(summary.expired, "subscription", "subscriptions")
            ));
        }
        if summary.unpaired > 0 {
            parts.push(format!(
                "{} {} unpaired",
                summary.unpaired,
                plural(summary.unpaired, "device", "devices")
            ));
        }
        format!("Alert for {entity_name}: {}", parts.join(", "))
    };
    truncate_to_limit(&text, limit)
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

/// Caps `text` at `limit` characters, preferring to cut at a word boundary
/// when one exists within the last 20% of the limit. Never splits a
/// multi-byte character.
pub fn truncate_to_limit(text: &str, limit: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= limit {
        return text.to_string();
    }
    if limit == 0 {
        return String::new();
    }

    let floor = limit - (limit / 5);
    let head = &chars[..limit];
    let cut = head
        .iter()
        .rposition(|c| c.is_whitespace())
        .filter(|&idx| idx >= floor)
        .unwrap_or(limit);
    head[..cut].iter().collect::<String>().trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_summary_reports_all_clear() {
        let text = format_alert("Acme Coffee", &AlertSummary::default(), 1600);
        assert_eq!(text, "Status for Acme Coffee: all zones healthy");
    }

    #[test]
    fn unhealthy_summary_lists_nonzero_categories_only() {
        let summary = AlertSummary {
            offline: 3,
            expired: 1,
            unpaired: 0,
        };
        let text = format_alert("Acme Coffee", &summary, 1600);
        assert_eq!(
            text,
            "Alert for Acme Coffee: 3 zones offline, 1 subscription expired"
        );
    }

    #[test]
    fn output_never_exceeds_limit() {
        let summary = AlertSummary {
            offline: 12,
            expired: 4,
            unpaired: 9,
        };
        for limit in [10, 20, 40, 80] {
            let text = format_alert("A Very Long Venue Name Indeed", &summary, limit);
            assert!(text.chars().count() <= limit, "limit {limit}: {text:?}");
        }
    }

    #[test]
    fn truncation_prefers_word_boundary_in_final_fifth() {
        let text = "twelve chars here and some more trailing words";
        let out = truncate_to_limit(text, 20);
        // char 20 falls mid-word; the last space inside the window is at
        // index 17, which is within the final 20% (>= 16).
        assert_eq!(out, "twelve chars here");
    }

    #[test]
    fn truncation_hard_cuts_when_no_boundary_in_window() {
        let out = truncate_to_limit("abcdefghijklmnopqrstuvwxyz", 10);
        assert_eq!(out, "abcdefghij");
    }

    #[test]
    fn truncation_is_char_safe_for_multibyte_text() {
        let out = truncate_to_limit("zéro défaut partout où possible toujours", 12);
        assert!(out.chars().count() <= 12);
        assert!(!out.is_empty());
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_to_limit("hi", 1600), "hi");
    }
}
