// 🔎 Column Resolution - locate semantic columns under varying headers
//
// Export formats rename, reorder and drop columns between versions, so each
// normalizer describes where a column may live as an ordered list of rules.
// The first rule that matches wins.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRule {
    /// Header equals the name exactly
    Exact(&'static str),
    /// First header containing the substring (case-sensitive)
    Contains(&'static str),
    /// Column at a fixed 0-based position
    Position(usize),
}

impl ColumnRule {
    pub fn matches(&self, headers: &[String]) -> Option<usize> {
        match self {
            ColumnRule::Exact(name) => headers.iter().position(|h| h == name),
            ColumnRule::Contains(fragment) => headers.iter().position(|h| h.contains(fragment)),
            ColumnRule::Position(idx) => (*idx < headers.len()).then_some(*idx),
        }
    }
}

/// A column found by [`resolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub index: usize,
    pub name: String,
    pub rule: ColumnRule,
}

/// Evaluate rules in order against the header list; first match wins.
pub fn resolve(rules: &[ColumnRule], headers: &[String]) -> Option<ResolvedColumn> {
    rules.iter().find_map(|rule| {
        rule.matches(headers).map(|index| ResolvedColumn {
            index,
            name: headers[index].clone(),
            rule: *rule,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_match_preferred() {
        let h = headers(&["Machine ID", "Date Time", "Total Amount ($)"]);
        let rules = [ColumnRule::Exact("Date Time"), ColumnRule::Position(0)];

        let col = resolve(&rules, &h).unwrap();
        assert_eq!(col.index, 1);
        assert_eq!(col.rule, ColumnRule::Exact("Date Time"));
    }

    #[test]
    fn test_positional_fallback() {
        let h = headers(&["Transaction Date", "Machine ID"]);
        let rules = [ColumnRule::Exact("Date Time"), ColumnRule::Position(0)];

        let col = resolve(&rules, &h).unwrap();
        assert_eq!(col.index, 0);
        assert_eq!(col.name, "Transaction Date");
    }

    #[test]
    fn test_contains_takes_first_match() {
        let h = headers(&["Date", "Amount Paid", "Refund Amount"]);

        let col = resolve(&[ColumnRule::Contains("Amount")], &h).unwrap();
        assert_eq!(col.name, "Amount Paid");
    }

    #[test]
    fn test_contains_is_case_sensitive() {
        let h = headers(&["Date", "amount"]);

        assert!(resolve(&[ColumnRule::Contains("Amount")], &h).is_none());
    }

    #[test]
    fn test_position_out_of_range() {
        let h = headers(&["Day", "Location"]);

        assert!(resolve(&[ColumnRule::Position(7)], &h).is_none());
    }

    #[test]
    fn test_no_rules_resolve_nothing() {
        assert!(resolve(&[], &headers(&["Day"])).is_none());
    }
}
