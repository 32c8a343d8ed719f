//! Pattern rule operations

use rusqlite::params;

use super::Database;
use crate::error::Result;
use crate::models::{MatchType, PatternRule};

/// Fields for a rule about to be inserted; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewRule<'a> {
    pub pattern_text: &'a str,
    pub match_type: MatchType,
    pub vendor_pattern: Option<&'a str>,
    pub target_category_id: Option<&'a str>,
    pub is_business: bool,
    pub priority: i64,
}

impl Database {
    /// List a user's active rules in match order: priority descending,
    /// then match count descending.
    pub fn list_active_rules(&self, user_id: &str) -> Result<Vec<PatternRule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, pattern_text, match_type, vendor_pattern, target_category_id,
                   is_business, priority, match_count, is_active
            FROM pattern_rules
            WHERE user_id = ? AND is_active = TRUE
            ORDER BY priority DESC, match_count DESC
            "#,
        )?;

        let rules = stmt
            .query_map(params![user_id], row_to_rule)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rules)
    }

    /// List all of a user's rules, active or not, in match order.
    pub fn list_rules(&self, user_id: &str) -> Result<Vec<PatternRule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, pattern_text, match_type, vendor_pattern, target_category_id,
                   is_business, priority, match_count, is_active
            FROM pattern_rules
            WHERE user_id = ?
            ORDER BY priority DESC, match_count DESC
            "#,
        )?;

        let rules = stmt
            .query_map(params![user_id], row_to_rule)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rules)
    }

    /// Insert a rule, returning its id.
    pub fn insert_rule(&self, user_id: &str, rule: &NewRule) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO pattern_rules
                (user_id, pattern_text, match_type, vendor_pattern, target_category_id,
                 is_business, priority)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                rule.pattern_text,
                rule.match_type.as_str(),
                rule.vendor_pattern,
                rule.target_category_id,
                rule.is_business,
                rule.priority,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Update an existing rule in place (all user-editable fields).
    pub fn update_rule(&self, rule: &PatternRule) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE pattern_rules
            SET pattern_text = ?, match_type = ?, vendor_pattern = ?,
                target_category_id = ?, is_business = ?, priority = ?, is_active = ?
            WHERE id = ?
            "#,
            params![
                rule.pattern_text,
                rule.match_type.as_str(),
                rule.vendor_pattern,
                rule.target_category_id,
                rule.is_business,
                rule.priority,
                rule.is_active,
                rule.id,
            ],
        )?;
        Ok(())
    }

    /// Bump a rule's match count after the matcher used it.
    ///
    /// Best-effort popularity counter; concurrent increments may race and
    /// that is acceptable.
    pub fn record_rule_match(&self, rule_id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE pattern_rules SET match_count = match_count + 1 WHERE id = ?",
            params![rule_id],
        )?;
        Ok(())
    }

    /// Case-insensitive existence check by pattern text.
    pub fn rule_exists_for_pattern(&self, user_id: &str, pattern: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM pattern_rules WHERE user_id = ? AND LOWER(pattern_text) = LOWER(?)",
            params![user_id, pattern],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Deactivate a rule without deleting its history.
    pub fn deactivate_rule(&self, rule_id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE pattern_rules SET is_active = FALSE WHERE id = ?",
            params![rule_id],
        )?;
        Ok(())
    }
}

fn row_to_rule(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatternRule> {
    let match_type_str: String = row.get(2)?;
    Ok(PatternRule {
        id: row.get(0)?,
        pattern_text: row.get(1)?,
        match_type: match_type_str.parse().unwrap_or_default(),
        vendor_pattern: row.get(3)?,
        target_category_id: row.get(4)?,
        is_business: row.get(5)?,
        priority: row.get(6)?,
        match_count: row.get(7)?,
        is_active: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_rule(pattern: &str, priority: i64) -> NewRule<'_> {
        NewRule {
            pattern_text: pattern,
            match_type: MatchType::Contains,
            vendor_pattern: None,
            target_category_id: Some("cat-1"),
            is_business: false,
            priority,
        }
    }

    #[test]
    fn test_insert_and_list_ordering() {
        let db = Database::in_memory().unwrap();
        let low = db.insert_rule("u1", &new_rule("shell", 0)).unwrap();
        let high = db.insert_rule("u1", &new_rule("shell gas", 1)).unwrap();

        let rules = db.list_active_rules("u1").unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].id, high);
        assert_eq!(rules[1].id, low);
    }

    #[test]
    fn test_match_count_breaks_priority_ties() {
        let db = Database::in_memory().unwrap();
        let a = db.insert_rule("u1", &new_rule("coffee", 5)).unwrap();
        let b = db.insert_rule("u1", &new_rule("espresso", 5)).unwrap();

        for _ in 0..3 {
            db.record_rule_match(b).unwrap();
        }

        let rules = db.list_active_rules("u1").unwrap();
        assert_eq!(rules[0].id, b);
        assert_eq!(rules[0].match_count, 3);
        assert_eq!(rules[1].id, a);
    }

    #[test]
    fn test_rules_scoped_by_user() {
        let db = Database::in_memory().unwrap();
        db.insert_rule("u1", &new_rule("netflix", 0)).unwrap();
        assert!(db.list_active_rules("u2").unwrap().is_empty());
    }

    #[test]
    fn test_exists_is_case_insensitive() {
        let db = Database::in_memory().unwrap();
        db.insert_rule("u1", &new_rule("Netflix", 0)).unwrap();
        assert!(db.rule_exists_for_pattern("u1", "NETFLIX").unwrap());
        assert!(db.rule_exists_for_pattern("u1", "netflix").unwrap());
        assert!(!db.rule_exists_for_pattern("u1", "hulu").unwrap());
        assert!(!db.rule_exists_for_pattern("u2", "netflix").unwrap());
    }

    #[test]
    fn test_deactivated_rule_hidden_from_active_list() {
        let db = Database::in_memory().unwrap();
        let id = db.insert_rule("u1", &new_rule("netflix", 0)).unwrap();
        db.deactivate_rule(id).unwrap();

        assert!(db.list_active_rules("u1").unwrap().is_empty());
        let all = db.list_rules("u1").unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].is_active);
    }

    #[test]
    fn test_update_rule_round_trip() {
        let db = Database::in_memory().unwrap();
        let id = db.insert_rule("u1", &new_rule("netflix", 0)).unwrap();

        let mut rule = db.list_active_rules("u1").unwrap().remove(0);
        rule.priority = 7;
        rule.match_type = MatchType::Exact;
        rule.vendor_pattern = Some("netflix".to_string());
        db.update_rule(&rule).unwrap();

        let reloaded = db.list_active_rules("u1").unwrap().remove(0);
        assert_eq!(reloaded.id, id);
        assert_eq!(reloaded.priority, 7);
        assert_eq!(reloaded.match_type, MatchType::Exact);
        assert_eq!(reloaded.vendor_pattern.as_deref(), Some("netflix"));
    }
}
