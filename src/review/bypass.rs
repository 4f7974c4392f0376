//! Session-configuration statements are not reviewed; they get a fixed
//! zero-issue document instead of an API call.

use super::document::{CategoryBreakdown, ReviewDocument, ReviewSummary, SeverityBreakdown};

pub const BYPASS_SCORE: f64 = 10.0;

pub const DEFAULT_ASSESSMENT: &str = "Đây là lệnh ALTER SESSION dùng để cấu hình tham số tại mức session (ví dụ: SET CURRENT_SCHEMA). Không phải là lệnh truy vấn dữ liệu (SELECT/INSERT/UPDATE/DELETE) nên không cần đánh giá hiệu suất. Không có vấn đề về performance, không cần thêm index, không cần tối ưu.";

/// True when the first two words of `sql` are `ALTER SESSION`, in any case
/// and with any whitespace around or between them.
pub fn is_session_statement(sql: &str) -> bool {
    let mut words = sql.split_whitespace();
    matches!(
        (words.next(), words.next()),
        (Some(first), Some(second))
            if first.eq_ignore_ascii_case("ALTER") && second.eq_ignore_ascii_case("SESSION")
    )
}

/// The canonical review written for a session statement.
pub fn bypass_document(assessment: &str) -> ReviewDocument {
    ReviewDocument {
        summary: ReviewSummary {
            performance_score: Some(BYPASS_SCORE),
            complexity_score: Some(0.0),
            total_issues: 0,
            by_severity: SeverityBreakdown::default(),
            by_category: CategoryBreakdown::default(),
            overall_assessment: assessment.to_string(),
            priority: "low".into(),
            effort_to_fix: "low".into(),
        },
        issues: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_session_statements() {
        assert!(is_session_statement("ALTER SESSION SET CURRENT_SCHEMA = APP"));
        assert!(is_session_statement("  alter\tsession set nls_date_format='YYYY'"));
        assert!(is_session_statement("Alter\n  Session"));
    }

    #[test]
    fn ignores_everything_else() {
        assert!(!is_session_statement("ALTER TABLE orders ADD note VARCHAR2(10)"));
        assert!(!is_session_statement("SELECT * FROM session"));
        assert!(!is_session_statement("ALTERSESSION"));
        assert!(!is_session_statement("ALTER"));
        assert!(!is_session_statement(""));
    }

    #[test]
    fn bypass_document_has_no_issues() {
        let doc = bypass_document(DEFAULT_ASSESSMENT);
        assert_eq!(doc.summary.total_issues, 0);
        assert_eq!(doc.summary.performance_score, Some(10.0));
        assert!(doc.issues.is_empty());
        assert_eq!(doc.summary.priority, "low");

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["summary"]["by_category"]["hibernate"], 0);
        assert_eq!(value["issues"], serde_json::json!([]));
    }
}
