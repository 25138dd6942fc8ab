//! JSON export of analysis results.

use crate::analysis::AnalysisResult;
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};

/// File name for a downloaded result, e.g. `analise-drc-2026-10-19T14-03-27.json`.
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("analise-drc-{}.json", at.format("%Y-%m-%dT%H-%M-%S"))
}

/// Pretty-printed JSON (two-space indent) of a result.
pub fn export_result_json(result: &AnalysisResult) -> CoreResult<String> {
    serde_json::to_string_pretty(result).map_err(CoreError::Serialization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisSection;
    use chrono::TimeZone;

    #[test]
    fn file_name_uses_dashes_and_second_precision() {
        let at = Utc
            .with_ymd_and_hms(2026, 10, 19, 14, 3, 27)
            .single()
            .expect("valid timestamp");
        assert_eq!(export_file_name(at), "analise-drc-2026-10-19T14-03-27.json");
    }

    #[test]
    fn exported_json_is_indented_and_parseable() {
        let result = AnalysisResult {
            anemia_analysis: AnalysisSection {
                evaluation: "ok".into(),
                recommendations: vec![],
            },
            mbd_analysis: AnalysisSection {
                evaluation: "high PTH".into(),
                recommendations: vec!["cinacalcet".into()],
            },
            overall_summary: "stable".into(),
        };

        let text = export_result_json(&result).expect("export");
        assert!(text.starts_with("{\n  \"anemiaAnalysis\""));
        let parsed: AnalysisResult = serde_json::from_str(&text).expect("reparse");
        assert_eq!(parsed, result);
    }
}
