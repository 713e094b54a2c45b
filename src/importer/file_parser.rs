// ==========================================
// 课表一致性引擎 - 上传文件解析器实现
// ==========================================
// 支持的 JSON 结构:
// - [{"timetable": [Week, ...]}, ...]
// - {"timetable": [Week, ...]}
// - [Week, ...]
// 编码: 仅 UTF-8, 自动去除 BOM
// 红线: 任一片段缺少 week_number / group_name 则整个来源拒绝
// ==========================================

use crate::domain::reconcile::IncomingFragment;
use crate::domain::timetable::Week;
use crate::engine::error::ValidationIssue;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::FileParser;
use serde_json::Value;
use std::path::Path;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const TIMETABLE_KEY: &str = "timetable";

// ==========================================
// JsonFragmentParser
// ==========================================
pub struct JsonFragmentParser;

impl JsonFragmentParser {
    /// 读取文件并解析, 来源取文件名
    pub fn parse_file(&self, path: &Path) -> ImportResult<IncomingFragment> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let bytes = std::fs::read(path)?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        self.parse(&source, &bytes)
    }
}

impl FileParser for JsonFragmentParser {
    fn parse(&self, source: &str, bytes: &[u8]) -> ImportResult<IncomingFragment> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let text = std::str::from_utf8(bytes).map_err(|e| ImportError::EncodingError {
            source_name: source.to_string(),
            message: e.to_string(),
        })?;

        let root: Value = serde_json::from_str(text).map_err(|e| ImportError::JsonParseError {
            source_name: source.to_string(),
            message: e.to_string(),
        })?;

        let raw_weeks = extract_weeks(source, root)?;

        let mut issues = Vec::new();
        let mut weeks = Vec::with_capacity(raw_weeks.len());
        for (idx, raw) in raw_weeks.into_iter().enumerate() {
            let before = issues.len();
            check_required_fields(&raw, &mut issues);

            if issues.len() == before {
                match serde_json::from_value::<Week>(raw) {
                    Ok(week) => weeks.push(week),
                    Err(e) => issues.push(ValidationIssue::new("week", e.to_string())),
                }
            }

            for issue in issues.iter_mut().skip(before) {
                issue.fragment = Some(idx);
                issue.source = Some(source.to_string());
            }
        }

        if !issues.is_empty() {
            tracing::warn!(source, issues = issues.len(), "上传文件片段校验失败");
            return Err(ImportError::InvalidFragments(issues));
        }

        tracing::info!(source, weeks = weeks.len(), "上传文件解析完成");
        Ok(IncomingFragment::new(source, weeks))
    }
}

/// 按三种结构取出周列表
fn extract_weeks(source: &str, root: Value) -> ImportResult<Vec<Value>> {
    let unsupported = |message: &str| ImportError::UnsupportedShape {
        source_name: source.to_string(),
        message: message.to_string(),
    };

    match root {
        Value::Object(mut obj) => match obj.remove(TIMETABLE_KEY) {
            Some(Value::Array(weeks)) => Ok(weeks),
            Some(_) => Err(unsupported("timetable 字段必须是数组")),
            None => Err(unsupported("缺少 timetable 字段")),
        },
        Value::Array(items) => {
            let wrapped = items
                .iter()
                .any(|item| item.get(TIMETABLE_KEY).is_some());
            if !wrapped {
                return Ok(items);
            }

            let mut weeks = Vec::new();
            for item in items {
                match item {
                    Value::Object(mut obj) => match obj.remove(TIMETABLE_KEY) {
                        Some(Value::Array(inner)) => weeks.extend(inner),
                        _ => return Err(unsupported("数组元素缺少 timetable 数组")),
                    },
                    _ => return Err(unsupported("数组元素必须是对象")),
                }
            }
            Ok(weeks)
        }
        _ => Err(unsupported("顶层必须是对象或数组")),
    }
}

/// 检查 week_number 与各组 group_name
fn check_required_fields(raw: &Value, issues: &mut Vec<ValidationIssue>) {
    let Some(obj) = raw.as_object() else {
        issues.push(ValidationIssue::new("week", "片段必须是对象"));
        return;
    };

    let week_number = obj.get("week_number").and_then(Value::as_u64);
    match week_number {
        Some(n) if n >= 1 && n <= u64::from(u32::MAX) => {}
        _ => issues.push(ValidationIssue::new("week_number", "周次缺失或不是正整数")),
    }

    let groups = obj.get("groups").and_then(Value::as_array);
    for group in groups.into_iter().flatten() {
        let has_name = group
            .get("group_name")
            .and_then(Value::as_str)
            .is_some_and(|name| !name.trim().is_empty());
        if !has_name {
            let mut issue = ValidationIssue::new("group_name", "组名缺失");
            if let Some(n) = week_number.and_then(|n| u32::try_from(n).ok()) {
                issue = issue.in_week(n);
            }
            issues.push(issue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::LessonType;
    use std::io::Write;

    const WEEK_5: &str = r#"{
        "week_number": 5,
        "date_start": "29.09.2025",
        "date_end": "2025-10-04",
        "groups": [{
            "group_name": "CS-101",
            "days": [{"weekday": 1, "lessons": [{
                "time": 1, "subject": "Math", "type": "л.",
                "teachers": [{"teacher_name": "Ivanov"}],
                "auditories": [{"auditory_name": "1.305"}]
            }]}]
        }]
    }"#;

    #[test]
    fn test_three_payload_shapes() {
        let parser = JsonFragmentParser;
        let shapes = [
            format!(r#"[{{"timetable": [{}]}}]"#, WEEK_5),
            format!(r#"{{"timetable": [{}]}}"#, WEEK_5),
            format!("[{}]", WEEK_5),
        ];

        for shape in &shapes {
            let fragment = parser.parse("a.json", shape.as_bytes()).unwrap();
            assert_eq!(fragment.source, "a.json");
            assert_eq!(fragment.weeks.len(), 1);
            let lesson = &fragment.weeks[0].groups[0].days[0].lessons[0];
            assert_eq!(lesson.kind, LessonType::Lecture);
            assert_eq!(lesson.primary_room().unwrap().as_str(), "1.305");
        }
    }

    #[test]
    fn test_bom_is_stripped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(format!("[{}]", WEEK_5).as_bytes());

        let fragment = JsonFragmentParser.parse("bom.json", &bytes).unwrap();
        assert_eq!(fragment.weeks[0].week_number, 5);
    }

    #[test]
    fn test_missing_fields_name_fragment_and_source() {
        let payload = r#"[
            {"week_number": 1, "date_start": "2025-09-01", "date_end": "2025-09-06", "groups": []},
            {"date_start": "2025-09-08", "date_end": "2025-09-13",
             "groups": [{"group_name": "", "days": []}]}
        ]"#;

        let err = JsonFragmentParser.parse("bad.json", payload.as_bytes()).unwrap_err();
        let issues = err.issues().unwrap();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.fragment == Some(1)));
        assert!(issues.iter().all(|i| i.source.as_deref() == Some("bad.json")));
        let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["week_number", "group_name"]);
    }

    #[test]
    fn test_wrong_field_type_is_reported() {
        let payload = r#"[{"week_number": 2, "date_start": "soon", "date_end": "2025-09-13"}]"#;

        let err = JsonFragmentParser.parse("dates.json", payload.as_bytes()).unwrap_err();
        let issues = err.issues().unwrap();
        assert_eq!(issues[0].field, "week");
        assert_eq!(issues[0].fragment, Some(0));
    }

    #[test]
    fn test_encoding_and_shape_errors() {
        let err = JsonFragmentParser.parse("cp1251.json", &[0xC0, 0xE1]).unwrap_err();
        assert!(matches!(err, ImportError::EncodingError { .. }));

        let err = JsonFragmentParser.parse("x.json", b"{\"weeks\": []}").unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedShape { .. }));

        let err = JsonFragmentParser.parse("x.json", b"{not json").unwrap_err();
        assert!(err.to_string().contains("x.json"));
    }

    #[test]
    fn test_parse_file_uses_file_name() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "[{}]", WEEK_5).unwrap();

        let fragment = JsonFragmentParser.parse_file(file.path()).unwrap();
        let expected = file.path().file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(fragment.source, expected);

        let missing = JsonFragmentParser.parse_file(Path::new("/nonexistent/t.json"));
        assert!(matches!(missing, Err(ImportError::FileNotFound(_))));
    }
}
