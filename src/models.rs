use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Fr,
    Ar,
}

impl Language {
    /// English name of the language, as written into prompts.
    pub fn name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Fr => "French",
            Language::Ar => "Arabic",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fr => "fr",
            Language::Ar => "ar",
        }
    }

    pub fn dir(self) -> &'static str {
        if self == Language::Ar { "rtl" } else { "ltr" }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Language::En),
            "fr" => Some(Language::Fr),
            "ar" => Some(Language::Ar),
            _ => None,
        }
    }

    /// Picks the language from a browser tag such as `fr-CA,fr;q=0.9`; anything unsupported is English.
    pub fn from_accept_language(header: &str) -> Self {
        let tag = header.trim().get(..2).unwrap_or_default().to_ascii_lowercase();
        Self::from_code(&tag).unwrap_or_default()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LessonRequest {
    pub subject: String,
    pub grade_level: String,
    pub lesson_title: String,
    pub duration: i64, // minutes
    pub unit: Option<String>,
    pub section: Option<String>,
    pub teacher_name: Option<String>,
    pub institution: Option<String>,
    pub school_year: Option<String>,
    pub didactic_support: Option<String>,
    pub methodology: Option<String>,
}

impl Default for LessonRequest {
    fn default() -> Self {
        Self {
            subject: String::new(),
            grade_level: String::new(),
            lesson_title: String::new(),
            duration: 45,
            unit: None,
            section: None,
            teacher_name: None,
            institution: None,
            school_year: None,
            didactic_support: None,
            methodology: None,
        }
    }
}

/// Field → message map, keyed by the camelCase field name the form uses.
#[derive(Debug, Error, Clone, PartialEq, Default, Serialize)]
#[error("invalid lesson request: {}", .fields.keys().cloned().collect::<Vec<_>>().join(", "))]
pub struct ValidationErrors {
    pub fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool { self.fields.is_empty() }
}

impl LessonRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        for (field, label, value) in [
            ("subject", "Subject", &self.subject),
            ("gradeLevel", "Grade Level", &self.grade_level),
            ("lessonTitle", "Lesson Title", &self.lesson_title),
        ] {
            if value.trim().is_empty() {
                errors.fields.insert(field, format!("{label} is required."));
            }
        }
        if self.duration <= 0 {
            errors.fields.insert("duration", "Duration must be a positive number.".to_string());
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Optional fields in prompt order, paired with their prompt labels.
    pub fn optional_fields(&self) -> [(&'static str, Option<&str>); 7] {
        [
            ("Unit", self.unit.as_deref()),
            ("Section", self.section.as_deref()),
            ("Teacher's Name", self.teacher_name.as_deref()),
            ("Institution", self.institution.as_deref()),
            ("School Year", self.school_year.as_deref()),
            ("Didactic Support", self.didactic_support.as_deref()),
            ("Lesson Methodology", self.methodology.as_deref()),
        ]
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LessonInfo {
    pub subject: String,
    pub grade_level: String,
    pub lesson_title: String,
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LessonStage {
    pub title: String,
    pub teacher_actions: Vec<String>,
    pub student_actions: Vec<String>,
    pub duration: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlan {
    pub lesson_info: LessonInfo,
    pub objectives: Vec<String>,
    pub prerequisites: Vec<String>,
    pub materials: Vec<String>,
    pub stages: Vec<LessonStage>,
}

impl LessonPlan {
    /// Sum of the stage durations. Only advisory: the generator is asked to match `lesson_info.duration`.
    pub fn stage_minutes(&self) -> u64 {
        self.stages.iter().map(|s| u64::from(s.duration)).sum()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub title: String,
    pub content: Vec<String>,
    pub speaker_notes: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Presentation {
    pub slides: Vec<Slide>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentHandout {
    pub html_content: String,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub fn fractions_request() -> LessonRequest {
        LessonRequest {
            subject: "Math".into(),
            grade_level: "5".into(),
            lesson_title: "Fractions".into(),
            duration: 45,
            ..LessonRequest::default()
        }
    }

    pub fn fractions_plan() -> LessonPlan {
        LessonPlan {
            lesson_info: LessonInfo {
                subject: "Math".into(),
                grade_level: "5".into(),
                lesson_title: "Fractions".into(),
                duration: 45,
                teacher_name: None,
                institution: None,
            },
            objectives: vec!["Compare fractions".into()],
            prerequisites: vec!["Division".into()],
            materials: vec!["Fraction strips".into()],
            stages: vec![
                LessonStage {
                    title: "Introduction".into(),
                    teacher_actions: vec!["Show a pizza cut in eighths".into()],
                    student_actions: vec!["Name the parts".into()],
                    duration: 10,
                },
                LessonStage {
                    title: "Practice".into(),
                    teacher_actions: vec!["Hand out strips".into()],
                    student_actions: vec!["Order fractions".into()],
                    duration: 35,
                },
            ],
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(fractions_request().validate().is_ok());
    }

    #[test]
    fn zero_duration_only_flags_duration() {
        let req = LessonRequest { duration: 0, ..fractions_request() };
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.fields.len(), 1);
        assert_eq!(errors.fields.get("duration").map(String::as_str), Some("Duration must be a positive number."));
    }

    #[test]
    fn blank_required_fields_are_reported_per_field() {
        let req = LessonRequest { subject: "   ".into(), lesson_title: String::new(), ..fractions_request() };
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.fields.get("subject").map(String::as_str), Some("Subject is required."));
        assert_eq!(errors.fields.get("lessonTitle").map(String::as_str), Some("Lesson Title is required."));
        assert_eq!(errors.fields.get("gradeLevel"), None);
    }

    #[test]
    fn request_uses_camel_case_on_the_wire() {
        let req: LessonRequest = serde_json::from_str(
            r#"{"subject":"Math","gradeLevel":"5","lessonTitle":"Fractions","duration":45,"teacherName":"Ms. Diallo"}"#,
        ).unwrap();
        assert_eq!(req.grade_level, "5");
        assert_eq!(req.teacher_name.as_deref(), Some("Ms. Diallo"));
        assert_eq!(req.unit, None);
    }

    #[test]
    fn stage_minutes_sums_stages() {
        assert_eq!(fractions_plan().stage_minutes(), 45);
    }

    #[test]
    fn stage_minutes_does_not_overflow() {
        let mut plan = fractions_plan();
        for stage in &mut plan.stages {
            stage.duration = 4_000_000_000;
        }
        assert_eq!(plan.stage_minutes(), 8_000_000_000);
    }

    #[test]
    fn language_from_browser_tag() {
        assert_eq!(Language::from_accept_language("fr-CA,fr;q=0.9"), Language::Fr);
        assert_eq!(Language::from_accept_language("ar"), Language::Ar);
        assert_eq!(Language::from_accept_language("de-DE"), Language::En);
        assert_eq!(Language::from_accept_language(""), Language::En);
        assert_eq!(Language::Ar.dir(), "rtl");
    }

    #[test]
    fn unknown_language_code_is_rejected() {
        assert!(serde_json::from_str::<Language>("\"es\"").is_err());
        assert_eq!(serde_json::from_str::<Language>("\"fr\"").unwrap(), Language::Fr);
    }
}
