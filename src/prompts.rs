use crate::models::{Language, LessonPlan, LessonRequest};

const JSON_ONLY: &str = "Your response must be a valid JSON object matching the provided schema. Do not include any text before or after the JSON object.";

fn plan_json(plan: &LessonPlan) -> String {
    // Plain data structs always serialize.
    serde_json::to_string_pretty(plan).unwrap_or_default()
}

pub fn lesson_plan_prompt(request: &LessonRequest, lang: Language) -> String {
    let language = lang.name();
    let duration = request.duration;
    let optional: String = request
        .optional_fields()
        .into_iter()
        .filter_map(|(label, value)| value.filter(|v| !v.trim().is_empty()).map(|v| format!("- {label}: {v}\n")))
        .collect();

    format!(
        "You are an expert instructional designer. Your task is to generate a comprehensive lesson plan based on the following details.\n\
The entire output, including all keys and values, must be in {language}.\n\
\n\
Lesson Details:\n\
- Subject: {subject}\n\
- Grade Level: {grade}\n\
- Lesson Title: {title}\n\
- Duration: {duration} minutes\n\
{optional}\
\n\
Generate a detailed lesson plan with the following structure.\n\
- lessonInfo: An object containing:\n\
  - subject: The lesson subject.\n\
  - gradeLevel: The grade level.\n\
  - lessonTitle: The lesson title.\n\
  - duration: The total duration in minutes.\n\
  - teacherName: The teacher's name, if provided.\n\
  - institution: The institution's name, if provided.\n\
- objectives: A list of 3-5 key learning objectives.\n\
- prerequisites: A list of skills or knowledge students should have before this lesson.\n\
- materials: A list of necessary materials for the lesson.\n\
- stages: An array of lesson stages (e.g., Introduction, Activity 1, Assessment, Conclusion). Each stage must include:\n\
  - title: The name of the stage.\n\
  - teacherActions: A list of actions the teacher will perform.\n\
  - studentActions: A list of actions the students will perform.\n\
  - duration: The estimated duration of this stage in minutes. The sum of all stage durations must equal the total lesson duration of {duration} minutes.\n\
\n\
{JSON_ONLY}\n",
        subject = request.subject,
        grade = request.grade_level,
        title = request.lesson_title,
    )
}

pub fn presentation_prompt(plan: &LessonPlan, lang: Language) -> String {
    let language = lang.name();
    let plan = plan_json(plan);
    format!(
        "You are an expert in creating educational presentations. Based on the following lesson plan, generate a slide-by-slide presentation.\n\
The entire output must be in {language}.\n\
\n\
Lesson Plan:\n\
{plan}\n\
\n\
Generate a presentation with an array of slides. Each slide should have:\n\
- title: A concise title for the slide.\n\
- content: A list of key bullet points (3-5 per slide).\n\
- speakerNotes: Detailed notes for the teacher to use when presenting the slide.\n\
\n\
Create a logical flow, starting with an introduction/title slide, covering each lesson stage, and ending with a summary or conclusion slide.\n\
{JSON_ONLY}\n"
    )
}

pub fn handout_prompt(plan: &LessonPlan, lang: Language) -> String {
    let language = lang.name();
    let plan = plan_json(plan);
    format!(
        "You are a teacher skilled at simplifying complex topics for students. Based on the following lesson plan, create a student-friendly handout in HTML format.\n\
The entire HTML content must be in {language}.\n\
\n\
Lesson Plan:\n\
{plan}\n\
\n\
The HTML should be a single, self-contained block of content. Use simple and engaging language.\n\
- Start with a clear title (<h1>).\n\
- Briefly explain the main goals of the lesson in a section (<h2>What will we learn today?</h2>).\n\
- Summarize the key information from each stage of the lesson using headings (<h3>) and paragraphs (<p>) or lists (<ul>, <li>).\n\
- Include a short summary or key takeaways at the end.\n\
- Use basic HTML tags only: <h1>, <h2>, <h3>, <p>, <ul>, <ol>, <li>, <strong>, <em>. Do not include <style>, <script>, <html>, <head>, or <body> tags.\n\
\n\
Your response must be a valid JSON object containing a single key \"htmlContent\" with the full HTML string as its value. Do not include any text before or after the JSON object.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::{fractions_plan, fractions_request};

    fn full_request() -> LessonRequest {
        LessonRequest {
            unit: Some("Unit 3: Numbers".into()),
            section: Some("5B".into()),
            teacher_name: Some("Amina Haddad".into()),
            institution: Some("École Jean Jaurès".into()),
            school_year: Some("2026-2027".into()),
            didactic_support: Some("Textbook p. 42".into()),
            methodology: Some("Inquiry-based learning".into()),
            ..fractions_request()
        }
    }

    #[test]
    fn plan_prompt_embeds_every_optional_value_and_language() {
        for lang in [Language::En, Language::Fr, Language::Ar] {
            let req = full_request();
            let prompt = lesson_plan_prompt(&req, lang);
            for (_, value) in req.optional_fields() {
                assert!(prompt.contains(value.unwrap()), "missing {value:?}");
            }
            assert!(prompt.contains(&format!("must be in {}", lang.name())));
        }
    }

    #[test]
    fn plan_prompt_skips_empty_optional_fields() {
        let req = LessonRequest { unit: Some(String::new()), section: Some("  ".into()), ..fractions_request() };
        let prompt = lesson_plan_prompt(&req, Language::En);
        assert!(!prompt.contains("- Unit:"));
        assert!(!prompt.contains("- Section:"));
        assert!(!prompt.contains("- Institution:"));
        assert!(prompt.contains("- Subject: Math\n"));
        assert!(prompt.contains("- Duration: 45 minutes\n"));
        assert!(prompt.contains("total lesson duration of 45 minutes"));
    }

    #[test]
    fn plan_prompt_is_deterministic() {
        let req = full_request();
        assert_eq!(lesson_plan_prompt(&req, Language::Fr), lesson_plan_prompt(&req, Language::Fr));
    }

    #[test]
    fn presentation_prompt_embeds_plan_json() {
        let prompt = presentation_prompt(&fractions_plan(), Language::Fr);
        assert!(prompt.contains("\"lessonTitle\": \"Fractions\""));
        assert!(prompt.contains("must be in French"));
        assert!(prompt.contains(JSON_ONLY));
    }

    #[test]
    fn handout_prompt_restricts_tags() {
        let prompt = handout_prompt(&fractions_plan(), Language::Ar);
        assert!(prompt.contains("must be in Arabic"));
        assert!(prompt.contains("\"htmlContent\""));
        assert!(prompt.contains("Do not include <style>, <script>"));
    }
}
