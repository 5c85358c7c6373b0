use crate::models::{Language, LessonPlan, Presentation, StudentHandout};
use printpdf::*;
use std::io::BufWriter;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("PDF error: {0}")] Pdf(String),
}

/// A finished download.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Document formats offered for download. Kept behind a trait so the generation
/// core never depends on a document library.
pub trait Exporter: Send + Sync {
    fn presentation_text(&self, presentation: &Presentation, plan: Option<&LessonPlan>, lang: Language, speaker_notes: bool) -> ExportFile;
    fn presentation_deck(&self, presentation: &Presentation, plan: &LessonPlan, lang: Language, speaker_notes: bool) -> Result<ExportFile, ExportError>;
    fn handout_document(&self, handout: &StudentHandout, lang: Language) -> ExportFile;
    fn lesson_plan_pdf(&self, plan: &LessonPlan, lang: Language) -> Result<ExportFile, ExportError>;
}

pub struct Labels {
    pub app_title: &'static str,
    pub slide: &'static str,
    pub speaker_notes: &'static str,
    pub handout: &'static str,
    pub subject: &'static str,
    pub grade_level: &'static str,
    pub duration: &'static str,
    pub minutes: &'static str,
    pub teacher: &'static str,
    pub institution: &'static str,
    pub objectives: &'static str,
    pub prerequisites: &'static str,
    pub materials: &'static str,
    pub stages: &'static str,
    pub teacher_actions: &'static str,
    pub student_actions: &'static str,
}

impl Labels {
    pub fn for_language(lang: Language) -> &'static Labels {
        match lang {
            Language::En => &EN,
            Language::Fr => &FR,
            Language::Ar => &AR,
        }
    }
}

static EN: Labels = Labels {
    app_title: "AI Lesson Planner",
    slide: "Slide",
    speaker_notes: "Speaker Notes",
    handout: "Student Handout",
    subject: "Subject",
    grade_level: "Grade Level",
    duration: "Duration",
    minutes: "min",
    teacher: "Teacher",
    institution: "Institution",
    objectives: "Learning Objectives",
    prerequisites: "Prerequisites",
    materials: "Materials",
    stages: "Lesson Stages",
    teacher_actions: "Teacher Actions",
    student_actions: "Student Actions",
};

static FR: Labels = Labels {
    app_title: "Planificateur de cours IA",
    slide: "Diapositive",
    speaker_notes: "Notes de l'orateur",
    handout: "Fiche élève",
    subject: "Matière",
    grade_level: "Niveau",
    duration: "Durée",
    minutes: "min",
    teacher: "Enseignant",
    institution: "Établissement",
    objectives: "Objectifs d'apprentissage",
    prerequisites: "Prérequis",
    materials: "Matériel",
    stages: "Étapes du cours",
    teacher_actions: "Actions de l'enseignant",
    student_actions: "Actions des élèves",
};

static AR: Labels = Labels {
    app_title: "مخطط الدروس بالذكاء الاصطناعي",
    slide: "شريحة",
    speaker_notes: "ملاحظات المتحدث",
    handout: "ورقة عمل الطالب",
    subject: "المادة",
    grade_level: "المستوى",
    duration: "المدة",
    minutes: "دقيقة",
    teacher: "الأستاذ",
    institution: "المؤسسة",
    objectives: "أهداف التعلم",
    prerequisites: "المكتسبات القبلية",
    materials: "الوسائل",
    stages: "مراحل الدرس",
    teacher_actions: "أنشطة الأستاذ",
    student_actions: "أنشطة المتعلمين",
};

pub struct DocumentExporter;

impl Exporter for DocumentExporter {
    fn presentation_text(&self, presentation: &Presentation, plan: Option<&LessonPlan>, lang: Language, speaker_notes: bool) -> ExportFile {
        let labels = Labels::for_language(lang);
        let title = plan.map(|p| p.lesson_info.lesson_title.as_str()).unwrap_or(labels.app_title);
        let mut content = format!("{title}\n\n");
        for (index, slide) in presentation.slides.iter().enumerate() {
            content.push_str(&format!("--- {} {}: {} ---\n\n", labels.slide, index + 1, slide.title));
            for bullet in &slide.content {
                content.push_str(&format!("- {bullet}\n"));
            }
            content.push('\n');
            if speaker_notes {
                content.push_str(&format!("{}:\n{}\n\n", labels.speaker_notes, slide.speaker_notes));
            }
        }
        ExportFile { filename: "presentation.txt".into(), content_type: "text/plain; charset=utf-8", bytes: content.into_bytes() }
    }

    fn presentation_deck(&self, presentation: &Presentation, plan: &LessonPlan, lang: Language, speaker_notes: bool) -> Result<ExportFile, ExportError> {
        let labels = Labels::for_language(lang);
        let info = &plan.lesson_info;
        let mut pdf = PdfWriter::new(&info.lesson_title, SLIDE_SIZE)?;

        pdf.line(&info.lesson_title, 28.0, true);
        pdf.line(&format!("{} · {}", info.subject, info.grade_level), 16.0, false);
        if let Some(teacher) = &info.teacher_name {
            pdf.line(teacher, 14.0, false);
        }
        if let Some(institution) = &info.institution {
            pdf.line(institution, 14.0, false);
        }

        for (index, slide) in presentation.slides.iter().enumerate() {
            pdf.page(&format!("{} {}", labels.slide, index + 1));
            pdf.line(&slide.title, 24.0, true);
            pdf.gap(4.0);
            for (n, bullet) in slide.content.iter().enumerate() {
                pdf.wrapped(&format!("{}. {bullet}", n + 1), 16.0, false);
            }
            if speaker_notes && !slide.speaker_notes.is_empty() {
                pdf.gap(6.0);
                pdf.line(&format!("{}:", labels.speaker_notes), 10.0, true);
                pdf.wrapped(&slide.speaker_notes, 10.0, false);
            }
        }

        Ok(ExportFile {
            filename: format!("{}.pdf", file_stem(&info.lesson_title, "presentation")),
            content_type: "application/pdf",
            bytes: pdf.finish()?,
        })
    }

    fn handout_document(&self, handout: &StudentHandout, lang: Language) -> ExportFile {
        let labels = Labels::for_language(lang);
        let html = format!(
            "<html xmlns:o='urn:schemas-microsoft-com:office:office' xmlns:w='urn:schemas-microsoft-com:office:word' xmlns='http://www.w3.org/TR/REC-html40'>\
<head><meta charset='utf-8'><title>{title}</title></head><body dir=\"{dir}\" lang=\"{code}\">{body}</body></html>",
            title = labels.handout,
            dir = lang.dir(),
            code = lang.code(),
            body = handout.html_content,
        );
        ExportFile { filename: "student-handout.doc".into(), content_type: "application/msword", bytes: html.into_bytes() }
    }

    fn lesson_plan_pdf(&self, plan: &LessonPlan, lang: Language) -> Result<ExportFile, ExportError> {
        let labels = Labels::for_language(lang);
        let info = &plan.lesson_info;
        let mut pdf = PdfWriter::new(&info.lesson_title, A4)?;

        pdf.line(&info.lesson_title, 20.0, true);
        pdf.line(&format!("{}: {}", labels.subject, info.subject), 11.0, false);
        pdf.line(&format!("{}: {}", labels.grade_level, info.grade_level), 11.0, false);
        pdf.line(&format!("{}: {} {}", labels.duration, info.duration, labels.minutes), 11.0, false);
        if let Some(teacher) = &info.teacher_name {
            pdf.line(&format!("{}: {teacher}", labels.teacher), 11.0, false);
        }
        if let Some(institution) = &info.institution {
            pdf.line(&format!("{}: {institution}", labels.institution), 11.0, false);
        }

        for (heading, items) in [
            (labels.objectives, &plan.objectives),
            (labels.prerequisites, &plan.prerequisites),
            (labels.materials, &plan.materials),
        ] {
            pdf.gap(4.0);
            pdf.line(heading, 14.0, true);
            for item in items {
                pdf.wrapped(&format!("• {item}"), 11.0, false);
            }
        }

        pdf.gap(4.0);
        pdf.line(labels.stages, 14.0, true);
        for stage in &plan.stages {
            pdf.gap(2.0);
            pdf.line(&format!("{} ({} {})", stage.title, stage.duration, labels.minutes), 12.0, true);
            for (heading, actions) in [(labels.teacher_actions, &stage.teacher_actions), (labels.student_actions, &stage.student_actions)] {
                pdf.line(heading, 10.0, true);
                for action in actions {
                    pdf.wrapped(&format!("- {action}"), 10.0, false);
                }
            }
        }

        Ok(ExportFile { filename: "lesson-plan.pdf".into(), content_type: "application/pdf", bytes: pdf.finish()? })
    }
}

const A4: (f32, f32) = (210.0, 297.0);
const SLIDE_SIZE: (f32, f32) = (254.0, 142.9);
const MARGIN: f32 = 15.0;

/// Top-down text layout that starts a new page when the cursor reaches the bottom margin.
struct PdfWriter {
    doc: PdfDocumentReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    layer: PdfLayerReference,
    size: (f32, f32),
    y: f32,
}

impl PdfWriter {
    fn new(title: &str, size: (f32, f32)) -> Result<Self, ExportError> {
        let (doc, page, layer) = PdfDocument::new(truncate(title, 48), Mm(size.0), Mm(size.1), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self { doc, regular, bold, layer, size, y: size.1 - MARGIN })
    }

    fn page(&mut self, name: &str) {
        let (page, layer) = self.doc.add_page(Mm(self.size.0), Mm(self.size.1), name);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = self.size.1 - MARGIN;
    }

    fn line(&mut self, text: &str, font_size: f32, bold: bool) {
        let height = line_height(font_size);
        if self.y - height < MARGIN {
            self.page("continued");
        }
        self.y -= height;
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, font_size, Mm(MARGIN), Mm(self.y), font);
    }

    fn wrapped(&mut self, text: &str, font_size: f32, bold: bool) {
        for line in wrap(text, self.chars_per_line(font_size)) {
            self.line(&line, font_size, bold);
        }
    }

    fn gap(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn chars_per_line(&self, font_size: f32) -> usize {
        // Helvetica averages roughly half an em per glyph.
        let usable = self.size.0 - 2.0 * MARGIN;
        let glyph_mm = font_size * 0.5 * 0.3528;
        ((usable / glyph_mm) as usize).max(10)
    }

    fn finish(self) -> Result<Vec<u8>, ExportError> {
        let mut buf: Vec<u8> = Vec::new();
        {
            let mut writer = BufWriter::new(&mut buf);
            self.doc.save(&mut writer).map_err(pdf_err)?;
        }
        Ok(buf)
    }
}

fn pdf_err(e: impl std::fmt::Display) -> ExportError {
    ExportError::Pdf(e.to_string())
}

fn line_height(font_size: f32) -> f32 {
    font_size * 0.3528 * 1.4
}

/// Greedy word wrap by character count.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() { word.chars().count() } else { current.chars().count() + 1 + word.chars().count() };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max { s.to_string() } else { format!("{}…", s.chars().take(max).collect::<String>()) }
}

fn file_stem(title: &str, fallback: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if stem.is_empty() { fallback.to_string() } else { stem }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Slide, tests::fractions_plan};
    use pretty_assertions::assert_eq;

    fn deck() -> Presentation {
        Presentation {
            slides: vec![
                Slide { title: "Fractions".into(), content: vec!["What is a fraction?".into()], speaker_notes: "Welcome the class.".into() },
                Slide { title: "Halves".into(), content: vec!["1/2 + 1/2 = 1".into(), "Fold the paper".into()], speaker_notes: "Use paper strips.".into() },
            ],
        }
    }

    #[test]
    fn text_transcript_lists_slides_and_notes() {
        let file = DocumentExporter.presentation_text(&deck(), Some(&fractions_plan()), Language::En, true);
        let text = String::from_utf8(file.bytes).unwrap();
        assert_eq!(
            text,
            "Fractions\n\n\
--- Slide 1: Fractions ---\n\n- What is a fraction?\n\nSpeaker Notes:\nWelcome the class.\n\n\
--- Slide 2: Halves ---\n\n- 1/2 + 1/2 = 1\n- Fold the paper\n\nSpeaker Notes:\nUse paper strips.\n\n"
        );
        assert_eq!(file.filename, "presentation.txt");
    }

    #[test]
    fn text_transcript_can_drop_notes_and_localizes() {
        let file = DocumentExporter.presentation_text(&deck(), None, Language::Fr, false);
        let text = String::from_utf8(file.bytes).unwrap();
        assert!(text.starts_with("Planificateur de cours IA\n\n"));
        assert!(text.contains("--- Diapositive 2: Halves ---"));
        assert!(!text.contains("Notes de l'orateur"));
    }

    #[test]
    fn handout_document_wraps_html_with_direction() {
        let handout = StudentHandout { html_content: "<h1>الكسور</h1>".into() };
        let file = DocumentExporter.handout_document(&handout, Language::Ar);
        let html = String::from_utf8(file.bytes).unwrap();
        assert!(html.contains("urn:schemas-microsoft-com:office:word"));
        assert!(html.contains("<body dir=\"rtl\" lang=\"ar\"><h1>الكسور</h1></body></html>"));
        assert_eq!(file.content_type, "application/msword");
    }

    #[test]
    fn lesson_plan_pdf_is_a_pdf() {
        let file = DocumentExporter.lesson_plan_pdf(&fractions_plan(), Language::En).unwrap();
        assert!(file.bytes.starts_with(b"%PDF"));
        assert_eq!(file.filename, "lesson-plan.pdf");
    }

    #[test]
    fn long_plans_spill_onto_more_pages() {
        let mut plan = fractions_plan();
        plan.objectives = (0..200).map(|i| format!("Objective number {i} about comparing fractions")).collect();
        let file = DocumentExporter.lesson_plan_pdf(&plan, Language::En).unwrap();
        assert!(file.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn deck_is_named_after_the_lesson() {
        let file = DocumentExporter.presentation_deck(&deck(), &fractions_plan(), Language::En, true).unwrap();
        assert!(file.bytes.starts_with(b"%PDF"));
        assert_eq!(file.filename, "Fractions.pdf");
    }

    #[test]
    fn wrap_breaks_on_words() {
        assert_eq!(wrap("one two three four", 9), vec!["one two", "three", "four"]);
        assert_eq!(wrap("", 10), vec![""]);
        assert_eq!(wrap("supercalifragilistic", 5), vec!["supercalifragilistic"]);
    }

    #[test]
    fn file_stem_is_filesystem_safe() {
        assert_eq!(file_stem("Fractions: Part 1/2", "x"), "Fractions-Part-1-2");
        assert_eq!(file_stem("???", "presentation"), "presentation");
    }
}
