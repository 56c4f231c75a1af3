use questionnaire_spec::{
    AnswerStore, ExportFormat, ExportOptions, QuestionSchema, Respondent, RowKind, Section,
    TableDocument, TextLayout, build_rows, encode_text, export, render_table_json,
    render_template, render_text,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "two_sections" => include_str!("../tests/fixtures/two_sections.json"),
        "legacy_answers" => include_str!("../tests/fixtures/legacy_answers.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn test_schema() -> QuestionSchema {
    QuestionSchema::new(vec![Section::new("Test", ["Q1?"])]).expect("schema")
}

fn household() -> QuestionSchema {
    QuestionSchema::from_json(fixture("two_sections")).expect("fixture schema")
}

fn household_answers() -> AnswerStore {
    AnswerStore::new()
        .with_answer(Respondent::Spouse1, "Salary:", "4200")
        .with_answer(Respondent::Spouse2, "Salary:", "3900")
        .with_answer(Respondent::Spouse2, "Bonus:", "none")
        .with_answer(Respondent::Spouse1, "Expenses_comments", "Shared car,\nsplit fuel")
        .with_answer(Respondent::Spouse1, "Dropped question:", "stale")
}

#[test]
fn interleaved_text_lists_both_spouses_under_each_question() {
    let schema = test_schema();
    let store = AnswerStore::new().with_answer(Respondent::Spouse1, "Q1?", "yes");

    let text = render_text(&schema, &store, TextLayout::Interleaved);
    assert!(text.contains("Q1?\nSpouse 1: yes\nSpouse 2: \n"));
    assert_eq!(
        text,
        "=============================\n\
         Alimony Questionnaire\n\
         =============================\n\
         \n\
         =============================\n\
         Test\n\
         =============================\n\
         \n\
         Q1?\n\
         Spouse 1: yes\n\
         Spouse 2: \n\
         \n\
         Additional Comments:\n\
         Spouse 1: \n\
         Spouse 2: \n"
    );
}

#[test]
fn per_respondent_text_matches_block_layout() {
    let schema = test_schema();
    let store = AnswerStore::new().with_answer(Respondent::Spouse1, "Q1?", "yes");

    let bytes = encode_text(&schema, &store, TextLayout::PerRespondent);
    let text = String::from_utf8(bytes).expect("utf8");
    let rule = "=============================";
    let expected = format!(
        "\n{rule}\nSpouse 1 Responses\n{rule}\n\nTest\n\nQ1?\nyes\n\nAdditional Comments:\n\n\
         \n{rule}\nSpouse 2 Responses\n{rule}\n\nTest\n\nQ1?\n\n\nAdditional Comments:\n\n"
    );
    assert_eq!(text, expected);
}

#[test]
fn text_export_keeps_answers_verbatim_and_skips_stale_keys() {
    let schema = household();
    let store = household_answers()
        .with_answer(Respondent::Spouse2, "Rent:", "€1 100 <shared> & \"split\"");

    let text = render_text(&schema, &store, TextLayout::Interleaved);
    assert!(text.starts_with("=============================\nHousehold Review\n"));
    assert!(text.contains("\n=============================\nIncome\n=============================\n"));
    assert!(text.contains("Salary:\nSpouse 1: 4200\nSpouse 2: 3900\n"));
    assert!(text.contains("Bonus:\nSpouse 1: \nSpouse 2: none\n"));
    assert!(text.contains("Spouse 2: €1 100 <shared> & \"split\"\n"));
    assert!(text.contains("Additional Comments:\nSpouse 1: Shared car,\nsplit fuel\n"));
    assert!(!text.contains("stale"));

    let per_respondent = render_text(&schema, &store, TextLayout::PerRespondent);
    assert!(per_respondent.contains("\nSalary:\n4200\n"));
    assert!(per_respondent.contains("\nSalary:\n3900\n"));
    assert!(!per_respondent.contains("stale"));
}

#[test]
fn build_rows_for_single_question_section() {
    let schema = test_schema();
    let store = AnswerStore::new().with_answer(Respondent::Spouse1, "Q1?", "yes");

    let rows = build_rows(&schema, &store);
    let cells = rows.iter().map(|row| row.cells()).collect::<Vec<_>>();
    assert_eq!(
        cells,
        vec![
            ["Test", "", ""],
            ["Q1?", "yes", ""],
            ["Additional Comments", "", ""],
        ]
    );
    assert_eq!(rows[0].kind, RowKind::SectionHeader);
    assert_eq!(rows[1].kind, RowKind::Question);
    assert_eq!(rows[2].kind, RowKind::Comments);
}

#[test]
fn build_rows_count_and_order_follow_schema() {
    let schema = household();
    let rows = build_rows(&schema, &household_answers());
    let expected: usize = schema
        .sections()
        .iter()
        .map(|section| section.questions.len() + 2)
        .sum();
    assert_eq!(rows.len(), expected);

    let labels = rows.iter().map(|row| row.label.as_str()).collect::<Vec<_>>();
    assert_eq!(
        labels,
        vec![
            "Income",
            "Salary:",
            "Bonus:",
            "Additional Comments",
            "Expenses",
            "Rent:",
            "Additional Comments",
        ]
    );
    assert_eq!(rows[6].respondent1, "Shared car,\nsplit fuel");
    assert_eq!(rows[1].respondent2, "3900");
}

#[test]
fn builtin_schema_yields_fifty_rows() {
    let schema = QuestionSchema::builtin().expect("builtin");
    let rows = build_rows(&schema, &AnswerStore::new());
    assert_eq!(rows.len(), 50);
    assert!(rows.iter().all(|row| row.respondent1.is_empty() && row.respondent2.is_empty()));
}

#[test]
fn pagination_carries_trailing_section_header() {
    let schema = household();
    let document = TableDocument::from_store(&schema, &household_answers());

    let pages = document.paginate(5);
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].rows.len(), 4);
    assert_eq!(pages[1].rows[0].label, "Expenses");
    assert_eq!(pages[1].rows[0].kind, RowKind::SectionHeader);

    let pages = document.paginate(4);
    assert_eq!(
        pages.iter().map(|page| page.rows.len()).collect::<Vec<_>>(),
        vec![4, 3]
    );
    assert_eq!(
        pages.iter().map(|page| page.number).collect::<Vec<_>>(),
        vec![1, 2]
    );
}

#[test]
fn pagination_never_leaves_empty_pages() {
    let schema = household();
    let document = TableDocument::from_store(&schema, &AnswerStore::new());
    for per_page in 0..10 {
        let pages = document.paginate(per_page);
        assert!(pages.iter().all(|page| !page.rows.is_empty()));
        let total: usize = pages.iter().map(|page| page.rows.len()).sum();
        assert_eq!(total, document.rows.len());
        for page in &pages[..pages.len() - 1] {
            if page.rows.len() > 1 {
                assert_ne!(page.rows.last().map(|row| row.kind), Some(RowKind::SectionHeader));
            }
        }
    }
    assert_eq!(document.paginate(0).len(), document.rows.len());
}

#[test]
fn huge_page_size_yields_one_page() {
    let schema = QuestionSchema::builtin().expect("builtin");
    let store = AnswerStore::new();
    let document = TableDocument::from_store(&schema, &store);

    let pages = document.paginate(usize::MAX);
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].rows.len(), 50);
    assert_eq!(document.paginate(1 << 40).len(), 1);

    let options = ExportOptions {
        rows_per_page: usize::MAX,
        ..ExportOptions::default()
    };
    let pdf = export(&schema, &store, ExportFormat::Pdf, options);
    let payload: serde_json::Value = serde_json::from_slice(&pdf.bytes).expect("table json");
    assert_eq!(payload["page_count"], 1);
    assert_eq!(payload["pages"][0]["rows"].as_array().map(Vec::len), Some(50));
}

#[test]
fn table_json_exposes_columns_and_pages() {
    let schema = household();
    let document = TableDocument::from_store(&schema, &household_answers());
    let payload = render_table_json(&document, 4);

    assert_eq!(payload["title"], "Household Review");
    assert_eq!(payload["columns"][0], "Question");
    assert_eq!(payload["columns"][1], "Spouse 1");
    assert_eq!(payload["columns"][2], "Spouse 2");
    assert_eq!(payload["row_count"], 7);
    assert_eq!(payload["page_count"], 2);
    assert_eq!(payload["pages"][0]["rows"][0]["kind"], "section_header");
    assert_eq!(payload["pages"][0]["rows"][1]["cells"][1], "4200");
}

#[test]
fn export_names_files_after_schema_stem() {
    let schema = QuestionSchema::builtin().expect("builtin");
    let store = AnswerStore::new();

    let text = export(&schema, &store, ExportFormat::Text, ExportOptions::default());
    assert_eq!(text.file_name, "Alimony_Questionnaire.txt");
    let json = export(&schema, &store, ExportFormat::Json, ExportOptions::default());
    assert_eq!(json.file_name, "Alimony_Questionnaire.json");
    let pdf = export(&schema, &store, ExportFormat::Pdf, ExportOptions::default());
    assert_eq!(pdf.file_name, "Alimony_Questionnaire.pdf.table.json");
    let docx = export(&schema, &store, ExportFormat::Docx, ExportOptions::default());
    assert_eq!(docx.file_name, "Alimony_Questionnaire.docx.table.json");

    let payload: serde_json::Value = serde_json::from_slice(&pdf.bytes).expect("table json");
    assert_eq!(payload["row_count"], 50);
    assert_eq!(payload["rows_per_page"], 25);
}

#[test]
fn custom_title_and_stem_flow_into_exports() {
    let schema = test_schema()
        .with_title("Mediation Intake")
        .with_file_stem("Mediation_Intake");
    let store = AnswerStore::new();

    let text = export(&schema, &store, ExportFormat::Text, ExportOptions::default());
    assert_eq!(text.file_name, "Mediation_Intake.txt");
    let rendered = String::from_utf8(text.bytes).expect("utf8");
    assert!(rendered.starts_with("=============================\nMediation Intake\n"));

    let docx = export(&schema, &store, ExportFormat::Docx, ExportOptions::default());
    assert_eq!(docx.file_name, "Mediation_Intake.docx.table.json");
    assert_eq!(TableDocument::from_store(&schema, &store).title, "Mediation Intake");
}

#[test]
fn template_renders_answers_without_escaping() {
    let schema = household();
    let store = household_answers().with_answer(Respondent::Spouse2, "Rent:", "<900>");
    let template = "{{title}}\n{{#each sections}}[{{title}}]{{#each questions}} {{text}}={{#each answers}}{{value}};{{/each}}{{/each}}|{{/each}}";

    let rendered = render_template(template, &schema, &store).expect("render");
    assert_eq!(
        rendered,
        "Household Review\n[Income] Salary:=4200;3900; Bonus:=;none;|[Expenses] Rent:=;<900>;|"
    );
}

#[test]
fn template_reports_unknown_fields() {
    let schema = household();
    let result = render_template("{{missing_field}}", &schema, &AnswerStore::new());
    assert!(result.is_err());
}
