use rust_mrc::pipelines::example_builder::{
    build_examples, load_examples, read_examples, write_examples,
};
use rust_mrc::pipelines::question_answering::QuestionId;
use std::fs;
use std::io::{BufWriter, Cursor};

const SEARCH_LINES: &str = r#"{"question_id": 10, "question": "高铁可以带酒吗", "question_type": "YES_NO", "answer_docs": [0], "answers": ["可以"], "documents": [{"segmented_title": ["高铁", "带酒"], "segmented_paragraphs": [["高铁", "带酒", "：", "可以", "携带"]], "most_related_para": 0}]}
not a json line
{"question_id": 11, "question": "无答案文档", "question_type": "ENTITY", "answer_docs": [], "documents": []}
{"question_id": 12, "question": "段落越界", "question_type": "ENTITY", "answer_docs": [0], "documents": [{"segmented_title": [], "segmented_paragraphs": [], "most_related_para": 2}]}
{"question_id": 13, "question": "第二题", "question_type": "ENTITY", "answer_docs": [1, 0], "documents": [{"segmented_title": [], "segmented_paragraphs": [["甲"]], "most_related_para": 0}, {"segmented_title": ["标题"], "segmented_paragraphs": [["乙"], ["标题", "，", "丙", "丁"]], "most_related_para": 1}]}"#;

#[test]
fn skipped_lines_are_counted() -> anyhow::Result<()> {
    let batch = read_examples(Cursor::new(SEARCH_LINES))?;

    assert_eq!(batch.examples.len(), 2);
    assert_eq!(batch.skipped, 3);
    assert_eq!(batch.examples[0].question_id, QuestionId::Number(10));
    assert_eq!(batch.examples[0].passages[0].text, "可以携带");
    assert_eq!(batch.examples[1].question_id, QuestionId::Number(13));
    assert_eq!(batch.examples[1].passages[0].text, "丙丁");
    Ok(())
}

#[test]
fn invalid_utf8_lines_are_skipped() -> anyhow::Result<()> {
    let mut content = b"{\"question_id\": \xff}\n".to_vec();
    content.extend_from_slice(SEARCH_LINES.as_bytes());

    let batch = read_examples(Cursor::new(content))?;

    assert_eq!(batch.examples.len(), 2);
    assert_eq!(batch.skipped, 4);
    Ok(())
}

#[test]
fn examples_are_written_in_source_order() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let zhidao_file = dir.path().join("zhidao.dev.json");
    let search_file = dir.path().join("search.dev.json");
    let output = dir.path().join("predict.data");
    fs::write(
        &zhidao_file,
        r#"{"question_id": 1, "question": "知道", "question_type": "ENTITY", "answer_docs": [0], "documents": [{"segmented_title": [], "segmented_paragraphs": [["第一"]], "most_related_para": 0}]}"#,
    )?;
    fs::write(&search_file, SEARCH_LINES)?;

    let summary = build_examples(&[&zhidao_file, &search_file], &output)?;
    let examples = load_examples(&output)?;

    assert_eq!(summary.examples, 3);
    assert_eq!(summary.skipped, 3);
    let ids: Vec<QuestionId> = examples
        .iter()
        .map(|example| example.question_id.clone())
        .collect();
    assert_eq!(
        ids,
        vec![
            QuestionId::Number(1),
            QuestionId::Number(10),
            QuestionId::Number(13)
        ]
    );
    // an empty title still drops the first paragraph token
    assert_eq!(examples[0].passages[0].text, "");
    Ok(())
}

#[test]
fn written_examples_keep_the_example_layout() -> anyhow::Result<()> {
    let batch = read_examples(Cursor::new(SEARCH_LINES))?;
    let mut output = BufWriter::new(Vec::new());
    write_examples(&batch.examples[..1], &mut output)?;
    let line = String::from_utf8(output.into_inner()?)?;

    assert_eq!(
        line,
        "{\"id\":10,\"question_text\":\"高铁可以带酒吗\",\"question_type\":\"YES_NO\",\"doc_tokens\":[{\"doc_tokens\":\"可以携带\"}],\"answers\":[\"可以\"]}\n"
    );
    Ok(())
}
