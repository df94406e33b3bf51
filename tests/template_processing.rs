//! End-to-end template processing on in-memory DOCX packages.

mod common;

use common::{entry, entry_names, para, row, table, DocxBuilder};
use doctmpl::engine::macros::repair;
use doctmpl::{Direction, DocPart, Error, TemplateDocument, TemplateOptions};
use std::collections::HashSet;
use zip::CompressionMethod;

fn open(data: Vec<u8>) -> TemplateDocument {
    TemplateDocument::from_bytes(data).unwrap()
}

fn body_of(doc: &TemplateDocument) -> &str {
    let main = doc.main_part();
    let start = main.find("<w:body>").unwrap() + "<w:body>".len();
    let end = main.find("</w:body>").unwrap();
    &main[start..end]
}

#[test]
fn test_set_value_greeting() {
    let mut doc = open(DocxBuilder::new().body(&para("${GREETING}, World")).build());
    assert_eq!(doc.set_value("GREETING", "Hello"), 1);
    assert_eq!(body_of(&doc), "<w:p><w:r><w:t>Hello, World</w:t></w:r></w:p>");
}

#[test]
fn test_set_value_in_headers_and_footers() {
    let data = DocxBuilder::new()
        .header(&para("Page of ${TITLE}"))
        .body(&para("${TITLE}"))
        .footer(&para("${TITLE} footer"))
        .build();
    let mut doc = open(data);
    assert_eq!(doc.set_value("${TITLE}", "Report"), 3);
    assert!(doc.part(DocPart::Header(1)).unwrap().contains("Page of Report"));
    assert!(doc.part(DocPart::Footer(1)).unwrap().contains("Report footer"));
}

#[test]
fn test_clone_row_three_times() {
    let body = table(&[row(&["Name"]), row(&["${NAME}"])]);
    let mut doc = open(DocxBuilder::new().body(&body).build());

    let original = doc.clone_row("NAME", 3).or_fail().unwrap();
    assert_eq!(original, row(&["${NAME}"]));
    assert_eq!(
        body_of(&doc),
        table(&[
            row(&["Name"]),
            row(&["${NAME#1}"]),
            row(&["${NAME#2}"]),
            row(&["${NAME#3}"]),
        ])
    );
}

#[test]
fn test_get_variables_no_duplicates() {
    let data = DocxBuilder::new()
        .header(&para("${B}"))
        .body(&para("${A} and ${A}"))
        .body(&para("broken ${C"))
        .build();
    let doc = open(data);

    let variables = doc.get_variables();
    assert_eq!(variables.len(), 2);
    let set: HashSet<&str> = variables.iter().map(String::as_str).collect();
    assert_eq!(set, HashSet::from(["A", "B"]));
}

#[test]
fn test_split_macro_repaired_on_open() {
    let body = "<w:p><w:r><w:t>Dear $</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>{NA</w:t></w:r><w:r><w:t>ME},</w:t></w:r></w:p>";
    let mut doc = open(DocxBuilder::new().body(body).build());
    assert_eq!(doc.get_variables(), vec!["NAME"]);
    assert_eq!(doc.set_value("NAME", "Ada"), 1);
    assert!(doc.main_part().contains("Dear Ada"));
}

#[test]
fn test_split_macro_kept_without_repair() {
    let body = "<w:p><w:r><w:t>$</w:t></w:r><w:r><w:t>{NAME}</w:t></w:r></w:p>";
    let options = TemplateOptions::default().with_repair_macros(false);
    let doc =
        TemplateDocument::from_bytes_with_options(DocxBuilder::new().body(body).build(), options)
            .unwrap();
    assert!(doc.get_variables().is_empty());
}

#[test]
fn test_repair_is_idempotent() {
    let samples = [
        "<w:p><w:r><w:t>$</w:t></w:r><w:r><w:t>{A}</w:t></w:r></w:p>",
        "<w:p><w:r><w:t>${A</w:t></w:r><w:r><w:t>}</w:t></w:r></w:p><w:p><w:r><w:t>${B}</w:t></w:r></w:p>",
        "<w:p><w:r><w:t>$ {not} ${</w:t></w:r></w:p><w:p><w:r><w:t>x}</w:t></w:r></w:p>",
        "no markup ${PLAIN} here",
    ];
    for xml in samples {
        let once = repair(xml, "</w:p>");
        assert_eq!(repair(&once, "</w:p>"), once, "input: {}", xml);
    }
}

#[test]
fn test_delete_row_with_vertical_merge() {
    let merged = |marker: &str, text: &str| {
        format!(
            "<w:tr><w:tc><w:tcPr>{}</w:tcPr>{}</w:tc><w:tc>{}</w:tc></w:tr>",
            marker,
            para(""),
            para(text)
        )
    };
    let body = table(&[
        merged("<w:vMerge w:val=\"restart\"/>", "${GROUP}"),
        merged("<w:vMerge/>", "second"),
        merged("<w:vMerge w:val=\"continue\"/>", "third"),
        merged("", "fourth"),
    ]);
    let mut doc = open(DocxBuilder::new().body(&body).build());

    let rows = doc.get_row("GROUP").found().unwrap();
    assert_eq!(rows.matches("<w:tr>").count(), 3);

    doc.delete_row("GROUP").or_fail().unwrap();
    let main = doc.main_part();
    assert!(!main.contains("second"));
    assert!(!main.contains("third"));
    assert!(main.contains("fourth"));
    assert_eq!(main.matches("<w:tr>").count(), 1);
}

#[test]
fn test_merged_rows_stop_at_table_end() {
    let first = table(&[format!(
        "<w:tr><w:tc><w:tcPr><w:vMerge w:val=\"restart\"/></w:tcPr>{}</w:tc></w:tr>",
        para("${ROW}")
    )]);
    let second = table(&[format!(
        "<w:tr><w:tc><w:tcPr><w:vMerge/></w:tcPr>{}</w:tc></w:tr>",
        para("other table")
    )]);
    let mut doc = open(DocxBuilder::new().body(&first).body(&second).build());

    doc.delete_row("ROW").or_fail().unwrap();
    assert!(doc.main_part().contains("other table"));
}

#[test]
fn test_replace_row() {
    let body = table(&[row(&["${X}"]), row(&["keep"])]);
    let mut doc = open(DocxBuilder::new().body(&body).build());
    doc.replace_row("X", &row(&["new"])).or_fail().unwrap();
    assert_eq!(body_of(&doc), table(&[row(&["new"]), row(&["keep"])]));
}

#[test]
fn test_inline_block_keeps_paragraph() {
    let body = para("Hello ${NAME}dear ${/NAME}friend");
    let mut doc = open(DocxBuilder::new().body(&body).build());

    assert_eq!(doc.get_block("NAME").found().as_deref(), Some("dear "));
    doc.replace_block("NAME", "old ").or_fail().unwrap();
    assert_eq!(body_of(&doc), para("Hello old friend"));
}

#[test]
fn test_inline_block_clone() {
    let body = para("${ITEM}x ${/ITEM}");
    let mut doc = open(DocxBuilder::new().body(&body).build());
    doc.clone_block("ITEM", 3, false).or_fail().unwrap();
    assert_eq!(body_of(&doc), para("x x x "));
}

#[test]
fn test_paragraph_block_replace() {
    let body = [
        para("before"),
        para("${SECTION}"),
        para("one"),
        para("two"),
        para("${/SECTION}"),
        para("after"),
    ]
    .concat();
    let mut doc = open(DocxBuilder::new().body(&body).build());

    doc.replace_block("SECTION", &para("replacement"))
        .or_fail()
        .unwrap();
    assert_eq!(
        body_of(&doc),
        [para("before"), para("replacement"), para("after")].concat()
    );
}

#[test]
fn test_clone_block_renumbers_every_copy() {
    let body = [para("${B}"), para("${X} / ${Y}"), para("${/B}")].concat();
    let mut doc = open(DocxBuilder::new().body(&body).build());

    doc.clone_block("B", 4, true).or_fail().unwrap();
    let main = doc.main_part();
    for i in 1..=4 {
        assert_eq!(main.matches(&format!("${{X#{}}}", i)).count(), 1);
        assert_eq!(main.matches(&format!("${{Y#{}}}", i)).count(), 1);
    }
    assert_eq!(main.matches("${X}").count(), 0);
    assert!(!main.contains("${B}"));
    assert!(!main.contains("${/B}"));
}

#[test]
fn test_delete_block() {
    let body = [para("${OPT}"), para("optional"), para("${/OPT}"), para("rest")].concat();
    let mut doc = open(DocxBuilder::new().body(&body).build());
    doc.delete_block("OPT").or_fail().unwrap();
    assert_eq!(body_of(&doc), para("rest"));
}

#[test]
fn test_block_without_close() {
    let mut doc = open(DocxBuilder::new().body(&para("${OPEN}")).build());
    let miss = doc.delete_block("OPEN");
    assert_eq!(miss, doctmpl::Located::MacroNotFound("${/OPEN}".to_string()));
}

#[test]
fn test_segment_directions() {
    let body = [para("previous"), para("${MARK}"), para("next")].concat();
    let doc = open(DocxBuilder::new().body(&body).build());

    let around = doc.get_segment("MARK", "w:p", Direction::Around, DocPart::Main);
    let right = doc.get_segment("MARK", "w:p", Direction::Right, DocPart::Main);
    let left = doc.get_segment("MARK", "w:p", Direction::Left, DocPart::Main);
    assert_eq!(around.found(), Some(para("${MARK}")));
    assert_eq!(right.found(), Some(para("next")));
    assert_eq!(left.found(), Some(para("previous")));
}

#[test]
fn test_segment_in_header() {
    let data = DocxBuilder::new()
        .header(&[para("${LOGO}"), para("line")].concat())
        .body(&para("body"))
        .build();
    let mut doc = open(data);

    doc.delete_segment("LOGO", "w:p", Direction::Around, DocPart::Header(1))
        .or_fail()
        .unwrap();
    assert_eq!(
        doc.part(DocPart::Header(1)).unwrap(),
        format!("<w:hdr>{}</w:hdr>", para("line"))
    );
}

#[test]
fn test_replace_segment() {
    let mut doc = open(DocxBuilder::new().body(&para("${IMG}")).build());
    doc.replace_segment("IMG", "w:p", Direction::Around, "<w:p/>", DocPart::Main)
        .or_fail()
        .unwrap();
    assert_eq!(body_of(&doc), "<w:p/>");
}

#[test]
fn test_misses_distinguished() {
    let mut doc = open(DocxBuilder::new().body(&para("${LONELY}")).build());

    let missing = doc.delete_row("ABSENT");
    assert!(missing.is_macro_missing());
    assert!(missing.found().is_none());

    let no_row = doc.delete_row("LONELY");
    assert!(no_row.is_tag_missing());

    match doc.clone_row("ABSENT", 2).or_fail() {
        Err(Error::MacroNotFound(name)) => assert_eq!(name, "${ABSENT}"),
        other => panic!("unexpected {:?}", other),
    }
    let message = doc.delete_row("LONELY").or_fail().unwrap_err().to_string();
    assert!(message.contains("w:tr"));
    assert!(message.contains("${LONELY}"));
}

#[test]
fn test_untouched_parts_round_trip() {
    let data = DocxBuilder::new()
        .header(&para("static header"))
        .body(&para("${A}"))
        .build();
    let mut doc = open(data.clone());
    doc.set_value("A", "filled");
    let out = doc.into_bytes().unwrap();

    assert_eq!(entry_names(&out), entry_names(&data));
    for name in ["word/header1.xml", "word/styles.xml", "[Content_Types].xml"] {
        assert_eq!(entry(&out, name), entry(&data, name), "{} changed", name);
    }
    assert_eq!(
        common::compression(&out, "word/styles.xml"),
        CompressionMethod::Stored
    );
    assert_ne!(entry(&out, "word/document.xml"), entry(&data, "word/document.xml"));
}

#[test]
fn test_operation_without_match_changes_nothing() {
    let data = DocxBuilder::new().body(&para("plain")).build();
    let mut doc = open(data.clone());
    assert_eq!(doc.set_value("NOTHING", "x"), 0);
    let _ = doc.delete_block("NOTHING");
    let out = doc.into_bytes().unwrap();
    assert_eq!(entry(&out, "word/document.xml"), entry(&data, "word/document.xml"));
}

#[test]
fn test_save_as_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("filled.docx");

    let mut doc = open(DocxBuilder::new().body(&para("${A}")).build());
    doc.set_value("A", "on disk");
    doc.save_as(&path).unwrap();

    let reopened = TemplateDocument::open(&path).unwrap();
    assert!(reopened.main_part().contains("on disk"));
}

#[test]
fn test_save_to_temporary_file() {
    let doc = open(DocxBuilder::new().body(&para("x")).build());
    let path = doc.save().unwrap();
    assert!(path.exists());
    assert!(path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("doctmpl") && n.ends_with(".docx")));
    std::fs::remove_file(path).unwrap();
}

#[test]
fn test_update_fields_setting() {
    let settings = r#"<w:settings xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:defaultTabStop w:val="720"/></w:settings>"#;
    let mut doc = open(DocxBuilder::new().body(&para("x")).settings(settings).build());
    doc.set_update_fields(true).unwrap();
    let out = doc.into_bytes().unwrap();
    let settings = String::from_utf8(entry(&out, "word/settings.xml")).unwrap();
    assert!(settings.ends_with("<w:updateFields w:val=\"true\"/></w:settings>"));
}

#[test]
fn test_row_ops_on_paragraph_after_table() {
    let body = [table(&[row(&["R1"]), row(&["R2"])]), para("${A}")].concat();
    let mut doc = open(DocxBuilder::new().body(&body).build());
    let before = doc.main_part().to_string();

    assert!(doc.get_row("A").is_tag_missing());
    assert!(doc.delete_row("A").is_tag_missing());
    assert!(doc.clone_row("A", 2).is_tag_missing());
    assert!(doc
        .delete_segment("A", "w:tr", Direction::Around, DocPart::Main)
        .is_tag_missing());
    assert_eq!(doc.main_part(), before);
}

#[test]
fn test_row_ops_on_paragraph_between_tables() {
    let body = [table(&[row(&["R1"])]), para("${A}"), table(&[row(&["R2"])])].concat();
    let mut doc = open(DocxBuilder::new().body(&body).build());
    let before = doc.main_part().to_string();

    assert!(doc.delete_row("A").is_tag_missing());
    assert!(doc.replace_row("A", "<w:tr/>").is_tag_missing());
    assert!(doc
        .get_segment("A", "w:tr", Direction::Around, DocPart::Main)
        .is_tag_missing());
    assert!(doc
        .clone_segment("A", "w:tbl", Direction::Around, 2, DocPart::Main, true)
        .is_tag_missing());
    assert_eq!(doc.main_part(), before);

    assert_eq!(
        doc.get_segment("A", "w:p", Direction::Around, DocPart::Main).found(),
        Some(para("${A}"))
    );
}
