//! Integration tests for the external converter, using shell scripts that
//! stand in for the office suite.
#![cfg(unix)]

mod support;

use std::path::Path;

use prkeeper_core::classify::{
    ClassifierConfig, ClassifyError, DocumentClassifier, RejectionReason, ScratchSpace,
};
use prkeeper_core::convert::{ConversionResult, ConvertError, LegacyConverter, SofficeConverter};
use support::fixtures::{alice_docx, fake_converter, fake_converter_calls, legacy_doc_bytes};
use tempfile::TempDir;

/// A converter script that copies `fixture` to the expected output path.
fn copying_converter(tools: &Path, fixture: &[u8]) -> SofficeConverter {
    let fixture_path = tools.join("fixture.docx");
    std::fs::write(&fixture_path, fixture).expect("write fixture");
    let script = fake_converter(
        tools,
        "soffice-ok",
        &format!("cp \"{}\" \"$outdir/$stem.docx\"", fixture_path.display()),
    );
    SofficeConverter::new(script, "docx")
}

#[test]
fn test_successful_conversion_produces_document_at_expected_path() {
    let tools = TempDir::new().expect("tools dir");
    let scratch = ScratchSpace::temporary().expect("scratch");
    let converter = copying_converter(tools.path(), &alice_docx());
    let raw = scratch.stage("00014", &legacy_doc_bytes()).expect("stage");
    let input = raw.path().to_path_buf();

    let result = converter.convert(raw).expect("convert");

    let ConversionResult::Converted(converted) = result else {
        panic!("conversion should succeed");
    };
    assert_eq!(converted.path(), scratch.dir().join("00014.docx"));
    assert_eq!(converted.id(), "00014");
    assert_eq!(std::fs::read(converted.path()).expect("read"), alice_docx());
    assert!(!input.exists(), "legacy input is consumed");
    assert_eq!(fake_converter_calls(tools.path()), 1);
}

#[test]
fn test_converter_receives_fixed_arguments() {
    let tools = TempDir::new().expect("tools dir");
    let scratch = ScratchSpace::temporary().expect("scratch");
    let converter = copying_converter(tools.path(), &alice_docx());
    let raw = scratch.stage("00015", &legacy_doc_bytes()).expect("stage");

    let _ = converter.convert(raw).expect("convert");

    let log = std::fs::read_to_string(tools.path().join("calls.log")).expect("calls log");
    let expected = format!(
        "--headless --convert-to docx --outdir {} {}",
        scratch.dir().display(),
        scratch.dir().join("00015").display()
    );
    assert_eq!(log.trim_end(), expected);
}

#[test]
fn test_nonzero_exit_is_conversion_failure() {
    let tools = TempDir::new().expect("tools dir");
    let scratch = ScratchSpace::temporary().expect("scratch");
    let converter = SofficeConverter::new(fake_converter(tools.path(), "soffice-exit1", "exit 1"), "docx");
    let classifier = DocumentClassifier::new(ClassifierConfig::default(), converter);

    for _ in 0..2 {
        let raw = scratch.stage("00016", &legacy_doc_bytes()).expect("stage");
        let outcome = classifier.classify(raw).expect("classify");
        assert_eq!(
            outcome.rejection_reason(),
            Some(RejectionReason::ConversionFailed)
        );
    }
    assert_eq!(fake_converter_calls(tools.path()), 2);
}

#[test]
fn test_success_exit_without_output_is_conversion_failure() {
    let tools = TempDir::new().expect("tools dir");
    let scratch = ScratchSpace::temporary().expect("scratch");
    let converter = SofficeConverter::new(fake_converter(tools.path(), "soffice-noop", "exit 0"), "docx");
    let classifier = DocumentClassifier::new(ClassifierConfig::default(), converter);

    for _ in 0..2 {
        let raw = scratch.stage("00017", &legacy_doc_bytes()).expect("stage");
        let outcome = classifier.classify(raw).expect("classify");
        assert_eq!(
            outcome.rejection_reason(),
            Some(RejectionReason::ConversionFailed)
        );
    }
}

#[test]
fn test_stale_output_does_not_mask_failure() {
    let tools = TempDir::new().expect("tools dir");
    let scratch = ScratchSpace::temporary().expect("scratch");
    std::fs::write(scratch.dir().join("00018.docx"), alice_docx()).expect("stale output");
    let converter = SofficeConverter::new(fake_converter(tools.path(), "soffice-noop", "exit 0"), "docx");
    let raw = scratch.stage("00018", &legacy_doc_bytes()).expect("stage");

    let result = converter.convert(raw).expect("convert");

    assert!(matches!(result, ConversionResult::Failed));
}

#[test]
fn test_classifier_accepts_converted_document() {
    let tools = TempDir::new().expect("tools dir");
    let scratch = ScratchSpace::temporary().expect("scratch");
    let classifier = DocumentClassifier::new(
        ClassifierConfig::default(),
        copying_converter(tools.path(), &alice_docx()),
    );
    let raw = scratch.stage("00019", &legacy_doc_bytes()).expect("stage");

    let outcome = classifier.classify(raw).expect("classify");

    assert!(outcome.is_accepted(), "converted document should be accepted");
}

#[test]
fn test_converter_output_still_legacy_is_unexpected_format() {
    let tools = TempDir::new().expect("tools dir");
    let scratch = ScratchSpace::temporary().expect("scratch");
    let classifier = DocumentClassifier::new(
        ClassifierConfig::default(),
        copying_converter(tools.path(), &legacy_doc_bytes()),
    );
    let raw = scratch.stage("00020", &legacy_doc_bytes()).expect("stage");

    let outcome = classifier.classify(raw).expect("classify");

    assert_eq!(
        outcome.rejection_reason(),
        Some(RejectionReason::UnexpectedFormat)
    );
    assert_eq!(fake_converter_calls(tools.path()), 1);
}

#[test]
fn test_missing_converter_binary_is_fatal() {
    let scratch = ScratchSpace::temporary().expect("scratch");
    let classifier = DocumentClassifier::new(
        ClassifierConfig::default(),
        SofficeConverter::new("/nonexistent/prkeeper/soffice", "docx"),
    );
    let raw = scratch.stage("00021", &legacy_doc_bytes()).expect("stage");

    let err = classifier.classify(raw).unwrap_err();

    assert!(
        matches!(
            err,
            ClassifyError::Converter(ConvertError::ProgramNotFound { .. })
        ),
        "unexpected error: {err}"
    );
}
