use std::path::Path;
use std::process::{Command, Output};

use pdfseal::{Document, Object, PasswordRole, Stream, dictionary, verify_password};

fn write_sample(path: &Path) {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, b"BT /F1 12 Tf 72 720 Td (Hello) Tj ET".to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    std::fs::write(path, doc.save_to_vec().unwrap()).unwrap();
}

fn pdfprotect(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pdfprotect"))
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn protects_a_document() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    let output = dir.path().join("out.pdf");
    write_sample(&input);

    let result = pdfprotect(&[
        input.to_str().unwrap(),
        output.to_str().unwrap(),
        "-u",
        "read1234",
        "-o",
        "owner",
        "--permit",
        "print,copy",
    ]);

    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
    assert_eq!(
        String::from_utf8_lossy(&result.stdout).trim_end(),
        format!("Successfully saved encrypted PDF as: {}", output.display())
    );

    let bytes = std::fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"%PDF-2.0"));
    assert_eq!(verify_password(&bytes, "read1234").unwrap(), PasswordRole::User);
    assert_eq!(verify_password(&bytes, "owner").unwrap(), PasswordRole::Owner);
}

#[test]
fn missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("missing.pdf");
    let output = dir.path().join("out.pdf");

    let result = pdfprotect(&[input.to_str().unwrap(), output.to_str().unwrap(), "-u", "x"]);

    assert_eq!(result.status.code(), Some(1));
    assert_eq!(
        String::from_utf8_lossy(&result.stderr).trim_end(),
        format!("Input file not found: {}", input.display())
    );
    assert!(!output.exists());
}

#[test]
fn invalid_input_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    let output = dir.path().join("out.pdf");
    std::fs::write(&input, b"this is not a pdf").unwrap();

    let result = pdfprotect(&[input.to_str().unwrap(), output.to_str().unwrap(), "-u", "x"]);

    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&result.stderr).starts_with("Error encrypting PDF: "));
    assert!(!output.exists());
    // No temporary file is left behind either.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn unknown_permission_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    let output = dir.path().join("out.pdf");
    write_sample(&input);

    let result = pdfprotect(&[
        input.to_str().unwrap(),
        output.to_str().unwrap(),
        "-u",
        "x",
        "--permit",
        "print,teleport",
    ]);

    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&result.stderr).contains("teleport"));
    assert!(!output.exists());
}

#[test]
fn user_password_is_required() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    write_sample(&input);

    let result = pdfprotect(&[input.to_str().unwrap(), "out.pdf"]);
    assert!(!result.status.success());
}
