//! Voucher document generation
//!
//! Claim and payment vouchers are produced by merging transaction fields
//! into `.docx` templates and writing the result to the export directory.

pub mod format;
pub mod template;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DocumentsConfig;
use crate::entity::transaction;

pub use format::{amount_in_words, format_currency, format_date, number_to_words};
pub use template::merge_docx;

#[derive(Debug, Error)]
pub enum DocError {
    #[error("template not found: {0}")]
    TemplateNotFound(PathBuf),

    #[error("template archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("template part is not UTF-8: {0}")]
    Encoding(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherKind {
    Claim,
    Payment,
}

impl VoucherKind {
    pub fn template_file(&self) -> &'static str {
        match self {
            VoucherKind::Claim => "claim_voucher.docx",
            VoucherKind::Payment => "payment_voucher.docx",
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            VoucherKind::Claim => "CV",
            VoucherKind::Payment => "PV",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedDocument {
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct DocumentGenerator {
    template_dir: PathBuf,
    export_dir: PathBuf,
    url_prefix: String,
}

impl DocumentGenerator {
    pub fn new(config: &DocumentsConfig) -> Self {
        Self {
            template_dir: config.template_dir.clone(),
            export_dir: config.export_dir.clone(),
            url_prefix: config.export_url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Merge `fields` into `template_name` and write `<output_stem>.docx`.
    /// Blocking; call from `spawn_blocking` in async code.
    pub fn generate(
        &self,
        template_name: &str,
        fields: &HashMap<String, String>,
        output_stem: &str,
    ) -> Result<GeneratedDocument, DocError> {
        let template_path = self.template_dir.join(template_name);
        if !template_path.is_file() {
            return Err(DocError::TemplateNotFound(template_path));
        }

        let template = std::fs::read(&template_path)?;
        let merged = merge_docx(&template, fields)?;

        std::fs::create_dir_all(&self.export_dir)?;
        let file_name = format!("{}.docx", output_stem);
        let path = self.export_dir.join(&file_name);
        let tmp_path = path.with_extension("docx.partial");
        std::fs::write(&tmp_path, &merged)?;
        std::fs::rename(&tmp_path, &path)?;

        tracing::info!("Generated {} from {}", path.display(), template_name);

        Ok(GeneratedDocument {
            url: format!("{}/{}", self.url_prefix, file_name),
            file_name,
            path,
        })
    }

    pub fn generate_voucher(
        &self,
        kind: VoucherKind,
        tx: &transaction::Model,
        today: NaiveDate,
    ) -> Result<GeneratedDocument, DocError> {
        let fields = voucher_fields(kind, tx, today);
        let stem = format!("{}_{}", kind.template_file().trim_end_matches(".docx"), tx.id);
        self.generate(kind.template_file(), &fields, &stem)
    }
}

pub fn voucher_number(kind: VoucherKind, id: i64) -> String {
    format!("{}-{:06}", kind.prefix(), id)
}

/// Template tags for a voucher
pub fn voucher_fields(
    kind: VoucherKind,
    tx: &transaction::Model,
    today: NaiveDate,
) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    let mut put = |key: &str, value: String| {
        fields.insert(key.to_string(), value);
    };
    put("txtvoucher_no", voucher_number(kind, tx.id));
    put("txtname", tx.payee_name.clone());
    put("txtid_number", tx.payee_id_number.clone().unwrap_or_default());
    put("txtdescription", tx.description.clone());
    put("txtamount", format_currency(tx.amount_cents));
    put("txtamount_in_words", amount_in_words(tx.amount_cents));
    put("txtdate", format_date(today));
    put("txtvote_head", tx.vote_head.clone());
    put("txtaie_number", tx.aie_number.clone());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read, Write};
    use zip::write::FileOptions;

    fn sample_transaction() -> transaction::Model {
        transaction::Model {
            id: 42,
            payee_name: "Mwangi Supplies".to_string(),
            payee_id_number: Some("P051234567X".to_string()),
            description: "Stationery".to_string(),
            amount_cents: 1_234_550,
            vote_head: "2211101".to_string(),
            aie_number: "AIE/2026/017".to_string(),
            status: "approved".to_string(),
            created_by: 2,
            approved_by: Some(3),
            approved_at: Some(0),
            remarks: None,
            voucher_path: None,
            created_at: 0,
        }
    }

    fn write_template(dir: &Path, name: &str, body: &str) {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options: FileOptions<()> = FileOptions::default();
        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        std::fs::write(dir.join(name), bytes).unwrap();
    }

    #[test]
    fn voucher_fields_are_formatted() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let fields = voucher_fields(VoucherKind::Payment, &sample_transaction(), today);
        assert_eq!(fields["txtvoucher_no"], "PV-000042");
        assert_eq!(fields["txtamount"], "12,345.50");
        assert_eq!(
            fields["txtamount_in_words"],
            "Twelve Thousand Three Hundred Forty Five Shillings and Fifty Cents Only"
        );
        assert_eq!(fields["txtdate"], "19th October 2026");
    }

    #[test]
    fn generates_voucher_into_export_dir() {
        let templates = tempfile::tempdir().unwrap();
        let exports = tempfile::tempdir().unwrap();
        write_template(
            templates.path(),
            "claim_voucher.docx",
            "<w:t>{txtvoucher_no}: {txtname} KES {txtamount}</w:t>",
        );
        let generator = DocumentGenerator::new(&DocumentsConfig {
            template_dir: templates.path().to_path_buf(),
            export_dir: exports.path().join("vouchers"),
            export_url_prefix: "/exports/".to_string(),
        });

        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let doc = generator
            .generate_voucher(VoucherKind::Claim, &sample_transaction(), today)
            .unwrap();

        assert_eq!(doc.file_name, "claim_voucher_42.docx");
        assert_eq!(doc.url, "/exports/claim_voucher_42.docx");
        let bytes = std::fs::read(&doc.path).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        assert_eq!(xml, "<w:t>CV-000042: Mwangi Supplies KES 12,345.50</w:t>");
    }

    #[test]
    fn missing_template_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let generator = DocumentGenerator::new(&DocumentsConfig {
            template_dir: dir.path().to_path_buf(),
            export_dir: dir.path().to_path_buf(),
            export_url_prefix: "/exports".to_string(),
        });
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let err = generator
            .generate_voucher(VoucherKind::Payment, &sample_transaction(), today)
            .unwrap_err();
        assert!(matches!(err, DocError::TemplateNotFound(_)));
    }
}
