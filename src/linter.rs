//! Profile linting - static analysis of registry profile files.
//!
//! Validates profile files for:
//! - JSON syntax errors
//! - Field entries that are not objects (bare values)
//! - Duplicate identifier declarations
//! - Malformed or dangling relationship declarations
//! - Unknown option keys (warnings)

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::schema::{json_type_name, FieldKind};

/// Resource declaration keys the loader understands.
const RESOURCE_KEYS: &[&str] = &["fields", "toOne", "toMany", "selfLink"];

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON path to the issue (e.g., "/resources/person/fields/id")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is true, files with warnings count as failed.
/// Returns aggregated results for all files.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_profile_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;
    let mut passed = 0;
    let mut failed = 0;

    for file in &files {
        let file_result = lint_file(file);
        let file_errors = file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        let file_warnings = file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count();

        total_errors += file_errors;
        total_warnings += file_warnings;
        if file_errors > 0 || (strict && file_warnings > 0) {
            failed += 1;
        } else {
            passed += 1;
        }
        results.push(file_result);
    }

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

/// Lint a single profile file.
pub fn lint_file(file: &Path) -> FileResult {
    let mut diagnostics = Vec::new();

    match std::fs::read_to_string(file) {
        Ok(content) => match serde_json::from_str::<Value>(&content) {
            Ok(profile) => lint_profile(file, &profile, &mut diagnostics),
            Err(e) => diagnostics.push(Diagnostic {
                severity: Severity::Error,
                code: "syntax".into(),
                file: file.to_path_buf(),
                path: "/".into(),
                message: format!("invalid JSON: {e}"),
            }),
        },
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            code: "io".into(),
            file: file.to_path_buf(),
            path: "/".into(),
            message: format!("cannot read file: {e}"),
        }),
    }

    let status = if diagnostics.iter().any(|d| d.severity == Severity::Error) {
        FileStatus::Error
    } else if !diagnostics.is_empty() {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: file.to_path_buf(),
        status,
        diagnostics,
    }
}

fn lint_profile(file: &Path, profile: &Value, diagnostics: &mut Vec<Diagnostic>) {
    let error = |code: &str, path: String, message: String| Diagnostic {
        severity: Severity::Error,
        code: code.into(),
        file: file.to_path_buf(),
        path,
        message,
    };
    let warning = |code: &str, path: String, message: String| Diagnostic {
        severity: Severity::Warning,
        code: code.into(),
        file: file.to_path_buf(),
        path,
        message,
    };

    let Some(resources) = profile
        .as_object()
        .and_then(|root| root.get("resources"))
        .and_then(Value::as_object)
    else {
        diagnostics.push(error(
            "not-a-profile",
            "/".into(),
            "profile root must be an object with a \"resources\" key".into(),
        ));
        return;
    };

    for (resource_type, declaration) in resources {
        let base = format!("/resources/{resource_type}");
        let Some(declaration) = declaration.as_object() else {
            diagnostics.push(error(
                "resource-not-object",
                base,
                format!(
                    "resource declaration must be an object, got {}",
                    json_type_name(declaration)
                ),
            ));
            continue;
        };

        for key in declaration.keys() {
            if !RESOURCE_KEYS.contains(&key.as_str()) {
                diagnostics.push(warning(
                    "unknown-key",
                    format!("{base}/{key}"),
                    format!("unknown resource key \"{key}\""),
                ));
            }
        }

        if let Some(fields) = declaration.get("fields") {
            lint_fields(fields, &base, diagnostics, &error, &warning);
        }

        for rel_key in ["toOne", "toMany"] {
            if let Some(relationships) = declaration.get(rel_key) {
                lint_relationships(
                    relationships,
                    resources,
                    &format!("{base}/{rel_key}"),
                    diagnostics,
                    &error,
                    &warning,
                );
            }
        }
    }
}

fn lint_fields(
    fields: &Value,
    base: &str,
    diagnostics: &mut Vec<Diagnostic>,
    error: &impl Fn(&str, String, String) -> Diagnostic,
    warning: &impl Fn(&str, String, String) -> Diagnostic,
) {
    let path = format!("{base}/fields");
    let Some(fields) = fields.as_object() else {
        diagnostics.push(error(
            "fields-not-object",
            path,
            format!("\"fields\" must be an object, got {}", json_type_name(fields)),
        ));
        return;
    };

    let mut identifier: Option<&str> = None;
    for (name, entry) in fields {
        let field_path = format!("{path}/{name}");
        let Some(options) = entry.as_object() else {
            diagnostics.push(error(
                "field-not-object",
                field_path,
                format!(
                    "field entry must be an object, got {}",
                    json_type_name(entry)
                ),
            ));
            continue;
        };

        for (option, value) in options {
            match option.as_str() {
                "identifier" | "encrypted" => {
                    if !value.is_boolean() {
                        diagnostics.push(error(
                            "invalid-option",
                            format!("{field_path}/{option}"),
                            format!(
                                "\"{option}\" must be a boolean, got {}",
                                json_type_name(value)
                            ),
                        ));
                    }
                }
                "kind" => match value.as_str() {
                    Some(kind) if FieldKind::parse(kind).is_some() => {}
                    Some(kind) => diagnostics.push(error(
                        "unknown-kind",
                        format!("{field_path}/kind"),
                        format!("unknown field kind \"{kind}\": expected optional or always"),
                    )),
                    None => diagnostics.push(error(
                        "invalid-option",
                        format!("{field_path}/kind"),
                        format!("\"kind\" must be a string, got {}", json_type_name(value)),
                    )),
                },
                "derive" => {
                    if !value.is_string() {
                        diagnostics.push(error(
                            "invalid-option",
                            format!("{field_path}/derive"),
                            format!(
                                "\"derive\" must be a string, got {}",
                                json_type_name(value)
                            ),
                        ));
                    }
                }
                other => diagnostics.push(warning(
                    "unknown-option",
                    format!("{field_path}/{other}"),
                    format!("unknown field option \"{other}\""),
                )),
            }
        }

        if options.get("identifier").and_then(Value::as_bool) == Some(true) {
            if let Some(first) = identifier {
                diagnostics.push(error(
                    "duplicate-identifier",
                    field_path,
                    format!("identifier already declared on \"{first}\""),
                ));
            } else {
                identifier = Some(name);
            }
        }
    }
}

fn lint_relationships(
    relationships: &Value,
    resources: &Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
    error: &impl Fn(&str, String, String) -> Diagnostic,
    warning: &impl Fn(&str, String, String) -> Diagnostic,
) {
    let Some(relationships) = relationships.as_object() else {
        diagnostics.push(error(
            "relationships-not-object",
            path.to_string(),
            format!(
                "relationship block must be an object, got {}",
                json_type_name(relationships)
            ),
        ));
        return;
    };

    for (name, entry) in relationships {
        let rel_path = format!("{path}/{name}");
        let builder_type = match entry {
            Value::String(builder_type) => Some(builder_type.as_str()),
            Value::Object(options) => match options.get("type").and_then(Value::as_str) {
                Some(builder_type) => {
                    if let Some(id_field) = options.get("idField") {
                        match id_field.as_str() {
                            Some("") => diagnostics.push(error(
                                "empty-id-field",
                                format!("{rel_path}/idField"),
                                "\"idField\" must not be empty".into(),
                            )),
                            Some(_) => {}
                            None => diagnostics.push(error(
                                "invalid-option",
                                format!("{rel_path}/idField"),
                                format!(
                                    "\"idField\" must be a string, got {}",
                                    json_type_name(id_field)
                                ),
                            )),
                        }
                    }
                    Some(builder_type)
                }
                None => {
                    diagnostics.push(error(
                        "relationship-not-configured",
                        rel_path.clone(),
                        "structured relationship must declare a \"type\" string".into(),
                    ));
                    None
                }
            },
            other => {
                diagnostics.push(error(
                    "relationship-not-configured",
                    rel_path.clone(),
                    format!(
                        "relationship must be a string or an object, got {}",
                        json_type_name(other)
                    ),
                ));
                None
            }
        };

        // Types registered in code won't appear in the profile, hence a warning.
        if let Some(builder_type) = builder_type {
            if !resources.contains_key(builder_type) {
                diagnostics.push(warning(
                    "unknown-resource-type",
                    rel_path,
                    format!("relationship references \"{builder_type}\", not declared in this profile"),
                ));
            }
        }
    }
}

/// Recursively collect .json files from a path.
fn collect_profile_files(path: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if path.is_file() {
        files.push(path.to_path_buf());
        return files;
    }

    if let Ok(entries) = std::fs::read_dir(path) {
        let mut entries: Vec<_> = entries.flatten().map(|e| e.path()).collect();
        entries.sort();
        for entry in entries {
            if entry.is_dir() {
                files.extend(collect_profile_files(&entry));
            } else if entry.extension().is_some_and(|ext| ext == "json") {
                files.push(entry);
            }
        }
    }
    files
}
