//! Rendering of projects and secrets: tables, env maps, `.env.<environment>` files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use eclipse_common::NotationFile;
use eclipse_common::file_notation::{Notation, NotationError};
use serde_json::Value;

use crate::api::{Project, RevealedSecret};
use crate::project_config::Target;

const ENV_FILE_HEADER: &str = "Environment file generated by Eclipse";

/// Secret name to value, as injected into a child process.
pub fn secret_map(secrets: &[RevealedSecret]) -> HashMap<String, String> {
    secrets
        .iter()
        .map(|s| (s.secret.name.clone(), s.value.clone()))
        .collect()
}

pub fn find_secret<'a>(secrets: &'a [RevealedSecret], name: &str) -> Option<&'a RevealedSecret> {
    secrets.iter().find(|s| s.secret.name == name)
}

pub fn no_secrets_message(project: &Project, target: &Target) -> String {
    format!(
        "No secrets found for project {}: component {} and environment {}",
        project.name, target.component, target.environment
    )
}

/// `2023-01-02T10:00:00.000Z` becomes `2023-01-02`; anything unparseable is shown as-is.
fn format_date(raw: Option<&str>) -> String {
    match raw {
        Some(raw) => raw
            .parse::<DateTime<Utc>>()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|_| raw.to_string()),
        None => "-".to_string(),
    }
}

fn column_width<'a>(header: &str, cells: impl Iterator<Item = &'a str>) -> usize {
    cells
        .map(|c| c.chars().count())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(header.len())
}

pub fn format_secret_table(secrets: &[RevealedSecret]) -> String {
    let name_w = column_width("Name", secrets.iter().map(|s| s.secret.name.as_str()));
    let value_w = column_width("Value", secrets.iter().map(|s| s.value.as_str()));

    let mut out = format!("{:<name_w$}  {:<value_w$}  Created\n", "Name", "Value");
    out.push_str(&"-".repeat(name_w + value_w + 14));
    out.push('\n');
    for s in secrets {
        out.push_str(&format!(
            "{:<name_w$}  {:<value_w$}  {}\n",
            s.secret.name,
            s.value,
            format_date(s.secret.created_at.as_deref())
        ));
    }
    out
}

pub fn format_project_table(projects: &[Project]) -> String {
    let id_w = column_width("ID", projects.iter().map(|p| p.id.as_str()));
    let name_w = column_width("Name", projects.iter().map(|p| p.name.as_str()));

    let mut out = format!("{:<id_w$}  {:<name_w$}  Created\n", "ID", "Name");
    out.push_str(&"-".repeat(id_w + name_w + 14));
    out.push('\n');
    for p in projects {
        out.push_str(&format!(
            "{:<id_w$}  {:<name_w$}  {}\n",
            p.id,
            p.name,
            format_date(p.created_at.as_deref())
        ));
    }
    out
}

pub fn env_file_path(dir: &Path, environment: &str) -> PathBuf {
    dir.join(format!(".env.{environment}"))
}

/// Write `.env.<environment>` into `dir`, replacing an existing file.
pub fn write_env_file(
    dir: &Path,
    environment: &str,
    secrets: &[RevealedSecret],
) -> Result<PathBuf, NotationError> {
    let path = env_file_path(dir, environment);
    let record: Notation = secrets
        .iter()
        .map(|s| (s.secret.name.clone(), Value::String(s.value.clone())))
        .collect();
    NotationFile::new(&path)
        .with_header(ENV_FILE_HEADER)
        .write(&record)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Secret;
    use pretty_assertions::assert_eq;

    fn revealed(name: &str, value: &str, created: Option<&str>) -> RevealedSecret {
        RevealedSecret {
            secret: Secret {
                id: format!("id-{name}"),
                name: name.to_string(),
                component: "api".to_string(),
                environment: "dev".to_string(),
                created_at: created.map(str::to_string),
            },
            value: value.to_string(),
        }
    }

    #[test]
    fn test_secret_map_and_lookup() {
        let secrets = vec![revealed("A", "1", None), revealed("B", "two", None)];
        let map = secret_map(&secrets);
        assert_eq!(map.get("B").map(String::as_str), Some("two"));
        assert_eq!(find_secret(&secrets, "A").unwrap().secret.id, "id-A");
        assert!(find_secret(&secrets, "C").is_none());
    }

    #[test]
    fn test_secret_table() {
        let table = format_secret_table(&[
            revealed("DATABASE_URL", "pg", Some("2023-01-02T10:00:00.000Z")),
            revealed("K", "v", Some("yesterday")),
        ]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "Name          Value  Created");
        assert_eq!(lines[2], "DATABASE_URL  pg     2023-01-02");
        assert_eq!(lines[3], "K             v      yesterday");
    }

    #[test]
    fn test_write_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_env_file(
            dir.path(),
            "staging",
            &[revealed("PORT", "8080", None), revealed("URL", "a=b", None)],
        )
        .unwrap();

        assert_eq!(path, dir.path().join(".env.staging"));
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "# Environment file generated by Eclipse\nPORT=8080\nURL=a=b\n"
        );
    }
}
