use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DeployError, DeployResult};
use crate::naming;

/// A roster entry. `assignments` maps template key to node name and is
/// filled in once by [`crate::distribution::distribute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub assignments: BTreeMap<String, String>,
}

impl User {
    pub fn new(username: &str, email: &str, full_name: &str) -> Self {
        Self {
            username: username.to_string(),
            email: email.to_string(),
            full_name: full_name.to_string(),
            department: String::new(),
            assignments: BTreeMap::new(),
        }
    }

    /// Node assigned to this user's VM for `template_key`, if distributed.
    pub fn node_for(&self, template_key: &str) -> Option<&str> {
        self.assignments.get(template_key).map(String::as_str)
    }
}

/// One CSV row. Columns beyond these are ignored.
#[derive(Debug, Deserialize)]
struct RosterRow {
    username: String,
    email: String,
    full_name: String,
    #[serde(default)]
    department: Option<String>,
}

/// One '@' with text on both sides, and nothing that would need quoting.
fn valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && email.chars().all(|c| {
                    c.is_ascii_graphic() && !matches!(c, '"' | '\\' | '$' | '%' | '<' | '>')
                })
        }
        None => false,
    }
}

/// Load the user roster from a CSV file with a header row.
pub fn load_roster(path: &Path) -> DeployResult<Vec<User>> {
    let file = std::fs::File::open(path).map_err(|e| {
        DeployError::config(format!("cannot open roster {}: {}", path.display(), e))
    })?;
    let users = parse_roster(file)?;
    info!(users = users.len(), path = %path.display(), "loaded user roster");
    Ok(users)
}

/// Parse a roster from any CSV source.
///
/// `username`, `email` and `full_name` are required and must be non-empty;
/// `department` is optional. Any bad row rejects the whole roster.
pub fn parse_roster<R: Read>(reader: R) -> DeployResult<Vec<User>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut users: Vec<User> = Vec::new();
    for (idx, row) in rdr.deserialize::<RosterRow>().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let row = row.map_err(|e| DeployError::config(format!("roster line {}: {}", line, e)))?;

        for (field, value) in [
            ("username", &row.username),
            ("email", &row.email),
            ("full_name", &row.full_name),
        ] {
            if value.is_empty() {
                return Err(DeployError::config(format!(
                    "roster line {}: required field '{}' is empty",
                    line, field
                )));
            }
        }
        if !row
            .username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(DeployError::config(format!(
                "roster line {}: username {:?} may only contain letters, digits, '.', '_' and '-'",
                line, row.username
            )));
        }
        if !valid_email(&row.email) {
            return Err(DeployError::config(format!(
                "roster line {}: invalid email {:?}",
                line, row.email
            )));
        }
        let stem = naming::user_stem(&row.username);
        if let Some(prev) = users.iter().find(|u| naming::user_stem(&u.username) == stem) {
            return Err(DeployError::config(format!(
                "roster line {}: username {:?} clashes with {:?} (VM names ignore case, '.', '_' and '-')",
                line, row.username, prev.username
            )));
        }

        users.push(User {
            username: row.username,
            email: row.email,
            full_name: row.full_name,
            department: row.department.unwrap_or_default(),
            assignments: BTreeMap::new(),
        });
    }
    Ok(users)
}

#[cfg(test)]
pub(crate) fn roster_fixture(n: usize) -> Vec<User> {
    (0..n)
        .map(|i| {
            User::new(
                &format!("user{:02}", i),
                &format!("user{:02}@example.com", i),
                &format!("User {}", i),
            )
        })
        .collect()
}
