use anyhow::{Result, bail};

/// Validate a template key: lowercase alphanumeric + hyphens/underscores, 1-32 chars.
///
/// Keys end up in Terraform resource names and Ansible group names, so they
/// are kept to a conservative character set.
pub fn validate_key(key: &str, kind: &str) -> Result<()> {
    if key.is_empty() || key.len() > 32 {
        bail!("{} key must be 1-32 characters, got {}", kind, key.len());
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        bail!(
            "{} key must be lowercase alphanumeric, '-' or '_': {:?}",
            kind,
            key
        );
    }
    if !key.starts_with(|c: char| c.is_ascii_lowercase()) {
        bail!("{} key must start with a letter: {:?}", kind, key);
    }
    Ok(())
}

/// Batch identifier for a 1-based sequence number: `batch_001`.
pub fn batch_id(sequence: usize) -> String {
    format!("batch_{:03}", sequence)
}

/// Key of one user's VM for a template, as used in descriptor outputs.
pub fn vm_key(username: &str, template_key: &str) -> String {
    format!("{}_{}", username, template_key)
}

/// Case-folded username with separators collapsed to `_`.
///
/// Two usernames with the same stem would share resource names and
/// hostnames.
pub fn user_stem(username: &str) -> String {
    username
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// Strip characters that could end a quoted HCL or YAML string or start an
/// HCL template sequence (`${`, `%{`).
pub fn quoted_safe(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '"' | '\\' | '$' | '%') && !c.is_control())
        .collect()
}

/// Terraform resource name for a VM key.
///
/// Resource names may only hold letters, digits, '_' and '-', and must not
/// start with a digit.
pub fn resource_name(vm_key: &str) -> String {
    let body: String = vm_key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("vm_{}", body)
}

/// DNS-safe guest hostname for a VM key (max 63 chars).
pub fn vm_hostname(vm_key: &str) -> String {
    let mut name: String = vm_key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    name.truncate(63);
    name.trim_matches('-').to_string()
}
