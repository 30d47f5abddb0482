use std::collections::HashMap;

use lazy_regex::regex;

use crate::error::MigrateError;

/// Substitute every `${name}` in `sql`. Unknown names are an error rather
/// than being left in the script.
pub fn replace_placeholders(
    sql: &str,
    placeholders: &HashMap<String, String>,
    script: &str,
) -> Result<String, MigrateError> {
    let pattern = regex!(r"\$\{([^}]+)\}");

    let mut out = String::with_capacity(sql.len());
    let mut last = 0;

    for caps in pattern.captures_iter(sql) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = placeholders.get(name.as_str()).ok_or_else(|| {
            MigrateError::UnresolvedPlaceholder {
                script: script.to_string(),
                name: name.as_str().to_string(),
            }
        })?;

        out.push_str(&sql[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }

    out.push_str(&sql[last..]);
    Ok(out)
}
