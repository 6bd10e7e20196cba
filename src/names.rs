//! Name helpers shared by schemas and the connection catalog.

/// Convert a display or type name to snake_case.
///
/// Runs of capitals are treated as one word (`PostgreSQL` becomes
/// `postgresql`, `HTTPApi` becomes `http_api`). Spaces, hyphens and dots
/// become underscores.
pub fn to_snake_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' || c == '-' || c == '.' || c == '_' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }

        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let starts_word = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => {
                    // "SQL" in "PostgreSQL" stays glued to "Postgre"
                    !is_acronym_tail(&chars, i)
                },
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()) && {
                    // "HTTPApi": the 'A' of "Api" starts a new word
                    !is_acronym_tail(&chars, i)
                },
                _ => false,
            };
            if starts_word && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    out.trim_end_matches('_').to_string()
}

// A trailing all-caps run of two or more letters ends the word ("PostgreSQL",
// "MySQL") rather than starting a new one.
fn is_acronym_tail(chars: &[char], i: usize) -> bool {
    let run = chars[i..].iter().take_while(|c| c.is_uppercase()).count();
    run >= 2 && i + run == chars.len() && chars[..i].iter().any(|c| c.is_lowercase())
}

/// Whether a user-facing name is acceptable: non-empty with no surrounding whitespace.
pub fn valid_name(name: &str) -> bool {
    !name.trim().is_empty() && name.trim() == name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case_simple() {
        assert_eq!(to_snake_case("GoogleSheets"), "google_sheets");
        assert_eq!(to_snake_case("bulkSync"), "bulk_sync");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("Webhook"), "webhook");
    }

    #[test]
    fn test_snake_case_acronyms() {
        assert_eq!(to_snake_case("PostgreSQL"), "postgresql");
        assert_eq!(to_snake_case("MySQL"), "mysql");
        assert_eq!(to_snake_case("HTTPApi"), "http_api");
        assert_eq!(to_snake_case("S3"), "s3");
    }

    #[test]
    fn test_snake_case_separators() {
        assert_eq!(to_snake_case("Google Cloud Storage"), "google_cloud_storage");
        assert_eq!(to_snake_case("sql-server"), "sql_server");
        assert_eq!(to_snake_case("a.b"), "a_b");
        assert_eq!(to_snake_case("trailing "), "trailing");
    }

    #[test]
    fn test_valid_name() {
        assert!(valid_name("Nightly copy"));
        assert!(!valid_name(""));
        assert!(!valid_name("   "));
        assert!(!valid_name(" leading"));
        assert!(!valid_name("trailing\n"));
    }
}
