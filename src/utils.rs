use rand::Rng;

/// Sanitize a user-supplied display name: whitespace becomes underscores
/// and anything outside `[A-Za-z0-9_.-]` is dropped.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect()
}

/// Derive the object-storage key for an upload.
pub fn storage_path(uploader_id: &str, file_name: &str) -> String {
    format!("{}/{}", uploader_id, file_name)
}

/// Extract the display filename from a storage key (the last path segment).
pub fn file_name_from_path(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Generate one five-digit share code candidate. Uniqueness is the
/// caller's job (checked against the database).
pub fn random_share_code() -> String {
    rand::thread_rng().gen_range(10_000..100_000).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_whitespace_with_underscores() {
        assert_eq!(sanitize_file_name("my report final.pdf"), "my_report_final.pdf");
        assert_eq!(sanitize_file_name("a\tb\nc"), "a_b_c");
    }

    #[test]
    fn sanitize_strips_special_characters() {
        assert_eq!(sanitize_file_name("pay$roll(2024)!.csv"), "payroll2024.csv");
        assert_eq!(sanitize_file_name("photo🙂.png"), "photo.png");
    }

    #[test]
    fn sanitize_keeps_word_characters_dots_and_dashes() {
        assert_eq!(sanitize_file_name("notes_v2.final-draft.txt"), "notes_v2.final-draft.txt");
    }

    #[test]
    fn storage_path_joins_uploader_and_name() {
        assert_eq!(storage_path("u1", "notes.txt"), "u1/notes.txt");
        assert_eq!(file_name_from_path("u1/notes.txt"), "notes.txt");
        assert_eq!(file_name_from_path("notes.txt"), "notes.txt");
    }

    #[test]
    fn share_codes_are_five_digit_numbers() {
        for _ in 0..100 {
            let code = random_share_code();
            assert_eq!(code.len(), 5);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(!code.starts_with('0'));
        }
    }
}
