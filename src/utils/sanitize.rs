const RESERVED: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Guild names and attachment filenames can contain characters that are not
/// valid in filesystem paths. Spaces become underscores; reserved characters
/// are dropped entirely.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter_map(|ch| match ch {
            ' ' => Some('_'),
            ch if RESERVED.contains(&ch) => None,
            ch => Some(ch),
        })
        .collect()
}
