/// Converts text into a URL-friendly slug.
///
/// Lowercases, drops everything except letters, digits, whitespace, `_` and
/// `-`, and turns every run of whitespace, `_` and `-` into a single dash.
/// Leading and trailing dashes are removed.
///
/// ```
/// assert_eq!(scaffold_api::util::slugify("My New Project"), "my-new-project");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.to_lowercase().chars() {
        if ch.is_whitespace() || ch == '_' || ch == '-' {
            pending_dash = true;
        } else if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        }
    }
    slug
}
