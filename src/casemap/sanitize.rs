/// Rewrite a project name into the form uploads used when the raw name was
/// not a legal storage path segment.
///
/// Each run of double quotes becomes a single `_`, and every `/` becomes
/// `_` (slashes show up in names as date fragments like `3/14/19`).
pub fn sanitize_project_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_quote_run = false;
    for ch in name.chars() {
        match ch {
            '"' => {
                if !in_quote_run {
                    out.push('_');
                    in_quote_run = true;
                }
            }
            '/' => {
                out.push('_');
                in_quote_run = false;
            }
            other => {
                out.push(other);
                in_quote_run = false;
            }
        }
    }
    out
}
