//! `${VAR}` substitution in raw config text.

/// Replace each `${VAR}` with the value of the environment variable `VAR`.
/// Placeholders whose variable is unset are left untouched so the parse
/// error (if any) points at the original text.
pub fn substitute_env(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        match tail.find('}') {
            Some(end) => {
                let name = &tail[..end];
                match std::env::var(name) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => {
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    },
                }
                rest = &tail[end + 1..];
            },
            None => {
                out.push_str(&rest[start..]);
                return out;
            },
        }
    }
    out.push_str(rest);
    out
}
