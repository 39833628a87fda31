//! Text escaping for the emitted languages.

/// Doxygen: `<` and `#` would start commands or HTML.
pub fn dox(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '<' | '#') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

pub fn latex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '#' | '_' | '{' | '}' | '%' | '&' | '$' => {
                out.push('\\');
                out.push(ch);
            }
            '^' => out.push_str("\\^{}"),
            '~' => out.push_str("\\~{}"),
            _ => out.push(ch),
        }
    }
    out
}

/// Body of a C string literal.
pub fn c_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// Body of a double-quoted Tcl string (DejaGnu expect scripts).
pub fn tcl(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '[' | ']' | '$' | '"' | '\\' | '{' | '}') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes() {
        assert_eq!(dox("a<b #c"), "a\\<b \\#c");
        assert_eq!(latex("x_1 ^ ~ {}"), "x\\_1 \\^{} \\~{} \\{\\}");
        assert_eq!(c_string("say \"hi\"\n"), "say \\\"hi\\\"\\n");
        assert_eq!(tcl("[x] $y"), "\\[x\\] \\$y");
    }
}
