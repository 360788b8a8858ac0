use std::fmt::{self, Write};

/// Formats a string as a quoted protobuf text-format literal.
pub(crate) struct Quoted<'a>(pub(crate) &'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        for &b in self.0.as_bytes() {
            match b {
                b'\n' => f.write_str("\\n")?,
                b'\r' => f.write_str("\\r")?,
                b'\t' => f.write_str("\\t")?,
                b'"' => f.write_str("\\\"")?,
                b'\\' => f.write_str("\\\\")?,
                0x20..=0x7e => f.write_char(b as char)?,
                _ => write!(f, "\\{:03o}", b)?,
            }
        }
        f.write_char('"')
    }
}

#[cfg(test)]
mod tests {
    use super::Quoted;

    #[test]
    fn escapes() {
        assert_eq!(Quoted("plain").to_string(), r#""plain""#);
        assert_eq!(Quoted("a\"b\\c").to_string(), r#""a\"b\\c""#);
        assert_eq!(Quoted("tab\there\n").to_string(), r#""tab\there\n""#);
        assert_eq!(Quoted("\u{1}").to_string(), r#""\001""#);
        assert_eq!(Quoted("é").to_string(), r#""\303\251""#);
    }
}
