/// Backslash-escape a value placed inside a quoted-string header parameter
pub trait QuoteForDigest {
    fn quote_for_digest(&self) -> String;
}

impl QuoteForDigest for str {
    fn quote_for_digest(&self) -> String {
        let mut out = String::with_capacity(self.len());
        for c in self.chars() {
            if c == '\\' || c == '"' {
                out.push('\\');
            }
            out.push(c);
        }
        out
    }
}

impl QuoteForDigest for String {
    fn quote_for_digest(&self) -> String {
        self.as_str().quote_for_digest()
    }
}
