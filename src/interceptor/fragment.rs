//! Scroll-To-Text-Fragment directive extraction.
//!
//! Syntactic only: pulls the ordered `text=` values out of a URL's `:~:`
//! fragment directive. Range (`start,end`) and context
//! (`prefix-,text,-suffix`) sub-syntax passes through as opaque strings.
//! Anything unparseable maps to absence, never to an error.

use percent_encoding::percent_decode_str;
use url::Url;

/// Reserved delimiter that opens a fragment directive, per the text-fragments
/// syntax. Must immediately follow `#`.
pub const DIRECTIVE_PREFIX: &str = ":~:";

// Neutral base so relative and absolute inputs resolve uniformly.
const NEUTRAL_BASE: &str = "https://fragment.invalid/";

/// Ordered `text=` directive values; never empty once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveSet(Vec<String>);

impl DirectiveSet {
    /// Returns `None` for an empty sequence — absence is the only way to
    /// represent "no directives".
    pub fn new(directives: Vec<String>) -> Option<Self> {
        if directives.is_empty() {
            None
        } else {
            Some(DirectiveSet(directives))
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn first(&self) -> &str {
        &self.0[0]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn join(&self, sep: &str) -> String {
        self.0.join(sep)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

/// Extracts scroll-to-text directives from `url`.
///
/// `None` covers every non-directive case: unresolvable input, no fragment,
/// a fragment without the `:~:` prefix, or a directive block with no
/// non-empty `text=` value.
pub fn parse(url: &str) -> Option<DirectiveSet> {
    let resolved = resolve(url)?;
    let fragment = resolved.fragment()?;
    let directives = fragment.strip_prefix(DIRECTIVE_PREFIX)?;
    DirectiveSet::new(text_values(directives))
}

fn resolve(input: &str) -> Option<Url> {
    let base = Url::parse(NEUTRAL_BASE).ok()?;
    base.join(input).ok()
}

/// Collects decoded `text=` values in occurrence order. Pairs without a key
/// match and empty values are skipped; `#:~:text=` alone counts as absent.
fn text_values(raw: &str) -> Vec<String> {
    let mut values = Vec::new();
    for pair in raw.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        if key != "text" {
            continue;
        }
        let decoded = decode_value(value);
        if !decoded.is_empty() {
            values.push(decoded);
        }
    }
    values
}

/// Percent-decodes one value. Decoding failure is local: a value that does
/// not decode to valid UTF-8 is kept raw, and stray `%` sequences pass
/// through untouched.
fn decode_value(raw: &str) -> String {
    match percent_decode_str(raw).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(url: &str) -> Vec<String> {
        parse(url).map(DirectiveSet::into_vec).unwrap_or_default()
    }

    #[test]
    fn single_directive() {
        assert_eq!(parsed("/page#:~:text=secret"), vec!["secret"]);
    }

    #[test]
    fn range_syntax_passes_through_opaque() {
        assert_eq!(parsed("/page#:~:text=start,end"), vec!["start,end"]);
    }

    #[test]
    fn multiple_directives_keep_occurrence_order() {
        assert_eq!(parsed("/page#:~:text=one&text=two"), vec!["one", "two"]);
    }

    #[test]
    fn foreign_keys_are_ignored_between_directives() {
        assert_eq!(
            parsed("/page#:~:text=one&unknown=x&text=two"),
            vec!["one", "two"]
        );
    }

    #[test]
    fn plain_element_fragment_is_absent() {
        assert!(parse("/page#section").is_none());
    }

    #[test]
    fn no_fragment_is_absent() {
        assert!(parse("/page").is_none());
    }

    #[test]
    fn directive_prefix_not_at_fragment_start_is_absent() {
        assert!(parse("/page#section:~:text=x").is_none());
    }

    #[test]
    fn junk_input_is_absent_not_an_error() {
        assert!(parse("not a valid url").is_none());
        assert!(parse("").is_none());
        assert!(parse("https://").is_none());
    }

    #[test]
    fn absolute_urls_parse_like_relative_ones() {
        assert_eq!(
            parsed("https://example.com/doc#:~:text=secret"),
            vec!["secret"]
        );
    }

    #[test]
    fn percent_decoding_is_applied_per_value() {
        assert_eq!(parsed("/page#:~:text=hello%20world"), vec!["hello world"]);
    }

    #[test]
    fn malformed_percent_sequences_stay_raw() {
        // Truncated escape: passes through rather than failing the call.
        assert_eq!(parsed("/page#:~:text=50%"), vec!["50%"]);
        // Decodes to invalid UTF-8: value kept in its raw form.
        assert_eq!(parsed("/page#:~:text=%FF%FE"), vec!["%FF%FE"]);
    }

    #[test]
    fn plus_is_not_a_space_in_fragment_directives() {
        assert_eq!(parsed("/page#:~:text=a+b"), vec!["a+b"]);
    }

    #[test]
    fn empty_text_values_are_filtered_before_presence_check() {
        assert!(parse("/page#:~:text=").is_none());
        assert_eq!(parsed("/page#:~:text=&text=real"), vec!["real"]);
    }

    #[test]
    fn prefix_with_no_text_key_is_absent() {
        assert!(parse("/page#:~:other=x").is_none());
        assert!(parse("/page#:~:").is_none());
    }

    #[test]
    fn values_may_contain_equals_signs() {
        assert_eq!(parsed("/page#:~:text=a=b"), vec!["a=b"]);
    }
}
