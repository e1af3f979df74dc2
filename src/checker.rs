//! Output checker: line-count-exact, per-line right-trimmed equality. No
//! normalisation of interior whitespace.

/// Compares `output` against `answer` and returns whether `output` is
/// correct.
pub fn check_output(output: &str, answer: &str) -> bool {
    let mut output_lines = output.lines();
    let mut answer_lines = answer.lines();

    loop {
        match (output_lines.next(), answer_lines.next()) {
            (Some(o), Some(a)) => {
                if o.trim_end() != a.trim_end() {
                    return false;
                }
            }
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_match() {
        assert!(check_output("hello\nworld", "hello\nworld"));
    }

    #[test]
    fn trailing_newline_does_not_change_line_count() {
        assert!(check_output("hello\n", "hello"));
    }

    #[test]
    fn trailing_whitespace_on_a_line_is_ignored() {
        assert!(check_output("42  \n", "42\n"));
        assert!(check_output("42\t\n", "42"));
    }

    #[test]
    fn interior_whitespace_is_significant() {
        assert!(!check_output("1  2\n", "1 2\n"));
    }

    #[test]
    fn differing_line_counts_reject() {
        assert!(!check_output("1\n2\n", "1\n"));
        assert!(!check_output("1\n", "1\n2\n"));
    }

    #[test]
    fn differing_content_rejects() {
        assert!(!check_output("0\n", "1\n"));
    }

    #[test]
    fn empty_strings_match() {
        assert!(check_output("", ""));
    }
}
