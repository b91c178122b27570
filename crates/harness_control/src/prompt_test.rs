use std::io::Cursor;

use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::prompt::confirm;

#[rstest]
#[case::yes("y\n", true)]
#[case::full_yes("YES\n", true)]
#[case::padded(" y \n", true)]
#[case::no("n\n", false)]
#[case::empty("\n", false)]
#[case::eof("", false)]
#[case::other("sure\n", false)]
fn answers(#[case] answer: &str, #[case] expected: bool) {
    let mut output = Vec::new();

    let confirmed =
        confirm(&mut Cursor::new(answer), &mut output, "Remove all volumes?").unwrap();

    assert_eq!(confirmed, expected);
    assert_eq!(String::from_utf8(output).unwrap(), "Remove all volumes? (y/N): ");
}
