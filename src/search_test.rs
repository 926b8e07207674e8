use super::*;

#[test]
fn collapses_duplicate_slashes_in_path() {
    assert_eq!(
        collapse_duplicate_slashes("https://registry.example.com//-/v1/search//?text=a"),
        "https://registry.example.com/-/v1/search/?text=a"
    );
}

#[test]
fn leaves_scheme_separator_untouched() {
    assert_eq!(
        collapse_duplicate_slashes("https://registry.example.com/-/v1/search"),
        "https://registry.example.com/-/v1/search"
    );
}

#[test]
fn collapses_runs_longer_than_two() {
    assert_eq!(collapse_duplicate_slashes("http://h///a////b"), "http://h/a/b");
}

#[test]
fn no_scheme_still_collapses() {
    assert_eq!(collapse_duplicate_slashes("//a//b"), "/a/b");
}
