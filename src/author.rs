//! Free-text author name parsing.
//!
//! Two forms are recognized: `"Family, Given"` and `"Given Given Family"`.
//! Multi-particle family names written without a comma (`"Jan van der Berg"`)
//! are split on the last token only, so the particles end up in the given
//! name. Write them as `"van der Berg, Jan"` to keep the family name intact.

use crate::Name;

/// Parse an author name into family and given parts.
///
/// Never fails: an empty string yields an empty family name and no given name.
///
/// # Examples
///
/// ```
/// use bibref::parse_author_name;
///
/// let name = parse_author_name("Smith, John");
/// assert_eq!(name.family, "Smith");
/// assert_eq!(name.given.as_deref(), Some("John"));
///
/// let name = parse_author_name("Mary Ann Evans");
/// assert_eq!(name.family, "Evans");
/// assert_eq!(name.given.as_deref(), Some("Mary Ann"));
/// ```
pub fn parse_author_name(name: &str) -> Name {
    if let Some((family, given)) = name.split_once(',') {
        let given = given.trim();
        return Name {
            family: family.trim().to_string(),
            given: (!given.is_empty()).then(|| given.to_string()),
        };
    }

    let parts: Vec<&str> = name.split_whitespace().collect();
    match parts.as_slice() {
        [] => Name::default(),
        [family] => Name::new(*family, None),
        [given @ .., family] => Name::new(*family, Some(given.join(" "))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Smith, John", "Smith", Some("John"))]
    #[case("  Smith ,  John  ", "Smith", Some("John"))]
    #[case("Smith,", "Smith", None)]
    #[case("Smith, John, Jr.", "Smith", Some("John, Jr."))]
    #[case("John Smith", "Smith", Some("John"))]
    #[case("John   Ronald  Tolkien", "Tolkien", Some("John Ronald"))]
    #[case("Plato", "Plato", None)]
    #[case("Иванов, Иван", "Иванов", Some("Иван"))]
    #[case("", "", None)]
    #[case("   ", "", None)]
    fn test_parse_author_name(
        #[case] input: &str,
        #[case] family: &str,
        #[case] given: Option<&str>,
    ) {
        let name = parse_author_name(input);
        assert_eq!(name.family, family);
        assert_eq!(name.given.as_deref(), given);
    }

    #[test]
    fn test_particles_without_comma_go_to_given() {
        let name = parse_author_name("Jan van der Berg");
        assert_eq!(name.family, "Berg");
        assert_eq!(name.given.as_deref(), Some("Jan van der"));

        let name = parse_author_name("van der Berg, Jan");
        assert_eq!(name.family, "van der Berg");
    }
}
