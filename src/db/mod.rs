pub mod audit;
pub mod catalogs;
pub mod categories;
pub mod products;
pub mod roles;
pub mod stock;
pub mod users;

/// Turn a free-text search into an `ILIKE` substring pattern.
///
/// LIKE metacharacters in the input are escaped so they match literally.
/// Blank input means "no filter".
pub fn like_pattern(search: Option<&str>) -> Option<String> {
    let search = search.map(str::trim).filter(|s| !s.is_empty())?;
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    Some(escaped)
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn blank_search_is_no_filter() {
        assert_eq!(like_pattern(None), None);
        assert_eq!(like_pattern(Some("   ")), None);
    }

    #[test]
    fn wraps_and_escapes() {
        assert_eq!(like_pattern(Some("bolt")).as_deref(), Some("%bolt%"));
        assert_eq!(like_pattern(Some("50%_off")).as_deref(), Some("%50\\%\\_off%"));
    }
}
