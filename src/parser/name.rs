/// Boilerplate lead-in the menu prints above the first dish.
const OFFER_PREFIX: &str = "Heute gibt's:";

/// Clean an accumulated dish name: collapse whitespace runs, trim, and strip
/// one leading offer phrase. Total over all inputs; whitespace-only input
/// normalizes to the empty string.
pub fn normalize(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.strip_prefix(OFFER_PREFIX) {
        Some(rest) => rest.trim().to_string(),
        None => collapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize("  Schnitzel   mit \t Pommes  "), "Schnitzel mit Pommes");
    }

    #[test]
    fn strips_offer_prefix() {
        assert_eq!(normalize("Heute gibt's: Currywurst"), "Currywurst");
    }

    #[test]
    fn plain_name_untouched() {
        assert_eq!(normalize("Normal Dish"), "Normal Dish");
    }

    #[test]
    fn whitespace_only_is_empty() {
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn prefix_spread_over_lines() {
        assert_eq!(normalize("Heute gibt's:\n Gulasch mit  Spätzle"), "Gulasch mit Spätzle");
    }
}
