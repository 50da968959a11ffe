pub mod line;
pub mod name;

use chrono::NaiveDate;
use serde::Serialize;

/// The source prints only one section today; the field exists so dishes can
/// be categorized later without a model change.
pub const DEFAULT_CATEGORY: &str = "Gerichte";

/// Lines carrying this marker are informational surcharge notes, not dishes.
const SURCHARGE_MARKER: &str = "aufschlag";

/// One menu item for one day. Prices are integer cents, parsed digit-exactly
/// from the decimal-comma token on the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DishEntry {
    pub name: String,
    pub category: String,
    pub price_cents: i64,
}

/// Parser output for one document. `date` is absent when no valid date line
/// was seen; `items` keeps document order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedMenu {
    pub date: Option<NaiveDate>,
    pub items: Vec<DishEntry>,
}

impl ParsedMenu {
    /// A menu without a date or without dishes must not be persisted.
    pub fn is_usable(&self) -> bool {
        self.date.is_some() && !self.items.is_empty()
    }
}

/// Transient per-parse state threaded through the line fold.
struct ParseState {
    date: Option<NaiveDate>,
    fragments: Vec<String>,
}

/// Fold the extracted text into a dated dish list.
///
/// Per trimmed, non-empty line:
/// 1. No date recorded yet + valid date token: record it, consume the line.
/// 2. Price token present: the text left of the leftmost token is the final
///    name fragment; the joined, normalized buffer becomes the dish name.
///    Surcharge notes and names of two characters or fewer are dropped.
///    The buffer is cleared either way.
/// 3. Otherwise the line joins the name buffer, but only once a date has
///    been seen; everything above the date line is header noise.
///
/// Never fails: an absent date or an empty item list is the "no usable menu"
/// signal, interpreted by the caller.
pub fn parse_menu(text: &str) -> ParsedMenu {
    let mut state = ParseState {
        date: None,
        fragments: Vec::new(),
    };
    let mut items = Vec::new();

    for raw in text.lines() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        let facts = line::classify(trimmed);

        if state.date.is_none() {
            if let Some(date) = facts.date {
                state.date = Some(date);
                continue;
            }
        }

        if let Some(hit) = facts.price {
            state.fragments.push(trimmed[..hit.start].to_string());
            let full_name = name::normalize(&state.fragments.join(" "));
            state.fragments.clear();

            if full_name.chars().count() > 2
                && !full_name.to_lowercase().contains(SURCHARGE_MARKER)
            {
                items.push(DishEntry {
                    name: full_name,
                    category: DEFAULT_CATEGORY.to_string(),
                    price_cents: hit.cents,
                });
            }
            continue;
        }

        if state.date.is_some() {
            state.fragments.push(trimmed.to_string());
        }
    }

    // A trailing fragment with no price line after it is dropped.
    ParsedMenu {
        date: state.date,
        items,
    }
}
