//! Autocomplete handlers for Discord slash command parameters.
//!
//! Suggests settlement months so users rarely have to type `YYYY-MM` by hand.

use crate::{bot::BotData, core::month::Month, errors::Error};

/// How many months back the month suggestions reach.
const MONTHS_BACK: usize = 12;

/// Current month first, then earlier months, filtered by `partial`.
#[must_use]
pub fn recent_months(current: Month, partial: &str) -> Vec<String> {
    let partial = partial.trim();
    std::iter::successors(Some(current), |m| Some(m.previous()))
        .take(MONTHS_BACK)
        .map(|m| m.to_string())
        .filter(|m| m.starts_with(partial) || m.contains(partial))
        .take(25) // Discord autocomplete limit
        .collect()
}

/// Provides autocomplete suggestions for month parameters.
pub async fn autocomplete_month(
    _ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    recent_months(Month::current(), partial)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_recent_months_newest_first() {
        let months = recent_months("2024-02".parse().unwrap(), "");
        assert_eq!(months.len(), MONTHS_BACK);
        assert_eq!(months[0], "2024-02");
        assert_eq!(months[1], "2024-01");
        assert_eq!(months[2], "2023-12");
    }

    #[test]
    fn test_recent_months_filters() {
        let months = recent_months("2024-02".parse().unwrap(), "2023");
        assert_eq!(months.len(), MONTHS_BACK - 2);
        assert!(months.iter().all(|m| m.starts_with("2023")));

        assert!(recent_months("2024-02".parse().unwrap(), "1999").is_empty());
    }
}
