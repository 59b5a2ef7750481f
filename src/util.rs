use chrono::{Datelike, NaiveDate};

/// Short label for the calendar month preceding `today`, e.g. "Jul 2026".
/// January rolls back to December of the previous year.
pub fn previous_month_label(today: NaiveDate) -> String {
    let (year, month) = if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    };
    format!("{} {}", month_abbrev(month), year)
}

fn month_abbrev(month: u32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        _ => "Dec",
    }
}

/// Default playlist description when the caller does not supply one.
pub fn default_description(limit: usize, window_label: &str) -> String {
    format!(
        "My top {} most played tracks of the {} term. Auto-generated.",
        limit, window_label
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn previous_month_mid_year() {
        let d = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        assert_eq!(previous_month_label(d), "Jul 2026");
    }

    #[test]
    fn previous_month_january_rolls_year() {
        let d = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        assert_eq!(previous_month_label(d), "Dec 2022");
    }
}
