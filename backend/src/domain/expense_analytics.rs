//! Expense aggregation.
//!
//! Pure functions over the expense collection keyed by `YYYY-MM` month
//! strings: month filtering, totals, month-over-month comparison, totals
//! by category and the trailing monthly trend.

use std::collections::HashMap;

use shared::Expense;

/// Category bucket for expenses outside the closed list.
const FALLBACK_CATEGORY: &str = "Outros";

/// The `YYYY-MM` key of an expense date.
pub fn month_key(date: &str) -> &str {
    if date.len() >= 7 {
        &date[..7]
    } else {
        date
    }
}

pub fn expenses_in_month<'a>(expenses: &'a [Expense], month: &str) -> Vec<&'a Expense> {
    expenses
        .iter()
        .filter(|e| e.date.starts_with(month))
        .collect()
}

/// Month view with an optional free-text filter over description and
/// supplier (case-insensitive).
pub fn filter_expenses<'a>(
    expenses: &'a [Expense],
    month: &str,
    search: &str,
) -> Vec<&'a Expense> {
    let needle = search.trim().to_lowercase();
    expenses
        .iter()
        .filter(|e| e.date.starts_with(month))
        .filter(|e| {
            needle.is_empty()
                || e.description.to_lowercase().contains(&needle)
                || e.supplier.to_lowercase().contains(&needle)
        })
        .collect()
}

pub fn month_total(expenses: &[Expense], month: &str) -> f64 {
    expenses_in_month(expenses, month)
        .iter()
        .map(|e| e.amount)
        .sum()
}

/// The `YYYY-MM` key immediately before the given one.
pub fn previous_month_key(month: &str) -> Option<String> {
    let (year, month_number) = parse_month_key(month)?;
    if month_number == 1 {
        Some(format!("{:04}-12", year - 1))
    } else {
        Some(format!("{:04}-{:02}", year, month_number - 1))
    }
}

/// Month-over-month percentage change. Defined as 0% when the prior
/// month's total is 0, regardless of the current total.
pub fn month_over_month_change(current_total: f64, previous_total: f64) -> f64 {
    if previous_total == 0.0 {
        0.0
    } else {
        (current_total - previous_total) / previous_total * 100.0
    }
}

/// Totals per category over the given expenses; empty or unknown
/// categories fall into "Outros".
pub fn totals_by_category<'a, I>(expenses: I) -> HashMap<String, f64>
where
    I: IntoIterator<Item = &'a Expense>,
{
    let mut totals: HashMap<String, f64> = HashMap::new();
    for expense in expenses {
        let category = if expense.category.is_empty() {
            FALLBACK_CATEGORY
        } else {
            &expense.category
        };
        *totals.entry(category.to_string()).or_insert(0.0) += expense.amount;
    }
    totals
}

pub fn top_category(totals: &HashMap<String, f64>) -> Option<(String, f64)> {
    totals
        .iter()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(category, total)| (category.clone(), *total))
}

/// Totals for the trailing `months` months ending at `anchor_month`
/// (inclusive), oldest first.
pub fn monthly_trend(expenses: &[Expense], anchor_month: &str, months: u32) -> Vec<(String, f64)> {
    let Some((mut year, mut month)) = parse_month_key(anchor_month) else {
        return Vec::new();
    };

    let mut keys = Vec::with_capacity(months as usize);
    for _ in 0..months {
        keys.push(format!("{:04}-{:02}", year, month));
        if month == 1 {
            month = 12;
            year -= 1;
        } else {
            month -= 1;
        }
    }
    keys.reverse();

    keys.into_iter()
        .map(|key| {
            let total = month_total(expenses, &key);
            (key, total)
        })
        .collect()
}

fn parse_month_key(month: &str) -> Option<(i32, u32)> {
    let mut parts = month.splitn(2, '-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month_number = parts.next()?.parse::<u32>().ok()?;
    if (1..=12).contains(&month_number) {
        Some((year, month_number))
    } else {
        None
    }
}
