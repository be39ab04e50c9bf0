pub mod command;
pub mod repl;

use chrono::{DateTime, Utc};

use crate::model::{Client, Contract, Event, UserView};

pub use repl::Repl;

/// A record that can be shown as one table row.
pub trait Tabular {
    fn headers() -> &'static [&'static str];
    fn row(&self) -> Vec<String>;
}

fn ts(t: &DateTime<Utc>) -> String { t.format("%Y-%m-%d %H:%M").to_string() }

fn opt<T: ToString>(v: &Option<T>) -> String { v.as_ref().map(|x| x.to_string()).unwrap_or_else(|| "-".to_string()) }

pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

impl Tabular for UserView {
    fn headers() -> &'static [&'static str] { &["id", "username", "first_name", "last_name", "email", "role"] }
    fn row(&self) -> Vec<String> {
        vec![self.id.to_string(), self.username.clone(), self.first_name.clone(), self.last_name.clone(), self.email.clone(), self.role.to_string()]
    }
}

impl Tabular for Client {
    fn headers() -> &'static [&'static str] {
        &["id", "first_name", "last_name", "email", "business_name", "telephone", "first_contact", "last_update", "commercial"]
    }
    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.first_name.clone(),
            self.last_name.clone(),
            self.email.clone(),
            opt(&self.business_name),
            opt(&self.telephone),
            ts(&self.first_contact),
            ts(&self.last_update),
            self.commercial_id.to_string(),
        ]
    }
}

impl Tabular for Contract {
    fn headers() -> &'static [&'static str] { &["id", "client", "commercial", "total", "rest_to_pay", "created_at", "signed"] }
    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.client_id.to_string(),
            self.commercial_id.to_string(),
            format_cents(self.total_cents),
            format_cents(self.rest_to_pay_cents),
            ts(&self.created_at),
            if self.signed { "yes".into() } else { "no".into() },
        ]
    }
}

impl Tabular for Event {
    fn headers() -> &'static [&'static str] {
        &["id", "name", "contract", "client", "support", "start", "end", "location", "attendees", "notes"]
    }
    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.contract_id.to_string(),
            self.client_id.to_string(),
            opt(&self.support_id),
            ts(&self.start),
            ts(&self.end),
            opt(&self.location),
            self.attendees.to_string(),
            opt(&self.notes),
        ]
    }
}

/// Render records as an ASCII table with a row-count footer.
pub fn render<T: Tabular>(records: &[T]) -> String {
    let cols: Vec<String> = T::headers().iter().map(|s| s.to_string()).collect();
    let rows: Vec<Vec<String>> = records.iter().map(Tabular::row).collect();
    render_table(&cols, &rows)
}

pub fn render_table(cols: &[String], rows: &[Vec<String>]) -> String {
    if rows.is_empty() { return "(no rows)".to_string(); }

    let max_col_width: usize = 40;
    let mut widths: Vec<usize> = cols.iter().map(|s| display_len(s).min(max_col_width)).collect();
    for r in rows {
        for (i, cell) in r.iter().enumerate().take(cols.len()) {
            let w = display_len(cell);
            if w > widths[i] { widths[i] = w.min(max_col_width); }
        }
    }

    let sep = build_separator(&widths);
    let mut out = Vec::with_capacity(rows.len() + 5);
    out.push(sep.clone());
    out.push(build_row(cols, &widths));
    out.push(sep.clone());
    for r in rows {
        out.push(build_row(r, &widths));
    }
    out.push(sep);
    out.push(format!("rows: {}", rows.len()));
    out.join("\n")
}

fn display_len(s: &str) -> usize { s.chars().count() }

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('+');
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let text = truncate(cell, *w);
        let pad = " ".repeat(w.saturating_sub(display_len(&text)));
        s.push(' ');
        if is_numeric_like(cell) {
            s.push_str(&pad);
            s.push_str(&text);
        } else {
            s.push_str(&text);
            s.push_str(&pad);
        }
        s.push_str(" |");
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    if display_len(s) <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

// right-align ids and amounts
fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    if st.is_empty() { return false; }
    let mut has_digit = false;
    for ch in st.chars() {
        if ch.is_ascii_digit() { has_digit = true; continue; }
        if ".-".contains(ch) { continue; }
        return false;
    }
    has_digit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_layout() {
        let cols = vec!["id".to_string(), "name".to_string()];
        let rows = vec![vec!["7".to_string(), "Ada".to_string()], vec!["12".to_string(), "Grace".to_string()]];
        let out = render_table(&cols, &rows);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "+----+-------+");
        assert_eq!(lines[1], "| id | name  |");
        assert_eq!(lines[3], "|  7 | Ada   |");
        assert_eq!(lines[4], "| 12 | Grace |");
        assert_eq!(lines.last().copied(), Some("rows: 2"));
    }

    #[test]
    fn empty_and_truncated() {
        assert_eq!(render_table(&["a".to_string()], &[]), "(no rows)");
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abc", 4), "abc");
    }

    #[test]
    fn money_format() {
        assert_eq!(format_cents(150_050), "1500.50");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(-120), "-1.20");
    }
}
