use crate::workflows::sales::domain::SalespersonSummary;

pub const SUMMARY_HEADERS: [&str; 5] = [
    "SALESPERSON",
    "CUSTOMERS VISITED",
    "ORDER VALUE FROM VISITS",
    "CUSTOMERS CALLED",
    "ORDER VALUE FROM CALLS",
];

/// Formats an amount with two decimals and comma thousands separators, e.g. `1,234.50`.
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let negative = value < 0.0 && fixed.bytes().any(|byte| byte.is_ascii_digit() && byte != b'0');
    format!("{}{grouped}.{fraction}", if negative { "-" } else { "" })
}

/// Formats a count with comma thousands separators.
pub fn format_count(value: usize) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// Fixed-width plain-text mirror of the summary sheet. The salesperson column is left
/// aligned, the numeric columns right aligned.
pub fn render_summary_table(rows: &[SalespersonSummary]) -> String {
    let cells: Vec<[String; 5]> = rows
        .iter()
        .map(|row| {
            [
                row.rep.clone(),
                row.customers_visited.to_string(),
                format_amount(row.order_value_from_visits),
                row.customers_called.to_string(),
                format_amount(row.order_value_from_calls),
            ]
        })
        .collect();

    let mut widths = SUMMARY_HEADERS.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(cells.len() + 1);
    lines.push(render_line(&SUMMARY_HEADERS.map(str::to_string), &widths));
    for row in &cells {
        lines.push(render_line(row, &widths));
    }
    lines.join("\n")
}

fn render_line(cells: &[String; 5], widths: &[usize; 5]) -> String {
    cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(column, (cell, width))| {
            if column == 0 {
                format!("{cell:<width$}")
            } else {
                format!("{cell:>width$}")
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_get_thousands_separators() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.5), "999.50");
        assert_eq!(format_amount(1234.5), "1,234.50");
        assert_eq!(format_amount(1234567.891), "1,234,567.89");
        assert_eq!(format_amount(-2500.0), "-2,500.00");
        assert_eq!(format_amount(-0.001), "0.00");
    }

    #[test]
    fn counts_get_thousands_separators() {
        assert_eq!(format_count(7), "7");
        assert_eq!(format_count(12345), "12,345");
    }

    #[test]
    fn summary_table_aligns_columns() {
        let rows = vec![
            SalespersonSummary {
                rep: "Ana".into(),
                customers_visited: 3,
                order_value_from_visits: 12500.0,
                customers_called: 1,
                order_value_from_calls: 80.25,
            },
            SalespersonSummary {
                rep: "Bonifacio Mutola".into(),
                customers_visited: 12,
                order_value_from_visits: 0.0,
                customers_called: 0,
                order_value_from_calls: 0.0,
            },
        ];

        let table = render_summary_table(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("SALESPERSON       CUSTOMERS VISITED"));
        assert!(lines[1].starts_with("Ana               "));
        assert!(lines[1].contains("12,500.00"));
        assert!(lines[1].ends_with("80.25"));
        assert_eq!(lines[0].len(), lines[1].len());
    }

    #[test]
    fn empty_summary_renders_header_only() {
        let table = render_summary_table(&[]);
        assert_eq!(table.lines().count(), 1);
        assert!(table.starts_with("SALESPERSON"));
    }
}
