use super::text::SUMMARY_HEADERS;
use super::{RepActivity, SalesReport};
use crate::workflows::sales::details::OrderLines;
use crate::workflows::sales::domain::{CustomerActivity, OrderLine, SalespersonSummary};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

const MAX_SHEET_NAME: usize = 31;
const FORBIDDEN_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];
const MONEY: &str = "#,##0.00";
const QUANTITY: &str = "#,##0";
const QUANTITY_FRACTION: &str = "#,##0.###";
const SUMMARY_WIDTHS: [u16; 5] = [25, 18, 22, 18, 22];
const REP_WIDTHS: [u16; 6] = [40, 15, 12, 10, 15, 18];
const LAST_REP_COLUMN: u16 = 5;

struct ReportFormats {
    header: Format,
    text: Format,
    count: Format,
    money: Format,
    title: Format,
    customer: Format,
    visit_type: Format,
    time_spent: Format,
    customer_fill: Format,
    product_header: Format,
    quantity: Format,
    quantity_fraction: Format,
    no_orders: Format,
}

impl ReportFormats {
    fn new() -> Self {
        let border = || {
            Format::new()
                .set_border(FormatBorder::Thin)
                .set_border_color(0xB4B4B4)
        };

        Self {
            header: border()
                .set_bold()
                .set_font_color(0xFFFFFF)
                .set_background_color(0x4472C4)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_text_wrap(),
            text: border().set_align(FormatAlign::Left),
            count: border().set_align(FormatAlign::Center),
            money: border().set_num_format(MONEY).set_align(FormatAlign::Right),
            title: Format::new()
                .set_bold()
                .set_font_size(14)
                .set_font_color(0x1F4E78)
                .set_background_color(0xE7E6E6)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            customer: border()
                .set_bold()
                .set_font_color(0x1F4E78)
                .set_background_color(0xD9E1F2)
                .set_align(FormatAlign::Left),
            visit_type: border()
                .set_italic()
                .set_font_size(10)
                .set_background_color(0xD9E1F2)
                .set_align(FormatAlign::Center),
            time_spent: border()
                .set_font_size(10)
                .set_background_color(0xD9E1F2)
                .set_align(FormatAlign::Center),
            customer_fill: border().set_background_color(0xD9E1F2),
            product_header: border()
                .set_bold()
                .set_font_size(10)
                .set_font_color(0xFFFFFF)
                .set_background_color(0x5B9BD5)
                .set_align(FormatAlign::Center),
            quantity: border().set_num_format(QUANTITY).set_align(FormatAlign::Center),
            quantity_fraction: border()
                .set_num_format(QUANTITY_FRACTION)
                .set_align(FormatAlign::Center),
            no_orders: border()
                .set_bold()
                .set_font_color(0xC00000)
                .set_background_color(0xFFF2CC)
                .set_align(FormatAlign::Center),
        }
    }
}

/// Writes the summary sheet followed by one detail sheet per rep.
pub fn write_workbook(
    path: &Path,
    summary_sheet: &str,
    report: &SalesReport,
    lines: &OrderLines,
    currency: &str,
) -> Result<(), XlsxError> {
    let formats = ReportFormats::new();
    let mut workbook = Workbook::new();
    let names = sheet_names(summary_sheet, &report.reps);
    let (summary_name, rep_names) = names
        .split_first()
        .map_or(("Summary", &[][..]), |(first, rest)| (first.as_str(), rest));

    let sheet = workbook.add_worksheet();
    sheet.set_name(summary_name)?;
    write_summary_sheet(sheet, &report.summaries, &formats)?;

    for (index, (activity, name)) in report.activities.iter().zip(rep_names).enumerate() {
        debug!(
            rep = %activity.rep,
            sheet = %name,
            position = index + 1,
            total = report.activities.len(),
            "writing rep sheet"
        );
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;
        write_rep_sheet(sheet, activity, lines, currency, &formats)?;
    }

    workbook.save(path)
}

fn write_summary_sheet(
    sheet: &mut Worksheet,
    rows: &[SalespersonSummary],
    formats: &ReportFormats,
) -> Result<(), XlsxError> {
    for (col, (header, width)) in SUMMARY_HEADERS.iter().zip(SUMMARY_WIDTHS).enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *header, &formats.header)?;
        sheet.set_column_width(col, width)?;
    }

    for (index, row) in rows.iter().enumerate() {
        let r = index as u32 + 1;
        sheet.write_string_with_format(r, 0, &row.rep, &formats.text)?;
        sheet.write_number_with_format(r, 1, row.customers_visited as f64, &formats.count)?;
        sheet.write_number_with_format(r, 2, row.order_value_from_visits, &formats.money)?;
        sheet.write_number_with_format(r, 3, row.customers_called as f64, &formats.count)?;
        sheet.write_number_with_format(r, 4, row.order_value_from_calls, &formats.money)?;
    }

    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn write_rep_sheet(
    sheet: &mut Worksheet,
    activity: &RepActivity,
    lines: &OrderLines,
    currency: &str,
    formats: &ReportFormats,
) -> Result<(), XlsxError> {
    let title = format!("Sales Activity Report - {}", activity.rep);
    sheet.merge_range(0, 0, 0, LAST_REP_COLUMN, &title, &formats.title)?;
    for (col, width) in REP_WIDTHS.iter().enumerate() {
        sheet.set_column_width(col as u16, *width)?;
    }

    let headers = rep_headers(currency);
    let mut row = 2u32;
    for (customer, info) in &activity.customers {
        write_customer_row(sheet, row, customer, info, formats)?;
        row += 1;

        let items: Vec<&OrderLine> = info
            .order_ids
            .iter()
            .filter_map(|order_id| lines.get(order_id))
            .flatten()
            .collect();

        if items.is_empty() {
            sheet.merge_range(
                row,
                0,
                row,
                LAST_REP_COLUMN,
                "No orders for this customer",
                &formats.no_orders,
            )?;
            row += 1;
        } else {
            for (col, header) in headers.iter().enumerate() {
                sheet.write_string_with_format(row, col as u16, header, &formats.product_header)?;
            }
            row += 1;
            for item in items {
                write_product_row(sheet, row, item, formats)?;
                row += 1;
            }
        }

        // blank spacer between customers
        row += 1;
    }

    sheet.set_freeze_panes(2, 0)?;
    Ok(())
}

fn write_customer_row(
    sheet: &mut Worksheet,
    row: u32,
    customer: &str,
    info: &CustomerActivity,
    formats: &ReportFormats,
) -> Result<(), XlsxError> {
    sheet.write_string_with_format(row, 0, customer, &formats.customer)?;
    sheet.write_string_with_format(row, 1, info.classification.label(), &formats.visit_type)?;
    sheet.write_string_with_format(row, 2, &info.time_spent, &formats.time_spent)?;
    for col in 3..=LAST_REP_COLUMN {
        sheet.write_blank(row, col, &formats.customer_fill)?;
    }
    Ok(())
}

fn write_product_row(
    sheet: &mut Worksheet,
    row: u32,
    item: &OrderLine,
    formats: &ReportFormats,
) -> Result<(), XlsxError> {
    sheet.write_string_with_format(row, 0, &product_label(item), &formats.text)?;
    sheet.write_blank(row, 1, &formats.text)?;
    sheet.write_blank(row, 2, &formats.text)?;
    let quantity = match quantity_format(item.sold_qty) {
        QUANTITY => &formats.quantity,
        _ => &formats.quantity_fraction,
    };
    sheet.write_number_with_format(row, 3, item.sold_qty, quantity)?;
    sheet.write_number_with_format(row, 4, item.unit_cost, &formats.money)?;
    sheet.write_number_with_format(row, 5, item.line_value(), &formats.money)?;
    Ok(())
}

fn rep_headers(currency: &str) -> [String; 6] {
    [
        "Product/Customer".to_string(),
        "Visit Type".to_string(),
        "Time Spent".to_string(),
        "Qty".to_string(),
        format!("Unit Cost ({currency})"),
        format!("Order Value ({currency})"),
    ]
}

/// Whole quantities print as counts; litres and other fractional units keep their decimals.
fn quantity_format(quantity: f64) -> &'static str {
    if quantity.fract() == 0.0 {
        QUANTITY
    } else {
        QUANTITY_FRACTION
    }
}

fn product_label(item: &OrderLine) -> String {
    match (item.product_id.is_empty(), item.product_desc.is_empty()) {
        (false, false) => format!("{} - {}", item.product_id, item.product_desc),
        (false, true) => item.product_id.clone(),
        (true, _) => item.product_desc.clone(),
    }
}

/// Sheet names for the summary sheet followed by each rep, in order. Dots and spaces become
/// underscores, characters Excel rejects are dropped, names are cut to 31 characters and
/// made unique ignoring case.
pub fn sheet_names(summary_sheet: &str, reps: &[String]) -> Vec<String> {
    let mut taken = HashSet::new();
    std::iter::once((summary_sheet, "Summary"))
        .chain(reps.iter().map(|rep| (rep.as_str(), "Sheet")))
        .map(|(raw, fallback)| {
            let base = sanitize_sheet_name(raw);
            let base = if base.is_empty() { fallback.to_string() } else { base };
            unique_name(&base, &mut taken)
        })
        .collect()
}

fn sanitize_sheet_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c == '.' || c == ' ' { '_' } else { c })
        .filter(|c| !FORBIDDEN_SHEET_CHARS.contains(c) && !c.is_control())
        .collect();
    // Excel rejects names that start or end with an apostrophe, so trim after the cut.
    let truncated: String = cleaned.chars().take(MAX_SHEET_NAME).collect();
    truncated.trim_matches('\'').to_string()
}

fn unique_name(base: &str, taken: &mut HashSet<String>) -> String {
    let mut candidate = base.to_string();
    let mut suffix = 2;
    while !taken.insert(candidate.to_lowercase()) {
        let tail = format!("_{suffix}");
        let head: String = base.chars().take(MAX_SHEET_NAME - tail.len()).collect();
        candidate = format!("{head}{tail}");
        suffix += 1;
    }
    candidate
}
