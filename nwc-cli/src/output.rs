// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use std::fmt::Display;
use std::time::Duration;

use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use nwc_core::nostr_sdk::Timestamp;
use nwc_core::types::{Transaction, TransactionType};

const TABLE_CELL_MAX: usize = 32;

pub(crate) fn format_msats(msats: u64) -> String {
    if msats % 1000 == 0 {
        format!("{} sats", msats / 1000)
    } else {
        format!("{} msats", msats)
    }
}

pub(crate) fn format_timestamp(secs: u64) -> String {
    Timestamp::from(secs).to_human_datetime()
}

fn direction(kind: Option<TransactionType>) -> &'static str {
    match kind {
        Some(TransactionType::Incoming) => "incoming",
        Some(TransactionType::Outgoing) => "outgoing",
        None => "-",
    }
}

/// Human messages go to stderr; anything meant for pipes goes to stdout.
pub struct Output {
    term: Term,
}

impl Output {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    pub fn success(&self, msg: &str) {
        self.line(&format!("{} {}", style("✓").green().bold(), msg));
    }

    pub fn error(&self, msg: &str) {
        self.line(&format!("{} {}", style("✗").red().bold(), msg));
    }

    pub fn warn(&self, msg: &str) {
        self.line(&format!("{} {}", style("!").yellow().bold(), msg));
    }

    pub fn note(&self, msg: &str) {
        self.line(msg);
    }

    pub fn section(&self, title: &str) {
        self.line(&format!("\n{}", style(title).bold()));
    }

    pub fn details(&self, details: &Details) {
        let width = details.label_width();
        for row in &details.rows {
            let label = style(format!("{:<width$}", row.label)).dim();
            if row.key {
                self.line(&format!("  {label}  {}", style(&row.value).yellow()));
            } else {
                self.line(&format!("  {label}  {}", row.value));
            }
        }
    }

    pub fn table(&self, table: &Table) {
        let widths = table.widths();
        let header = table
            .headers
            .iter()
            .zip(&widths)
            .map(|(name, width)| style(format!("{name:<width$}")).bold().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        self.line(&format!("\n{header}"));
        self.line(&"─".repeat(widths.iter().sum::<usize>() + widths.len().saturating_sub(1)));
        for cells in &table.rows {
            let row = cells
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(col, (cell, width))| {
                    let cell = format!("{:<width$}", fit(cell, *width));
                    if table.highlight == Some(col) {
                        style(cell).yellow().to_string()
                    } else {
                        cell
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
            self.line(row.trim_end());
        }
    }

    pub fn spinner(&self, msg: &str) -> Spinner {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        Spinner { pb }
    }

    /// Machine-readable result on stdout: an invoice, a preimage, a URI.
    pub fn emit(&self, value: &str) {
        println!("{value}");
    }

    pub fn secret_warning(&self) {
        self.line("");
        self.warn("The connection URI below contains a secret that can spend from the wallet.");
        self.warn("Store it like a password.");
    }
}

struct Row {
    label: &'static str,
    value: String,
    key: bool,
}

/// Labelled values printed as one aligned block. Unset values are skipped.
#[derive(Default)]
pub struct Details {
    rows: Vec<Row>,
}

impl Details {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(&mut self, label: &'static str, value: impl Display) -> &mut Self {
        self.rows.push(Row {
            label,
            value: value.to_string(),
            key: false,
        });
        self
    }

    pub fn opt(&mut self, label: &'static str, value: Option<impl Display>) -> &mut Self {
        if let Some(value) = value {
            self.field(label, value);
        }
        self
    }

    /// A value the user is likely to copy, shown highlighted.
    pub fn key(&mut self, label: &'static str, value: impl Display) -> &mut Self {
        self.rows.push(Row {
            label,
            value: value.to_string(),
            key: true,
        });
        self
    }

    pub fn amount(&mut self, label: &'static str, msats: Option<u64>) -> &mut Self {
        self.opt(label, msats.map(format_msats))
    }

    pub fn time(&mut self, label: &'static str, secs: Option<u64>) -> &mut Self {
        self.opt(label, secs.map(format_timestamp))
    }

    pub fn list<T: AsRef<str>>(&mut self, label: &'static str, items: &[T]) -> &mut Self {
        if !items.is_empty() {
            let joined: Vec<&str> = items.iter().map(AsRef::as_ref).collect();
            self.field(label, joined.join(", "));
        }
        self
    }

    pub fn transaction(tx: &Transaction) -> Self {
        let mut details = Self::new();
        details
            .opt("Type", tx.transaction_type.map(|t| direction(Some(t))))
            .opt("State", tx.state.as_deref())
            .amount("Amount", tx.amount)
            .amount("Fees", tx.fees_paid)
            .opt("Description", tx.description.as_deref())
            .opt("Payment hash", tx.payment_hash.as_deref())
            .opt("Preimage", tx.preimage.as_deref())
            .time("Created", tx.created_at)
            .time("Expires", tx.expires_at)
            .time("Settled", tx.settled_at);
        details
    }

    fn label_width(&self) -> usize {
        self.rows.iter().map(|r| r.label.len()).max().unwrap_or(0)
    }
}

/// Columns sized to their widest cell, capped so long descriptions and
/// hashes cannot push the table off screen.
pub struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
    highlight: Option<usize>,
}

impl Table {
    pub fn new(headers: &[&'static str]) -> Self {
        Self {
            headers: headers.to_vec(),
            rows: Vec::new(),
            highlight: None,
        }
    }

    pub fn highlight(mut self, column: usize) -> Self {
        self.highlight = Some(column);
        self
    }

    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    pub fn transactions(transactions: &[Transaction]) -> Self {
        let mut table = Self::new(&["TYPE", "AMOUNT", "CREATED", "DESCRIPTION"]).highlight(1);
        for tx in transactions {
            table.row(vec![
                direction(tx.transaction_type).to_string(),
                tx.amount.map(format_msats).unwrap_or_default(),
                tx.created_at.map(format_timestamp).unwrap_or_default(),
                tx.description.clone().unwrap_or_default(),
            ]);
        }
        table
    }

    fn widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                self.rows
                    .iter()
                    .filter_map(|cells| cells.get(col))
                    .map(|cell| cell.chars().count())
                    .chain([header.len()])
                    .max()
                    .unwrap_or(0)
                    .min(TABLE_CELL_MAX)
            })
            .collect()
    }
}

/// Truncate to `width` characters, marking the cut with an ellipsis.
fn fit(cell: &str, width: usize) -> String {
    if cell.chars().count() <= width {
        return cell.to_string();
    }
    let kept: String = cell.chars().take(width.saturating_sub(1)).collect();
    format!("{kept}…")
}

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.pb.finish_and_clear();
    }
}
