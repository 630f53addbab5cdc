use super::ui;
use crate::core::currency::RateSource;
use crate::core::normalize::Normalized;
use crate::core::record::NormalizedRecord;
use crate::core::snapshot::Snapshot;
use crate::refresh::state::{RefreshState, RefreshStatus};
use chrono::{DateTime, Local, Utc};
use comfy_table::Cell;
use tokio::time::Instant;

fn cell(value: &Normalized) -> Cell {
    ui::number_cell(value.to_string(), value.malformed)
}

fn change(value: &Normalized) -> Cell {
    if value.malformed {
        ui::number_cell("N/A".to_string(), true)
    } else {
        ui::change_cell(value.value, value.decimals)
    }
}

impl NormalizedRecord {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        match self {
            NormalizedRecord::Balance(balance) => {
                let currency = balance.currency;
                table.set_header(vec![
                    ui::header_cell(&format!("Total ({currency})")),
                    ui::header_cell("Available"),
                    ui::header_cell("Locked"),
                    ui::header_cell("Available %"),
                ]);
                table.add_row(vec![
                    cell(&balance.total),
                    cell(&balance.available),
                    cell(&balance.locked),
                    cell(&balance.available_pct),
                ]);
            }
            NormalizedRecord::Holdings(holdings) => {
                let currency = holdings.currency;
                table.set_header(vec![
                    ui::header_cell("Asset"),
                    ui::header_cell("Quantity"),
                    ui::header_cell("Avg Buy"),
                    ui::header_cell(&format!("Price ({currency})")),
                    ui::header_cell(&format!("Value ({currency})")),
                    ui::header_cell("P/L"),
                ]);
                for row in &holdings.rows {
                    table.add_row(vec![
                        Cell::new(&row.asset),
                        cell(&row.quantity),
                        ui::format_optional_cell(row.avg_buy_price, |p| p.to_string()),
                        cell(&row.current_price),
                        cell(&row.eval_amount),
                        row.profit_rate
                            .as_ref()
                            .map_or_else(|| ui::number_cell("N/A".to_string(), true), change),
                    ]);
                }
                let total = format!(
                    "\nTotal ({}): {}",
                    ui::style_text(currency.code(), ui::StyleType::TotalLabel),
                    ui::style_text(&holdings.total_eval.to_string(), ui::StyleType::TotalValue)
                );
                return format!("{table}{total}");
            }
            NormalizedRecord::TopTraded(top) => {
                let currency = top.currency;
                table.set_header(vec![
                    ui::header_cell("#"),
                    ui::header_cell("Symbol"),
                    ui::header_cell("Name"),
                    ui::header_cell(&format!("Price ({currency})")),
                    ui::header_cell("Change"),
                    ui::header_cell("Volume"),
                    ui::header_cell(&format!("Traded ({currency})")),
                ]);
                for (rank, row) in top.rows.iter().enumerate() {
                    table.add_row(vec![
                        Cell::new(rank + 1),
                        Cell::new(&row.symbol),
                        Cell::new(&row.name),
                        cell(&row.price),
                        change(&row.change_rate),
                        cell(&row.volume),
                        cell(&row.traded_value),
                    ]);
                }
            }
            NormalizedRecord::Sentiment(sentiment) => {
                table.set_header(vec![
                    ui::header_cell("Index"),
                    ui::header_cell("Classification"),
                    ui::header_cell("Updated"),
                ]);
                table.add_row(vec![
                    cell(&sentiment.value),
                    Cell::new(&sentiment.classification),
                    Cell::new(
                        sentiment
                            .updated_at
                            .map_or("N/A".to_string(), format_time),
                    ),
                ]);
            }
            NormalizedRecord::Transfers(rows) => {
                table.set_header(vec![
                    ui::header_cell("Coin"),
                    ui::header_cell("Amount"),
                    ui::header_cell("From"),
                    ui::header_cell("To"),
                    ui::header_cell("Value (USD)"),
                    ui::header_cell("Time"),
                ]);
                for row in rows {
                    table.add_row(vec![
                        Cell::new(&row.coin),
                        cell(&row.amount),
                        Cell::new(&row.sender),
                        Cell::new(&row.receiver),
                        cell(&row.value_usd),
                        Cell::new(row.timestamp.as_deref().unwrap_or("N/A")),
                    ]);
                }
            }
            NormalizedRecord::Indices(rows) => {
                table.set_header(vec![
                    ui::header_cell("Index"),
                    ui::header_cell("Level"),
                    ui::header_cell("Change"),
                    ui::header_cell("Change %"),
                ]);
                for row in rows {
                    table.add_row(vec![
                        Cell::new(&row.name),
                        cell(&row.level),
                        cell(&row.change),
                        change(&row.change_rate),
                    ]);
                }
            }
            NormalizedRecord::Sectors(rows) => {
                table.set_header(vec![
                    ui::header_cell("Sector"),
                    ui::header_cell("Change %"),
                    ui::header_cell("Trend"),
                ]);
                for row in rows {
                    table.add_row(vec![
                        Cell::new(&row.name),
                        change(&row.change_rate),
                        Cell::new(&row.trend),
                    ]);
                }
            }
        }

        table.to_string()
    }
}

fn format_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

impl Snapshot {
    /// Every section of the snapshot in order, failed ones with their reason.
    pub fn display(&self) -> String {
        let mut output = format!(
            "{} {}\n",
            ui::style_text(
                &format!("{} dashboard", self.view_mode()),
                ui::StyleType::Title
            ),
            ui::style_text(
                &format!("fetched {}", format_time(self.fetched_at())),
                ui::StyleType::Subtle
            )
        );

        for quote in self.fx().quotes() {
            let source = match quote.source {
                RateSource::Live => ui::style_text("live", ui::StyleType::Subtle),
                RateSource::Fallback => ui::style_text("fallback", ui::StyleType::Warning),
            };
            output.push_str(&format!(
                "{}/{} {} ({source})\n",
                quote.from, quote.to, quote.rate
            ));
        }

        for (key, record) in self.sections() {
            output.push_str(&format!(
                "\n{}\n",
                ui::style_text(key.title(), ui::StyleType::TotalLabel)
            ));
            match record {
                Some(record) => output.push_str(&record.display_as_table()),
                None => {
                    let reason = self
                        .failure(key)
                        .map_or("unavailable".to_string(), |e| e.to_string());
                    output.push_str(&ui::style_text(
                        &format!("Unavailable: {reason}"),
                        ui::StyleType::Error,
                    ));
                }
            }
            output.push('\n');
        }

        if let Some(error) = self.error() {
            output.push_str(&format!(
                "\n{}\n",
                ui::style_text(&error.to_string(), ui::StyleType::Error)
            ));
        } else if self.is_partial() {
            output.push_str(&format!(
                "\n{}\n",
                ui::style_text(
                    &format!(
                        "Partial data: {} of {} sections loaded",
                        self.succeeded(),
                        self.sections().count()
                    ),
                    ui::StyleType::Warning
                )
            ));
        }
        output
    }
}

/// One line summary: status, time since last success and auto-refresh.
pub fn status_line(state: &RefreshState, now: DateTime<Utc>, instant: Instant) -> String {
    let status = match state.status {
        RefreshStatus::Cooldown => match state.cooldown_remaining(instant) {
            Some(remaining) => format!("cooldown {}s", remaining.as_secs() + 1),
            None => "cooldown".to_string(),
        },
        RefreshStatus::Error => {
            let reason = state
                .last_error
                .as_ref()
                .map_or(String::new(), |e| format!(" ({})", e.kind()));
            ui::style_text(&format!("error{reason}"), ui::StyleType::Error)
        }
        other => other.to_string(),
    };
    let updated = state
        .since_last_success(now)
        .map_or("never".to_string(), |ago| format!("{}s ago", ago.num_seconds().max(0)));
    let auto = state
        .auto_refresh
        .map_or("off".to_string(), |a| a.to_string());

    format!(
        "[{}] status: {} | updated: {} | auto-refresh: {}",
        state.view_mode, status, updated, auto
    )
}
