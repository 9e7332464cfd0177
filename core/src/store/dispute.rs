use super::RecoveryStore;
use crate::{
    error::{RecoveryError, RecoveryResult},
    filter::DisputeFilter,
    record::{DisputeRecord, ExternalStatus},
};
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter};
use rust_decimal::Decimal;
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw column values before decimal/date/status parsing.
struct RawDisputeRow {
    dispute_id: String,
    chain: Option<String>,
    b_name: String,
    slug: String,
    platform: String,
    order_date: String,
    dispute_date: String,
    external_status: String,
    raised: bool,
    error_category: String,
    error_subcategory: String,
    won_amount: String,
    refund_amount: String,
    order_subtotal: String,
}

pub(super) fn parse_date(dispute_id: &str, column: &'static str, value: &str) -> RecoveryResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| RecoveryError::MalformedColumn {
        dispute_id: dispute_id.to_string(),
        column,
        value: value.to_string(),
    })
}

fn parse_amount(dispute_id: &str, column: &'static str, value: &str) -> RecoveryResult<Decimal> {
    Decimal::from_str(value.trim()).map_err(|_| RecoveryError::MalformedColumn {
        dispute_id: dispute_id.to_string(),
        column,
        value: value.to_string(),
    })
}

impl RawDisputeRow {
    fn into_record(self) -> RecoveryResult<DisputeRecord> {
        let id = self.dispute_id.as_str();
        let record = DisputeRecord {
            order_date: parse_date(id, "order_date", &self.order_date)?,
            dispute_date: parse_date(id, "dispute_date", &self.dispute_date)?,
            external_status: ExternalStatus::from_str(&self.external_status)?,
            won_amount: parse_amount(id, "won_amount", &self.won_amount)?,
            refund_amount: parse_amount(id, "refund_amount", &self.refund_amount)?,
            order_subtotal: parse_amount(id, "order_subtotal", &self.order_subtotal)?,
            dispute_id: self.dispute_id,
            chain: self.chain,
            b_name: self.b_name,
            slug: self.slug,
            platform: self.platform,
            raised: self.raised,
            error_category: self.error_category,
            error_subcategory: self.error_subcategory,
        };
        Ok(record.normalized())
    }
}

/// Translate a typed filter into a WHERE clause with positional
/// parameters. Values are always bound, never spliced into the SQL.
/// Category values are literal substrings: `instr` has no wildcards.
fn where_clause(filter: &DisputeFilter) -> (String, Vec<String>) {
    let mut sql = format!("WHERE {} BETWEEN ?1 AND ?2", filter.date_field.column());
    if filter.raised_only {
        sql.push_str(" AND raised = 1");
    }
    let mut args = vec![
        filter.date_range.start.format(DATE_FORMAT).to_string(),
        filter.date_range.end.format(DATE_FORMAT).to_string(),
    ];

    let mut push_in = |column: &str, values: &std::collections::BTreeSet<String>, sql: &mut String| {
        if values.is_empty() {
            return;
        }
        let start = args.len() + 1;
        let marks: Vec<String> = (start..start + values.len()).map(|i| format!("?{i}")).collect();
        sql.push_str(&format!(" AND TRIM({column}) IN ({})", marks.join(", ")));
        args.extend(values.iter().cloned());
    };
    push_in("platform", &filter.platforms, &mut sql);
    push_in("chain", &filter.chains, &mut sql);

    if !filter.categories.is_empty() {
        let start = args.len() + 1;
        let matches: Vec<String> = (start..start + filter.categories.len())
            .map(|i| format!("instr(UPPER(error_category), ?{i}) > 0"))
            .collect();
        sql.push_str(&format!(" AND ({})", matches.join(" OR ")));
        args.extend(filter.categories.iter().map(|c| c.to_ascii_uppercase()));
    }

    (sql, args)
}

impl RecoveryStore {
    pub fn insert_dispute(&self, r: &DisputeRecord) -> RecoveryResult<()> {
        self.conn.execute(
            "INSERT INTO dispute (
                dispute_id, chain, b_name, slug, platform, order_date, dispute_date,
                external_status, raised, error_category, error_subcategory,
                won_amount, refund_amount, order_subtotal
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                &r.dispute_id,
                &r.chain,
                &r.b_name,
                &r.slug,
                &r.platform,
                r.order_date.format(DATE_FORMAT).to_string(),
                r.dispute_date.format(DATE_FORMAT).to_string(),
                r.external_status.as_str(),
                r.raised,
                &r.error_category,
                &r.error_subcategory,
                r.won_amount.to_string(),
                r.refund_amount.to_string(),
                r.order_subtotal.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Insert a batch in one transaction. Returns the number inserted.
    pub fn insert_disputes(&self, records: &[DisputeRecord]) -> RecoveryResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for r in records {
            self.insert_dispute(r)?;
        }
        tx.commit()?;
        Ok(records.len())
    }

    pub(super) fn query_disputes(&self, filter: &DisputeFilter) -> RecoveryResult<Vec<DisputeRecord>> {
        let (clause, args) = where_clause(filter);
        let sql = format!(
            "SELECT dispute_id, chain, b_name, slug, platform, order_date, dispute_date,
                    external_status, raised, error_category, error_subcategory,
                    won_amount, refund_amount, order_subtotal
             FROM dispute
             {clause}
             ORDER BY dispute_date ASC, dispute_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok(RawDisputeRow {
                    dispute_id: row.get(0)?,
                    chain: row.get(1)?,
                    b_name: row.get(2)?,
                    slug: row.get(3)?,
                    platform: row.get(4)?,
                    order_date: row.get(5)?,
                    dispute_date: row.get(6)?,
                    external_status: row.get(7)?,
                    raised: row.get(8)?,
                    error_category: row.get(9)?,
                    error_subcategory: row.get(10)?,
                    won_amount: row.get(11)?,
                    refund_amount: row.get(12)?,
                    order_subtotal: row.get(13)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter().map(RawDisputeRow::into_record).collect()
    }
}
