//! CSV parsing and value coercion
//!
//! Export files arrive from third-party research tools whose headers are
//! decorated inconsistently (emoji prefixes, variable casing and
//! whitespace) and whose numeric columns mix currency symbols and
//! locale-dependent separators. Parsing is forgiving per cell and strict
//! per row: a row either yields a full validated record or a row error,
//! never a partial record.

use crate::core::import::types::RowError;
use crate::storage::repository::ProductUpsert;
use crate::utils::error::{Result, TrackerError};
use csv::ReaderBuilder;
use tracing::debug;

/// Known CSV columns after header normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Asin,
    Title,
    Brand,
    Category,
    ImageUrl,
    AmazonUrl,
    Price,
    BuyBoxPrice,
    Bsr,
    Rating,
    ReviewCount,
    SellerCount,
    MonthlySales,
    MonthlyRevenue,
    FbaFee,
    ReferralFee,
    Fulfillment,
    SoldByAmazon,
}

/// Parser output: validated records plus row-level errors
#[derive(Debug, Default)]
pub struct ParsedImport {
    pub valid: Vec<ProductUpsert>,
    pub errors: Vec<RowError>,
    /// Data rows seen, header excluded
    pub total_rows: usize,
}

/// Normalize a raw header cell for vocabulary matching: strip decorative
/// non-ASCII tokens (emoji, pictographs), lowercase, drop punctuation,
/// collapse whitespace.
fn normalize_header(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            cleaned.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c.is_ascii_punctuation() {
            cleaned.push(' ');
        }
        // Everything else (emoji and other decoration) is dropped.
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Match a normalized header against the known field vocabulary.
///
/// The "buy box" column family is matched with or without decorative
/// substrings because exports are inconsistent about them.
fn match_field(normalized: &str) -> Option<Field> {
    match normalized {
        "asin" => Some(Field::Asin),
        "title" | "product title" | "product name" | "name" => Some(Field::Title),
        "brand" => Some(Field::Brand),
        "category" => Some(Field::Category),
        "image" | "image url" => Some(Field::ImageUrl),
        "url" | "amazon url" | "product url" | "link" => Some(Field::AmazonUrl),
        "price" | "current price" => Some(Field::Price),
        "buy box" | "buy box price" | "buybox" | "buybox price" => Some(Field::BuyBoxPrice),
        "bsr" | "rank" | "best sellers rank" | "best seller rank" => Some(Field::Bsr),
        "rating" | "review rating" | "stars" => Some(Field::Rating),
        "reviews" | "review count" | "ratings" | "ratings count" => Some(Field::ReviewCount),
        "sellers" | "seller count" | "number of sellers" => Some(Field::SellerCount),
        "monthly sales" | "sales" | "est monthly sales" | "estimated monthly sales" => {
            Some(Field::MonthlySales)
        }
        "monthly revenue" | "revenue" | "est monthly revenue" | "estimated monthly revenue" => {
            Some(Field::MonthlyRevenue)
        }
        "fba fee" | "fba fees" => Some(Field::FbaFee),
        "referral fee" | "referral fees" => Some(Field::ReferralFee),
        "fulfillment" | "fulfilment" | "fulfillment type" => Some(Field::Fulfillment),
        "sold by amazon" | "amazon sells" | "sold by amz" => Some(Field::SoldByAmazon),
        _ => None,
    }
}

/// Values that coerce to absence rather than to an error
fn is_sentinel(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty()
        || matches!(trimmed, "-" | "–" | "—")
        || trimmed.eq_ignore_ascii_case("n/a")
        || trimmed.eq_ignore_ascii_case("na")
}

/// Locale-tolerant numeric coercion.
///
/// Currency symbols, percent signs, and spaces are stripped first. When
/// both `,` and `.` appear, whichever appears last is the decimal
/// separator and the other is grouping. A separator occurring more than
/// once can only be grouping.
pub fn parse_number(raw: &str) -> Option<f64> {
    if is_sentinel(raw) {
        return None;
    }
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-' | '+'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let last_comma = cleaned.rfind(',');
    let last_dot = cleaned.rfind('.');
    let decimal = match (last_comma, last_dot) {
        (Some(c), Some(d)) => Some(if c > d { ',' } else { '.' }),
        (Some(_), None) => Some(','),
        (None, Some(_)) => Some('.'),
        (None, None) => None,
    };

    let mut normalized = String::with_capacity(cleaned.len());
    for c in cleaned.chars() {
        match c {
            ',' | '.' => {
                if Some(c) == decimal && cleaned.matches(c).count() == 1 {
                    normalized.push('.');
                }
                // Grouping separators are dropped.
            }
            other => normalized.push(other),
        }
    }
    normalized.parse().ok()
}

/// Integer coercion on top of [`parse_number`]; fractional values are
/// rounded toward the nearest integer (exports occasionally write counts
/// as "1.0").
pub fn parse_integer(raw: &str) -> Option<i64> {
    parse_number(raw).map(|n| n.round() as i64)
}

/// Boolean coercion: "yes", "true", and "1" are truthy, case-insensitive;
/// sentinels are absence; anything else is false.
pub fn parse_boolean(raw: &str) -> Option<bool> {
    if is_sentinel(raw) {
        return None;
    }
    let trimmed = raw.trim();
    Some(
        trimmed.eq_ignore_ascii_case("yes")
            || trimmed.eq_ignore_ascii_case("true")
            || trimmed == "1",
    )
}

/// Reduce a multi-value cell to its first entry
fn first_value(raw: &str) -> Option<String> {
    if is_sentinel(raw) {
        return None;
    }
    raw.split([';', ',', '|'])
        .map(str::trim)
        .find(|part| !part.is_empty())
        .map(str::to_string)
}

fn text_value(raw: &str) -> Option<String> {
    if is_sentinel(raw) {
        None
    } else {
        Some(raw.trim().to_string())
    }
}

/// Validate and canonicalize an ASIN: exactly 10 ASCII alphanumerics,
/// uppercased.
pub fn canonical_asin(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.len() == 10 && trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(trimmed.to_ascii_uppercase())
    } else {
        None
    }
}

/// Parse an uploaded CSV byte stream.
///
/// Fails only on file-level problems (no header row, no recognizable
/// ASIN column). Row-level problems become [`RowError`]s and never abort
/// the parse.
pub fn parse_csv(bytes: &[u8]) -> Result<ParsedImport> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| TrackerError::Validation(format!("unreadable CSV header row: {}", e)))?
        .clone();

    let columns: Vec<Option<Field>> = headers
        .iter()
        .map(|h| match_field(&normalize_header(h)))
        .collect();

    if !columns.contains(&Some(Field::Asin)) {
        return Err(TrackerError::Validation(
            "CSV file has no recognizable ASIN column".to_string(),
        ));
    }

    let mut parsed = ParsedImport::default();
    for (index, record) in reader.records().enumerate() {
        // Header is row 1; the first data row is reported as row 2.
        let row = index + 2;
        parsed.total_rows += 1;

        let record = match record {
            Ok(record) => record,
            Err(e) => {
                parsed.errors.push(RowError {
                    row,
                    reason: format!("malformed CSV row: {}", e),
                    raw_row: None,
                });
                continue;
            }
        };

        let mut upsert = ProductUpsert::default();
        let mut asin_cell = None;
        for (field, cell) in columns.iter().zip(record.iter()) {
            let Some(field) = field else { continue };
            match field {
                Field::Asin => asin_cell = Some(cell),
                Field::Title => upsert.title = text_value(cell),
                Field::Brand => upsert.brand = text_value(cell),
                Field::Category => upsert.category = text_value(cell),
                Field::ImageUrl => upsert.image_url = text_value(cell),
                Field::AmazonUrl => upsert.amazon_url = text_value(cell),
                Field::Price => upsert.price = parse_number(cell),
                Field::BuyBoxPrice => upsert.buy_box_price = parse_number(cell),
                Field::Bsr => upsert.bsr = parse_integer(cell),
                Field::Rating => upsert.rating = parse_number(cell),
                Field::ReviewCount => upsert.review_count = parse_integer(cell),
                Field::SellerCount => upsert.seller_count = parse_integer(cell),
                Field::MonthlySales => upsert.monthly_sales = parse_integer(cell),
                Field::MonthlyRevenue => upsert.monthly_revenue = parse_number(cell),
                Field::FbaFee => upsert.fba_fee = parse_number(cell),
                Field::ReferralFee => upsert.referral_fee = parse_number(cell),
                Field::Fulfillment => upsert.fulfillment = first_value(cell),
                Field::SoldByAmazon => upsert.sold_by_amazon = parse_boolean(cell),
            }
        }

        match asin_cell.and_then(canonical_asin) {
            Some(asin) => {
                upsert.asin = asin;
                parsed.valid.push(upsert);
            }
            None => parsed.errors.push(RowError {
                row,
                reason: "missing or invalid ASIN".to_string(),
                raw_row: Some(record.iter().collect::<Vec<_>>().join(",")),
            }),
        }
    }

    debug!(
        total_rows = parsed.total_rows,
        valid = parsed.valid.len(),
        errors = parsed.errors.len(),
        "CSV parse finished"
    );
    Ok(parsed)
}
